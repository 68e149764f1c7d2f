//! Exports Kubernetes-style status conditions as
//! `<namespace>_controller_condition` series, keeping exactly one
//! (status, reason) series per condition of each resource.
mod condition;
mod recorder;

pub use condition::find_condition;
pub use condition::merge_condition;
pub use condition::Condition;
pub use condition::ConditionStatus;
pub use condition::ConditionedObject;
pub use recorder::ConditionMetricRecorder;
pub use recorder::OperatorConditionsGauge;
