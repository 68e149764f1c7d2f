use chrono::Utc;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use tracing::debug;

use gaugevecset::{GaugeVecSet, GaugeVecSetError, GaugeVecSetOpts};

use crate::condition::{merge_condition, Condition, ConditionedObject};

const SUBSYSTEM: &str = "controller";
const NAME: &str = "condition";
const HELP: &str = "Condition status for a custom resource; one active (status,reason) time series per (controller,kind,name,namespace,condition).";

const OUTER_LABELS: [&str; 4] = [
    "controller",
    "resource_kind",
    "resource_name",
    "resource_namespace",
];
const SUB_LABELS: [&str; 1] = ["condition"];
const EXTRA_LABELS: [&str; 2] = ["status", "reason"];

/// `<namespace>_controller_condition`, holding one (status, reason) series
/// per (controller, kind, name, namespace, condition).
///
/// Cloning is cheap and clones share their series, so one clone can be
/// registered while the others record.
#[derive(Clone)]
pub struct OperatorConditionsGauge {
    inner: GaugeVecSet,
}

impl OperatorConditionsGauge {
    pub fn new<S: Into<String>>(metric_namespace: S) -> Result<Self, GaugeVecSetError> {
        let inner = GaugeVecSet::new(
            GaugeVecSetOpts::new(NAME, HELP)
                .namespace(metric_namespace)
                .subsystem(SUBSYSTEM)
                .outer_labels(&OUTER_LABELS)
                .sub_labels(&SUB_LABELS)
                .extra_labels(&EXTRA_LABELS),
        )?;
        Ok(OperatorConditionsGauge { inner })
    }

    pub fn gauge_vec_set(&self) -> &GaugeVecSet {
        &self.inner
    }
}

impl Collector for OperatorConditionsGauge {
    fn desc(&self) -> Vec<&Desc> {
        self.inner.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.inner.collect()
    }
}

/// Records the conditions a controller sets on its resources.
///
/// The exported value is the condition's last transition time in Unix
/// seconds.
#[derive(Clone)]
pub struct ConditionMetricRecorder {
    pub controller: String,
    pub gauge: OperatorConditionsGauge,
}

impl ConditionMetricRecorder {
    pub fn new<S: Into<String>>(controller: S, gauge: OperatorConditionsGauge) -> Self {
        ConditionMetricRecorder {
            controller: controller.into(),
            gauge,
        }
    }

    fn outer<'a, O: ConditionedObject>(
        &'a self,
        kind: &'a str,
        object: &'a O,
    ) -> [&'a str; 4] {
        [
            self.controller.as_str(),
            kind,
            object.name(),
            object.namespace(),
        ]
    }

    /// Makes `condition` the only (status, reason) series of its condition
    /// type for `object`. A condition without a transition time is recorded
    /// as transitioning now.
    pub fn record_condition_for<O: ConditionedObject>(
        &self,
        kind: &str,
        object: &O,
        condition: &Condition,
    ) -> Result<(), GaugeVecSetError> {
        let transitioned = condition.last_transition_time.unwrap_or_else(Utc::now);
        self.gauge.inner.set_group(
            transitioned.timestamp() as f64,
            &self.outer(kind, object),
            &[condition.condition_type.as_str()],
            &[condition.status.as_str(), condition.reason.as_str()],
        )
    }

    /// Merges `condition` into `conditions` and records the merged condition
    /// if anything changed. Returns whether it changed.
    pub fn set_status_condition<O: ConditionedObject>(
        &self,
        kind: &str,
        object: &O,
        conditions: &mut Vec<Condition>,
        condition: Condition,
    ) -> Result<bool, GaugeVecSetError> {
        let condition_type = condition.condition_type.clone();
        if !merge_condition(conditions, condition, Utc::now()) {
            return Ok(false);
        }

        if let Some(merged) = conditions
            .iter()
            .find(|merged| merged.condition_type == condition_type)
        {
            self.record_condition_for(kind, object, merged)?;
        }
        Ok(true)
    }

    /// Removes every condition series of `object`, e.g. once it is deleted.
    /// Returns how many series were removed.
    pub fn remove_conditions_for<O: ConditionedObject>(
        &self,
        kind: &str,
        object: &O,
    ) -> Result<usize, GaugeVecSetError> {
        let removed = self.gauge.inner.delete_by_index(&self.outer(kind, object))?;
        debug!(
            "removed {} condition series for {} {}/{}",
            removed,
            kind,
            object.namespace(),
            object.name()
        );
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::ConditionStatus;
    use chrono::{DateTime, TimeZone};
    use prometheus::{Encoder, Registry, TextEncoder};

    struct FakeObject {
        name: String,
        namespace: String,
    }

    impl ConditionedObject for FakeObject {
        fn name(&self) -> &str {
            &self.name
        }

        fn namespace(&self) -> &str {
            &self.namespace
        }
    }

    fn make_obj(name: &str, namespace: &str) -> FakeObject {
        FakeObject {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    fn transition_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
    }

    fn condition(condition_type: &str, status: ConditionStatus, reason: &str) -> Condition {
        Condition::new(condition_type, status, reason).last_transition_time(transition_time())
    }

    fn registered(metric_namespace: &str) -> (Registry, ConditionMetricRecorder) {
        let gauge = OperatorConditionsGauge::new(metric_namespace).unwrap();
        let registry = Registry::new();
        registry.register(Box::new(gauge.clone())).unwrap();
        (registry, ConditionMetricRecorder::new("my-controller", gauge))
    }

    fn exposition(registry: &Registry) -> String {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&registry.gather(), &mut buffer)
            .unwrap();
        String::from_utf8(buffer).unwrap()
    }

    #[test]
    fn test_record_transition_and_second_condition() {
        let (registry, recorder) = registered("test_record_transition");
        let obj = make_obj("cr-1", "prod");

        recorder
            .record_condition_for("MyCRD", &obj, &condition("Ready", ConditionStatus::True, ""))
            .unwrap();
        recorder
            .record_condition_for(
                "MyCRD",
                &obj,
                &condition("Ready", ConditionStatus::False, "Failed"),
            )
            .unwrap();
        recorder
            .record_condition_for(
                "MyCRD",
                &obj,
                &condition("Synchronized", ConditionStatus::True, ""),
            )
            .unwrap();

        insta::assert_snapshot!(exposition(&registry), @r###"
        # HELP test_record_transition_controller_condition Condition status for a custom resource; one active (status,reason) time series per (controller,kind,name,namespace,condition).
        # TYPE test_record_transition_controller_condition gauge
        test_record_transition_controller_condition{condition="Ready",controller="my-controller",reason="Failed",resource_kind="MyCRD",resource_name="cr-1",resource_namespace="prod",status="False"} 1735689600
        test_record_transition_controller_condition{condition="Synchronized",controller="my-controller",reason="",resource_kind="MyCRD",resource_name="cr-1",resource_namespace="prod",status="True"} 1735689600
        "###);

        assert_eq!(recorder.remove_conditions_for("MyCRD", &obj).unwrap(), 2);
    }

    #[test]
    fn test_remove_conditions_for() {
        let (registry, recorder) = registered("test_remove_conditions_for");
        let obj = make_obj("cr-2", "staging");
        let other = make_obj("cr-3", "staging");

        for (object, recorded) in [
            (&obj, condition("Ready", ConditionStatus::True, "")),
            (&obj, condition("Synchronized", ConditionStatus::False, "SyncPending")),
            (&other, condition("Ready", ConditionStatus::True, "")),
        ] {
            recorder
                .record_condition_for("MyCRD", object, &recorded)
                .unwrap();
        }

        assert_eq!(recorder.remove_conditions_for("MyCRD", &obj).unwrap(), 2);
        assert_eq!(recorder.remove_conditions_for("MyCRD", &obj).unwrap(), 0);

        let text = exposition(&registry);
        assert!(!text.contains("cr-2"));
        assert!(text.contains(r#"resource_name="cr-3""#));
    }

    #[test]
    fn test_sets_kind_label_from_argument() {
        let (_registry, recorder) = registered("test_sets_kind_label");
        let obj = make_obj("obj-1", "ns-1");

        recorder
            .record_condition_for(
                "FancyKind",
                &obj,
                &condition("Ready", ConditionStatus::True, ""),
            )
            .unwrap();

        assert_eq!(
            recorder.gauge.gauge_vec_set().indexed_series(),
            vec![vec![
                "my-controller",
                "FancyKind",
                "obj-1",
                "ns-1",
                "Ready",
                "True",
                ""
            ]]
        );
        assert_eq!(
            recorder
                .gauge
                .gauge_vec_set()
                .delete_by_index(&["my-controller", "FancyKind", "obj-1", "ns-1"])
                .unwrap(),
            1
        );
    }

    #[test]
    fn test_cluster_scoped_object() {
        let (registry, recorder) = registered("test_cluster_scoped");
        let obj = make_obj("global", "");

        recorder
            .record_condition_for(
                "ClusterThing",
                &obj,
                &condition("Ready", ConditionStatus::Unknown, "Probing"),
            )
            .unwrap();

        assert!(exposition(&registry).contains(r#"resource_namespace="""#));
        assert_eq!(recorder.remove_conditions_for("ClusterThing", &obj).unwrap(), 1);
    }

    #[test]
    fn test_set_status_condition_records_only_changes() {
        let (_registry, recorder) = registered("test_set_status_condition");
        let obj = make_obj("cr-4", "prod");
        let mut conditions = Vec::new();

        let changed = recorder
            .set_status_condition(
                "MyCRD",
                &obj,
                &mut conditions,
                condition("Ready", ConditionStatus::False, "Pending"),
            )
            .unwrap();
        assert!(changed);
        assert_eq!(recorder.gauge.gauge_vec_set().len(), 1);

        // Same condition again: nothing changes, nothing is recorded.
        recorder
            .gauge
            .gauge_vec_set()
            .delete_by_index(&["my-controller", "MyCRD", "cr-4", "prod"])
            .unwrap();
        let changed = recorder
            .set_status_condition(
                "MyCRD",
                &obj,
                &mut conditions,
                Condition::new("Ready", ConditionStatus::False, "Pending"),
            )
            .unwrap();
        assert!(!changed);
        assert!(recorder.gauge.gauge_vec_set().is_empty());

        let changed = recorder
            .set_status_condition(
                "MyCRD",
                &obj,
                &mut conditions,
                Condition::new("Ready", ConditionStatus::True, "Reconciled"),
            )
            .unwrap();
        assert!(changed);
        assert_eq!(conditions.len(), 1);
        assert_eq!(conditions[0].status, ConditionStatus::True);

        let series = recorder.gauge.gauge_vec_set().indexed_series();
        assert_eq!(series.len(), 1);
        assert_eq!(series[0][5], "True");
        assert_eq!(series[0][6], "Reconciled");
    }

    #[test]
    fn test_set_status_condition_value_is_transition_time() {
        let (registry, recorder) = registered("test_transition_value");
        let obj = make_obj("cr-5", "prod");
        let mut conditions = vec![condition("Ready", ConditionStatus::True, "")];

        // Only the reason changes, so the stored transition time is exported.
        let changed = recorder
            .set_status_condition(
                "MyCRD",
                &obj,
                &mut conditions,
                Condition::new("Ready", ConditionStatus::True, "Reconciled"),
            )
            .unwrap();

        assert!(changed);
        assert!(exposition(&registry).contains(r#"reason="Reconciled""#));
        assert!(exposition(&registry).contains("} 1735689600\n"));
    }
}
