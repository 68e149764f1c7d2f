use std::fmt::{Display, Formatter};

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Eq, Hash, PartialEq)]
pub enum ConditionStatus {
    True,
    False,
    Unknown,
}

impl ConditionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConditionStatus::True => "True",
            ConditionStatus::False => "False",
            ConditionStatus::Unknown => "Unknown",
        }
    }
}

impl Display for ConditionStatus {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A status condition as found in a custom resource's `.status.conditions`.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// e.g. `Ready`, `Synchronized`.
    pub condition_type: String,
    pub status: ConditionStatus,
    /// Short machine readable reason, often empty when the status is `True`.
    pub reason: String,
    pub message: String,
    pub observed_generation: i64,
    pub last_transition_time: Option<DateTime<Utc>>,
}

impl Condition {
    pub fn new<T: Into<String>, R: Into<String>>(
        condition_type: T,
        status: ConditionStatus,
        reason: R,
    ) -> Self {
        Condition {
            condition_type: condition_type.into(),
            status,
            reason: reason.into(),
            message: String::new(),
            observed_generation: 0,
            last_transition_time: None,
        }
    }

    pub fn message<S: Into<String>>(mut self, message: S) -> Self {
        self.message = message.into();
        self
    }

    pub fn observed_generation(mut self, generation: i64) -> Self {
        self.observed_generation = generation;
        self
    }

    pub fn last_transition_time(mut self, time: DateTime<Utc>) -> Self {
        self.last_transition_time = Some(time);
        self
    }
}

/// An object that carries conditions. Cluster scoped objects return an
/// empty namespace.
pub trait ConditionedObject {
    fn name(&self) -> &str;
    fn namespace(&self) -> &str;
}

pub fn find_condition<'a>(
    conditions: &'a [Condition],
    condition_type: &str,
) -> Option<&'a Condition> {
    conditions
        .iter()
        .find(|condition| condition.condition_type == condition_type)
}

/// Merges `condition` into `conditions` and returns whether anything changed.
///
/// A new condition type is appended, stamped with `now` if it has no
/// transition time. For an existing type the transition time only moves when
/// the status changes; reason, message and observed generation are always
/// brought up to date.
pub fn merge_condition(
    conditions: &mut Vec<Condition>,
    mut condition: Condition,
    now: DateTime<Utc>,
) -> bool {
    let Some(existing) = conditions
        .iter_mut()
        .find(|existing| existing.condition_type == condition.condition_type)
    else {
        condition.last_transition_time.get_or_insert(now);
        conditions.push(condition);
        return true;
    };

    let mut changed = false;
    if existing.status != condition.status {
        existing.status = condition.status;
        existing.last_transition_time = Some(condition.last_transition_time.unwrap_or(now));
        changed = true;
    }
    if existing.reason != condition.reason {
        existing.reason = condition.reason;
        changed = true;
    }
    if existing.message != condition.message {
        existing.message = condition.message;
        changed = true;
    }
    if existing.observed_generation != condition.observed_generation {
        existing.observed_generation = condition.observed_generation;
        changed = true;
    }
    changed
}
