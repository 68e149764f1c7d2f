use std::collections::HashSet;

use crate::error::{GaugeVecSetError, Tier};

/// Label names of a [`crate::GaugeVecSet`], split in three tiers.
///
/// - outer: identify a bulk-deletion scope (e.g. a resource), at least one.
/// - sub: a mutually exclusive group under an outer key (e.g. a condition type).
/// - extra: the variants within a group (e.g. status and reason).
///
/// The exported label order is outer, then sub, then extra.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct LabelSchema {
    outer: Vec<String>,
    sub: Vec<String>,
    extra: Vec<String>,
}

impl LabelSchema {
    pub fn new<S: AsRef<str>>(
        outer: &[S],
        sub: &[S],
        extra: &[S],
    ) -> Result<Self, GaugeVecSetError> {
        if outer.is_empty() {
            return Err(GaugeVecSetError::NoOuterLabels);
        }

        let mut seen = HashSet::with_capacity(outer.len() + sub.len() + extra.len());
        for label in outer.iter().chain(sub).chain(extra) {
            if !seen.insert(label.as_ref()) {
                return Err(GaugeVecSetError::DuplicateLabel(label.as_ref().to_string()));
            }
        }

        let owned = |labels: &[S]| -> Vec<String> {
            labels.iter().map(|l| l.as_ref().to_string()).collect()
        };
        Ok(LabelSchema {
            outer: owned(outer),
            sub: owned(sub),
            extra: owned(extra),
        })
    }

    pub fn outer(&self) -> &[String] {
        &self.outer
    }

    pub fn sub(&self) -> &[String] {
        &self.sub
    }

    pub fn extra(&self) -> &[String] {
        &self.extra
    }

    pub fn has_sub(&self) -> bool {
        !self.sub.is_empty()
    }

    /// Every label name in exported order.
    pub fn all_labels(&self) -> Vec<&str> {
        self.outer
            .iter()
            .chain(&self.sub)
            .chain(&self.extra)
            .map(String::as_str)
            .collect()
    }

    fn labels(&self, tier: Tier) -> &[String] {
        match tier {
            Tier::Outer => &self.outer,
            Tier::Sub => &self.sub,
            Tier::Extra => &self.extra,
        }
    }

    pub(crate) fn check_arity<S>(
        &self,
        tier: Tier,
        values: &[S],
    ) -> Result<(), GaugeVecSetError> {
        let labels = self.labels(tier);
        if values.len() != labels.len() {
            return Err(GaugeVecSetError::ArityMismatch {
                tier,
                expected: labels.len(),
                got: values.len(),
                labels: labels.to_vec(),
            });
        }
        Ok(())
    }

    pub(crate) fn check_tuple<S>(
        &self,
        outer: &[S],
        sub: &[S],
        extra: &[S],
    ) -> Result<(), GaugeVecSetError> {
        self.check_arity(Tier::Outer, outer)?;
        self.check_arity(Tier::Sub, sub)?;
        self.check_arity(Tier::Extra, extra)
    }
}
