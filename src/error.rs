use std::fmt::{Display, Formatter};
use thiserror::Error;

/// One of the three label tiers of a [`crate::LabelSchema`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Tier {
    Outer,
    Sub,
    Extra,
}

impl Display for Tier {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Tier::Outer => write!(f, "outer"),
            Tier::Sub => write!(f, "sub"),
            Tier::Extra => write!(f, "extra"),
        }
    }
}

#[derive(Debug, Error)]
pub enum GaugeVecSetError {
    #[error("at least one outer label is required")]
    NoOuterLabels,
    #[error("duplicate label {0:?} detected across outer/sub/extra labels")]
    DuplicateLabel(String),
    #[error("expected {expected} {tier} values for labels {labels:?}, got {got}")]
    ArityMismatch {
        tier: Tier,
        expected: usize,
        got: usize,
        labels: Vec<String>,
    },
    #[error("metric error: {0}")]
    Metric(#[from] prometheus::Error),
}
