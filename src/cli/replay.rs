//! Replays a file of operations against a [`GaugeVecSet`] and renders the
//! resulting series in the Prometheus text format.
//!
//! ```text
//! # comment
//! set 1 prod;nginx;Pending
//! set-active 1 prod;nginx;Running
//! set-group 1 prod;nginx;Failed
//! delete-group prod;nginx
//! delete-index prod
//! ```
//!
//! Tiers are separated by `;` and values within a tier by `,`.
use std::path::Path;

use anyhow::Context;
use prometheus::{Encoder, Registry, TextEncoder};
use thiserror::Error;
use tracing::{debug, info};

use gaugevecset::{GaugeVecSet, GaugeVecSetError, GaugeVecSetOpts, LabelSchema};

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub(crate) enum SetMode {
    Plain,
    ActiveInGroup,
    Group,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Operation {
    Set {
        mode: SetMode,
        value: f64,
        outer: Vec<String>,
        sub: Vec<String>,
        extra: Vec<String>,
    },
    DeleteByIndex {
        outer: Vec<String>,
    },
    DeleteByGroup {
        outer: Vec<String>,
        sub: Vec<String>,
    },
}

#[derive(Debug, Error, PartialEq)]
pub(crate) enum ParseError {
    #[error("line {0}: unknown operation {1:?}")]
    UnknownOperation(usize, String),
    #[error("line {0}: missing {1}")]
    Missing(usize, &'static str),
    #[error("line {0}: invalid value {1:?}")]
    InvalidValue(usize, String),
    #[error("line {line}: expected {expected} tiers separated by ';', got {got}")]
    TierCount {
        line: usize,
        expected: usize,
        got: usize,
    },
}

/// Splits one tier into its values. A tier without labels is written empty.
fn split_tier(segment: &str, arity: usize) -> Vec<String> {
    if arity == 0 && segment.is_empty() {
        return Vec::new();
    }
    segment.split(',').map(String::from).collect()
}

fn split_tiers<'a>(
    line: usize,
    tiers: &'a str,
    expected: usize,
) -> Result<Vec<&'a str>, ParseError> {
    let segments: Vec<&str> = tiers.split(';').collect();
    if segments.len() != expected {
        return Err(ParseError::TierCount {
            line,
            expected,
            got: segments.len(),
        });
    }
    Ok(segments)
}

/// Parses one line. Blank lines and `#` comments yield `None`.
pub(crate) fn parse_line(
    line: usize,
    text: &str,
    schema: &LabelSchema,
) -> Result<Option<Operation>, ParseError> {
    let text = text.trim();
    if text.is_empty() || text.starts_with('#') {
        return Ok(None);
    }

    let (op, rest) = text.split_once(char::is_whitespace).unwrap_or((text, ""));
    let rest = rest.trim_start();
    let outer_arity = schema.outer().len();
    let sub_arity = schema.sub().len();

    let operation = match op {
        "set" | "set-active" | "set-group" => {
            let mode = match op {
                "set" => SetMode::Plain,
                "set-active" => SetMode::ActiveInGroup,
                _ => SetMode::Group,
            };
            let (value, tiers) = rest
                .split_once(char::is_whitespace)
                .ok_or(ParseError::Missing(line, "label values"))?;
            let value: f64 = value
                .parse()
                .map_err(|_| ParseError::InvalidValue(line, value.to_string()))?;
            let segments = split_tiers(line, tiers.trim(), 3)?;
            Operation::Set {
                mode,
                value,
                outer: split_tier(segments[0], outer_arity),
                sub: split_tier(segments[1], sub_arity),
                extra: split_tier(segments[2], schema.extra().len()),
            }
        }
        "delete-index" => {
            if rest.is_empty() {
                return Err(ParseError::Missing(line, "outer values"));
            }
            let segments = split_tiers(line, rest, 1)?;
            Operation::DeleteByIndex {
                outer: split_tier(segments[0], outer_arity),
            }
        }
        "delete-group" => {
            if rest.is_empty() {
                return Err(ParseError::Missing(line, "outer and sub values"));
            }
            let segments = split_tiers(line, rest, 2)?;
            Operation::DeleteByGroup {
                outer: split_tier(segments[0], outer_arity),
                sub: split_tier(segments[1], sub_arity),
            }
        }
        _ => return Err(ParseError::UnknownOperation(line, op.to_string())),
    };
    Ok(Some(operation))
}

/// Parses a whole file, returning each operation with its 1-based line number.
pub(crate) fn parse_operations(
    input: &str,
    schema: &LabelSchema,
) -> Result<Vec<(usize, Operation)>, ParseError> {
    let mut operations = Vec::new();
    for (i, text) in input.lines().enumerate() {
        if let Some(operation) = parse_line(i + 1, text, schema)? {
            operations.push((i + 1, operation));
        }
    }
    Ok(operations)
}

/// Applies one operation, returning the number of removed series.
pub(crate) fn apply(
    store: &GaugeVecSet,
    operation: &Operation,
) -> Result<usize, GaugeVecSetError> {
    match operation {
        Operation::Set {
            mode,
            value,
            outer,
            sub,
            extra,
        } => {
            match mode {
                SetMode::Plain => store.set(*value, outer, sub, extra)?,
                SetMode::ActiveInGroup => store.set_active_in_group(*value, outer, sub, extra)?,
                SetMode::Group => store.set_group(*value, outer, sub, extra)?,
            }
            Ok(0)
        }
        Operation::DeleteByIndex { outer } => store.delete_by_index(outer),
        Operation::DeleteByGroup { outer, sub } => store.delete_by_group(outer, sub),
    }
}

/// Renders the current series of `store` in the Prometheus text format.
pub(crate) fn exposition(store: &GaugeVecSet) -> anyhow::Result<String> {
    let registry = Registry::new();
    registry.register(Box::new(store.clone()))?;

    let mut buffer = Vec::new();
    TextEncoder::new().encode(&registry.gather(), &mut buffer)?;
    Ok(String::from_utf8(buffer)?)
}

pub(crate) fn replay(opts: GaugeVecSetOpts, input: &str) -> anyhow::Result<String> {
    let store = GaugeVecSet::new(opts)?;
    let operations = parse_operations(input, store.schema())?;

    let mut removed = 0;
    for (line, operation) in &operations {
        let deleted = apply(&store, operation).with_context(|| format!("line {line}"))?;
        if deleted > 0 {
            debug!("line {}: removed {} series", line, deleted);
        }
        removed += deleted;
    }
    info!(
        "replayed {} operations, removed {} series, {} series remain",
        operations.len(),
        removed,
        store.len()
    );

    exposition(&store)
}

pub(crate) fn run(opts: GaugeVecSetOpts, path: &Path) -> anyhow::Result<String> {
    let input = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read operations from {}", path.display()))?;
    replay(opts, &input)
}
