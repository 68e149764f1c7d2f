//! Canonical string keys for label value tuples.
//!
//! Values are joined with [`SEPARATOR`]. A value that contains the separator
//! has it removed first, both in the key and in the tuple handed to the gauge
//! vector, so the exported series and its key always agree and no two
//! distinct tuples produce the same key.
use std::borrow::Cow;

use itertools::Itertools;

pub const SEPARATOR: char = '`';
const SEPARATOR_STR: &str = "`";

/// Returns the value with every separator removed, borrowing in the common
/// case where there is nothing to remove.
fn strip(value: &str) -> Cow<'_, str> {
    if value.contains(SEPARATOR) {
        Cow::Owned(value.replace(SEPARATOR, ""))
    } else {
        Cow::Borrowed(value)
    }
}

/// Joins `values` into a single key. An empty slice maps to the empty string.
pub fn serialize<S: AsRef<str>>(values: &[S]) -> String {
    values
        .iter()
        .map(|value| strip(value.as_ref()))
        .join(SEPARATOR_STR)
}

/// Splits a key produced by [`serialize`] back into its values.
///
/// The arity of a key is not recoverable from the empty string, which is both
/// the key of an empty tuple and of a single empty value. Full series keys
/// always have at least one outer value, so they are unambiguous.
pub fn deserialize(key: &str) -> Vec<&str> {
    key.split(SEPARATOR).collect()
}

/// Concatenates the three tiers in schema order, stripped like [`serialize`].
/// The result is what gets written to the gauge vector.
pub fn concat<'a, S: AsRef<str>>(
    outer: &'a [S],
    sub: &'a [S],
    extra: &'a [S],
) -> Vec<Cow<'a, str>> {
    let mut values = Vec::with_capacity(outer.len() + sub.len() + extra.len());
    values.extend(
        outer
            .iter()
            .chain(sub)
            .chain(extra)
            .map(|value| strip(value.as_ref())),
    );
    values
}
