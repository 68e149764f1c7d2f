use std::collections::{HashMap, HashSet};

type Bucket = HashSet<String>;

/// outer key -> sub key -> set of full series keys.
///
/// Holds the series believed to exist in the gauge vector. Buckets that become
/// empty are removed right away, and so are outer entries without buckets.
#[derive(Debug, Default)]
pub(crate) struct CompositeIndex {
    outers: HashMap<String, HashMap<String, Bucket>>,
}

impl CompositeIndex {
    pub(crate) fn insert(&mut self, outer_key: String, sub_key: String, full_key: String) {
        self.outers
            .entry(outer_key)
            .or_default()
            .entry(sub_key)
            .or_default()
            .insert(full_key);
    }

    /// Copies the full keys of one (outer, sub) bucket.
    pub(crate) fn group_keys(&self, outer_key: &str, sub_key: &str) -> Vec<String> {
        self.outers
            .get(outer_key)
            .and_then(|buckets| buckets.get(sub_key))
            .map(|bucket| bucket.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Copies the full keys of every bucket under `outer_key`.
    pub(crate) fn outer_keys(&self, outer_key: &str) -> Vec<String> {
        self.outers
            .get(outer_key)
            .map(|buckets| buckets.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    pub(crate) fn remove_outer(&mut self, outer_key: &str) {
        self.outers.remove(outer_key);
    }

    pub(crate) fn remove_group(&mut self, outer_key: &str, sub_key: &str) {
        if let Some(buckets) = self.outers.get_mut(outer_key) {
            buckets.remove(sub_key);
            if buckets.is_empty() {
                self.outers.remove(outer_key);
            }
        }
    }

    /// Number of indexed series.
    pub(crate) fn len(&self) -> usize {
        self.outers
            .values()
            .flat_map(|buckets| buckets.values())
            .map(|bucket| bucket.len())
            .sum()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.outers.is_empty()
    }

    pub(crate) fn full_keys(&self) -> impl Iterator<Item = &String> {
        self.outers
            .values()
            .flat_map(|buckets| buckets.values())
            .flatten()
    }

    #[cfg(test)]
    pub(crate) fn has_empty_entries(&self) -> bool {
        self.outers
            .values()
            .any(|buckets| buckets.is_empty() || buckets.values().any(|b| b.is_empty()))
    }
}
