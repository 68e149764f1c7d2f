use std::borrow::Cow;
use std::sync::Arc;

use parking_lot::RwLock;
use prometheus::core::{Collector, Desc};
use prometheus::proto::MetricFamily;
use prometheus::{GaugeVec, Opts};
use tracing::{debug, instrument, trace};

use crate::error::{GaugeVecSetError, Tier};
use crate::index::CompositeIndex;
use crate::key;
use crate::schema::LabelSchema;
use crate::vector::GaugeVector;

/// Metric metadata and label names used to build a [`GaugeVecSet`].
#[derive(Debug, Clone, Default)]
pub struct GaugeVecSetOpts {
    pub namespace: String,
    pub subsystem: String,
    pub name: String,
    pub help: String,
    pub outer_labels: Vec<String>,
    pub sub_labels: Vec<String>,
    pub extra_labels: Vec<String>,
}

fn owned_labels<S: AsRef<str>>(labels: &[S]) -> Vec<String> {
    labels.iter().map(|l| l.as_ref().to_string()).collect()
}

impl GaugeVecSetOpts {
    pub fn new<S1: Into<String>, S2: Into<String>>(name: S1, help: S2) -> Self {
        GaugeVecSetOpts {
            name: name.into(),
            help: help.into(),
            ..Default::default()
        }
    }

    pub fn namespace<S: Into<String>>(mut self, namespace: S) -> Self {
        self.namespace = namespace.into();
        self
    }

    pub fn subsystem<S: Into<String>>(mut self, subsystem: S) -> Self {
        self.subsystem = subsystem.into();
        self
    }

    pub fn outer_labels<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        self.outer_labels = owned_labels(labels);
        self
    }

    pub fn sub_labels<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        self.sub_labels = owned_labels(labels);
        self
    }

    pub fn extra_labels<S: AsRef<str>>(mut self, labels: &[S]) -> Self {
        self.extra_labels = owned_labels(labels);
        self
    }
}

/// A gauge vector that keeps an index of its series:
///
/// ```text
/// outer key -> sub key -> set(full key)
/// ```
///
/// so that every series of an outer key, or of one (outer, sub) group, can be
/// zeroed or deleted without scanning unrelated series. Use it for enum-like
/// metrics where one variant per group is active.
///
/// Label values are passed per tier and must match the arity of the
/// [`LabelSchema`]. The index lock is never held while calling into the
/// gauge vector; bulk operations snapshot the affected keys first.
///
/// Every exported series is kept in memory. Prefer bounded outer and sub
/// label spaces.
///
/// Clones share the same vector and index, which is how a set is handed to a
/// `prometheus::Registry` while still being written to.
pub struct GaugeVecSet<V = GaugeVec> {
    vector: Arc<V>,
    schema: Arc<LabelSchema>,
    index: Arc<RwLock<CompositeIndex>>,
}

impl<V> Clone for GaugeVecSet<V> {
    fn clone(&self) -> Self {
        GaugeVecSet {
            vector: Arc::clone(&self.vector),
            schema: Arc::clone(&self.schema),
            index: Arc::clone(&self.index),
        }
    }
}

impl GaugeVecSet<GaugeVec> {
    /// Builds an unregistered set backed by a `prometheus::GaugeVec`.
    pub fn new(opts: GaugeVecSetOpts) -> Result<Self, GaugeVecSetError> {
        let schema =
            LabelSchema::new(&opts.outer_labels, &opts.sub_labels, &opts.extra_labels)?;
        let vector = GaugeVec::new(
            Opts::new(opts.name, opts.help)
                .namespace(opts.namespace)
                .subsystem(opts.subsystem),
            &schema.all_labels(),
        )?;
        Ok(Self::with_vector(vector, schema))
    }
}

impl<V: GaugeVector> GaugeVecSet<V> {
    /// The vector must have been created with `schema.all_labels()`.
    pub fn with_vector(vector: V, schema: LabelSchema) -> Self {
        GaugeVecSet {
            vector: Arc::new(vector),
            schema: Arc::new(schema),
            index: Arc::new(RwLock::new(CompositeIndex::default())),
        }
    }

    pub fn schema(&self) -> &LabelSchema {
        &self.schema
    }

    pub fn vector(&self) -> &V {
        &self.vector
    }

    /// Sets one series to `value`. Sibling series are left untouched.
    pub fn set<S: AsRef<str>>(
        &self,
        value: f64,
        outer: &[S],
        sub: &[S],
        extra: &[S],
    ) -> Result<(), GaugeVecSetError> {
        self.schema.check_tuple(outer, sub, extra)?;

        let values = key::concat(outer, sub, extra);
        self.write(&values, value)?;
        self.index.write().insert(
            key::serialize(outer),
            key::serialize(sub),
            key::serialize(&values),
        );
        Ok(())
    }

    /// Sets the target series to `value` and zeroes every other series of its
    /// (outer, sub) group. Zeroed series stay exported and indexed.
    ///
    /// Without sub labels there is no group and this behaves like [`Self::set`].
    /// Only use it for small, bounded variant spaces; see [`Self::set_group`].
    pub fn set_active_in_group<S: AsRef<str>>(
        &self,
        value: f64,
        outer: &[S],
        sub: &[S],
        extra: &[S],
    ) -> Result<(), GaugeVecSetError> {
        if !self.schema.has_sub() {
            return self.set(value, outer, sub, extra);
        }
        self.schema.check_tuple(outer, sub, extra)?;

        let values = key::concat(outer, sub, extra);
        let full_key = key::serialize(&values);
        let outer_key = key::serialize(outer);
        let sub_key = key::serialize(sub);

        let siblings = self.index.read().group_keys(&outer_key, &sub_key);
        for sibling in siblings.iter().filter(|sibling| **sibling != full_key) {
            self.vector.set(&key::deserialize(sibling), 0.0)?;
        }

        self.write(&values, value)?;
        self.index.write().insert(outer_key, sub_key, full_key);
        Ok(())
    }

    /// Deletes every other series of the (outer, sub) group and sets the
    /// target to `value`, leaving exactly one series in the group.
    ///
    /// Unlike [`Self::set_active_in_group`], the number of series stays at one
    /// per group however many extra label variants are seen, e.g. 10k groups
    /// with 10 variants each export 10k series instead of 100k.
    pub fn set_group<S: AsRef<str>>(
        &self,
        value: f64,
        outer: &[S],
        sub: &[S],
        extra: &[S],
    ) -> Result<(), GaugeVecSetError> {
        self.schema.check_tuple(outer, sub, extra)?;
        self.delete_by_group(outer, sub)?;
        self.set(value, outer, sub, extra)
    }

    /// Deletes every series under the outer key, across all groups, and
    /// returns how many were actually removed from the vector.
    #[instrument(level = "debug", skip_all)]
    pub fn delete_by_index<S: AsRef<str>>(
        &self,
        outer: &[S],
    ) -> Result<usize, GaugeVecSetError> {
        self.schema.check_arity(Tier::Outer, outer)?;

        let outer_key = key::serialize(outer);
        let keys = self.index.read().outer_keys(&outer_key);
        let deleted = self.delete_all(&keys);
        // Gone from the index even if some series were already absent.
        self.index.write().remove_outer(&outer_key);

        debug!(
            "deleted {} of {} indexed series for outer key {:?}",
            deleted,
            keys.len(),
            outer_key
        );
        Ok(deleted)
    }

    /// Deletes every series of one (outer, sub) group and returns how many
    /// were actually removed. Returns 0 when no sub labels are configured.
    #[instrument(level = "debug", skip_all)]
    pub fn delete_by_group<S: AsRef<str>>(
        &self,
        outer: &[S],
        sub: &[S],
    ) -> Result<usize, GaugeVecSetError> {
        if !self.schema.has_sub() {
            return Ok(0);
        }
        self.schema.check_arity(Tier::Outer, outer)?;
        self.schema.check_arity(Tier::Sub, sub)?;

        let outer_key = key::serialize(outer);
        let sub_key = key::serialize(sub);
        let keys = self.index.read().group_keys(&outer_key, &sub_key);
        let deleted = self.delete_all(&keys);
        self.index.write().remove_group(&outer_key, &sub_key);

        debug!(
            "deleted {} of {} indexed series for group {:?} of outer key {:?}",
            deleted,
            keys.len(),
            sub_key,
            outer_key
        );
        Ok(deleted)
    }

    /// Number of indexed series.
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Label values of every indexed series, in exported label order.
    pub fn indexed_series(&self) -> Vec<Vec<String>> {
        self.index
            .read()
            .full_keys()
            .map(|full_key| {
                key::deserialize(full_key)
                    .into_iter()
                    .map(String::from)
                    .collect()
            })
            .collect()
    }

    fn write(&self, values: &[Cow<'_, str>], value: f64) -> Result<(), GaugeVecSetError> {
        let label_values: Vec<&str> = values.iter().map(|v| v.as_ref()).collect();
        trace!("setting {:?} to {}", label_values, value);
        self.vector.set(&label_values, value)
    }

    fn delete_all(&self, keys: &[String]) -> usize {
        keys.iter()
            .filter(|full_key| self.vector.delete(&key::deserialize(full_key)))
            .count()
    }
}

impl<V: GaugeVector + Collector> Collector for GaugeVecSet<V> {
    fn desc(&self) -> Vec<&Desc> {
        self.vector.desc()
    }

    fn collect(&self) -> Vec<MetricFamily> {
        self.vector.collect()
    }
}
