use prometheus::GaugeVec;

use crate::error::GaugeVecSetError;

/// The gauge vector a [`crate::GaugeVecSet`] writes its series to.
///
/// Label values are always passed in full, in exported label order.
/// Implementations do their own locking; the store never holds its index
/// lock while calling into them.
pub trait GaugeVector: Send + Sync {
    /// Sets the series to `value`, creating it if needed.
    fn set(&self, label_values: &[&str], value: f64) -> Result<(), GaugeVecSetError>;
    /// Removes the series. Returns whether it existed.
    fn delete(&self, label_values: &[&str]) -> bool;
}

impl GaugeVector for GaugeVec {
    fn set(&self, label_values: &[&str], value: f64) -> Result<(), GaugeVecSetError> {
        self.get_metric_with_label_values(label_values)?.set(value);
        Ok(())
    }

    fn delete(&self, label_values: &[&str]) -> bool {
        self.remove_label_values(label_values).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prometheus::Opts;

    #[test]
    fn test_gauge_vec_set_and_delete() {
        let vec = GaugeVec::new(Opts::new("series", "help"), &["a", "b"]).unwrap();

        GaugeVector::set(&vec, &["x", "y"], 2.5).unwrap();
        assert_eq!(vec.with_label_values(&["x", "y"]).get(), 2.5);

        assert!(GaugeVector::delete(&vec, &["x", "y"]));
        assert!(!GaugeVector::delete(&vec, &["x", "y"]));
    }

    #[test]
    fn test_gauge_vec_wrong_arity() {
        let vec = GaugeVec::new(Opts::new("series", "help"), &["a", "b"]).unwrap();

        assert!(matches!(
            GaugeVector::set(&vec, &["x"], 1.0),
            Err(GaugeVecSetError::Metric(_))
        ));
        assert!(!GaugeVector::delete(&vec, &["x"]));
    }
}
