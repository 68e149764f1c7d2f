mod error;
mod gauge_vec_set;
mod index;
pub mod key;
mod schema;
mod vector;

pub use error::GaugeVecSetError;
pub use error::Tier;
pub use gauge_vec_set::GaugeVecSet;
pub use gauge_vec_set::GaugeVecSetOpts;
pub use schema::LabelSchema;
pub use vector::GaugeVector;
