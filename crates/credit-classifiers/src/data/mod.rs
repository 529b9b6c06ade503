//! Tabular data: the in-memory `Table`, CSV loading, schema validation and
//! the stratified train/test split.
pub mod load;
pub mod schema;
pub mod table;
pub mod transform;
pub mod validation;

pub use load::DataLoad;
pub use table::Table;
pub use transform::{DataTransform, Split};
pub use validation::DataValidation;
