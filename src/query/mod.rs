pub mod error;
pub mod parser;
pub mod types;

pub use error::ValidationError;
pub use parser::parse_query;
pub use types::{Crop, CropRect, CropStrategy, CropUnit, Dimensions, Gravity, TransformSpec};
