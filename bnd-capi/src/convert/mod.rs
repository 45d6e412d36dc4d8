//! Conversion of host declarations into C wrapper text.

pub mod method;
pub mod types;

pub use method::{Conversion, GeneratedMethod, MethodConverter, NameCounter};
pub use types::TypeConverter;
