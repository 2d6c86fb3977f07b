pub mod color;
pub mod error;
pub mod fn_types;
pub mod function;
pub mod symbol;

pub use color::*;
pub use error::*;
pub use fn_types::*;
pub use function::*;
pub use symbol::*;
