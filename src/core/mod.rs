//! Core constants, error types and traits shared by every IrLAP module.

mod constants;
mod error;
mod traits;

pub use constants::*;
pub use error::*;
pub use traits::*;
