//! Domain models for prescription intake.

mod prescription;
mod product;
mod status;

pub use prescription::*;
pub use product::*;
pub use status::*;
