//! Domain models for the rx-desk system.

pub mod dates;
mod medicine;
mod patient;
mod prescription;

pub use medicine::*;
pub use patient::*;
pub use prescription::*;
