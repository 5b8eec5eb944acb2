//! # Domain Layer (Inner Hexagon)
//!
//! Pure business types and counter transforms.
//! NO I/O, NO async, NO ledger access.

pub mod entities;
pub mod services;
pub mod value_objects;

pub use entities::*;
pub use services::*;
pub use value_objects::*;
