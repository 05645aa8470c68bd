//! Domain module
//!
//! Campaign pipeline and segmentation logic, free of any I/O.

pub mod aggregates;
pub mod value_objects;
pub mod events;
pub mod services;

pub use aggregates::*;
pub use value_objects::*;
pub use events::*;
