//! Ports module (Hexagonal Architecture)
//!
//! Use case traits driven by presentation layers and gateway traits
//! implemented by backend adapters.

pub mod inbound;
pub mod outbound;

pub use inbound::*;
pub use outbound::*;
