// Foundational types
// Principle: minimal, auditable, durable

pub mod primitives;

pub use primitives::*;
