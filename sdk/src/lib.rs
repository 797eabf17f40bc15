//! EDITH SDK
//!
//! Shared library providing the error type, tool result types and the
//! capability registry trait. This crate is used by the engine and by any
//! capability registry implementation.

/// Error types and handling
pub mod errors;

/// Capability registry trait
pub mod registry;

/// Tool invocation types
pub mod types;

// Re-export commonly used types
pub use errors::{EdithErrorExt, EngineError};
pub use registry::CapabilityRegistry;
pub use types::{CapabilityDescriptor, Params, ToolResult};
