//! Error types for slotpath-core
//!
//! This module defines the error types that can occur during slot assignment,
//! address resolution, and slot reads.

#[cfg(feature = "std")]
use alloc::boxed::Box;
use alloc::string::String;

/// Errors that can occur during slot assignment and address resolution
///
/// `InvalidDescriptor` and `KeyEncoding` are the two failure modes of the
/// pure resolver. The remaining variants belong to the surfaces built around
/// it (query parsing, layout files, slot readers).
#[derive(Debug)]
pub enum LayoutError {
    /// Unrecognized or malformed type tag, unknown struct, or a layout that
    /// cannot be assigned
    InvalidDescriptor(String),
    /// A mapping key or array index cannot be encoded for its declared type
    KeyEncoding(String),
    /// Query refers to something the layout cannot address
    PathResolution(String),
    /// Query string could not be parsed
    InvalidQuery(String),
    /// Compiler-style layout failed validation (overlaps, overflow, etc.)
    InvalidLayout(String),
    /// Reading a slot from the execution environment failed
    SlotRead(String),
    /// IO error (only available with std feature)
    #[cfg(feature = "std")]
    Io(Box<dyn std::error::Error + Send + Sync>),
    /// Serialization error with error details
    Serialization(String),
}

impl LayoutError {
    /// Shorthand for an [`LayoutError::InvalidDescriptor`] from any message
    pub fn invalid_descriptor(msg: impl Into<String>) -> Self {
        LayoutError::InvalidDescriptor(msg.into())
    }

    /// Shorthand for a [`LayoutError::KeyEncoding`] from any message
    pub fn key_encoding(msg: impl Into<String>) -> Self {
        LayoutError::KeyEncoding(msg.into())
    }
}

impl core::fmt::Display for LayoutError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            LayoutError::InvalidDescriptor(msg) => write!(f, "Invalid descriptor: {}", msg),
            LayoutError::KeyEncoding(msg) => write!(f, "Key encoding failed: {}", msg),
            LayoutError::PathResolution(msg) => write!(f, "Path resolution failed: {}", msg),
            LayoutError::InvalidQuery(msg) => write!(f, "Invalid query format: {}", msg),
            LayoutError::InvalidLayout(msg) => write!(f, "Invalid storage layout: {}", msg),
            LayoutError::SlotRead(msg) => write!(f, "Slot read failed: {}", msg),
            #[cfg(feature = "std")]
            LayoutError::Io(err) => write!(f, "IO error: {}", err),
            LayoutError::Serialization(msg) => write!(f, "Serialization error: {}", msg),
        }
    }
}

#[cfg(feature = "std")]
impl std::error::Error for LayoutError {}

#[cfg(feature = "std")]
impl From<std::io::Error> for LayoutError {
    fn from(err: std::io::Error) -> Self {
        LayoutError::Io(Box::new(err))
    }
}

impl From<serde_json::Error> for LayoutError {
    fn from(err: serde_json::Error) -> Self {
        LayoutError::Serialization(alloc::format!("{}", err))
    }
}
