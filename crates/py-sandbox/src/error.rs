//! Error types for the sandbox crate.

use thiserror::Error;

/// Sandbox error type
#[derive(Error, Debug)]
pub enum SandboxError {
    /// Failed to build the wasmtime engine
    #[error("engine creation failed: {0}")]
    Engine(String),

    /// Failed to compile or load a guest module
    #[error("module load failed: {0}")]
    ModuleLoad(String),

    /// Failed to build or link the WASI environment
    #[error("WASI setup failed: {0}")]
    Wasi(String),

    /// Module instantiation failed (bad imports, start-function trap)
    #[error("instantiation failed: {0}")]
    Instantiation(String),

    /// A required guest export is missing or has the wrong kind/signature
    #[error("missing or mistyped export '{name}': {reason}")]
    ExportBinding {
        /// Name of the export that failed to bind
        name: &'static str,
        /// What went wrong resolving it
        reason: String,
    },

    /// A computed guest memory access falls outside linear memory
    #[error("out-of-bounds guest memory access at {addr:#x}+{width} (memory is {size} bytes)")]
    OutOfBounds {
        /// Absolute byte address of the access
        addr: u64,
        /// Width of the access in bytes
        width: u64,
        /// Current memory size in bytes
        size: u64,
    },

    /// A host string too large to address in 32-bit guest memory
    #[error("string of {0} bytes cannot be addressed in 32-bit guest memory")]
    StringTooLarge(usize),

    /// Bytes lifted from guest memory are not valid UTF-8
    #[error("guest string is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    /// An optional-value discriminant byte is neither 0 nor 1
    #[error("invalid variant discriminant for option: {0}")]
    InvalidDiscriminant(u8),

    /// The guest trapped while executing an export
    #[error("guest trap: {0}")]
    GuestTrap(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for sandbox operations
pub type Result<T> = std::result::Result<T, SandboxError>;
