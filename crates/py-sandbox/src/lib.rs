//! # py-sandbox
//!
//! Sandboxed Python execution over WebAssembly.
//!
//! This crate binds a Python interpreter compiled to `wasm32-wasi`
//! through a small canonical-ABI marshaling layer: strings cross the
//! boundary as pointer+length pairs in the guest's linear memory,
//! structured results come back as flat records, and optional values
//! carry a one-byte discriminant. Host and guest never share an
//! address space; every value is copied and bounds-checked on the way
//! across, and every guest-allocated result buffer is released through
//! the guest's own allocator before a call returns.
//!
//! ## Security Model
//!
//! - **Memory isolation**: the interpreter runs in its own linear memory
//! - **Capability-based**: no filesystem, env, or stdio access unless
//!   explicitly granted via WASI
//! - **Deny-by-default**: [`WasiCapabilities`] starts with nothing allowed
//! - **Resource limits**: guest memory is capped; optional fuel
//!   metering bounds execution
//!
//! ## Usage
//!
//! ```rust,ignore
//! use py_sandbox::{SandboxConfig, SandboxRuntime};
//!
//! let runtime = SandboxRuntime::new(SandboxConfig::python())?;
//! let module = runtime.load_module("py_sandbox.wasm")?;
//! let mut sandbox = runtime.instantiate(&module)?;
//!
//! let output = sandbox.exec("print('hi')")?;
//! assert_eq!(output.out, "hi\n");
//!
//! let result = sandbox.eval("1 + 1")?;
//! let value = result.value.expect("expression has a value");
//! assert_eq!((value.value.as_str(), value.datatype.as_str()), ("2", "int"));
//! ```
//!
//! ## Guest Contract
//!
//! The interpreter module must provide five exports:
//!
//! | Export | Kind | Role |
//! |--------|------|------|
//! | `memory` | linear memory | shared address space for marshaling |
//! | `canonical_abi_realloc` | function | guest allocator |
//! | `canonical_abi_free` | function | guest deallocator |
//! | `exec` | function | run code, capture stdout/stderr |
//! | `eval` | function | evaluate expression, capture output + value |
//!
//! Binding fails fast at instantiation if any export is missing or of
//! the wrong kind.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod abi;
pub mod config;
pub mod error;
pub mod runtime;
pub mod sandbox;

pub use abi::{EvalResult, Stdout, Value};
pub use config::{SandboxConfig, WasiCapabilities};
pub use error::{Result, SandboxError};
pub use runtime::{SandboxModule, SandboxRuntime};
pub use sandbox::Sandbox;
