//! Canonical-ABI marshaling between host and guest.
//!
//! All structured values cross the module boundary through the guest's
//! linear memory: strings travel as `(pointer, length)` pairs of
//! UTF-8 bytes, records are flat sequences of 32-bit fields, and
//! optional values carry a one-byte discriminant. The guest allocates
//! result storage itself and hands back a pointer to a flat result
//! envelope; the host copies every value out and releases each guest
//! buffer through `canonical_abi_free` before the call returns.
//!
//! ## Wire layout
//!
//! Two-string record (the `exec` envelope, also the stdout half of
//! `eval`'s):
//!
//! ```text
//! offset  0: out ptr    (u32)
//! offset  4: out len    (u32)
//! offset  8: err ptr    (u32)
//! offset 12: err len    (u32)
//! ```
//!
//! `eval` extends it with an optional value record:
//!
//! ```text
//! offset 16: discriminant (u8)   0 = absent, 1 = present
//! offset 20: value ptr    (u32)  \
//! offset 24: value len    (u32)  | only read when
//! offset 28: datatype ptr (u32)  | discriminant == 1
//! offset 32: datatype len (u32)  /
//! ```

pub(crate) mod decode;
pub(crate) mod layout;
pub(crate) mod memory;
pub(crate) mod string;

/// Captured standard output and standard error from one guest execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stdout {
    /// Text written to stdout
    pub out: String,
    /// Text written to stderr
    pub err: String,
}

/// Textual rendering of an evaluated expression's result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Value {
    /// The rendered value, e.g. `"42"`
    pub value: String,
    /// The guest's name for the value's type, e.g. `"int"`
    pub datatype: String,
}

/// Result of an `eval` call: captured output plus an optional value.
///
/// `value` is `None` when the evaluated source produced no value
/// (a statement rather than an expression).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalResult {
    /// Captured stdout/stderr
    pub stdout: Stdout,
    /// The computed value, if the expression produced one
    pub value: Option<Value>,
}
