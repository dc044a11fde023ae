//! Declarative wire layouts for the result envelopes.
//!
//! The two envelope shapes are described as tables of string fields
//! rather than inline offset literals, so the decode code reads the
//! layout instead of restating it.

/// All guest strings use byte alignment.
pub(crate) const STRING_ALIGN: i32 = 1;

/// One string-typed field of an envelope: a `(ptr, len)` pair of
/// 32-bit slots at fixed offsets from the envelope base.
pub(crate) struct StringField {
    pub name: &'static str,
    pub ptr_offset: u32,
    pub len_offset: u32,
}

/// The two-string record shared by both operations: captured stdout
/// and stderr. This is the whole of `exec`'s envelope.
pub(crate) const STDOUT_FIELDS: [StringField; 2] = [
    StringField {
        name: "stdout.out",
        ptr_offset: 0,
        len_offset: 4,
    },
    StringField {
        name: "stdout.err",
        ptr_offset: 8,
        len_offset: 12,
    },
];

/// Offset of `eval`'s optional-value discriminant byte.
pub(crate) const EVAL_DISCRIMINANT_OFFSET: u32 = 16;

/// The optional value record of `eval`'s envelope, only present when
/// the discriminant byte is 1.
pub(crate) const VALUE_FIELDS: [StringField; 2] = [
    StringField {
        name: "value.value",
        ptr_offset: 20,
        len_offset: 24,
    },
    StringField {
        name: "value.datatype",
        ptr_offset: 28,
        len_offset: 32,
    },
];
