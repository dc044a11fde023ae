//! Result-envelope decoding.
//!
//! A guest export returns a single 32-bit pointer to a flat envelope
//! it wrote into its own memory (layouts in [`super::layout`]). The
//! reader lifts each string field and releases its guest buffer
//! through `canonical_abi_free` — on every exit path, so a decode
//! failure cannot strand a buffer that was already located.

use tracing::trace;
use wasmtime::{Memory, Store, TypedFunc};

use super::layout::{self, StringField, EVAL_DISCRIMINANT_OFFSET, STRING_ALIGN};
use super::memory::MemoryView;
use super::string::decode_string;
use super::{EvalResult, Stdout, Value};
use crate::error::{Result, SandboxError};

/// Decodes one result envelope, freeing guest buffers as it goes.
pub(crate) struct EnvelopeReader<'a, S> {
    store: &'a mut Store<S>,
    memory: Memory,
    free: TypedFunc<(i32, i32, i32), ()>,
}

impl<'a, S> EnvelopeReader<'a, S> {
    pub fn new(
        store: &'a mut Store<S>,
        memory: Memory,
        free: TypedFunc<(i32, i32, i32), ()>,
    ) -> Self {
        Self {
            store,
            memory,
            free,
        }
    }

    /// Decode an `exec` envelope: the plain two-string record.
    pub fn read_stdout(&mut self, base: u32) -> Result<Stdout> {
        let out = self.take_string(base, &layout::STDOUT_FIELDS[0])?;
        let err = self.take_string(base, &layout::STDOUT_FIELDS[1])?;
        Ok(Stdout { out, err })
    }

    /// Decode an `eval` envelope: the two-string record plus the
    /// discriminant-tagged optional value record.
    pub fn read_eval_result(&mut self, base: u32) -> Result<EvalResult> {
        let stdout = self.read_stdout(base)?;

        let discriminant =
            MemoryView::new(&self.memory, self.store).load_u8(base, EVAL_DISCRIMINANT_OFFSET)?;
        let value = match discriminant {
            0 => None,
            1 => {
                let value = self.take_string(base, &layout::VALUE_FIELDS[0])?;
                let datatype = self.take_string(base, &layout::VALUE_FIELDS[1])?;
                Some(Value { value, datatype })
            }
            other => return Err(SandboxError::InvalidDiscriminant(other)),
        };

        Ok(EvalResult { stdout, value })
    }

    /// Lift one string field and release its guest buffer.
    ///
    /// The `canonical_abi_free` call runs whether or not the lift
    /// succeeded, with exactly the `(ptr, len)` pair that was read
    /// from the envelope. A lift error takes precedence over a free
    /// error when both occur.
    fn take_string(&mut self, base: u32, field: &StringField) -> Result<String> {
        let (ptr, len) = {
            let view = MemoryView::new(&self.memory, self.store);
            (
                view.load_u32(base, field.ptr_offset)?,
                view.load_u32(base, field.len_offset)?,
            )
        };
        trace!(field = field.name, ptr, len, "lifting guest string");

        let lifted = {
            let view = MemoryView::new(&self.memory, self.store);
            decode_string(&view, ptr, len)
        };
        let released = self
            .free
            .call(&mut *self.store, (ptr as i32, len as i32, STRING_ALIGN))
            .map_err(|e| SandboxError::GuestTrap(e.to_string()));

        let text = lifted?;
        released?;
        Ok(text)
    }
}
