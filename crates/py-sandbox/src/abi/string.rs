//! String lifting and lowering across the guest boundary.

use wasmtime::{Memory, Store, TypedFunc};

use super::layout::STRING_ALIGN;
use super::memory::MemoryView;
use crate::error::{Result, SandboxError};

/// Lift a guest string: copy `len` bytes at `ptr` out of the view and
/// validate them as UTF-8. The guest memory is not touched.
pub(crate) fn decode_string(view: &MemoryView<'_>, ptr: u32, len: u32) -> Result<String> {
    let bytes = view.bytes(ptr, len)?.to_vec();
    Ok(String::from_utf8(bytes)?)
}

/// Lower a host string into guest-owned storage.
///
/// Asks the guest allocator for `len` bytes via
/// `canonical_abi_realloc(0, 0, 1, len)`, copies the UTF-8 bytes into
/// the returned region, and hands back the `(ptr, len)` pair. The
/// guest owns the buffer from here on; the call convention determines
/// who releases it.
pub(crate) fn encode_string<S>(
    store: &mut Store<S>,
    memory: &Memory,
    realloc: &TypedFunc<(i32, i32, i32, i32), i32>,
    value: &str,
) -> Result<(u32, u32)> {
    let bytes = value.as_bytes();
    let len = u32::try_from(bytes.len()).map_err(|_| SandboxError::StringTooLarge(bytes.len()))?;

    let ptr = realloc
        .call(&mut *store, (0, 0, STRING_ALIGN, len as i32))
        .map_err(|e| SandboxError::GuestTrap(e.to_string()))? as u32;

    // The realloc call may have grown memory; check against the size
    // current right now.
    let data = memory.data_mut(&mut *store);
    let end = u64::from(ptr) + u64::from(len);
    if end > data.len() as u64 {
        return Err(SandboxError::OutOfBounds {
            addr: u64::from(ptr),
            width: u64::from(len),
            size: data.len() as u64,
        });
    }
    data[ptr as usize..end as usize].copy_from_slice(bytes);

    Ok((ptr, len))
}
