//! Bounds-checked typed access into guest linear memory.

use wasmtime::{Memory, Store};

use crate::error::{Result, SandboxError};

/// A non-owning window over the guest's linear memory contents.
///
/// A view is constructed fresh at each access site and never cached
/// across guest calls: the guest may grow its memory during a call, so
/// every bounds check must run against the size current at the moment
/// of the access.
pub(crate) struct MemoryView<'a> {
    data: &'a [u8],
}

impl<'a> MemoryView<'a> {
    /// Create a view over the memory's current contents.
    pub fn new<S>(memory: &Memory, store: &'a Store<S>) -> Self {
        Self {
            data: memory.data(store),
        }
    }

    /// Read an unsigned byte at `base + offset`.
    pub fn load_u8(&self, base: u32, offset: u32) -> Result<u8> {
        let addr = u64::from(base) + u64::from(offset);
        self.check(addr, 1)?;
        Ok(self.data[addr as usize])
    }

    /// Read a little-endian 32-bit value at `base + offset`.
    pub fn load_u32(&self, base: u32, offset: u32) -> Result<u32> {
        let addr = u64::from(base) + u64::from(offset);
        self.check(addr, 4)?;
        let a = addr as usize;
        Ok(u32::from_le_bytes([
            self.data[a],
            self.data[a + 1],
            self.data[a + 2],
            self.data[a + 3],
        ]))
    }

    /// Borrow `len` bytes starting at `ptr`.
    pub fn bytes(&self, ptr: u32, len: u32) -> Result<&'a [u8]> {
        let addr = u64::from(ptr);
        self.check(addr, u64::from(len))?;
        Ok(&self.data[addr as usize..(addr + u64::from(len)) as usize])
    }

    fn check(&self, addr: u64, width: u64) -> Result<()> {
        if addr + width > self.data.len() as u64 {
            return Err(SandboxError::OutOfBounds {
                addr,
                width,
                size: self.data.len() as u64,
            });
        }
        Ok(())
    }
}
