//! Append-only view over an executable mapping.

use crate::code::allocator::{with_jit_write, CodeSlice};
use crate::code::cache::{invalidate_icache, MAINTENANCE};
use crate::types::{CodeRange, CodegenError, Result};

/// Generated code, written in address order from the start of a [`CodeSlice`].
///
/// The buffer owns its mapping for the life of the process. Writes go through
/// the data side only; nothing becomes fetchable with certainty until
/// [`CodeBuffer::sync`] covers it.
#[derive(Debug)]
pub struct CodeBuffer {
    slice: CodeSlice,
    len: usize,
}

impl CodeBuffer {
    pub fn new(slice: CodeSlice) -> Self {
        Self { slice, len: 0 }
    }

    /// Bytes emitted so far.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn capacity(&self) -> usize {
        self.slice.size
    }

    /// Address of the first emitted instruction.
    pub fn entry(&self) -> *const u8 {
        self.slice.pc
    }

    /// Emitted instruction words.
    pub fn words(&self) -> &[u32] {
        // SAFETY: the mapping is page aligned, at least `len` bytes long and
        // only mutated through `&mut self`.
        unsafe { core::slice::from_raw_parts(self.slice.data as *const u32, self.len / 4) }
    }

    pub(crate) fn push_word(&mut self, word: u32) -> Result<()> {
        if self.len + 4 > self.slice.size {
            return Err(CodegenError::BufferFull { capacity: self.slice.size });
        }
        let slot = unsafe { self.slice.data.add(self.len) } as *mut u32;
        with_jit_write(|| unsafe { slot.write_volatile(word) });
        self.len += 4;
        Ok(())
    }

    /// Replace already-emitted words starting at byte `offset`.
    ///
    /// The emitted length never changes. Nothing is synchronized.
    pub(crate) fn overwrite(&mut self, offset: usize, words: &[u32]) -> Result<CodeRange> {
        let range = CodeRange::new(offset, words.len() * 4);
        if offset % 4 != 0 || range.end() > self.len {
            return Err(CodegenError::PatchOutOfBounds {
                offset,
                len: range.len,
                emitted: self.len,
            });
        }
        let base = self.slice.data;
        with_jit_write(|| {
            for (i, &word) in words.iter().enumerate() {
                unsafe { (base.add(offset + i * 4) as *mut u32).write_volatile(word) };
            }
        });
        Ok(range)
    }

    /// Make `range` visible to instruction fetch.
    ///
    /// The range may extend past the emitted bytes but not past the mapping.
    pub fn sync(&self, range: CodeRange) -> Result<()> {
        if range.end() > self.slice.size {
            return Err(CodegenError::RangeOutOfBounds {
                offset: range.offset,
                len: range.len,
                capacity: self.slice.size,
            });
        }
        log::debug!(
            "syncing I-cache over [0x{:x}, 0x{:x}) ({:?})",
            self.slice.pc as usize + range.offset,
            self.slice.pc as usize + range.end(),
            MAINTENANCE
        );
        unsafe { invalidate_icache(self.slice.data.add(range.offset), range.len) };
        Ok(())
    }

    /// Range covering everything emitted so far.
    pub fn emitted(&self) -> CodeRange {
        CodeRange::new(0, self.len)
    }

    /// Jump to the start of the buffer as a `void (*)(void)`.
    ///
    /// # Safety
    /// The buffer must hold a complete A32 function that follows the AAPCS,
    /// and the host must be a 32-bit ARM core.
    #[cfg(target_arch = "arm")]
    pub unsafe fn call(&self) -> Result<()> {
        let func: extern "C" fn() = core::mem::transmute(self.slice.pc);
        func();
        Ok(())
    }

    /// # Safety
    /// Never jumps; A32 code cannot run on this host.
    #[cfg(not(target_arch = "arm"))]
    pub unsafe fn call(&self) -> Result<()> {
        Err(CodegenError::ForeignHost(std::env::consts::ARCH))
    }
}
