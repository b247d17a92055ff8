use crate::types::{CodegenError, Result};

/// Raw view of a code mapping.
///
/// `data` is the writable view and `pc` the address instructions execute at.
/// The two coincide for a plain RWX mapping.
#[derive(Debug)]
pub struct CodeSlice {
    pub data: *mut u8,
    pub pc: *const u8,
    pub size: usize,
}

/// Hands out anonymous read+write+execute mappings.
///
/// Mappings are never returned to the OS; they live until the process exits.
#[derive(Debug)]
pub struct CodeAllocator {
    slab_size: usize,
}

impl Default for CodeAllocator {
    fn default() -> Self {
        Self { slab_size: page_size() }
    }
}

fn page_size() -> usize {
    let sz = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if sz > 0 {
        sz as usize
    } else {
        4096
    }
}

#[cfg(target_os = "macos")]
const MAP_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_JIT;
#[cfg(not(target_os = "macos"))]
const MAP_FLAGS: libc::c_int = libc::MAP_PRIVATE | libc::MAP_ANONYMOUS;

impl CodeAllocator {
    /// `slab_size` is rounded up to a whole number of pages.
    pub fn new(slab_size: usize) -> Result<Self> {
        let slab_size = slab_size
            .max(1)
            .checked_next_multiple_of(page_size())
            .ok_or(CodegenError::CapacityTooLarge {
                bytes: slab_size as u128,
            })?;
        Ok(Self { slab_size })
    }

    pub fn slab_size(&self) -> usize {
        self.slab_size
    }

    /// Map `slab_size` bytes with write and execute permission at once.
    ///
    /// On macOS the mapping is `MAP_JIT`; writes must go through [`with_jit_write`].
    pub fn alloc_rwx(&self) -> Result<CodeSlice> {
        unsafe {
            let ptr = libc::mmap(
                core::ptr::null_mut(),
                self.slab_size,
                libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
                MAP_FLAGS,
                -1,
                0,
            );
            if ptr == libc::MAP_FAILED {
                return Err(CodegenError::AllocationFailed {
                    size: self.slab_size,
                    source: std::io::Error::last_os_error(),
                });
            }
            log::debug!("mapped {} RWX bytes at {:p}", self.slab_size, ptr);
            Ok(CodeSlice {
                data: ptr as *mut u8,
                pc: ptr as *const u8,
                size: self.slab_size,
            })
        }
    }
}

/// Run `f` with this thread allowed to write `MAP_JIT` pages.
///
/// Apple Silicon toggles JIT pages between writable and executable per
/// thread. Everywhere else the mapping is plain RWX and this just calls `f`.
#[inline]
pub(crate) fn with_jit_write<R>(f: impl FnOnce() -> R) -> R {
    #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
    unsafe {
        libc::pthread_jit_write_protect_np(0);
    }
    let out = f();
    #[cfg(all(target_os = "macos", target_arch = "aarch64"))]
    unsafe {
        libc::pthread_jit_write_protect_np(1);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_whole_pages() {
        let page = page_size();
        assert_eq!(CodeAllocator::new(16 * 4).unwrap().slab_size(), page);
        assert_eq!(CodeAllocator::new(page + 1).unwrap().slab_size(), 2 * page);
        assert_eq!(CodeAllocator::new(0).unwrap().slab_size(), page);
    }

    #[test]
    fn rounding_past_address_space_is_an_error() {
        let err = CodeAllocator::new(usize::MAX - 1).unwrap_err();
        assert!(matches!(err, CodegenError::CapacityTooLarge { bytes } if bytes == (usize::MAX - 1) as u128));
    }

    #[test]
    fn alloc_rwx_returns_writable_zeroed_page() {
        let alloc = CodeAllocator::default();
        let slice = alloc.alloc_rwx().expect("alloc");
        assert_eq!(slice.size, alloc.slab_size());
        assert_eq!(slice.data as *const u8, slice.pc);
        unsafe {
            assert_eq!((slice.data as *const u32).read(), 0);
            with_jit_write(|| (slice.data as *mut u32).write(0xE12F_FF1E)); // bx lr
            assert_eq!((slice.data as *const u32).read(), 0xE12F_FF1E);
        }
    }
}
