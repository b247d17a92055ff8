/// How this host makes freshly written instructions fetchable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Maintenance {
    /// `sys_dcache_flush` + `sys_icache_invalidate`.
    Darwin,
    /// The compiler runtime's `__clear_cache`.
    ClearCache,
    /// Stores are snooped by instruction fetch; nothing to do.
    Coherent,
}

#[cfg(target_os = "macos")]
pub const MAINTENANCE: Maintenance = Maintenance::Darwin;

#[cfg(all(not(target_os = "macos"), not(any(target_arch = "x86_64", target_arch = "x86"))))]
pub const MAINTENANCE: Maintenance = Maintenance::ClearCache;

#[cfg(all(not(target_os = "macos"), any(target_arch = "x86_64", target_arch = "x86")))]
pub const MAINTENANCE: Maintenance = Maintenance::Coherent;

#[cfg(target_os = "macos")]
extern "C" {
    fn sys_icache_invalidate(addr: *mut core::ffi::c_void, size: usize);
    fn sys_dcache_flush(addr: *mut core::ffi::c_void, size: usize);
}

#[cfg(all(not(target_os = "macos"), not(any(target_arch = "x86_64", target_arch = "x86"))))]
extern "C" {
    fn __clear_cache(beg: *mut libc::c_void, end: *mut libc::c_void);
}

/// Flush data cache and invalidate instruction cache for a code region.
///
/// On ARM the data and instruction caches are not coherent. After writing
/// new instructions through the data cache, we must:
/// 1. Clean the data cache so the writes reach the point of unification
/// 2. Invalidate the instruction cache to discard stale entries
///
/// Only fetches from `[addr, addr + size)` are guaranteed to see the new
/// instructions afterwards. Calling this on a range that is already coherent
/// (or was never written) has no observable effect.
///
/// # Safety
/// `addr` must point to at least `size` bytes of mapped memory.
#[inline]
pub unsafe fn invalidate_icache(addr: *mut u8, size: usize) {
    if size == 0 {
        return;
    }

    #[cfg(target_os = "macos")]
    {
        sys_dcache_flush(addr as *mut core::ffi::c_void, size);
        sys_icache_invalidate(addr as *mut core::ffi::c_void, size);
    }

    // libgcc and compiler-rt issue the cacheflush syscall on 32-bit ARM and
    // DC CVAU / IC IVAU loops on aarch64.
    #[cfg(all(not(target_os = "macos"), not(any(target_arch = "x86_64", target_arch = "x86"))))]
    {
        __clear_cache(addr as *mut libc::c_void, addr.add(size) as *mut libc::c_void);
    }

    // x86 keeps the I-cache coherent with stores, no flush needed.
    #[cfg(all(not(target_os = "macos"), any(target_arch = "x86_64", target_arch = "x86")))]
    {
        let _ = (addr, size);
    }
}
