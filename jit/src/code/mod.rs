pub mod allocator;
pub mod buffer;
pub mod cache;
pub mod patcher;
