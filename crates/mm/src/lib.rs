//! 内存管理子系统
//!
//! 提供两部分紧密耦合的功能：
//!
//! - [`frame_allocator`]：按地址散列分桶的物理页分配器，每个桶一把自旋锁；
//! - [`memory_space`]：进程级的文件映射区域表（VMA），按需缺页装入，
//!   解除映射时把共享映射中的脏页写回文件。
//!
//! [`syscall`] 在两者之上提供 `mmap`/`munmap` 系统调用的参数校验和错误码转换。
//!
//! # 架构解耦
//!
//! 通过 trait 抽象与架构特定组件解耦：
//! - [`ArchMmOps`]: 物理地址与内核虚拟地址的转换
//! - [`MmConfig`]: 物理内存上界和 mmap 窗口
//! - [`PageTableInner`]: 页表的查找、映射和解除映射
//! - [`MmFile`]/[`MmInode`]: 被映射文件的读写、加锁和日志事务
//!
//! 使用前必须调用 [`register_arch_ops`] 和 [`register_config`] 注册实现。

#![no_std]

extern crate alloc;

#[cfg(test)]
extern crate std;

mod arch_ops;
mod config;
mod error;
mod file;

pub mod address;
pub mod frame_allocator;
pub mod memory_space;
pub mod page_table;
pub mod syscall;

#[cfg(test)]
mod tests;

pub use arch_ops::{ArchMmOps, arch_ops, register_arch_ops};
pub use config::{
    ALLOC_JUNK, FREE_JUNK, FREE_LIST_BUCKETS, MAX_VMA, MmConfig, PAGE_SHIFT, PAGE_SIZE,
    mm_config, register_config,
};
pub use error::{MmError, MmResult};
pub use file::{FsTransaction, InodeLockGuard, MmFile, MmInode};

pub use address::{AlignOps, PageNum, Paddr, Ppn, UsizeConvert, Vaddr, Vpn, VpnRange};
pub use frame_allocator::{
    AllocatorStats, PageAllocator, PhysPage, alloc_page, free_page, get_stats,
    init_page_allocator, page_allocator,
};
pub use memory_space::{
    FaultAccess, MappedRegion, MemorySpace, MmapFile, RegionHandle, RegionTable, UnmapKind,
};
pub use page_table::{PageTableEntry, PageTableInner, PagingError, PagingResult, UniversalPTEFlag};
