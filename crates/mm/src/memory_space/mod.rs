//! 内存空间模块
//!
//! [`MemorySpace`] 把一个进程的页表和它的文件映射区域表放在一起，
//! 提供 mmap、惰性缺页处理、munmap、进程退出时的整体回收以及 fork 时的区域复制。
//!
//! 一个映射区域的生命周期：
//!
//! 1. `mmap` 在页表中为整个范围安装惰性标记，不分配任何物理页；
//! 2. 第一次访问某页触发缺页，[`MemorySpace::handle_lazy_fault`] 分配一页、
//!    从文件读入内容并安装真正的映射；
//! 3. `munmap` 释放范围内的页，共享映射中被写过的页先写回文件，
//!    然后收缩或销毁区域描述符。

mod fault;
pub mod installer;
mod mmap_file;
pub mod region;
mod space;
mod unmap;

pub use fault::FaultAccess;
pub use mmap_file::MmapFile;
pub use region::{MappedRegion, RegionHandle, RegionTable, UnmapKind};
pub use space::MemorySpace;
