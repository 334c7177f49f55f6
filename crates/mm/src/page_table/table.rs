//! 页表内部接口
//!
//! `PageTableInner` 由各架构实现；上层（[`crate::memory_space::MemorySpace`]）
//! 只依赖该 trait，从而实现地址空间管理逻辑与页表硬件细节的解耦。

use super::{PageTableEntry, PagingResult, UniversalPTEFlag};
use crate::address::{Ppn, Vpn};

/// 页表内部接口
pub trait PageTableInner {
    /// 查找叶子页表项；没有任何页表项（包括惰性标记）时返回 None
    fn walk(&self, vpn: Vpn) -> Option<PageTableEntry>;

    /// 安装页表项
    ///
    /// 已存在页表项时返回 [`super::PagingError::AlreadyMapped`]。
    /// `flags` 不含 `VALID` 时安装的是非驻留项（例如惰性标记）。
    fn map(&mut self, vpn: Vpn, ppn: Ppn, flags: UniversalPTEFlag) -> PagingResult<()>;

    /// 移除页表项并返回旧值
    ///
    /// 不存在时返回 [`super::PagingError::NotMapped`]。不会释放物理页。
    fn unmap(&mut self, vpn: Vpn) -> PagingResult<PageTableEntry>;

    /// 刷新单个 TLB 条目
    fn tlb_flush(&self, vpn: Vpn);
}
