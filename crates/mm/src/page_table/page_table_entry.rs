//! 页表项
//!
//! 与架构无关的页表项视图。位布局参照 RISC-V Sv39，
//! `LAZY` 使用软件保留位标记“已预留、尚未装入”的 mmap 页。

use crate::address::Ppn;
use bitflags::bitflags;

bitflags! {
    /// 通用页表项标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct UniversalPTEFlag: usize {
        /// 有效位
        const VALID = 1 << 0;
        /// 可读
        const READABLE = 1 << 1;
        /// 可写
        const WRITEABLE = 1 << 2;
        /// 可执行
        const EXECUTABLE = 1 << 3;
        /// 用户态可访问
        const USER_ACCESSIBLE = 1 << 4;
        /// 全局映射
        const GLOBAL = 1 << 5;
        /// 已访问（硬件设置）
        const ACCESSED = 1 << 6;
        /// 已写（硬件设置）
        const DIRTY = 1 << 7;
        /// 惰性 mmap 页：存在页表项但没有物理页，访问会触发缺页
        const LAZY = 1 << 8;
    }
}

impl UniversalPTEFlag {
    /// 惰性映射标记使用的标志
    pub const fn lazy_marker() -> Self {
        Self::LAZY.union(Self::USER_ACCESSIBLE)
    }
}

/// 页表项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageTableEntry {
    /// 物理页码；惰性标记项中无意义
    pub ppn: Ppn,
    /// 标志位
    pub flags: UniversalPTEFlag,
}

impl PageTableEntry {
    /// 创建页表项
    pub const fn new(ppn: Ppn, flags: UniversalPTEFlag) -> Self {
        Self { ppn, flags }
    }

    /// 惰性映射标记项
    pub const fn lazy() -> Self {
        Self::new(Ppn(0), UniversalPTEFlag::lazy_marker())
    }

    /// 是否指向一个物理页
    pub fn is_present(&self) -> bool {
        self.flags.contains(UniversalPTEFlag::VALID)
    }

    /// 是否为尚未装入的惰性映射标记
    pub fn is_lazy(&self) -> bool {
        self.flags.contains(UniversalPTEFlag::LAZY) && !self.is_present()
    }

    /// 页是否被写过
    pub fn is_dirty(&self) -> bool {
        self.flags.contains(UniversalPTEFlag::DIRTY)
    }
}
