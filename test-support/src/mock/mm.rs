//! 内存管理相关操作的 Mock 实现
//!
//! 注意：这里不直接依赖 `mm` crate（避免循环依赖）。
//! `mm` crate 在 `cfg(test)` 下为这些类型实现其 trait（例如 `ArchMmOps` / `MmConfig`）。

/// Mock 的内存管理架构操作
///
/// 采用“恒等映射”（vaddr == paddr），测试中的物理页就是宿主机上按页对齐的内存。
pub struct MockMmOps;

impl MockMmOps {
    pub const fn new() -> Self {
        Self
    }

    /// 将虚拟地址转换为物理地址（恒等映射）
    ///
    /// # Safety
    /// 仅用于测试环境的可控输入。
    pub unsafe fn vaddr_to_paddr(&self, vaddr: usize) -> usize {
        vaddr
    }

    /// 将物理地址转换为虚拟地址（恒等映射）
    pub fn paddr_to_vaddr(&self, paddr: usize) -> usize {
        paddr
    }
}

/// 全局 Mock 实例
pub static MOCK_MM_OPS: MockMmOps = MockMmOps::new();

/// Mock 的内存管理配置
pub struct MockMmConfig;

impl MockMmConfig {
    pub const fn new() -> Self {
        Self
    }

    pub fn memory_end(&self) -> usize {
        // 仅供测试：给一个较大的上界
        usize::MAX
    }

    /// mmap 窗口起点：1024 页
    pub fn mmap_base(&self) -> usize {
        0x40_0000
    }

    /// mmap 窗口终点（不含）
    pub fn mmap_top(&self) -> usize {
        0x80_0000
    }
}

/// 全局 Mock 实例
pub static MOCK_MM_CONFIG: MockMmConfig = MockMmConfig::new();
