//! 内存管理配置
//!
//! 编译期常量放在这里；物理内存上界和 mmap 窗口由内核通过 [`MmConfig`] 注册。

use core::sync::atomic::{AtomicUsize, Ordering};

/// 页大小（字节）
pub const PAGE_SIZE: usize = 4096;

/// 页内偏移位数
pub const PAGE_SHIFT: usize = 12;

/// 物理页分配器的桶数
pub const FREE_LIST_BUCKETS: usize = 4;

/// 每个进程最多同时存在的映射区域数
pub const MAX_VMA: usize = 16;

/// 分配出去的页被填充的字节，便于发现使用未初始化内存
pub const ALLOC_JUNK: u8 = 0x05;

/// 释放回来的页被填充的字节，便于发现释放后使用
pub const FREE_JUNK: u8 = 0x01;

/// 内存布局配置
///
/// 内核实现此 trait 并注册。
pub trait MmConfig: Send + Sync {
    /// 物理内存结束地址（不含）
    fn memory_end(&self) -> usize;

    /// 用户 mmap 窗口起始地址，必须页对齐
    fn mmap_base(&self) -> usize;

    /// 用户 mmap 窗口结束地址（不含）
    fn mmap_top(&self) -> usize;
}

static CONFIG_DATA: AtomicUsize = AtomicUsize::new(0);
static CONFIG_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册配置实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_config(config: &'static dyn MmConfig) {
    let ptr = config as *const dyn MmConfig;
    // SAFETY: 将 fat pointer 拆分为 data 和 vtable 两部分存储
    let (data, vtable) =
        unsafe { core::mem::transmute::<*const dyn MmConfig, (usize, usize)>(ptr) };
    CONFIG_DATA.store(data, Ordering::Release);
    CONFIG_VTABLE.store(vtable, Ordering::Release);
}

/// 获取已注册的配置实现
///
/// # Panics
/// 如果尚未调用 [`register_config`] 注册实现，则 panic
#[inline]
pub fn mm_config() -> &'static dyn MmConfig {
    let data = CONFIG_DATA.load(Ordering::Acquire);
    let vtable = CONFIG_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        #[cfg(test)]
        {
            extern crate test_support;
            return &test_support::mock::mm::MOCK_MM_CONFIG;
        }
        #[cfg(not(test))]
        panic!("mm: MmConfig not registered");
    }
    // SAFETY: 重组 fat pointer
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn MmConfig>((data, vtable)) }
}

#[cfg(test)]
mod test_mock {
    extern crate test_support;

    use super::MmConfig;

    impl MmConfig for test_support::mock::mm::MockMmConfig {
        fn memory_end(&self) -> usize {
            test_support::mock::mm::MockMmConfig::memory_end(self)
        }

        fn mmap_base(&self) -> usize {
            test_support::mock::mm::MockMmConfig::mmap_base(self)
        }

        fn mmap_top(&self) -> usize {
            test_support::mock::mm::MockMmConfig::mmap_top(self)
        }
    }

    #[test]
    fn test_config_fallback_is_page_aligned() {
        let cfg = super::mm_config();
        assert_eq!(cfg.mmap_base() % super::PAGE_SIZE, 0);
        assert!(cfg.mmap_base() < cfg.mmap_top());
        assert_eq!(1 << super::PAGE_SHIFT, super::PAGE_SIZE);
    }
}
