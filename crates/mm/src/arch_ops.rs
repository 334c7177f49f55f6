//! 架构相关内存管理操作 trait 定义和注册

use core::sync::atomic::{AtomicUsize, Ordering};

/// 架构相关内存管理操作
///
/// 内核通过直接映射区访问物理页：空闲链表的指针、页的填充和文件读写
/// 都经由这里把物理地址换成内核可访问的虚拟地址。
pub trait ArchMmOps: Send + Sync {
    /// 将内核虚拟地址转换为物理地址（直接映射区域）
    ///
    /// # Safety
    /// 调用者必须确保虚拟地址位于直接映射区域内
    unsafe fn vaddr_to_paddr(&self, vaddr: usize) -> usize;

    /// 将物理地址转换为内核虚拟地址（直接映射区域）
    fn paddr_to_vaddr(&self, paddr: usize) -> usize;
}

static ARCH_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static ARCH_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册架构操作实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_arch_ops(ops: &'static dyn ArchMmOps) {
    let ptr = ops as *const dyn ArchMmOps;
    // SAFETY: 将 fat pointer 拆分为 data 和 vtable 两部分存储
    let (data, vtable) =
        unsafe { core::mem::transmute::<*const dyn ArchMmOps, (usize, usize)>(ptr) };
    ARCH_OPS_DATA.store(data, Ordering::Release);
    ARCH_OPS_VTABLE.store(vtable, Ordering::Release);
}

/// 获取已注册的架构操作实现
///
/// # Panics
/// 如果尚未调用 [`register_arch_ops`] 注册实现，则 panic
#[inline]
pub fn arch_ops() -> &'static dyn ArchMmOps {
    let data = ARCH_OPS_DATA.load(Ordering::Acquire);
    let vtable = ARCH_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        #[cfg(test)]
        {
            extern crate test_support;
            return &test_support::mock::mm::MOCK_MM_OPS;
        }
        #[cfg(not(test))]
        panic!("mm: ArchMmOps not registered");
    }
    // SAFETY: 重组 fat pointer
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn ArchMmOps>((data, vtable)) }
}

#[cfg(test)]
mod test_mock {
    extern crate test_support;

    use super::ArchMmOps;

    impl ArchMmOps for test_support::mock::mm::MockMmOps {
        unsafe fn vaddr_to_paddr(&self, vaddr: usize) -> usize {
            unsafe { test_support::mock::mm::MockMmOps::vaddr_to_paddr(self, vaddr) }
        }

        fn paddr_to_vaddr(&self, paddr: usize) -> usize {
            test_support::mock::mm::MockMmOps::paddr_to_vaddr(self, paddr)
        }
    }

    #[test]
    fn test_arch_ops_fallback_is_identity() {
        let ops = super::arch_ops();
        assert_eq!(ops.paddr_to_vaddr(0x8020_0000), 0x8020_0000);
        assert_eq!(unsafe { ops.vaddr_to_paddr(0x1000) }, 0x1000);
    }
}
