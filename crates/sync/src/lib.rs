//! 同步原语
//!
//! 向内存管理子系统提供中断安全的自旋锁，以及在关中断状态下读取
//! 当前 CPU 编号的辅助函数。
//!
//! # 架构依赖
//!
//! 此 crate 通过 `ArchOps` trait 抽象架构相关操作。
//! 使用前必须调用 `register_arch_ops` 注册实现。

#![no_std]

#[cfg(test)]
extern crate std;

mod intr_guard;
mod raw_spin;
mod spin_lock;

pub use intr_guard::*;
pub use raw_spin::RawSpinLock;
pub use spin_lock::*;

use core::sync::atomic::{AtomicUsize, Ordering};

/// 架构相关操作的 trait
///
/// 由内核实现并注册，提供中断控制和 CPU 信息
pub trait ArchOps: Send + Sync {
    /// 读取并禁用中断，返回之前的状态
    ///
    /// # Safety
    /// 调用者必须确保在适当的上下文中调用
    unsafe fn read_and_disable_interrupts(&self) -> usize;

    /// 恢复中断状态
    ///
    /// # Safety
    /// flags 必须是之前 read_and_disable_interrupts 返回的值
    unsafe fn restore_interrupts(&self, flags: usize);

    /// 中断使能位在 flags 中的掩码
    fn sstatus_sie(&self) -> usize;

    /// 获取当前 CPU ID
    fn cpu_id(&self) -> usize;
}

static ARCH_OPS_DATA: AtomicUsize = AtomicUsize::new(0);
static ARCH_OPS_VTABLE: AtomicUsize = AtomicUsize::new(0);

/// 注册架构操作实现
///
/// # Safety
/// 必须在单线程环境下调用，且只能调用一次
pub unsafe fn register_arch_ops(ops: &'static dyn ArchOps) {
    let ptr = ops as *const dyn ArchOps;
    // SAFETY: fat pointer 的布局是 (data, vtable)
    let (data, vtable) = unsafe { core::mem::transmute::<*const dyn ArchOps, (usize, usize)>(ptr) };
    ARCH_OPS_DATA.store(data, Ordering::Release);
    ARCH_OPS_VTABLE.store(vtable, Ordering::Release);
}

#[inline]
pub(crate) fn arch_ops() -> &'static dyn ArchOps {
    let data = ARCH_OPS_DATA.load(Ordering::Acquire);
    let vtable = ARCH_OPS_VTABLE.load(Ordering::Acquire);
    if data == 0 {
        #[cfg(test)]
        {
            extern crate test_support;
            return &test_support::mock::arch::MOCK_ARCH_OPS;
        }
        #[cfg(not(test))]
        panic!("sync: ArchOps not registered, call register_arch_ops first");
    }
    // SAFETY: data 和 vtable 是通过 register_arch_ops 设置的有效指针
    unsafe { &*core::mem::transmute::<(usize, usize), *const dyn ArchOps>((data, vtable)) }
}

/// 读取当前 CPU 编号
///
/// 读取期间关闭本地中断，保证不会在读取途中被迁移到其它 CPU。
/// 返回后调用者可能已经换了 CPU，所以结果只能当作提示使用。
pub fn current_cpu_id() -> usize {
    let _guard = IntrGuard::new();
    arch_ops().cpu_id()
}

#[cfg(test)]
mod test_mock {
    extern crate test_support;

    use super::ArchOps;
    use std::sync::{Mutex, MutexGuard};

    impl ArchOps for test_support::mock::arch::MockArchOps {
        unsafe fn read_and_disable_interrupts(&self) -> usize {
            unsafe { test_support::mock::arch::MockArchOps::read_and_disable_interrupts(self) }
        }

        unsafe fn restore_interrupts(&self, flags: usize) {
            unsafe { test_support::mock::arch::MockArchOps::restore_interrupts(self, flags) }
        }

        fn sstatus_sie(&self) -> usize {
            test_support::mock::arch::MockArchOps::sstatus_sie(self)
        }

        fn cpu_id(&self) -> usize {
            test_support::mock::arch::MockArchOps::cpu_id(self)
        }
    }

    static SERIAL: Mutex<()> = Mutex::new(());

    /// mock 的中断状态是全局的，观察它的测试需要串行执行
    pub(crate) fn serial() -> MutexGuard<'static, ()> {
        let guard = SERIAL.lock().unwrap_or_else(|e| e.into_inner());
        test_support::mock::arch::MOCK_ARCH_OPS
            .interrupt_state
            .store(true, core::sync::atomic::Ordering::SeqCst);
        guard
    }

    #[test]
    fn test_current_cpu_id_reads_mock_and_restores_interrupts() {
        let _serial = serial();
        let mock = &test_support::mock::arch::MOCK_ARCH_OPS;
        mock.cpu_id.store(3, core::sync::atomic::Ordering::Relaxed);
        assert_eq!(super::current_cpu_id(), 3);
        mock.cpu_id.store(0, core::sync::atomic::Ordering::Relaxed);
        assert!(mock.interrupt_state.load(core::sync::atomic::Ordering::SeqCst));
    }
}
