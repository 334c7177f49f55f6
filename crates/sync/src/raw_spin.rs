//! 原始自旋锁
//!
//! 只负责互斥，不处理中断；作为 `lock_api::RawMutex` 的实现交给
//! [`crate::SpinLock`] 组合使用。

use core::{
    hint,
    sync::atomic::{AtomicBool, Ordering},
};

/// 基于 `AtomicBool` 的原始自旋锁，不可重入
#[derive(Debug)]
pub struct RawSpinLock {
    locked: AtomicBool,
}

// SAFETY: locked 为 true 期间只有一个持有者，unlock 使用 Release 与 lock 的 Acquire 配对
unsafe impl lock_api::RawMutex for RawSpinLock {
    #[allow(clippy::declare_interior_mutable_const)]
    const INIT: Self = RawSpinLock {
        locked: AtomicBool::new(false),
    };

    // 持锁期间本地中断已关闭，守卫不能被带到其它 CPU 上释放
    type GuardMarker = lock_api::GuardNoSend;

    fn lock(&self) {
        while self
            .locked
            .compare_exchange_weak(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            while self.locked.load(Ordering::Relaxed) {
                hint::spin_loop();
            }
        }
    }

    fn try_lock(&self) -> bool {
        self.locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    unsafe fn unlock(&self) {
        self.locked.store(false, Ordering::Release);
    }

    fn is_locked(&self) -> bool {
        self.locked.load(Ordering::Relaxed)
    }
}
