//! 自旋锁封装
//!
//! 提供对数据的互斥访问的自旋锁结构体。

use crate::intr_guard::IntrGuard;
use crate::raw_spin::RawSpinLock;
use lock_api::RawMutex;

/// 关中断的自旋锁
///
/// 先关闭本地中断再自旋获取锁，释放时先解锁再恢复中断，
/// 因此持锁期间本 CPU 上的中断处理程序不会再来争用同一把锁。
///
/// # 示例
/// ```ignore
/// let lock = SpinLock::new(0);
/// {
///     let mut guard = lock.lock();
///     *guard += 1;
/// }
/// ```
///
/// # 注意
/// SpinLock 不可重入，持锁时应避免长时间运行的操作。
#[derive(Debug)]
pub struct SpinLock<T> {
    inner: lock_api::Mutex<RawSpinLock, T>,
}

impl<T> SpinLock<T> {
    /// 创建一个新的 SpinLock
    pub const fn new(data: T) -> Self {
        SpinLock {
            inner: lock_api::Mutex::const_new(RawSpinLock::INIT, data),
        }
    }

    /// 关中断并获取锁
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let intr = IntrGuard::new();
        SpinLockGuard {
            guard: self.inner.lock(),
            _intr: intr,
        }
    }

    /// 尝试获取锁，失败时立即恢复中断状态并返回 None
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        let intr = IntrGuard::new();
        self.inner.try_lock().map(|guard| SpinLockGuard { guard, _intr: intr })
    }

    /// 锁当前是否被占用（仅用于调试和断言）
    pub fn is_locked(&self) -> bool {
        self.inner.is_locked()
    }

    /// 通过独占引用直接访问数据，无需加锁
    pub fn get_mut(&mut self) -> &mut T {
        self.inner.get_mut()
    }
}

impl<T: Default> Default for SpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

/// SpinLock 的 RAII 保护器
///
/// 字段按声明顺序析构：先释放锁，再恢复中断。
pub struct SpinLockGuard<'a, T> {
    guard: lock_api::MutexGuard<'a, RawSpinLock, T>,
    _intr: IntrGuard,
}

impl<T> core::ops::Deref for SpinLockGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl<T> core::ops::DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
