//! 中断保护器
//!
//! 基于 RAII 实现中断保护，在创建时禁用中断，销毁时恢复。
//!
//! 注意：禁用中断只能阻止**本地 CPU** 上任务与中断处理程序的并发，
//! 并不能阻止其他 CPU 的并行访问；多核共享数据仍需要配合自旋锁。

use crate::arch_ops;

/// 中断保护器
///
/// 保存进入时的中断状态，离开作用域时恢复该状态而不是无条件开中断，
/// 因此可以任意嵌套。
///
/// # 示例
/// ```ignore
/// {
///     let _guard = IntrGuard::new(); // 禁用中断
///     // 临界区代码
/// } // 恢复进入前的中断状态
/// ```
#[must_use]
pub struct IntrGuard {
    flags: usize,
}

impl IntrGuard {
    /// 禁用本地中断并记录之前的状态
    pub fn new() -> Self {
        // SAFETY: 保存的 flags 只会在 Drop 中原样恢复
        let flags = unsafe { arch_ops().read_and_disable_interrupts() };
        IntrGuard { flags }
    }

    /// 进入临界区前中断是否处于启用状态
    pub fn was_enabled(&self) -> bool {
        self.flags & arch_ops().sstatus_sie() != 0
    }
}

impl Default for IntrGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for IntrGuard {
    fn drop(&mut self) {
        // SAFETY: flags 来自 new() 中的 read_and_disable_interrupts
        unsafe { arch_ops().restore_interrupts(self.flags) };
    }
}

/// 在关中断状态下执行闭包
pub fn without_interrupts<R>(f: impl FnOnce() -> R) -> R {
    let _guard = IntrGuard::new();
    f()
}

#[cfg(test)]
mod tests {
    extern crate test_support;

    use super::*;
    use crate::test_mock::serial;
    use core::sync::atomic::Ordering;
    use test_support::mock::arch::MOCK_ARCH_OPS;

    fn interrupts_on() -> bool {
        MOCK_ARCH_OPS.interrupt_state.load(Ordering::SeqCst)
    }

    #[test]
    fn test_guard_disables_and_restores() {
        let _serial = serial();
        assert!(interrupts_on());
        {
            let guard = IntrGuard::new();
            assert!(!interrupts_on());
            assert!(guard.was_enabled());
        }
        assert!(interrupts_on());
    }

    #[test]
    fn test_nested_guards_restore_outer_state() {
        let _serial = serial();
        let outer = IntrGuard::new();
        {
            let inner = IntrGuard::new();
            assert!(!inner.was_enabled());
        }
        assert!(!interrupts_on());
        drop(outer);
        assert!(interrupts_on());
    }

    #[test]
    fn test_without_interrupts_returns_value() {
        let _serial = serial();
        let v = without_interrupts(|| {
            assert!(!interrupts_on());
            7
        });
        assert_eq!(v, 7);
        assert!(interrupts_on());
    }
}
