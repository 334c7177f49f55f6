//! 地址与页码的基础操作

use crate::config::PAGE_SIZE;

/// 与 usize 互相转换
pub trait UsizeConvert: Copy {
    /// 取出内部的 usize
    fn as_usize(&self) -> usize;
    /// 从 usize 构造
    fn from_usize(value: usize) -> Self;
}

/// 页对齐操作
pub trait AlignOps: UsizeConvert {
    /// 是否按页对齐
    fn is_page_aligned(self) -> bool {
        self.as_usize() % PAGE_SIZE == 0
    }

    /// 向下对齐到页边界
    fn align_down_to_page(self) -> Self {
        Self::from_usize(self.as_usize() & !(PAGE_SIZE - 1))
    }

    /// 向上对齐到页边界
    fn align_up_to_page(self) -> Self {
        Self::from_usize(page_round_up(self.as_usize()))
    }

    /// 页内偏移
    fn page_offset(self) -> usize {
        self.as_usize() & (PAGE_SIZE - 1)
    }
}

/// 把字节数向上取整到页大小的整数倍
#[inline]
pub const fn page_round_up(bytes: usize) -> usize {
    (bytes + PAGE_SIZE - 1) & !(PAGE_SIZE - 1)
}

/// 同 [`page_round_up`]，结果超出 `usize` 时返回 `None`
#[inline]
pub const fn checked_page_round_up(bytes: usize) -> Option<usize> {
    match bytes.checked_add(PAGE_SIZE - 1) {
        Some(v) => Some(v & !(PAGE_SIZE - 1)),
        None => None,
    }
}

/// 为 `struct T(pub usize)` 形式的新类型实现 [`UsizeConvert`] 和 [`AlignOps`]
#[macro_export]
macro_rules! impl_usize_convert {
    ($type:ty) => {
        impl $crate::address::operations::UsizeConvert for $type {
            fn as_usize(&self) -> usize {
                self.0
            }

            fn from_usize(value: usize) -> Self {
                Self(value)
            }
        }

        impl $crate::address::operations::AlignOps for $type {}
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_round_up() {
        assert_eq!(page_round_up(0), 0);
        assert_eq!(page_round_up(1), PAGE_SIZE);
        assert_eq!(page_round_up(PAGE_SIZE), PAGE_SIZE);
        assert_eq!(page_round_up(PAGE_SIZE + 1), 2 * PAGE_SIZE);
    }

    #[test]
    fn test_checked_page_round_up() {
        assert_eq!(checked_page_round_up(1), Some(PAGE_SIZE));
        let top = usize::MAX & !(PAGE_SIZE - 1);
        assert_eq!(checked_page_round_up(top), Some(top));
        assert_eq!(checked_page_round_up(usize::MAX - 10), None);
    }
}
