//! 页码抽象模块
//!
//! 此模块定义了表示页码 (Page Number) 的 Trait 和具体的页码类型 (Ppn, Vpn)，
//! 以及用于处理连续页码的范围结构 (PageNumRange)。

use crate::address::operations::{AlignOps, UsizeConvert};
use crate::address::types::{Paddr, Vaddr};
use crate::config::PAGE_SHIFT;

/// 表示一个页码的 Trait。
pub trait PageNum: UsizeConvert + Copy + Clone + PartialEq + PartialOrd + Eq + Ord {
    /// 此页码类型关联的地址类型（例如 Ppn 关联 Paddr，Vpn 关联 Vaddr）。
    type TAddress: AlignOps;

    /// 将页码增加 1。
    fn step(&mut self) {
        *self = Self::from_usize(self.as_usize() + 1);
    }

    /// 将地址转换为页码 (向下取整，即包含该地址的页)。
    fn from_addr_floor(addr: Self::TAddress) -> Self {
        Self::from_usize(addr.as_usize() >> PAGE_SHIFT)
    }

    /// 将地址转换为页码 (向上取整)。
    ///
    /// 页的结束地址（例如 0x1000）得到下一页的页码（例如 1）。
    fn from_addr_ceil(addr: Self::TAddress) -> Self {
        Self::from_usize(addr.align_up_to_page().as_usize() >> PAGE_SHIFT)
    }

    /// 页的起始地址。
    fn start_addr(self) -> Self::TAddress {
        Self::TAddress::from_usize(self.as_usize() << PAGE_SHIFT)
    }

    /// 页的结束地址 (即下一页的起始地址)。
    fn end_addr(self) -> Self::TAddress {
        Self::TAddress::from_usize((self.as_usize() + 1) << PAGE_SHIFT)
    }
}

macro_rules! impl_page_num {
    ($type:ty, $addr_type:ty) => {
        crate::impl_usize_convert!($type);

        impl PageNum for $type {
            type TAddress = $addr_type;
        }
    };
}

/// 物理页码，对应物理地址 (Paddr)。
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Ppn(pub usize);
impl_page_num!(Ppn, Paddr);

/// 虚拟页码，对应虚拟地址 (Vaddr)。
#[repr(transparent)]
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct Vpn(pub usize);
impl_page_num!(Vpn, Vaddr);

/// 页码的半开区间 `[start, end)`。
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageNumRange<T: PageNum> {
    start: T,
    end: T,
}

impl<T: PageNum> PageNumRange<T> {
    /// 创建一个新的页码范围。
    pub fn new(start: T, end: T) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// 从起始页码和页数创建。
    pub fn from_start_len(start: T, len: usize) -> Self {
        Self {
            start,
            end: T::from_usize(start.as_usize() + len),
        }
    }

    /// 起始页码。
    pub fn start(&self) -> T {
        self.start
    }

    /// 结束页码 (不包含)。
    pub fn end(&self) -> T {
        self.end
    }

    /// 范围内的页数。
    pub fn len(&self) -> usize {
        self.end.as_usize() - self.start.as_usize()
    }

    /// 范围是否为空。
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// 是否包含给定页码。
    pub fn contains(&self, pn: T) -> bool {
        pn >= self.start && pn < self.end
    }

    /// 获取范围的迭代器。
    pub fn iter(&self) -> PageNumRangeIterator<T> {
        PageNumRangeIterator {
            current: self.start,
            end: self.end,
        }
    }
}

impl<T: PageNum> IntoIterator for PageNumRange<T> {
    type Item = T;
    type IntoIter = PageNumRangeIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 页码范围的迭代器，按升序返回范围内的每个页码。
pub struct PageNumRangeIterator<T: PageNum> {
    current: T,
    end: T,
}

impl<T: PageNum> Iterator for PageNumRangeIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.current >= self.end {
            return None;
        }
        let result = self.current;
        self.current.step();
        Some(result)
    }
}

/// 虚拟页码范围的类型别名
pub type VpnRange = PageNumRange<Vpn>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_num_start_end_addr() {
        let vpn = Vpn::from_usize(1);
        assert_eq!(vpn.start_addr().as_usize(), 4096);
        assert_eq!(vpn.end_addr().as_usize(), 8192);
    }

    #[test]
    fn test_page_num_from_addr_floor_ceil() {
        let a = Vaddr::from_usize(4096);
        assert_eq!(Vpn::from_addr_floor(a).as_usize(), 1);
        assert_eq!(Vpn::from_addr_ceil(a).as_usize(), 1);

        let b = Vaddr::from_usize(4097);
        assert_eq!(Vpn::from_addr_floor(b).as_usize(), 1);
        assert_eq!(Vpn::from_addr_ceil(b).as_usize(), 2);
    }

    #[test]
    fn test_vpn_range_iterates_half_open() {
        let range = VpnRange::from_start_len(Vpn(10), 3);
        assert_eq!(range.len(), 3);
        assert!(range.contains(Vpn(12)));
        assert!(!range.contains(Vpn(13)));
        let mut it = range.into_iter();
        assert_eq!(it.next(), Some(Vpn(10)));
        assert_eq!(it.next(), Some(Vpn(11)));
        assert_eq!(it.next(), Some(Vpn(12)));
        assert_eq!(it.next(), None);
        assert!(VpnRange::new(Vpn(4), Vpn(4)).is_empty());
    }
}
