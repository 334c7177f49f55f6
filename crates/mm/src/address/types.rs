//! 物理地址与虚拟地址类型

use crate::arch_ops::arch_ops;

/// 物理地址
#[repr(transparent)]
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Paddr(pub usize);
crate::impl_usize_convert!(Paddr);

/// 虚拟地址
#[repr(transparent)]
#[derive(Copy, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Vaddr(pub usize);
crate::impl_usize_convert!(Vaddr);

impl Paddr {
    /// 转换为直接映射区中的内核虚拟地址
    pub fn to_vaddr(self) -> Vaddr {
        Vaddr(arch_ops().paddr_to_vaddr(self.0))
    }
}

impl Vaddr {
    /// 把直接映射区中的内核虚拟地址转换回物理地址
    ///
    /// # Safety
    /// 地址必须位于直接映射区域内
    pub unsafe fn to_paddr(self) -> Paddr {
        Paddr(unsafe { arch_ops().vaddr_to_paddr(self.0) })
    }

    /// 转换为指针
    pub fn as_ptr<T>(self) -> *const T {
        self.0 as *const T
    }

    /// 转换为可变指针
    pub fn as_mut_ptr<T>(self) -> *mut T {
        self.0 as *mut T
    }

    /// 加上字节偏移，溢出时返回 None
    pub fn checked_add(self, bytes: usize) -> Option<Self> {
        self.0.checked_add(bytes).map(Self)
    }
}

impl core::ops::Add<usize> for Vaddr {
    type Output = Vaddr;

    fn add(self, rhs: usize) -> Vaddr {
        Vaddr(self.0 + rhs)
    }
}

impl core::ops::Sub for Vaddr {
    type Output = usize;

    /// 两个地址之间的字节数
    fn sub(self, rhs: Vaddr) -> usize {
        self.0 - rhs.0
    }
}

impl core::fmt::Debug for Paddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Paddr({:#x})", self.0)
    }
}

impl core::fmt::Debug for Vaddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "Vaddr({:#x})", self.0)
    }
}
