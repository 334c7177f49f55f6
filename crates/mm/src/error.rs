//! 内存管理错误类型
//!
//! 可通过 [`MmError::to_errno()`] 转换为系统调用错误码。

use crate::page_table::PagingError;
use uapi::errno::{EACCES, EBADF, EFAULT, EINVAL, EIO, ENOMEM};

/// 映射、缺页和解除映射可能返回的错误
///
/// 分配器契约被破坏（释放未对齐或越界的页）不在此列，那是内核 bug，直接 panic。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MmError {
    // 资源耗尽
    /// 没有空闲物理页 (-ENOMEM)
    OutOfMemory,
    /// 区域表已满 (-ENOMEM)
    NoFreeSlot,
    /// mmap 窗口中找不到足够长的空闲虚拟地址范围 (-ENOMEM)
    NoVirtualSpace,

    // 非法请求
    /// 对不可写文件建立可写共享映射 (-EACCES)
    PermissionDenied,
    /// 参数非法 (-EINVAL)
    InvalidArgument,
    /// 地址不在任何映射区域内 (-EINVAL)
    NotMapped,
    /// 在区域中间挖洞，需要拆分区域 (-EINVAL)
    InteriorUnmap,
    /// 缺页地址上不是惰性映射标记 (-EFAULT)
    NotLazyFault,
    /// 没有可映射的文件 (-EBADF)
    BadFileDescriptor,

    // 协作者失败
    /// 文件读写失败，携带文件层返回的 errno
    Io(isize),
    /// 页表操作失败
    Paging(PagingError),
}

/// 内存管理操作的结果类型
pub type MmResult<T> = Result<T, MmError>;

impl MmError {
    /// 转换为系统调用错误码（负数）
    pub fn to_errno(&self) -> isize {
        match self {
            MmError::OutOfMemory | MmError::NoFreeSlot | MmError::NoVirtualSpace => -ENOMEM,
            MmError::PermissionDenied => -EACCES,
            MmError::InvalidArgument | MmError::NotMapped | MmError::InteriorUnmap => -EINVAL,
            MmError::NotLazyFault => -EFAULT,
            MmError::BadFileDescriptor => -EBADF,
            // 文件层可能返回正数或 0，统一成负的 errno
            MmError::Io(errno) => match *errno {
                0 => -EIO,
                e if e < 0 => e,
                e => -e,
            },
            MmError::Paging(PagingError::OutOfMemory) => -ENOMEM,
            MmError::Paging(_) => -EINVAL,
        }
    }
}

impl From<PagingError> for MmError {
    fn from(e: PagingError) -> Self {
        MmError::Paging(e)
    }
}
