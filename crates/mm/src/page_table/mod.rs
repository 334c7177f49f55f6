//! 页表模块
//!
//! 内存管理只通过 [`PageTableInner`] 访问页表；具体的多级页表格式由架构实现。
mod page_table_entry;
mod table;

pub use page_table_entry::*;
pub use table::*;

/// 分页操作中可能发生的错误
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagingError {
    /// 虚拟地址未被映射
    NotMapped,
    /// 虚拟地址已被映射
    AlreadyMapped,
    /// 提供了无效的地址
    InvalidAddress,
    /// 分配中间级页表时内存耗尽
    OutOfMemory,
}

/// 分页操作的结果类型
pub type PagingResult<T> = Result<T, PagingError>;
