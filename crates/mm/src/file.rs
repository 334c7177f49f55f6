//! 文件映射接口 trait 定义
//!
//! 映射区域只通过这里的 trait 访问文件系统。文件引用计数用 `Arc` 表达：
//! 克隆 `Arc<dyn MmFile>` 相当于 dup，最后一个引用被丢弃相当于 close。

use alloc::sync::Arc;

/// 可用于内存映射读写的 Inode 接口
pub trait MmInode: Send + Sync {
    /// 从指定偏移读取数据到缓冲区，返回实际读取的字节数
    ///
    /// 读到文件末尾时返回的字节数可以小于缓冲区长度。
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize, isize>;

    /// 将缓冲区数据写入指定偏移，返回实际写入的字节数
    fn write_at(&self, offset: usize, buf: &[u8]) -> Result<usize, isize>;

    /// 获取 inode 锁（可睡眠）
    fn lock(&self);

    /// 释放 inode 锁
    fn unlock(&self);

    /// 开始一次文件系统日志事务
    fn begin_op(&self) {}

    /// 结束日志事务
    fn end_op(&self) {}
}

/// 可映射到内存的文件接口
pub trait MmFile: Send + Sync {
    /// 获取底层 Inode 用于读写操作
    fn inode(&self) -> Result<Arc<dyn MmInode>, isize>;

    /// 文件是否以可写方式打开
    fn writable(&self) -> bool;
}

/// inode 锁的 RAII 保护器
pub struct InodeLockGuard<'a> {
    inode: &'a dyn MmInode,
}

impl<'a> InodeLockGuard<'a> {
    /// 加锁并返回保护器
    pub fn lock(inode: &'a dyn MmInode) -> Self {
        inode.lock();
        Self { inode }
    }
}

impl Drop for InodeLockGuard<'_> {
    fn drop(&mut self) {
        self.inode.unlock();
    }
}

/// 日志事务的 RAII 保护器
pub struct FsTransaction<'a> {
    inode: &'a dyn MmInode,
}

impl<'a> FsTransaction<'a> {
    /// 开始事务
    pub fn begin(inode: &'a dyn MmInode) -> Self {
        inode.begin_op();
        Self { inode }
    }
}

impl Drop for FsTransaction<'_> {
    fn drop(&mut self) {
        self.inode.end_op();
    }
}
