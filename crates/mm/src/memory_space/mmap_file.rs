//! mmap 文件映射信息

use crate::MmFile;
use alloc::sync::Arc;
use uapi::mm::{MapFlags, ProtFlags};

/// 区域背后的文件及映射参数
///
/// 克隆会复制文件引用（相当于 dup），丢弃会释放引用（相当于 close）。
#[derive(Clone)]
pub struct MmapFile {
    /// 文件对象引用
    pub file: Arc<dyn MmFile>,
    /// 区域起始地址对应的文件偏移（字节）
    pub offset: usize,
    /// 保护标志
    pub prot: ProtFlags,
    /// 共享方式
    pub flags: MapFlags,
}

impl MmapFile {
    /// 修改是否需要写回文件
    pub fn is_shared(&self) -> bool {
        self.flags.contains(MapFlags::SHARED)
    }
}

// 手动实现 Debug，因为 dyn MmFile 没有实现 Debug
impl core::fmt::Debug for MmapFile {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("MmapFile")
            .field("file", &"<dyn MmFile>")
            .field("offset", &self.offset)
            .field("prot", &self.prot)
            .field("flags", &self.flags)
            .finish()
    }
}
