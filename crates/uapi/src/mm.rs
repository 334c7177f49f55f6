//! 内存映射相关的用户态常量
//!
//! `PROT_*` 与 `MAP_*` 的取值与 Linux 一致。

use bitflags::bitflags;

bitflags! {
    /// 映射区域的保护标志
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ProtFlags: u32 {
        const NONE = 0;
        const READ = 1 << 0;
        const WRITE = 1 << 1;
        const EXEC = 1 << 2;
    }
}

bitflags! {
    /// 映射的共享方式
    ///
    /// 只能二选一：`SHARED` 的修改会写回文件，`PRIVATE` 的修改被丢弃。
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MapFlags: u32 {
        const SHARED = 0x01;
        const PRIVATE = 0x02;
    }
}

impl MapFlags {
    /// 恰好指定了 SHARED 或 PRIVATE 之一
    pub fn is_valid_share_mode(self) -> bool {
        self.contains(Self::SHARED) != self.contains(Self::PRIVATE)
    }
}
