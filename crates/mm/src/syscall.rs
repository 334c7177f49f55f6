//! mmap/munmap 系统调用
//!
//! 负责把原始寄存器参数解析成强类型参数，并把 [`MmError`] 转换成负的 errno。
//! 文件描述符到文件对象的解析由调用者完成。

use crate::address::{AlignOps, UsizeConvert, Vaddr};
use crate::error::{MmError, MmResult};
use crate::file::MmFile;
use crate::frame_allocator::PageAllocator;
use crate::memory_space::MemorySpace;
use crate::page_table::PageTableInner;
use alloc::sync::Arc;
use uapi::mm::{MapFlags, ProtFlags};

/// mmap(addr, len, prot, flags, fd, offset)
///
/// `file` 是 fd 对应的文件，fd 无效时传 None。成功返回映射的起始地址。
pub fn sys_mmap<PT: PageTableInner>(
    space: &mut MemorySpace<PT>,
    file: Option<&Arc<dyn MmFile>>,
    addr: usize,
    len: usize,
    prot: usize,
    flags: usize,
    offset: usize,
) -> isize {
    let result = parse_mmap_args(len, prot, flags, offset).and_then(|(prot, flags)| {
        let file = file.ok_or(MmError::BadFileDescriptor)?;
        space.mmap(Vaddr(addr), len, prot, flags, file, offset)
    });
    match result {
        Ok(va) => va.as_usize() as isize,
        Err(e) => {
            log::debug!("sys_mmap: {:?}", e);
            e.to_errno()
        }
    }
}

/// munmap(addr, len)
pub fn sys_munmap<PT: PageTableInner>(
    space: &mut MemorySpace<PT>,
    allocator: &PageAllocator,
    addr: usize,
    len: usize,
) -> isize {
    match space.munmap(allocator, Vaddr(addr), len) {
        Ok(()) => 0,
        Err(e) => {
            log::debug!("sys_munmap: {:?}", e);
            e.to_errno()
        }
    }
}

fn parse_mmap_args(
    len: usize,
    prot: usize,
    flags: usize,
    offset: usize,
) -> MmResult<(ProtFlags, MapFlags)> {
    if len == 0 || !Vaddr(offset).is_page_aligned() {
        return Err(MmError::InvalidArgument);
    }
    let prot = u32::try_from(prot)
        .ok()
        .and_then(ProtFlags::from_bits)
        .ok_or(MmError::InvalidArgument)?;
    let flags = u32::try_from(flags)
        .ok()
        .and_then(MapFlags::from_bits)
        .filter(|f| f.is_valid_share_mode())
        .ok_or(MmError::InvalidArgument)?;
    Ok((prot, flags))
}
