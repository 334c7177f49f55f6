//! 惰性缺页处理

use super::installer;
use super::region::RegionHandle;
use super::space::MemorySpace;
use crate::address::{PageNum, UsizeConvert, Vaddr, Vpn};
use crate::error::{MmError, MmResult};
use crate::file::InodeLockGuard;
use crate::frame_allocator::PageAllocator;
use crate::page_table::PageTableInner;
use uapi::mm::ProtFlags;

/// 触发缺页的访问类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultAccess {
    /// 读
    Read,
    /// 写
    Write,
    /// 取指
    Execute,
}

impl FaultAccess {
    fn required(self) -> ProtFlags {
        match self {
            FaultAccess::Read => ProtFlags::READ,
            FaultAccess::Write => ProtFlags::WRITE,
            FaultAccess::Execute => ProtFlags::EXEC,
        }
    }
}

impl<PT: PageTableInner> MemorySpace<PT> {
    /// trap 分发入口：先检查访问类型是否被区域允许，再装入页
    ///
    /// 权限不符时在分配任何资源之前返回 [`MmError::PermissionDenied`]。
    pub fn handle_page_fault(
        &mut self,
        allocator: &PageAllocator,
        addr: Vaddr,
        access: FaultAccess,
    ) -> MmResult<()> {
        let vpn = Vpn::from_addr_floor(addr);
        let handle = self.lazy_region_of(vpn)?;
        let allowed = self
            .regions
            .get(handle)
            .is_some_and(|r| r.prot().contains(access.required()));
        if !allowed {
            log::warn!(
                "page fault: {:?} access to {:#x} not permitted",
                access,
                addr.as_usize()
            );
            return Err(MmError::PermissionDenied);
        }
        self.fill_page(allocator, vpn, handle)
    }

    /// 为 `addr` 所在的惰性页分配物理页并从文件读入内容
    ///
    /// 页表项不是惰性标记时返回 [`MmError::NotLazyFault`]，由调用者决定如何处理
    /// （通常是终止进程）。任何失败都不会改变页表：新页被归还，惰性标记保留。
    pub fn handle_lazy_fault(&mut self, allocator: &PageAllocator, addr: Vaddr) -> MmResult<()> {
        let vpn = Vpn::from_addr_floor(addr);
        let handle = self.lazy_region_of(vpn)?;
        self.fill_page(allocator, vpn, handle)
    }

    fn lazy_region_of(&self, vpn: Vpn) -> MmResult<RegionHandle> {
        match self.page_table.walk(vpn) {
            Some(entry) if entry.is_lazy() => {}
            _ => return Err(MmError::NotLazyFault),
        }
        self.regions
            .find(vpn.start_addr())
            .ok_or(MmError::NotMapped)
    }

    fn fill_page(&mut self, allocator: &PageAllocator, vpn: Vpn, handle: RegionHandle) -> MmResult<()> {
        let region = self.regions.get(handle).ok_or(MmError::NotMapped)?;
        let inode = region.backing().file.inode().map_err(MmError::Io)?;
        let file_offset = region
            .file_offset_of(vpn)
            .ok_or(MmError::InvalidArgument)?;
        let want = region.bytes_in_page(vpn);
        let flags = installer::pte_flags_for(region.prot());

        let mut page = allocator.alloc().ok_or(MmError::OutOfMemory)?;
        page.zero();

        // 先通过内核地址读入，再安装映射：读失败时页表保持原样
        let read = {
            let _locked = InodeLockGuard::lock(inode.as_ref());
            inode.read_at(file_offset, &mut page.as_bytes_mut()[..want])
        };
        match read {
            Ok(n) if n < want => log::debug!(
                "page fault: short read at offset {:#x} ({} of {} bytes)",
                file_offset,
                n,
                want
            ),
            Ok(_) => {}
            Err(errno) => {
                allocator.free(page);
                log::warn!(
                    "page fault: reading offset {:#x} failed ({})",
                    file_offset,
                    errno
                );
                return Err(MmError::Io(errno));
            }
        }

        installer::materialize(&mut self.page_table, vpn, page, flags, allocator)?;
        log::debug!(
            "page fault: {:#x} <- file offset {:#x}",
            vpn.start_addr().as_usize(),
            file_offset
        );
        Ok(())
    }
}
