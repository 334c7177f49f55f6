//! 解除映射与脏页写回

use super::installer;
use super::region::{MappedRegion, RegionHandle};
use super::space::MemorySpace;
use crate::address::{AlignOps, PageNum, Ppn, UsizeConvert, Vaddr, Vpn, VpnRange};
use crate::error::{MmError, MmResult};
use crate::file::{FsTransaction, InodeLockGuard, MmInode};
use crate::frame_allocator::{PageAllocator, page_bytes};
use crate::page_table::PageTableInner;
use core::cmp::min;
use uapi::errno::EIO;

impl<PT: PageTableInner> MemorySpace<PT> {
    /// 解除 `[addr, addr + len)` 的映射
    ///
    /// `addr` 必须页对齐且落在某个区域内；`len` 按页向上取整并截断到区域末尾。
    /// 范围必须是整个区域、区域前缀或区域后缀，在中间挖洞会在修改任何状态之前被拒绝。
    ///
    /// 共享映射中被写过的页先写回文件，范围内所有驻留页都归还给 `allocator`。
    /// 写回失败不会中止解除映射：记账照常完成，然后返回第一个写回错误。
    pub fn munmap(&mut self, allocator: &PageAllocator, addr: Vaddr, len: usize) -> MmResult<()> {
        if len == 0 || !addr.is_page_aligned() {
            return Err(MmError::InvalidArgument);
        }
        let handle = self.regions.find(addr).ok_or(MmError::NotMapped)?;
        let region = self.regions.get(handle).ok_or(MmError::NotMapped)?;
        // 先截断到区域末尾再取整，`page_end` 已页对齐，取整不会溢出
        let end = Vaddr(addr.as_usize().saturating_add(len));
        let end = min(end, region.page_end()).align_up_to_page();
        region.classify(addr, end)?;
        let inode = region.backing().file.inode().map_err(MmError::Io)?;

        let range = VpnRange::new(Vpn::from_addr_floor(addr), Vpn::from_addr_floor(end));
        let released = self.release_range(allocator, handle, range, inode.as_ref());
        let kind = self.regions.shrink_or_destroy(handle, addr, end - addr)?;
        log::debug!(
            "munmap: [{:#x}, {:#x}) {:?}",
            addr.as_usize(),
            end.as_usize(),
            kind
        );
        released
    }

    /// 在 inode 锁内逐页拆除映射
    fn release_range(
        &mut self,
        allocator: &PageAllocator,
        handle: RegionHandle,
        range: VpnRange,
        inode: &dyn MmInode,
    ) -> MmResult<()> {
        let Some(region) = self.regions.get(handle) else {
            return Err(MmError::NotMapped);
        };
        let shared = region.backing().is_shared();
        let mut result = Ok(());

        let _locked = InodeLockGuard::lock(inode);
        for vpn in range {
            let Some(entry) = self.page_table.walk(vpn) else {
                continue;
            };
            if shared && entry.is_present() && entry.is_dirty() {
                if let Err(e) = write_back(inode, region, vpn, entry.ppn) {
                    log::error!(
                        "munmap: writeback of {:#x} failed: {:?}",
                        vpn.start_addr().as_usize(),
                        e
                    );
                    if result.is_ok() {
                        result = Err(e);
                    }
                }
            }
            if let Err(e) = installer::release(&mut self.page_table, vpn, Some(allocator)) {
                log::error!(
                    "munmap: removing {:#x} failed: {:?}",
                    vpn.start_addr().as_usize(),
                    e
                );
                if result.is_ok() {
                    result = Err(e.into());
                }
            }
        }
        result
    }
}

/// 在一次日志事务中把一页写回文件
fn write_back(inode: &dyn MmInode, region: &MappedRegion, vpn: Vpn, ppn: Ppn) -> MmResult<()> {
    let len = region.bytes_in_page(vpn);
    if len == 0 {
        return Ok(());
    }
    let offset = region.file_offset_of(vpn).ok_or(MmError::InvalidArgument)?;
    // SAFETY: 页仍由页表项持有，拆除之前没有其它访问者
    let bytes = unsafe { &page_bytes(ppn)[..len] };

    let _op = FsTransaction::begin(inode);
    match inode.write_at(offset, bytes) {
        Ok(n) if n == len => Ok(()),
        Ok(n) => {
            log::error!(
                "munmap: partial write at offset {:#x}: expected {}, got {}",
                offset,
                len,
                n
            );
            Err(MmError::Io(-EIO))
        }
        Err(errno) => Err(MmError::Io(errno)),
    }
}
