//! 页表项的安装与拆除
//!
//! mmap 预留、缺页装入和解除映射对页表的全部修改都经过这里。

use crate::address::{PageNum, Ppn, Vpn, VpnRange};
use crate::error::MmResult;
use crate::frame_allocator::{PageAllocator, PhysPage};
use crate::page_table::{PageTableEntry, PageTableInner, PagingError, PagingResult, UniversalPTEFlag};
use uapi::mm::ProtFlags;

/// 由保护标志得到用户页的页表项权限
pub fn pte_flags_for(prot: ProtFlags) -> UniversalPTEFlag {
    let mut flags = UniversalPTEFlag::USER_ACCESSIBLE;
    if prot.contains(ProtFlags::READ) {
        flags |= UniversalPTEFlag::READABLE;
    }
    if prot.contains(ProtFlags::WRITE) {
        flags |= UniversalPTEFlag::WRITEABLE;
    }
    if prot.contains(ProtFlags::EXEC) {
        flags |= UniversalPTEFlag::EXECUTABLE;
    }
    flags
}

/// 为范围内每一页安装惰性标记
///
/// 任何一页失败时，已经安装的标记全部撤销，页表恢复原状。
pub fn reserve<PT: PageTableInner + ?Sized>(page_table: &mut PT, range: VpnRange) -> PagingResult<()> {
    for vpn in range {
        if let Err(e) = page_table.map(vpn, Ppn(0), UniversalPTEFlag::lazy_marker()) {
            for done in VpnRange::new(range.start(), vpn) {
                let _ = page_table.unmap(done);
            }
            log::warn!(
                "mmap: reserving page {:#x} failed ({:?}), rolled back {} pages",
                vpn.start_addr().0,
                e,
                vpn.0 - range.start().0
            );
            return Err(e);
        }
    }
    Ok(())
}

/// 用真实物理页替换惰性标记
///
/// 失败时页还给分配器，并恢复惰性标记，之后的访问可以再次触发缺页。
pub fn materialize<PT: PageTableInner + ?Sized>(
    page_table: &mut PT,
    vpn: Vpn,
    page: PhysPage,
    flags: UniversalPTEFlag,
    allocator: &PageAllocator,
) -> MmResult<()> {
    match page_table.unmap(vpn) {
        Ok(_) | Err(PagingError::NotMapped) => {}
        Err(e) => {
            allocator.free(page);
            return Err(e.into());
        }
    }
    if let Err(e) = page_table.map(vpn, page.ppn(), flags | UniversalPTEFlag::VALID) {
        let _ = page_table.map(vpn, Ppn(0), UniversalPTEFlag::lazy_marker());
        allocator.free(page);
        return Err(e.into());
    }
    // 所有权转交给页表项
    let _ = page.into_ppn();
    Ok(())
}

/// 移除页表项并刷新 TLB，返回被移除的项
///
/// 给出 `reclaim` 时，驻留页归还给该分配器；惰性标记没有物理页可还。
pub fn release<PT: PageTableInner + ?Sized>(
    page_table: &mut PT,
    vpn: Vpn,
    reclaim: Option<&PageAllocator>,
) -> PagingResult<PageTableEntry> {
    let entry = page_table.unmap(vpn)?;
    page_table.tlb_flush(vpn);
    if let (true, Some(allocator)) = (entry.is_present(), reclaim) {
        // SAFETY: 页表项是该页唯一的所有者，刚刚已被移除
        allocator.free(unsafe { PhysPage::from_ppn(entry.ppn) });
    }
    Ok(entry)
}
