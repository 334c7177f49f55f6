//! 进程地址空间中与文件映射相关的部分

use super::installer;
use super::region::{MappedRegion, RegionHandle, RegionTable};
use super::MmapFile;
use crate::address::{AlignOps, PageNum, UsizeConvert, Vaddr, Vpn, VpnRange, checked_page_round_up};
use crate::config::{MAX_VMA, PAGE_SIZE};
use crate::error::{MmError, MmResult};
use crate::file::MmFile;
use crate::frame_allocator::PageAllocator;
use crate::mm_config;
use crate::page_table::PageTableInner;
use alloc::sync::Arc;
use uapi::mm::{MapFlags, ProtFlags};

/// 一个进程的页表和映射区域表
///
/// 调用者负责串行化对同一个 `MemorySpace` 的访问（通常由进程自身的锁保证）。
pub struct MemorySpace<PT: PageTableInner> {
    pub(super) page_table: PT,
    pub(super) regions: RegionTable,
    mmap_base: Vaddr,
    mmap_top: Vaddr,
}

impl<PT: PageTableInner> MemorySpace<PT> {
    /// 使用已注册 [`crate::MmConfig`] 中的 mmap 窗口
    pub fn new(page_table: PT) -> Self {
        let cfg = mm_config();
        Self::with_mmap_window(page_table, Vaddr(cfg.mmap_base()), Vaddr(cfg.mmap_top()))
    }

    /// 指定 mmap 窗口 `[base, top)`
    pub fn with_mmap_window(page_table: PT, base: Vaddr, top: Vaddr) -> Self {
        Self {
            page_table,
            regions: RegionTable::new(),
            mmap_base: base.align_up_to_page(),
            mmap_top: top.align_down_to_page(),
        }
    }

    /// 页表
    pub fn page_table(&self) -> &PT {
        &self.page_table
    }

    /// 页表（可变）
    pub fn page_table_mut(&mut self) -> &mut PT {
        &mut self.page_table
    }

    /// 区域表
    pub fn regions(&self) -> &RegionTable {
        &self.regions
    }

    /// 建立文件映射
    ///
    /// 只在页表中预留惰性标记，不分配物理页。成功时区域持有文件的一个新引用。
    /// 失败时没有任何副作用：不占用槽位，页表不变，文件引用计数不变。
    pub fn mmap(
        &mut self,
        hint: Vaddr,
        len: usize,
        prot: ProtFlags,
        flags: MapFlags,
        file: &Arc<dyn MmFile>,
        offset: usize,
    ) -> MmResult<Vaddr> {
        let Some(span) = checked_page_round_up(len).filter(|&span| span != 0) else {
            return Err(MmError::InvalidArgument);
        };
        // 整个映射在文件中的范围必须可以表示
        if offset.checked_add(span).is_none() {
            return Err(MmError::InvalidArgument);
        }
        if flags.contains(MapFlags::SHARED) && prot.contains(ProtFlags::WRITE) && !file.writable() {
            log::warn!("mmap: shared writable mapping of a read-only file");
            return Err(MmError::PermissionDenied);
        }
        let slot = self.regions.free_slot().ok_or(MmError::NoFreeSlot)?;
        let pages = span / PAGE_SIZE;
        let start = self
            .find_free_range(hint, pages)
            .ok_or(MmError::NoVirtualSpace)?;

        installer::reserve(
            &mut self.page_table,
            VpnRange::from_start_len(Vpn::from_addr_floor(start), pages),
        )?;

        let backing = MmapFile {
            file: Arc::clone(file),
            offset,
            prot,
            flags,
        };
        self.regions
            .insert(slot, MappedRegion::new(start, len, backing));
        log::debug!(
            "mmap: [{:#x}, {:#x}) slot {} offset {:#x} {:?} {:?}",
            start.as_usize(),
            start.as_usize() + len,
            slot,
            offset,
            prot,
            flags
        );
        Ok(start)
    }

    /// 选择一段 `pages` 页长的空闲虚拟地址范围
    ///
    /// 合法的提示地址优先，否则取窗口内地址最低的空闲范围。
    fn find_free_range(&self, hint: Vaddr, pages: usize) -> Option<Vaddr> {
        if hint.as_usize() != 0 && hint.is_page_aligned() && self.range_is_free(hint, pages) {
            return Some(hint);
        }
        let window = VpnRange::new(
            Vpn::from_addr_floor(self.mmap_base),
            Vpn::from_addr_floor(self.mmap_top),
        );
        let mut run_start = window.start();
        let mut run = 0;
        for vpn in window {
            if self.page_table.walk(vpn).is_some() {
                run = 0;
                continue;
            }
            if run == 0 {
                run_start = vpn;
            }
            run += 1;
            if run == pages {
                return Some(run_start.start_addr());
            }
        }
        None
    }

    fn range_is_free(&self, start: Vaddr, pages: usize) -> bool {
        let Some(end) = pages
            .checked_mul(PAGE_SIZE)
            .and_then(|bytes| start.checked_add(bytes))
        else {
            return false;
        };
        if start < self.mmap_base || end > self.mmap_top {
            return false;
        }
        VpnRange::from_start_len(Vpn::from_addr_floor(start), pages)
            .into_iter()
            .all(|vpn| self.page_table.walk(vpn).is_none())
    }

    /// 进程退出时解除所有映射
    ///
    /// 共享映射中的脏页照常写回。单个区域失败不会中止回收：该区域剩余的页被直接丢弃，
    /// 返回遇到的第一个错误。
    pub fn unmap_all(&mut self, allocator: &PageAllocator) -> MmResult<()> {
        let mut result = Ok(());
        for slot in 0..MAX_VMA {
            let handle = RegionHandle::new(slot);
            let Some(region) = self.regions.get(handle) else {
                continue;
            };
            let (start, len) = (region.start(), region.len());
            if let Err(e) = self.munmap(allocator, start, len) {
                log::error!("exit: unmapping {:#x} failed: {:?}", start.as_usize(), e);
                if self.regions.get(handle).is_some() {
                    self.discard_region(allocator, handle);
                }
                if result.is_ok() {
                    result = Err(e);
                }
            }
        }
        result
    }

    /// 不写回，直接拆除区域的所有页并丢弃描述符
    fn discard_region(&mut self, allocator: &PageAllocator, handle: RegionHandle) {
        if let Some(region) = self.regions.remove(handle) {
            for vpn in region.vpn_range() {
                let _ = installer::release(&mut self.page_table, vpn, Some(allocator));
            }
        }
    }

    /// fork 时把所有区域复制到子进程
    ///
    /// 子进程得到相同的槽位、相同的地址范围和各自的文件引用；
    /// 页表中只有惰性标记，页在子进程第一次访问时从文件重新读入。
    ///
    /// 任一区域复制失败时，已复制到子进程的区域全部撤销，子进程回到调用前的状态。
    pub fn fork_regions<CPT: PageTableInner>(&self, child: &mut MemorySpace<CPT>) -> MmResult<()> {
        for (handle, region) in self.regions.iter() {
            let copied = if child.regions.get(handle).is_some() {
                Err(MmError::NoFreeSlot)
            } else {
                installer::reserve(&mut child.page_table, region.vpn_range()).map_err(MmError::from)
            };
            if let Err(e) = copied {
                log::warn!("fork: copying slot {} failed: {:?}", handle.slot(), e);
                let copied_before = self
                    .regions
                    .iter()
                    .take_while(|(h, _)| h.slot() < handle.slot());
                for (done, _) in copied_before {
                    child.drop_lazy_region(done);
                }
                return Err(e);
            }
            child.regions.insert(handle.slot(), region.clone());
        }
        Ok(())
    }

    /// 撤销一个从未被访问过的区域：只有惰性标记，没有物理页
    fn drop_lazy_region(&mut self, handle: RegionHandle) {
        if let Some(region) = self.regions.remove(handle) {
            for vpn in region.vpn_range() {
                let _ = installer::release(&mut self.page_table, vpn, None);
            }
        }
    }
}
