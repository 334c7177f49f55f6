//! 映射区域表
//!
//! 每个进程一张固定容量的表，最多 [`MAX_VMA`] 个有效区域。
//! 表只做记账：页表的修改由调用者（[`super::MemorySpace`]）负责。

use super::MmapFile;
use crate::address::{AlignOps, PageNum, UsizeConvert, Vaddr, Vpn, VpnRange};
use crate::config::{MAX_VMA, PAGE_SIZE};
use crate::error::{MmError, MmResult};
use core::cmp::min;
use uapi::mm::{MapFlags, ProtFlags};

/// 一个有效的文件映射区域
#[derive(Debug, Clone)]
pub struct MappedRegion {
    start: Vaddr,
    len: usize,
    backing: MmapFile,
}

impl MappedRegion {
    /// 创建区域描述符，`start` 必须页对齐，`len` 不为 0
    pub fn new(start: Vaddr, len: usize, backing: MmapFile) -> Self {
        debug_assert!(start.is_page_aligned() && len > 0);
        Self {
            start,
            len,
            backing,
        }
    }

    /// 起始地址
    pub fn start(&self) -> Vaddr {
        self.start
    }

    /// 长度（字节）
    pub fn len(&self) -> usize {
        self.len
    }

    /// 字节意义上的结束地址（不含）
    pub fn end(&self) -> Vaddr {
        self.start + self.len
    }

    /// 按页取整后的结束地址（不含）
    pub fn page_end(&self) -> Vaddr {
        self.end().align_up_to_page()
    }

    /// 覆盖的虚拟页
    pub fn vpn_range(&self) -> VpnRange {
        VpnRange::new(
            Vpn::from_addr_floor(self.start),
            Vpn::from_addr_ceil(self.end()),
        )
    }

    /// 地址是否落在 `[start, start + len)` 内
    pub fn contains(&self, va: Vaddr) -> bool {
        va >= self.start && va < self.end()
    }

    /// 背后的文件
    pub fn backing(&self) -> &MmapFile {
        &self.backing
    }

    /// 保护标志
    pub fn prot(&self) -> ProtFlags {
        self.backing.prot
    }

    /// 共享方式
    pub fn flags(&self) -> MapFlags {
        self.backing.flags
    }

    /// 当前的文件偏移
    pub fn offset(&self) -> usize {
        self.backing.offset
    }

    /// 页在文件中的偏移，超出 `usize` 时返回 `None`
    pub fn file_offset_of(&self, vpn: Vpn) -> Option<usize> {
        self.backing.offset.checked_add(vpn.start_addr() - self.start)
    }

    /// 该页中属于映射的字节数（只有最后一页可能不满一页）
    pub fn bytes_in_page(&self, vpn: Vpn) -> usize {
        let page = vpn.start_addr();
        if page >= self.end() {
            return 0;
        }
        min(PAGE_SIZE, self.end() - page)
    }

    /// 判断解除 `[start, end)` 属于哪种情况；`end` 按页对齐
    ///
    /// 在区域中间挖洞会返回 [`MmError::InteriorUnmap`]。
    pub fn classify(&self, start: Vaddr, end: Vaddr) -> MmResult<UnmapKind> {
        let page_end = self.page_end();
        if start < self.start || start >= page_end || end <= start {
            return Err(MmError::InvalidArgument);
        }
        match (start == self.start, end >= page_end) {
            (true, true) => Ok(UnmapKind::Whole),
            (true, false) => Ok(UnmapKind::Prefix),
            (false, true) => Ok(UnmapKind::Suffix),
            (false, false) => Err(MmError::InteriorUnmap),
        }
    }
}

/// 解除映射的范围与区域的关系
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmapKind {
    /// 整个区域
    Whole,
    /// 从区域开头开始的一段
    Prefix,
    /// 到区域结尾为止的一段
    Suffix,
}

/// 指向区域表中某个槽位的句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionHandle(usize);

impl RegionHandle {
    pub(crate) fn new(slot: usize) -> Self {
        Self(slot)
    }

    /// 槽位下标
    pub fn slot(&self) -> usize {
        self.0
    }
}

/// 进程的映射区域表
#[derive(Debug)]
pub struct RegionTable {
    slots: [Option<MappedRegion>; MAX_VMA],
}

impl RegionTable {
    /// 空表
    pub const fn new() -> Self {
        Self {
            slots: [const { None }; MAX_VMA],
        }
    }

    /// 第一个空闲槽位
    pub fn free_slot(&self) -> Option<usize> {
        self.slots.iter().position(Option::is_none)
    }

    /// 把区域放进指定的空闲槽位
    pub(crate) fn insert(&mut self, slot: usize, region: MappedRegion) -> RegionHandle {
        debug_assert!(self.slots[slot].is_none());
        self.slots[slot] = Some(region);
        RegionHandle(slot)
    }

    /// 查找包含 `va` 的有效区域（线性扫描）
    pub fn find(&self, va: Vaddr) -> Option<RegionHandle> {
        self.slots
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|r| r.contains(va)))
            .map(RegionHandle)
    }

    /// 通过句柄访问区域；槽位已失效时返回 None
    pub fn get(&self, handle: RegionHandle) -> Option<&MappedRegion> {
        self.slots.get(handle.0)?.as_ref()
    }

    /// 解除映射后更新区域描述符
    ///
    /// - 整个区域：清空槽位，释放文件引用；
    /// - 前缀：起始地址和文件偏移前移，长度减少；
    /// - 后缀：长度减少。
    ///
    /// `length` 按页向上取整，并截断到区域末尾。
    pub fn shrink_or_destroy(
        &mut self,
        handle: RegionHandle,
        start: Vaddr,
        length: usize,
    ) -> MmResult<UnmapKind> {
        let slot = self
            .slots
            .get_mut(handle.0)
            .ok_or(MmError::InvalidArgument)?;
        let region = slot.as_mut().ok_or(MmError::NotMapped)?;
        let end = Vaddr(start.as_usize().saturating_add(length));
        let end = min(end, region.page_end()).align_up_to_page();

        let kind = region.classify(start, end)?;
        match kind {
            UnmapKind::Whole => *slot = None,
            UnmapKind::Prefix => {
                let removed = end - start;
                region.start = end;
                region.len -= removed;
                region.backing.offset += removed;
            }
            UnmapKind::Suffix => region.len = start - region.start,
        }
        Ok(kind)
    }

    /// 遍历所有有效区域
    pub fn iter(&self) -> impl Iterator<Item = (RegionHandle, &MappedRegion)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(i, slot)| slot.as_ref().map(|r| (RegionHandle(i), r)))
    }

    /// 有效区域个数
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    /// 是否没有任何有效区域
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 直接移除区域，不做任何页表操作
    pub(crate) fn remove(&mut self, handle: RegionHandle) -> Option<MappedRegion> {
        self.slots.get_mut(handle.0)?.take()
    }
}

impl Default for RegionTable {
    fn default() -> Self {
        Self::new()
    }
}
