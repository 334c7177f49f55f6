//! mm 的单元测试
//!
//! 使用宿主机上的 `cargo test` 运行。物理内存是一块按页对齐的宿主机内存，
//! 物理地址与内核虚拟地址恒等映射（见 `test_support::mock::mm`）；
//! 页表和被映射的文件由本模块中的 mock 实现。


use crate::address::{AlignOps, Paddr, PageNum, UsizeConvert, Vaddr, Vpn};
use crate::config::PAGE_SIZE;
use crate::file::{MmFile, MmInode};
use crate::frame_allocator::PageAllocator;
use crate::memory_space::MemorySpace;
use crate::page_table::{PageTableEntry, PageTableInner, PagingError, PagingResult, UniversalPTEFlag};
use crate::{Ppn, MmError};
use alloc::{collections::BTreeMap, sync::Arc, vec::Vec};
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::alloc::{Layout, alloc_zeroed, dealloc};
use std::sync::{Mutex, Once};

extern crate test_support;

// ---------------------------------------------------------------------------
// sync 的架构钩子
// ---------------------------------------------------------------------------

struct HostArch;

impl sync::ArchOps for HostArch {
    unsafe fn read_and_disable_interrupts(&self) -> usize {
        unsafe { test_support::mock::arch::MOCK_ARCH_OPS.read_and_disable_interrupts() }
    }

    unsafe fn restore_interrupts(&self, flags: usize) {
        unsafe { test_support::mock::arch::MOCK_ARCH_OPS.restore_interrupts(flags) }
    }

    fn sstatus_sie(&self) -> usize {
        test_support::mock::arch::MOCK_ARCH_OPS.sstatus_sie()
    }

    fn cpu_id(&self) -> usize {
        test_support::mock::arch::MOCK_ARCH_OPS.cpu_id()
    }
}

static HOST_ARCH: HostArch = HostArch;
static REGISTER: Once = Once::new();

/// 每个测试开头调用
pub(super) fn setup() {
    // SAFETY: Once 保证只注册一次
    REGISTER.call_once(|| unsafe { sync::register_arch_ops(&HOST_ARCH) });
}

// ---------------------------------------------------------------------------
// 物理内存
// ---------------------------------------------------------------------------

/// 一块按页对齐的宿主机内存，充当物理内存
pub(super) struct PhysArena {
    base: *mut u8,
    layout: Layout,
}

impl PhysArena {
    pub(super) fn new(pages: usize) -> Self {
        let layout = Layout::from_size_align(pages * PAGE_SIZE, PAGE_SIZE).unwrap();
        // SAFETY: layout 大小非零
        let base = unsafe { alloc_zeroed(layout) };
        assert!(!base.is_null());
        Self { base, layout }
    }

    pub(super) fn start(&self) -> Paddr {
        Paddr(self.base as usize)
    }

    pub(super) fn end(&self) -> Paddr {
        Paddr(self.base as usize + self.layout.size())
    }
}

impl Drop for PhysArena {
    fn drop(&mut self) {
        // SAFETY: base 由 alloc_zeroed 以同一个 layout 分配
        unsafe { dealloc(self.base, self.layout) };
    }
}

/// 准备一块 `pages` 页的物理内存及管理它的分配器
pub(super) fn allocator_with(pages: usize) -> (PhysArena, PageAllocator) {
    setup();
    let arena = PhysArena::new(pages);
    let allocator = PageAllocator::new();
    allocator.init(arena.start(), arena.end());
    (arena, allocator)
}

/// 直接读取物理内存（恒等映射）
pub(super) fn read_phys(pa: Paddr, len: usize) -> Vec<u8> {
    // SAFETY: 测试只读取 PhysArena 内的地址
    unsafe { core::slice::from_raw_parts(pa.as_usize() as *const u8, len) }.to_vec()
}

// ---------------------------------------------------------------------------
// 页表
// ---------------------------------------------------------------------------

/// 用 BTreeMap 模拟的单级页表
#[derive(Default)]
pub(super) struct MockPageTable {
    entries: BTreeMap<Vpn, PageTableEntry>,
    /// 在该页上的 map 调用返回 OutOfMemory
    pub(super) fail_map_at: Option<Vpn>,
    flushes: AtomicUsize,
}

impl PageTableInner for MockPageTable {
    fn walk(&self, vpn: Vpn) -> Option<PageTableEntry> {
        self.entries.get(&vpn).copied()
    }

    fn map(&mut self, vpn: Vpn, ppn: Ppn, flags: UniversalPTEFlag) -> PagingResult<()> {
        if self.fail_map_at == Some(vpn) {
            return Err(PagingError::OutOfMemory);
        }
        if self.entries.contains_key(&vpn) {
            return Err(PagingError::AlreadyMapped);
        }
        self.entries.insert(vpn, PageTableEntry::new(ppn, flags));
        Ok(())
    }

    fn unmap(&mut self, vpn: Vpn) -> PagingResult<PageTableEntry> {
        self.entries.remove(&vpn).ok_or(PagingError::NotMapped)
    }

    fn tlb_flush(&self, _vpn: Vpn) {
        self.flushes.fetch_add(1, Ordering::Relaxed);
    }
}

impl MockPageTable {
    pub(super) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(super) fn flushes(&self) -> usize {
        self.flushes.load(Ordering::Relaxed)
    }

    /// 模拟用户态写入：页必须驻留且可写，硬件置 A/D 位
    pub(super) fn user_write(&mut self, va: Vaddr, data: &[u8]) {
        assert!(va.page_offset() + data.len() <= PAGE_SIZE);
        let vpn = Vpn::from_addr_floor(va);
        let entry = self.entries.get_mut(&vpn).expect("page not mapped");
        assert!(entry.is_present());
        assert!(entry.flags.contains(UniversalPTEFlag::WRITEABLE));
        entry.flags |= UniversalPTEFlag::ACCESSED | UniversalPTEFlag::DIRTY;
        let pa = entry.ppn.start_addr().as_usize() + va.page_offset();
        // SAFETY: 页位于 PhysArena 内
        unsafe { core::slice::from_raw_parts_mut(pa as *mut u8, data.len()) }.copy_from_slice(data);
    }

    /// 模拟用户态读取一页内的数据
    pub(super) fn user_read(&self, va: Vaddr, len: usize) -> Vec<u8> {
        assert!(va.page_offset() + len <= PAGE_SIZE);
        let entry = self.walk(Vpn::from_addr_floor(va)).expect("page not mapped");
        assert!(entry.is_present());
        read_phys(Paddr(entry.ppn.start_addr().as_usize() + va.page_offset()), len)
    }
}

// ---------------------------------------------------------------------------
// 文件
// ---------------------------------------------------------------------------

/// 内存中的 inode，检查加锁和事务的使用方式
#[derive(Default)]
pub(super) struct MockInode {
    pub(super) data: Mutex<Vec<u8>>,
    locked: AtomicBool,
    in_op: AtomicBool,
    pub(super) lock_count: AtomicUsize,
    pub(super) op_count: AtomicUsize,
    pub(super) write_count: AtomicUsize,
    pub(super) fail_reads: AtomicBool,
    pub(super) fail_writes: AtomicBool,
}

impl MockInode {
    pub(super) fn contents(&self) -> Vec<u8> {
        self.data.lock().unwrap().clone()
    }
}

impl MmInode for MockInode {
    fn read_at(&self, offset: usize, buf: &mut [u8]) -> Result<usize, isize> {
        assert!(self.locked.load(Ordering::SeqCst), "read without inode lock");
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(-5);
        }
        let data = self.data.lock().unwrap();
        if offset >= data.len() {
            return Ok(0);
        }
        let n = buf.len().min(data.len() - offset);
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        Ok(n)
    }

    fn write_at(&self, offset: usize, buf: &[u8]) -> Result<usize, isize> {
        assert!(self.locked.load(Ordering::SeqCst), "write without inode lock");
        assert!(self.in_op.load(Ordering::SeqCst), "write outside a transaction");
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(-5);
        }
        let mut data = self.data.lock().unwrap();
        if data.len() < offset + buf.len() {
            data.resize(offset + buf.len(), 0);
        }
        data[offset..offset + buf.len()].copy_from_slice(buf);
        self.write_count.fetch_add(1, Ordering::SeqCst);
        Ok(buf.len())
    }

    fn lock(&self) {
        assert!(!self.locked.swap(true, Ordering::SeqCst), "inode lock is not reentrant");
        self.lock_count.fetch_add(1, Ordering::SeqCst);
    }

    fn unlock(&self) {
        assert!(self.locked.swap(false, Ordering::SeqCst), "unlock without lock");
    }

    fn begin_op(&self) {
        assert!(!self.in_op.swap(true, Ordering::SeqCst), "nested transaction");
        self.op_count.fetch_add(1, Ordering::SeqCst);
    }

    fn end_op(&self) {
        assert!(self.in_op.swap(false, Ordering::SeqCst), "end_op without begin_op");
    }
}

pub(super) struct MockFile {
    inode: Arc<MockInode>,
    writable: bool,
}

impl MmFile for MockFile {
    fn inode(&self) -> Result<Arc<dyn MmInode>, isize> {
        let inode: Arc<dyn MmInode> = self.inode.clone();
        Ok(inode)
    }

    fn writable(&self) -> bool {
        self.writable
    }
}

/// 创建内容为 `data` 的文件，同时返回 inode 以便检查
pub(super) fn mock_file(data: Vec<u8>, writable: bool) -> (Arc<MockInode>, Arc<dyn MmFile>) {
    let inode = Arc::new(MockInode {
        data: Mutex::new(data),
        ..Default::default()
    });
    let file: Arc<dyn MmFile> = Arc::new(MockFile {
        inode: inode.clone(),
        writable,
    });
    (inode, file)
}

/// 每个字节等于 (偏移 / 页大小) 的 `pages` 页文件内容，便于核对偏移
pub(super) fn paged_content(pages: usize) -> Vec<u8> {
    (0..pages * PAGE_SIZE).map(|i| (i / PAGE_SIZE) as u8 + 1).collect()
}

/// 使用 mock 配置中 mmap 窗口的空地址空间
pub(super) fn empty_space() -> MemorySpace<MockPageTable> {
    MemorySpace::new(MockPageTable::default())
}

/// 地址 `va` 所在页的页表项
pub(super) fn entry_at(space: &MemorySpace<MockPageTable>, va: Vaddr) -> Option<PageTableEntry> {
    space.page_table().walk(Vpn::from_addr_floor(va))
}

pub(super) fn is_lazy(space: &MemorySpace<MockPageTable>, va: Vaddr) -> bool {
    entry_at(space, va).is_some_and(|e| e.is_lazy())
}

/// mock 配置中 mmap 窗口的起点
pub(super) fn mmap_base() -> Vaddr {
    Vaddr(crate::mm_config().mmap_base()).align_up_to_page()
}

pub(super) fn assert_err<T: core::fmt::Debug>(r: Result<T, MmError>, expected: MmError) {
    assert_eq!(r.unwrap_err(), expected);
}
