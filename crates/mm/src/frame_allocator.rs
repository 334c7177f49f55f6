//! 物理页分配器
//!
//! ## 分配策略（分桶空闲链表）
//!
//! 空闲页被分到 [`FREE_LIST_BUCKETS`] 个桶里，每个桶是一条侵入式单链表：
//! 链表指针直接写在空闲页自身的开头，不额外占用内存。每个桶有自己的自旋锁，
//! 多个 CPU 同时分配、释放时只在同一个桶上竞争。
//!
//! - **释放**：桶号由物理页号对桶数取模决定，与谁释放无关，页的“归属桶”固定。
//! - **分配**：从调用者给的提示（通常是当前 CPU 编号）对应的桶开始，
//!   依次尝试 `hint, hint+1, ..., hint+B-1 (mod B)`，每个桶只在弹出时持锁。
//!   只要任何一个桶里还有页，分配就不会失败。
//!
//! ## 填充字节
//!
//! 分出去的页被填成 [`ALLOC_JUNK`]，释放回来的页被填成 [`FREE_JUNK`]
//! （开头被链表指针覆盖的几个字节除外），使用未初始化内存或释放后使用
//! 都会读到明显的垃圾值。
//!
//! ## 页的所有权
//!
//! [`PhysPage`] 是不可复制的令牌，任何时刻一个物理页只有一个所有者：
//! 分配器、某个页表项，或者持有令牌的代码。它没有实现 `Drop`，
//! 忘记归还只会泄漏，不会重复释放。

use crate::address::{AlignOps, Paddr, PageNum, Ppn, UsizeConvert};
use crate::config::{ALLOC_JUNK, FREE_JUNK, FREE_LIST_BUCKETS, PAGE_SHIFT, PAGE_SIZE};
use core::ptr::NonNull;
use core::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use sync::SpinLock;

// ============================================================================
// PhysPage - 物理页令牌
// ============================================================================

/// 一个已分配物理页的所有权令牌
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a PhysPage leaks the page; return it with PageAllocator::free"]
pub struct PhysPage(Paddr);

impl PhysPage {
    /// 物理页码
    pub fn ppn(&self) -> Ppn {
        Ppn::from_addr_floor(self.0)
    }

    /// 物理地址
    pub fn paddr(&self) -> Paddr {
        self.0
    }

    /// 通过直接映射区访问页内容
    pub fn as_bytes(&self) -> &[u8] {
        // SAFETY: 持有令牌即独占该页
        unsafe { page_bytes(self.ppn()) }
    }

    /// 通过直接映射区修改页内容
    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        // SAFETY: 持有令牌即独占该页
        unsafe { page_bytes(self.ppn()) }
    }

    /// 将整页清零
    pub fn zero(&mut self) {
        self.as_bytes_mut().fill(0);
    }

    /// 放弃令牌，把页的所有权交给页表项
    #[must_use]
    pub fn into_ppn(self) -> Ppn {
        self.ppn()
    }

    /// 从页表项收回页的所有权
    ///
    /// # Safety
    /// 调用者必须保证该页此前由 [`PhysPage::into_ppn`] 交出，且没有其它所有者。
    pub unsafe fn from_ppn(ppn: Ppn) -> Self {
        PhysPage(ppn.start_addr())
    }

    /// 用任意物理地址构造令牌
    ///
    /// # Safety
    /// 调用者必须独占该地址处的页；地址是否合法由 [`PageAllocator::free`] 检查。
    pub unsafe fn from_paddr(paddr: Paddr) -> Self {
        PhysPage(paddr)
    }
}

/// 通过直接映射区得到一个物理页的字节切片
///
/// # Safety
/// 调用者必须保证在返回切片存活期间没有其它对该页的访问。
pub(crate) unsafe fn page_bytes<'a>(ppn: Ppn) -> &'a mut [u8] {
    let va = ppn.start_addr().to_vaddr();
    unsafe { core::slice::from_raw_parts_mut(va.as_mut_ptr::<u8>(), PAGE_SIZE) }
}

// ============================================================================
// FreeList - 侵入式空闲链表
// ============================================================================

/// 写在空闲页开头的链表节点
struct FreePage {
    next: Option<NonNull<FreePage>>,
}

struct FreeList {
    head: Option<NonNull<FreePage>>,
    len: usize,
}

// SAFETY: 节点位于链表独占的空闲页中，只在持有桶锁时访问
unsafe impl Send for FreeList {}

impl FreeList {
    const fn new() -> Self {
        Self { head: None, len: 0 }
    }

    /// # Safety
    /// 页必须空闲且不在任何链表中
    unsafe fn push(&mut self, paddr: Paddr) {
        let node = paddr.to_vaddr().as_mut_ptr::<FreePage>();
        // SAFETY: 页已空闲，直接映射区地址按页对齐
        unsafe { node.write(FreePage { next: self.head }) };
        self.head = NonNull::new(node);
        self.len += 1;
    }

    fn pop(&mut self) -> Option<Paddr> {
        let node = self.head?;
        // SAFETY: node 由 push 写入，持锁期间链表不会被修改
        self.head = unsafe { node.as_ref().next };
        self.len -= 1;
        // SAFETY: node 指向直接映射区
        Some(unsafe { crate::address::Vaddr(node.as_ptr() as usize).to_paddr() })
    }
}

// ============================================================================
// PageAllocator
// ============================================================================

/// 分配器统计信息
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    /// 受管理的总页数
    pub total_pages: usize,
    /// 当前空闲页数
    pub free_pages: usize,
    /// 每个桶的空闲页数
    pub bucket_free: [usize; FREE_LIST_BUCKETS],
}

/// 分桶的物理页分配器
pub struct PageAllocator {
    buckets: [SpinLock<FreeList>; FREE_LIST_BUCKETS],
    /// 受管理范围 `[start, end)` 的物理地址
    start: AtomicUsize,
    end: AtomicUsize,
    total: AtomicUsize,
    initialized: AtomicBool,
}

impl PageAllocator {
    /// 创建一个空的分配器；调用 [`PageAllocator::init`] 之前任何分配都会失败
    pub const fn new() -> Self {
        Self {
            buckets: [const { SpinLock::new(FreeList::new()) }; FREE_LIST_BUCKETS],
            start: AtomicUsize::new(0),
            end: AtomicUsize::new(0),
            total: AtomicUsize::new(0),
            initialized: AtomicBool::new(false),
        }
    }

    /// 把 `[start, end)` 中的每个整页交给分配器
    ///
    /// `start` 向上、`end` 向下对齐到页边界。
    ///
    /// # Panics
    /// 同一个分配器初始化两次时 panic。
    pub fn init(&self, start: Paddr, end: Paddr) {
        if self.initialized.swap(true, Ordering::AcqRel) {
            panic!("page allocator initialized twice");
        }
        let start = start.align_up_to_page();
        let end = end.align_down_to_page();
        self.start.store(start.as_usize(), Ordering::Release);
        self.end.store(end.as_usize(), Ordering::Release);

        let mut pages = 0;
        let mut pa = start;
        while pa < end {
            self.release(pa);
            pa = Paddr(pa.as_usize() + PAGE_SIZE);
            pages += 1;
        }
        self.total.store(pages, Ordering::Release);
        log::debug!(
            "page allocator: {} pages in [{:#x}, {:#x})",
            pages,
            start.as_usize(),
            end.as_usize()
        );
    }

    /// 分配一页，以当前 CPU 编号作为起始桶
    pub fn alloc(&self) -> Option<PhysPage> {
        self.alloc_with_hint(sync::current_cpu_id())
    }

    /// 分配一页，从 `hint % B` 号桶开始依次尝试所有桶
    ///
    /// 所有桶都为空时返回 None，不会等待或重试。
    pub fn alloc_with_hint(&self, hint: usize) -> Option<PhysPage> {
        let first = hint % FREE_LIST_BUCKETS;
        for i in 0..FREE_LIST_BUCKETS {
            let idx = (first + i) % FREE_LIST_BUCKETS;
            let popped = self.buckets[idx].lock().pop();
            if let Some(paddr) = popped {
                let mut page = PhysPage(paddr);
                page.as_bytes_mut().fill(ALLOC_JUNK);
                return Some(page);
            }
        }
        None
    }

    /// 归还一页
    ///
    /// # Panics
    /// 页未对齐，或不在 `init` 给定的范围内时 panic。
    pub fn free(&self, page: PhysPage) {
        self.release(page.0);
    }

    fn release(&self, pa: Paddr) {
        let start = self.start.load(Ordering::Acquire);
        let end = self.end.load(Ordering::Acquire);
        if !pa.is_page_aligned() || pa.as_usize() < start || pa.as_usize() >= end {
            panic!(
                "free_page: bad page {:#x} (managed range [{:#x}, {:#x}))",
                pa.as_usize(),
                start,
                end
            );
        }

        // SAFETY: 调用者交出了该页的所有权
        unsafe { page_bytes(Ppn::from_addr_floor(pa)) }.fill(FREE_JUNK);

        let mut list = self.buckets[Self::bucket_of(pa)].lock();
        // SAFETY: 页已校验且不再有其它所有者
        unsafe { list.push(pa) };
    }

    /// 页的归属桶
    pub fn bucket_of(pa: Paddr) -> usize {
        (pa.as_usize() >> PAGE_SHIFT) % FREE_LIST_BUCKETS
    }

    /// 受管理的总页数
    pub fn total_pages(&self) -> usize {
        self.total.load(Ordering::Acquire)
    }

    /// 当前空闲页数
    pub fn free_pages(&self) -> usize {
        self.buckets.iter().map(|b| b.lock().len).sum()
    }

    /// 当前已分配出去的页数
    pub fn allocated_pages(&self) -> usize {
        self.total_pages().saturating_sub(self.free_pages())
    }

    /// 统计信息快照；各桶分别加锁，结果不是原子快照
    pub fn stats(&self) -> AllocatorStats {
        let mut bucket_free = [0; FREE_LIST_BUCKETS];
        for (slot, bucket) in bucket_free.iter_mut().zip(self.buckets.iter()) {
            *slot = bucket.lock().len;
        }
        AllocatorStats {
            total_pages: self.total_pages(),
            free_pages: bucket_free.iter().sum(),
            bucket_free,
        }
    }
}

impl Default for PageAllocator {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// 全局分配器
// ============================================================================

static PAGE_ALLOCATOR: PageAllocator = PageAllocator::new();

/// 用内核镜像结束地址到物理内存上界之间的内存初始化全局分配器
pub fn init_page_allocator(kernel_end: usize) {
    PAGE_ALLOCATOR.init(Paddr(kernel_end), Paddr(crate::mm_config().memory_end()));
}

/// 全局分配器
pub fn page_allocator() -> &'static PageAllocator {
    &PAGE_ALLOCATOR
}

/// 从全局分配器分配一页
pub fn alloc_page() -> Option<PhysPage> {
    PAGE_ALLOCATOR.alloc()
}

/// 向全局分配器归还一页
pub fn free_page(page: PhysPage) {
    PAGE_ALLOCATOR.free(page);
}

/// 全局分配器的统计信息
pub fn get_stats() -> AllocatorStats {
    PAGE_ALLOCATOR.stats()
}
