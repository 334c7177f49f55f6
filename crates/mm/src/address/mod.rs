//! 地址模块
//!
//! 此模块提供物理地址、虚拟地址以及页码的抽象。
//!
//! # 地址类型
//!
//! - [`Paddr`] - 物理地址
//! - [`Vaddr`] - 虚拟地址
//!
//! # 页码
//!
//! - [`PageNum`] - 表示页码的 Trait
//! - [`Ppn`] - 物理页码（Physical Page Number）
//! - [`Vpn`] - 虚拟页码（Virtual Page Number）
//! - [`VpnRange`] - 虚拟页码的半开区间
//!
//! # 操作
//!
//! - [`UsizeConvert`] - 在类型和 usize 之间进行转换
//! - [`AlignOps`] - 页对齐操作
pub mod operations;
pub mod page_num;
pub mod types;

pub use operations::{AlignOps, UsizeConvert, checked_page_round_up, page_round_up};
pub use page_num::{PageNum, Ppn, Vpn, VpnRange};
pub use types::{Paddr, Vaddr};
