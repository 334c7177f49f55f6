//! 与用户空间共用定义和声明
//!
//! 包含 mmap/munmap 使用的常量和错误码，确保内核和用户空间的一致性

#![no_std]
// uapi 中包含与 Linux 兼容的常量定义；逐项补 `///` 噪声较大。
#![allow(missing_docs)]

pub mod errno;
pub mod mm;
