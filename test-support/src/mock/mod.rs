//! Mock 实现模块
//!
//! 提供架构和内存管理钩子的 Mock 实现，用于宿主机上的单元测试

pub mod arch;
pub mod mm;
