//! 错误码定义（与 Linux 保持一致）
//!
//! 系统调用以 `-errno` 的形式返回这些值。

pub const EPERM: isize = 1;
pub const ENOENT: isize = 2;
pub const EIO: isize = 5;
pub const EBADF: isize = 9;
pub const ENOMEM: isize = 12;
pub const EACCES: isize = 13;
pub const EFAULT: isize = 14;
pub const EINVAL: isize = 22;
