//! 通用工具
//!
//! 代码校验、数值格式化和北京时间

pub mod formatters;
pub mod time;
pub mod validators;
