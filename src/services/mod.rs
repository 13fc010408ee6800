//! 业务逻辑服务模块
//!
//! 行情获取、数据处理、图表渲染、下载导出和页面渲染

pub mod chart;     // SVG 图表
pub mod dashboard; // HTML 页面
pub mod export;    // 数据下载
pub mod market;    // 行情数据获取
pub mod processor; // 标准化与统计
pub mod report;    // 请求校验与报告组装
