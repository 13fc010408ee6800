//! 查询参数模型

use serde::Deserialize;

/// 可视化请求的原始查询参数
///
/// 页面表单、JSON 接口、图表和下载接口共用同一组参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct VisualizeQuery {
    /// 逗号分隔的代码列表
    pub codes: Option<String>,
    /// 开始日期（YYYY-MM-DD 或 YYYYMMDD）
    pub start_date: Option<String>,
    /// 结束日期（YYYY-MM-DD 或 YYYYMMDD）
    pub end_date: Option<String>,
    /// 是否标准化（首日=100）
    pub normalize: Option<String>,
    /// 复权方式：qfq / hfq / none
    pub adjust: Option<String>,
    /// 图表区间：1m / 3m / 6m / 1y / all
    pub range: Option<String>,
    /// 浏览器无法携带 Authorization 头时使用
    pub api_key: Option<String>,
}

impl VisualizeQuery {
    /// 复选框提交 `on`，接口调用方习惯 `true` / `1`
    pub fn normalize_enabled(&self) -> bool {
        matches!(
            self.normalize.as_deref().map(|s| s.trim().to_lowercase()).as_deref(),
            Some("true" | "1" | "on" | "yes")
        )
    }
}
