//! 统计分析模型
//!
//! 统计摘要、多代码比较和表格展示行

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::DataSource;

/// 单只代码的统计摘要
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryStats {
    pub code: String,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub start_price: f64,
    pub end_price: f64,
    /// 区间总收益率（%）
    pub total_return_pct: f64,
    pub max_price: f64,
    pub min_price: f64,
    pub avg_volume: f64,
    /// 年化波动率（%），少于两条记录时为空
    pub volatility_annual_pct: Option<f64>,
    pub sharpe_ratio: Option<f64>,
}

/// 数据概况：代码数、数据点总数、时间跨度和数据源数
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataInfo {
    pub symbols: usize,
    pub data_points: usize,
    pub span_days: i64,
    pub data_sources: usize,
}

/// 多代码比较表的一行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonRow {
    #[serde(rename = "代码 | Code")]
    pub code: String,
    #[serde(rename = "名称 | Name")]
    pub name: String,
    #[serde(rename = "起始价格 | Start Price")]
    pub start_price: f64,
    #[serde(rename = "结束价格 | End Price")]
    pub end_price: f64,
    #[serde(rename = "总收益率 (%) | Total Return (%)")]
    pub total_return_pct: f64,
    #[serde(rename = "最高价 | Max Price")]
    pub max_price: f64,
    #[serde(rename = "最低价 | Min Price")]
    pub min_price: f64,
    #[serde(rename = "年化波动率 (%) | Annual Volatility (%)")]
    pub volatility_annual_pct: f64,
    #[serde(rename = "数据点数 | Data Points")]
    pub data_points: usize,
}

/// 数据表展示行
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayRow {
    pub date: NaiveDate,
    pub code: String,
    pub name: String,
    pub data_source: DataSource,
    pub close: f64,
    pub pct_change: Option<f64>,
}

/// 数据表列名
pub mod labels {
    pub const DATE: &str = "日期 | Date";
    pub const CODE: &str = "代码 | Code";
    pub const NAME: &str = "名称 | Name";
    pub const DATA_SOURCE: &str = "数据源 | Data Source";
    pub const CLOSE: &str = "收盘价 | Close";
    pub const CLOSE_NORMALIZED: &str = "标准化价格 | Normalized Price";
    pub const PCT_CHANGE: &str = "涨跌幅(%) | Change(%)";

    /// 数据表表头，收盘价列随是否标准化变化
    pub fn display_headers(normalized: bool) -> [&'static str; 6] {
        [
            DATE,
            CODE,
            NAME,
            DATA_SOURCE,
            if normalized { CLOSE_NORMALIZED } else { CLOSE },
            PCT_CHANGE,
        ]
    }
}
