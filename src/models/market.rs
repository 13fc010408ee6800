//! 行情数据模型
//!
//! 定义日K线、数据源类别和复权方式

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 价格复权方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Adjust {
    /// 前复权
    #[default]
    #[serde(rename = "qfq")]
    Forward,
    /// 后复权
    #[serde(rename = "hfq")]
    Backward,
    /// 不复权
    #[serde(rename = "none")]
    None,
}

impl Adjust {
    pub const ALL: [Adjust; 3] = [Adjust::Forward, Adjust::Backward, Adjust::None];

    /// 查询参数中的取值
    pub fn as_str(&self) -> &'static str {
        match self {
            Adjust::Forward => "qfq",
            Adjust::Backward => "hfq",
            Adjust::None => "none",
        }
    }

    /// 下拉框显示名称
    pub fn label(&self) -> &'static str {
        match self {
            Adjust::Forward => "前复权 | Forward Adjusted",
            Adjust::Backward => "后复权 | Backward Adjusted",
            Adjust::None => "不复权 | Not Adjusted",
        }
    }
}

impl FromStr for Adjust {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "qfq" => Ok(Adjust::Forward),
            "hfq" => Ok(Adjust::Backward),
            "" | "none" => Ok(Adjust::None),
            other => Err(format!("未知的复权方式: {}", other)),
        }
    }
}

/// 数据源类别，按声明顺序依次尝试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSource {
    Stock,
    Fund,
    Index,
}

impl DataSource {
    /// 回退顺序：股票 -> 基金 -> 指数
    pub const FALLBACK_ORDER: [DataSource; 3] =
        [DataSource::Stock, DataSource::Fund, DataSource::Index];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::Stock => "stock",
            DataSource::Fund => "fund",
            DataSource::Index => "index",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 单日行情记录
///
/// 前半部分字段来自上游接口，`daily_return` 之后的字段由
/// `processor::calculate_returns` 计算填充
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceRecord {
    /// 交易日期
    pub date: NaiveDate,
    /// 开盘价
    pub open: f64,
    /// 收盘价
    pub close: f64,
    /// 最高价
    pub high: f64,
    /// 最低价
    pub low: f64,
    /// 成交量（手）
    pub volume: f64,
    /// 成交额
    pub amount: Option<f64>,
    /// 振幅（%）
    pub amplitude: Option<f64>,
    /// 涨跌幅（%）
    pub pct_change: Option<f64>,
    /// 涨跌额
    pub price_change: Option<f64>,
    /// 换手率（%）
    pub turnover: Option<f64>,
    /// 日收益率
    #[serde(default)]
    pub daily_return: Option<f64>,
    /// 累计收益率
    #[serde(default)]
    pub cumulative_return: Option<f64>,
    /// 20 日年化波动率
    #[serde(default)]
    pub volatility_20d: Option<f64>,
}

impl PriceRecord {
    /// 只含 OHLCV 的记录，其余字段为空
    pub fn ohlcv(date: NaiveDate, open: f64, close: f64, high: f64, low: f64, volume: f64) -> Self {
        Self {
            date,
            open,
            close,
            high,
            low,
            volume,
            amount: None,
            amplitude: None,
            pct_change: None,
            price_change: None,
            turnover: None,
            daily_return: None,
            cumulative_return: None,
            volatility_20d: None,
        }
    }
}

/// 单只代码的时间序列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolSeries {
    /// 6 位代码
    pub code: String,
    /// 名称（取不到时等于代码）
    pub name: String,
    /// 命中的数据源类别
    pub data_source: DataSource,
    /// 按日期升序排列的记录
    pub records: Vec<PriceRecord>,
}

impl SymbolSeries {
    /// 图例文本，形如 `600000 · 浦发银行`
    pub fn display_name(&self) -> String {
        format!("{} · {}", self.code, self.name)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.records.first().map(|r| r.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.records.last().map(|r| r.date)
    }
}

/// 单只代码获取失败的原因
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FetchFailure {
    pub code: String,
    pub message: String,
}

/// 批量获取结果，成功和失败分别按输入顺序排列
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchFetch {
    pub series: Vec<SymbolSeries>,
    pub failures: Vec<FetchFailure>,
}

impl BatchFetch {
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adjust_parse() {
        assert_eq!("qfq".parse::<Adjust>().unwrap(), Adjust::Forward);
        assert_eq!("HFQ".parse::<Adjust>().unwrap(), Adjust::Backward);
        assert_eq!("".parse::<Adjust>().unwrap(), Adjust::None);
        assert_eq!("none".parse::<Adjust>().unwrap(), Adjust::None);
        assert!("weekly".parse::<Adjust>().is_err());
    }

    #[test]
    fn test_data_source_serde() {
        let json = serde_json::to_string(&DataSource::Fund).unwrap();
        assert_eq!(json, "\"fund\"");
        assert_eq!(DataSource::FALLBACK_ORDER[0], DataSource::Stock);
        assert_eq!(DataSource::FALLBACK_ORDER[2], DataSource::Index);
    }
}
