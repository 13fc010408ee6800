//! 行情数据获取
//!
//! ## 结构
//! - `HistorySource`：上游历史行情接口的抽象
//! - `EastmoneyClient`：东方财富日K线实现（股票、ETF 基金、指数）
//! - `MarketDataFetcher`：数据源回退、TTL 缓存和有界并发批量获取

mod cache;
mod eastmoney;
mod fetcher;

use anyhow::Result;
use chrono::NaiveDate;
use futures::future::BoxFuture;

use crate::models::{Adjust, DataSource, PriceRecord};

pub use cache::SeriesCache;
pub use eastmoney::EastmoneyClient;
pub use fetcher::{FetchError, MarketDataFetcher};

/// 单次历史行情请求
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HistoryRequest {
    pub code: String,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub adjust: Adjust,
}

/// 上游返回的原始数据
///
/// `records` 为空表示该类别下没有这个代码
#[derive(Debug, Clone, Default)]
pub struct RawHistory {
    pub name: Option<String>,
    pub records: Vec<PriceRecord>,
}

/// 历史行情数据源
pub trait HistorySource: Send + Sync {
    /// 按类别获取一个代码的日K线
    fn fetch_history<'a>(
        &'a self,
        category: DataSource,
        request: &'a HistoryRequest,
    ) -> BoxFuture<'a, Result<RawHistory>>;
}
