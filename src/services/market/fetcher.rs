//! 多数据源行情获取
//!
//! 单只代码依次尝试 股票 -> 基金 -> 指数，多只代码以有界并发获取，
//! 单只失败不影响其余代码

use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

use super::{HistoryRequest, HistorySource, RawHistory, SeriesCache};
use crate::config::DataConfig;
use crate::models::{Adjust, BatchFetch, DataSource, FetchFailure, SymbolSeries};
use crate::utils::validators::validate_stock_code;

/// 单只代码的获取错误
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("无效的代码格式: {0} | Invalid code format: {0}")]
    InvalidCode(String),
    #[error("未找到 {code} 的数据 | No data found for {code}: {details}")]
    NotFound { code: String, details: String },
    #[error("获取 {0} 超时 | Timed out fetching {0}")]
    Timeout(String),
}

/// 行情获取服务
pub struct MarketDataFetcher {
    /// 上游数据源
    source: Arc<dyn HistorySource>,
    /// 结果缓存
    cache: SeriesCache,
    /// 批量获取的最大并发数
    max_workers: usize,
    /// 单只代码（含全部回退）的超时
    fetch_timeout: Duration,
}

impl MarketDataFetcher {
    pub fn new(source: Arc<dyn HistorySource>, config: &DataConfig) -> Self {
        Self {
            source,
            cache: SeriesCache::new(Duration::from_secs(config.cache_ttl_secs)),
            max_workers: config.max_workers.max(1),
            fetch_timeout: Duration::from_secs(config.fetch_timeout_secs),
        }
    }

    /// 获取单只代码的日K线
    ///
    /// 按 `DataSource::FALLBACK_ORDER` 尝试，第一个非空结果即为命中
    pub async fn fetch_single(
        &self,
        code: &str,
        start: NaiveDate,
        end: NaiveDate,
        adjust: Adjust,
    ) -> Result<Arc<SymbolSeries>, FetchError> {
        if !validate_stock_code(code) {
            log::warn!("无效的代码格式: {}", code);
            return Err(FetchError::InvalidCode(code.to_string()));
        }

        let request = HistoryRequest {
            code: code.trim().to_string(),
            start,
            end,
            adjust,
        };

        if let Some(series) = self.cache.get(&request) {
            log::debug!("缓存命中: {}", request.code);
            return Ok(series);
        }

        let mut errors = Vec::new();

        for category in DataSource::FALLBACK_ORDER {
            match self.source.fetch_history(category, &request).await {
                Ok(raw) => {
                    let series = standardize(&request, raw, category);
                    if series.records.is_empty() {
                        errors.push(format!("{} data source returned no rows", category));
                        continue;
                    }

                    log::info!(
                        "{} 获取成功: {} ({} 条, 数据源 {})",
                        series.code,
                        series.name,
                        series.records.len(),
                        category
                    );
                    let series = Arc::new(series);
                    self.cache.insert(request, Arc::clone(&series));
                    log::debug!("缓存条目数: {}", self.cache.len());
                    return Ok(series);
                }
                Err(e) => {
                    let message = format!("{} data source error: {}", category, e);
                    log::warn!("{}: {}", request.code, message);
                    errors.push(message);
                }
            }
        }

        let details = errors.join("; ");
        log::error!("所有数据源均失败 {}: {}", request.code, details);
        Err(FetchError::NotFound {
            code: request.code,
            details,
        })
    }

    /// 并发获取多只代码
    ///
    /// 并发数为 `min(max_workers, codes.len())`，每只代码单独计时，
    /// 结果和失败都按输入顺序返回
    pub async fn fetch_multiple(
        &self,
        codes: &[String],
        start: NaiveDate,
        end: NaiveDate,
        adjust: Adjust,
    ) -> BatchFetch {
        let total = codes.len();
        let workers = self.max_workers.min(total).max(1);

        let tasks = stream::iter(codes.iter().enumerate())
            .map(|(idx, code)| async move {
                let result = match timeout(
                    self.fetch_timeout,
                    self.fetch_single(code, start, end, adjust),
                )
                .await
                {
                    Ok(result) => result,
                    Err(_) => Err(FetchError::Timeout(code.clone())),
                };
                (idx, code.clone(), result)
            })
            .buffer_unordered(workers);
        futures::pin_mut!(tasks);

        let mut outcomes = Vec::with_capacity(total);
        while let Some(outcome) = tasks.next().await {
            outcomes.push(outcome);
            log::debug!("Fetching data: {}/{} completed", outcomes.len(), total);
        }
        outcomes.sort_by_key(|(idx, _, _)| *idx);

        let mut batch = BatchFetch::default();
        for (_, code, result) in outcomes {
            match result {
                Ok(series) => batch.series.push((*series).clone()),
                Err(e) => {
                    log::error!("Error processing {}: {}", code, e);
                    batch.failures.push(FetchFailure {
                        code,
                        message: e.to_string(),
                    });
                }
            }
        }

        if !batch.is_empty() {
            let sources = batch
                .series
                .iter()
                .map(|s| format!("{}: {}", s.code, s.data_source))
                .collect::<Vec<_>>()
                .join(", ");
            log::info!("Data sources used: {}", sources);
        }

        batch
    }
}

/// 统一记录格式：按日期升序、去重、裁剪到请求范围，名称缺省为代码
fn standardize(request: &HistoryRequest, raw: RawHistory, category: DataSource) -> SymbolSeries {
    let mut records = raw.records;
    records.retain(|r| r.date >= request.start && r.date <= request.end);
    records.sort_by_key(|r| r.date);
    records.dedup_by_key(|r| r.date);

    SymbolSeries {
        code: request.code.clone(),
        name: raw.name.unwrap_or_else(|| request.code.clone()),
        data_source: category,
        records,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PriceRecord;
    use anyhow::anyhow;
    use futures::future::BoxFuture;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Canned = Result<RawHistory, String>;

    /// 按 (类别, 代码) 返回预设结果的数据源
    #[derive(Default)]
    struct FakeSource {
        responses: HashMap<(DataSource, String), Canned>,
        delays: HashMap<String, Duration>,
        calls: AtomicUsize,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl FakeSource {
        fn with(mut self, category: DataSource, code: &str, response: Canned) -> Self {
            self.responses.insert((category, code.to_string()), response);
            self
        }

        fn delay(mut self, code: &str, delay: Duration) -> Self {
            self.delays.insert(code.to_string(), delay);
            self
        }
    }

    impl HistorySource for FakeSource {
        fn fetch_history<'a>(
            &'a self,
            category: DataSource,
            request: &'a HistoryRequest,
        ) -> BoxFuture<'a, anyhow::Result<RawHistory>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.max_in_flight.fetch_max(now, Ordering::SeqCst);

                if let Some(delay) = self.delays.get(&request.code) {
                    tokio::time::sleep(*delay).await;
                }
                self.in_flight.fetch_sub(1, Ordering::SeqCst);

                match self.responses.get(&(category, request.code.clone())) {
                    Some(Ok(raw)) => Ok(raw.clone()),
                    Some(Err(e)) => Err(anyhow!(e.clone())),
                    None => Ok(RawHistory::default()),
                }
            })
        }
    }

    fn date(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2023, m, d).unwrap()
    }

    fn raw(name: &str, days: &[(u32, u32, f64)]) -> Canned {
        Ok(RawHistory {
            name: Some(name.to_string()),
            records: days
                .iter()
                .map(|&(m, d, close)| PriceRecord::ohlcv(date(m, d), close, close, close, close, 1000.0))
                .collect(),
        })
    }

    fn fetcher(source: FakeSource, max_workers: usize, timeout_secs: u64) -> (MarketDataFetcher, Arc<FakeSource>) {
        let source = Arc::new(source);
        let config = DataConfig {
            max_workers,
            fetch_timeout_secs: timeout_secs,
            ..DataConfig::default()
        };
        (MarketDataFetcher::new(source.clone(), &config), source)
    }

    #[tokio::test]
    async fn test_invalid_code_rejected() {
        let (fetcher, source) = fetcher(FakeSource::default(), 4, 5);
        let result = fetcher.fetch_single("60000X", date(1, 1), date(6, 30), Adjust::Forward).await;

        assert!(matches!(result, Err(FetchError::InvalidCode(_))));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_falls_back_to_next_category() {
        let source = FakeSource::default()
            .with(DataSource::Stock, "000300", Err("connection reset".to_string()))
            .with(DataSource::Index, "000300", raw("沪深300", &[(1, 3, 3887.9), (1, 4, 3892.9)]));
        let (fetcher, _) = fetcher(source, 4, 5);

        let series = fetcher
            .fetch_single("000300", date(1, 1), date(6, 30), Adjust::Forward)
            .await
            .unwrap();

        assert_eq!(series.data_source, DataSource::Index);
        assert_eq!(series.name, "沪深300");
        assert_eq!(series.records.len(), 2);
    }

    #[tokio::test]
    async fn test_all_categories_fail() {
        let source = FakeSource::default()
            .with(DataSource::Stock, "123456", Err("stock boom".to_string()))
            .with(DataSource::Fund, "123456", Err("fund boom".to_string()));
        let (fetcher, _) = fetcher(source, 4, 5);

        let err = fetcher
            .fetch_single("123456", date(1, 1), date(6, 30), Adjust::Forward)
            .await
            .unwrap_err();

        let message = err.to_string();
        assert!(matches!(err, FetchError::NotFound { .. }));
        assert!(message.contains("stock boom"));
        assert!(message.contains("fund boom"));
        assert!(message.contains("index data source returned no rows"));
    }

    #[tokio::test]
    async fn test_standardizes_records() {
        let source = FakeSource::default().with(
            DataSource::Stock,
            "600000",
            Ok(RawHistory {
                name: None,
                records: vec![
                    PriceRecord::ohlcv(date(1, 5), 7.3, 7.3, 7.3, 7.3, 1.0),
                    PriceRecord::ohlcv(date(1, 3), 7.1, 7.1, 7.1, 7.1, 1.0),
                    PriceRecord::ohlcv(date(1, 3), 7.1, 7.1, 7.1, 7.1, 1.0),
                    PriceRecord::ohlcv(date(8, 1), 9.0, 9.0, 9.0, 9.0, 1.0),
                ],
            }),
        );
        let (fetcher, _) = fetcher(source, 4, 5);

        let series = fetcher
            .fetch_single("600000", date(1, 1), date(6, 30), Adjust::Forward)
            .await
            .unwrap();

        let dates: Vec<_> = series.records.iter().map(|r| r.date).collect();
        assert_eq!(dates, vec![date(1, 3), date(1, 5)]);
        assert_eq!(series.name, "600000");
    }

    #[tokio::test]
    async fn test_results_are_cached() {
        let source = FakeSource::default()
            .with(DataSource::Stock, "600000", raw("浦发银行", &[(1, 3, 7.2)]));
        let (fetcher, source) = fetcher(source, 4, 5);

        for _ in 0..3 {
            fetcher
                .fetch_single("600000", date(1, 1), date(6, 30), Adjust::Forward)
                .await
                .unwrap();
        }
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        fetcher
            .fetch_single("600000", date(1, 1), date(6, 30), Adjust::None)
            .await
            .unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_batch_keeps_partial_results_in_order() {
        let source = FakeSource::default()
            .with(DataSource::Stock, "600000", raw("浦发银行", &[(1, 3, 7.2)]))
            .with(DataSource::Fund, "510300", raw("沪深300ETF", &[(1, 3, 3.9)]))
            .delay("600000", Duration::from_millis(30));
        let (fetcher, _) = fetcher(source, 4, 5);

        let codes: Vec<String> = ["600000", "999999", "510300"].iter().map(|s| s.to_string()).collect();
        let batch = fetcher.fetch_multiple(&codes, date(1, 1), date(6, 30), Adjust::Forward).await;

        let fetched: Vec<_> = batch.series.iter().map(|s| s.code.as_str()).collect();
        assert_eq!(fetched, vec!["600000", "510300"]);
        assert_eq!(batch.series[1].data_source, DataSource::Fund);
        assert_eq!(batch.failures.len(), 1);
        assert_eq!(batch.failures[0].code, "999999");
    }

    #[tokio::test]
    async fn test_slow_symbol_times_out_alone() {
        let source = FakeSource::default()
            .with(DataSource::Stock, "600000", raw("浦发银行", &[(1, 3, 7.2)]))
            .with(DataSource::Stock, "601288", raw("农业银行", &[(1, 3, 2.9)]))
            .delay("601288", Duration::from_secs(5));
        let (fetcher, _) = fetcher(source, 4, 1);

        let codes = vec!["600000".to_string(), "601288".to_string()];
        let batch = fetcher.fetch_multiple(&codes, date(1, 1), date(6, 30), Adjust::Forward).await;

        assert_eq!(batch.series.len(), 1);
        assert_eq!(batch.series[0].code, "600000");
        assert_eq!(batch.failures[0].code, "601288");
        assert!(batch.failures[0].message.contains("Timed out"));
    }

    #[tokio::test]
    async fn test_concurrency_is_bounded() {
        let mut source = FakeSource::default();
        let codes: Vec<String> = (0..6).map(|i| format!("60000{}", i)).collect();
        for code in &codes {
            source = source
                .with(DataSource::Stock, code, raw("测试", &[(1, 3, 1.0)]))
                .delay(code, Duration::from_millis(20));
        }
        let (fetcher, source) = fetcher(source, 2, 5);

        let batch = fetcher.fetch_multiple(&codes, date(1, 1), date(6, 30), Adjust::Forward).await;

        assert_eq!(batch.series.len(), 6);
        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 2);
    }
}
