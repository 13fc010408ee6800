//! HTTP 请求处理器
//!
//! - GET / - 可视化页面
//! - GET /api/v1/health - 健康检查
//! - GET /api/v1/series, /api/v1/series/{code} - JSON 数据
//! - GET /api/v1/charts/{kind}.svg - SVG 图表
//! - GET /api/v1/export/{file} - 数据下载

pub mod charts;
pub mod dashboard;
pub mod export;
pub mod health;
pub mod series;

use actix_web::{web, HttpResponse};

use crate::config::AppConfig;
use crate::models::ApiResponse;
use crate::services::chart::ChartRenderer;
use crate::services::market::MarketDataFetcher;
use crate::services::report::Report;
use crate::utils::validators::ValidationError;

/// 所有处理器共享的状态
pub struct AppState {
    pub config: AppConfig,
    pub fetcher: MarketDataFetcher,
    pub charts: ChartRenderer,
}

impl AppState {
    pub fn new(config: AppConfig, fetcher: MarketDataFetcher) -> Self {
        let charts = ChartRenderer::new(&config.chart);
        Self {
            config,
            fetcher,
            charts,
        }
    }
}

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.configure(dashboard::config).service(
        web::scope("/api/v1")
            .configure(health::config)
            .configure(series::config)
            .configure(charts::config)
            .configure(export::config),
    );
}

/// 参数错误 -> 400
fn bad_request(err: ValidationError) -> HttpResponse {
    log::warn!("请求参数错误: {}", err);
    HttpResponse::BadRequest().json(ApiResponse::<()>::error(err.to_string()))
}

/// 所有代码都没有数据 -> 404，消息中列出每只代码的失败原因
fn no_data(report: &Report) -> HttpResponse {
    let mut message =
        "无法获取数据，请检查代码和日期范围 | Failed to fetch data, please check codes and date range"
            .to_string();
    let failures = report.failure_messages();
    if !failures.is_empty() {
        message.push_str(": ");
        message.push_str(&failures.join("; "));
    }
    HttpResponse::NotFound().json(ApiResponse::<()>::error(message))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::AppConfig;
    use crate::models::{DataSource, PriceRecord};
    use crate::services::market::{HistoryRequest, HistorySource, RawHistory};
    use chrono::NaiveDate;
    use futures::future::BoxFuture;
    use std::sync::Arc;

    /// 600000 为股票，510300 为基金，其余代码无数据
    pub struct FakeSource;

    impl HistorySource for FakeSource {
        fn fetch_history<'a>(
            &'a self,
            category: DataSource,
            request: &'a HistoryRequest,
        ) -> BoxFuture<'a, anyhow::Result<RawHistory>> {
            Box::pin(async move {
                let (name, base) = match (category, request.code.as_str()) {
                    (DataSource::Stock, "600000") => ("浦发银行", 7.0),
                    (DataSource::Fund, "510300") => ("沪深300ETF", 4.0),
                    _ => return Ok(RawHistory::default()),
                };
                let records = (0..30)
                    .map(|i| {
                        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
                            + chrono::Duration::days(i);
                        let close = base + i as f64 * 0.01;
                        PriceRecord::ohlcv(date, close, close, close + 0.05, close - 0.05, 1000.0 + i as f64)
                    })
                    .collect();
                Ok(RawHistory {
                    name: Some(name.to_string()),
                    records,
                })
            })
        }
    }

    pub fn state() -> web::Data<AppState> {
        let config = AppConfig::default();
        let fetcher = MarketDataFetcher::new(Arc::new(FakeSource), &config.data);
        web::Data::new(AppState::new(config, fetcher))
    }
}
