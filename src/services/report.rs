//! 可视化报告
//!
//! 查询参数校验 -> 并发获取 -> 标准化 -> 收益率 -> 统计摘要

use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

use super::chart::ChartRange;
use super::market::MarketDataFetcher;
use super::processor;
use crate::config::DataConfig;
use crate::models::{
    Adjust, ComparisonRow, DataInfo, DataSource, DisplayRow, FetchFailure, SummaryStats, SymbolSeries,
    VisualizeQuery,
};
use crate::utils::validators::{
    parse_date, sanitize_codes, validate_date_range, validate_multiple_codes, ValidationError,
};

/// 校验后的请求
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardRequest {
    /// 有效且去重后的代码
    pub codes: Vec<String>,
    /// 被跳过的无效代码
    pub invalid_codes: Vec<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub normalize: bool,
    pub adjust: Adjust,
    pub range: ChartRange,
}

impl DashboardRequest {
    /// 从查询参数构造请求
    ///
    /// 开始日期缺省为配置的默认日期，结束日期缺省为 `today`
    pub fn from_query(
        query: &VisualizeQuery,
        config: &DataConfig,
        today: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let input = query.codes.as_deref().unwrap_or("").trim();
        if input.is_empty() {
            return Err(ValidationError::EmptyInput);
        }

        let start = match non_empty(&query.start_date) {
            Some(s) => parse_date(s)?,
            None => config.default_start_date,
        };
        let end = match non_empty(&query.end_date) {
            Some(s) => parse_date(s)?,
            None => today,
        };
        validate_date_range(start, end, today, config.max_history_years)?;

        let adjust = match query.adjust.as_deref() {
            Some(s) => s
                .parse::<Adjust>()
                .map_err(|_| ValidationError::InvalidAdjust(s.to_string()))?,
            None => Adjust::default(),
        };
        let range = match non_empty(&query.range) {
            Some(s) => s.parse::<ChartRange>()?,
            None => ChartRange::All,
        };

        let (valid, invalid_codes) = validate_multiple_codes(input);
        if !invalid_codes.is_empty() {
            log::warn!("Invalid code formats skipped: {}", invalid_codes.join(", "));
        }
        if valid.is_empty() {
            return Err(ValidationError::NoValidCodes);
        }

        Ok(Self {
            codes: sanitize_codes(&valid),
            invalid_codes,
            start,
            end,
            normalize: query.normalize_enabled(),
            adjust,
            range,
        })
    }

    /// 单只代码请求，路径中的代码替换查询参数里的代码列表
    pub fn single(
        code: &str,
        query: &VisualizeQuery,
        config: &DataConfig,
        today: NaiveDate,
    ) -> Result<Self, ValidationError> {
        let code = code.trim();
        if !crate::utils::validators::validate_stock_code(code) {
            return Err(ValidationError::InvalidCode(code.to_string()));
        }
        let query = VisualizeQuery {
            codes: Some(code.to_string()),
            ..query.clone()
        };
        Self::from_query(&query, config, today)
    }

    /// 无效代码提示
    pub fn warnings(&self) -> Vec<String> {
        if self.invalid_codes.is_empty() {
            Vec::new()
        } else {
            vec![format!(
                "无效的代码格式已跳过 | Invalid code formats skipped: {}",
                self.invalid_codes.join(", ")
            )]
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// 处理完成的可视化数据
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub codes: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub normalized: bool,
    pub adjust: Adjust,
    pub series: Vec<SymbolSeries>,
    pub names: BTreeMap<String, String>,
    pub data_sources: BTreeMap<String, DataSource>,
    pub failures: Vec<FetchFailure>,
    pub invalid_codes: Vec<String>,
    /// 处理过程中的提示（如无法标准化）
    pub warnings: Vec<String>,
    pub summary: Vec<SummaryStats>,
    pub comparison: Vec<ComparisonRow>,
}

impl Report {
    /// 没有任何代码获取成功
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn data_info(&self) -> DataInfo {
        processor::data_info(&self.series)
    }

    pub fn display_rows(&self) -> Vec<DisplayRow> {
        processor::prepare_display_rows(&self.series)
    }

    /// 获取失败的代码，形如 `No data found for 123456`
    pub fn failure_messages(&self) -> Vec<String> {
        self.failures
            .iter()
            .map(|f| format!("{}: {}", f.code, f.message))
            .collect()
    }

    /// 数据源说明，形如 `600000: stock, 510300: fund`
    pub fn source_info(&self) -> String {
        self.series
            .iter()
            .map(|s| format!("{}: {}", s.code, s.data_source))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// 获取并处理数据
pub async fn build_report(fetcher: &MarketDataFetcher, request: &DashboardRequest) -> Report {
    let batch = fetcher
        .fetch_multiple(&request.codes, request.start, request.end, request.adjust)
        .await;

    let mut series = batch.series;
    let mut warnings = Vec::new();
    let mut normalized = false;
    if request.normalize {
        match processor::normalize(&mut series) {
            Some(base_date) => {
                log::debug!("标准化基准日期: {}", base_date);
                normalized = true;
            }
            None if series.len() > 1 => {
                log::warn!("所选代码没有共同交易日，无法标准化");
                warnings.push(
                    "所选代码没有共同交易日，显示原始价格 | No common trading date, showing raw prices"
                        .to_string(),
                );
            }
            None => {}
        }
    }
    processor::calculate_returns(&mut series);

    let names = series
        .iter()
        .map(|s| (s.code.clone(), s.name.clone()))
        .collect();
    let data_sources = series
        .iter()
        .map(|s| (s.code.clone(), s.data_source))
        .collect();
    let summary = processor::generate_summary_stats(&series);
    let comparison = processor::comparison_table(&series);

    Report {
        codes: request.codes.clone(),
        start_date: request.start,
        end_date: request.end,
        normalized,
        adjust: request.adjust,
        series,
        names,
        data_sources,
        failures: batch.failures,
        invalid_codes: request.invalid_codes.clone(),
        warnings,
        summary,
        comparison,
    }
}
