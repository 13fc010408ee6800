//! 数据导出
//!
//! 原始数据 CSV、格式化 CSV、JSON 记录、统计摘要 CSV 和比较表 CSV

use anyhow::{anyhow, Result};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::str::FromStr;

use super::report::Report;
use crate::models::{labels, DataSource};
use crate::utils::formatters::{create_download_filename, format_optional};

/// 下载类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    RawCsv,
    FormattedCsv,
    Json,
    SummaryCsv,
    ComparisonCsv,
}

impl ExportKind {
    pub const ALL: [ExportKind; 5] = [
        ExportKind::RawCsv,
        ExportKind::FormattedCsv,
        ExportKind::Json,
        ExportKind::SummaryCsv,
        ExportKind::ComparisonCsv,
    ];

    /// 路径中的文件名
    pub fn path(&self) -> &'static str {
        match self {
            ExportKind::RawCsv => "raw.csv",
            ExportKind::FormattedCsv => "formatted.csv",
            ExportKind::Json => "data.json",
            ExportKind::SummaryCsv => "summary.csv",
            ExportKind::ComparisonCsv => "comparison.csv",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ExportKind::RawCsv => "下载原始数据CSV | Download Raw CSV",
            ExportKind::FormattedCsv => "下载格式化CSV | Download Formatted CSV",
            ExportKind::Json => "下载JSON | Download JSON",
            ExportKind::SummaryCsv => "下载统计摘要CSV | Download Summary Stats CSV",
            ExportKind::ComparisonCsv => "下载比较数据CSV | Download Comparison CSV",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            ExportKind::RawCsv => "stock_data_raw",
            ExportKind::FormattedCsv => "stock_data_formatted",
            ExportKind::Json => "stock_data",
            ExportKind::SummaryCsv => "summary_stats",
            ExportKind::ComparisonCsv => "stock_comparison",
        }
    }

    fn extension(&self) -> &'static str {
        match self {
            ExportKind::Json => "json",
            _ => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportKind::Json => "application/json",
            _ => "text/csv; charset=utf-8",
        }
    }
}

impl FromStr for ExportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExportKind::ALL
            .into_iter()
            .find(|k| k.path() == s)
            .ok_or_else(|| format!("未知的下载类型: {}", s))
    }
}

/// 待下载的文件
#[derive(Debug, Clone)]
pub struct ExportFile {
    pub filename: String,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// 原始数据的一行，每条记录附带代码、名称和数据源
#[derive(Debug, Serialize)]
struct RawRow<'a> {
    date: NaiveDate,
    code: &'a str,
    name: &'a str,
    data_source: DataSource,
    open: f64,
    close: f64,
    high: f64,
    low: f64,
    volume: f64,
    amount: Option<f64>,
    amplitude: Option<f64>,
    pct_change: Option<f64>,
    price_change: Option<f64>,
    turnover: Option<f64>,
    daily_return: Option<f64>,
    cumulative_return: Option<f64>,
    volatility_20d: Option<f64>,
}

fn raw_rows(report: &Report) -> Vec<RawRow<'_>> {
    report
        .series
        .iter()
        .flat_map(|s| {
            s.records.iter().map(move |r| RawRow {
                date: r.date,
                code: &s.code,
                name: &s.name,
                data_source: s.data_source,
                open: r.open,
                close: r.close,
                high: r.high,
                low: r.low,
                volume: r.volume,
                amount: r.amount,
                amplitude: r.amplitude,
                pct_change: r.pct_change,
                price_change: r.price_change,
                turnover: r.turnover,
                daily_return: r.daily_return,
                cumulative_return: r.cumulative_return,
                volatility_20d: r.volatility_20d,
            })
        })
        .collect()
}

/// 生成下载文件
pub fn export(kind: ExportKind, report: &Report, now: NaiveDateTime) -> Result<ExportFile> {
    let body = match kind {
        ExportKind::RawCsv => write_csv(raw_rows(report))?,
        ExportKind::FormattedCsv => formatted_csv(report)?,
        ExportKind::Json => serde_json::to_vec(&raw_rows(report))?,
        ExportKind::SummaryCsv => write_csv(report.summary.iter())?,
        ExportKind::ComparisonCsv => write_csv(report.comparison.iter())?,
    };

    Ok(ExportFile {
        filename: create_download_filename(kind.prefix(), &report.codes, kind.extension(), now),
        content_type: kind.content_type(),
        body,
    })
}

fn write_csv<I, T>(rows: I) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = T>,
    T: Serialize,
{
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer.serialize(row)?;
    }
    writer
        .into_inner()
        .map_err(|e| anyhow!("写入 CSV 失败: {}", e))
}

/// 展示用表格：收盘价保留两位小数，涨跌幅带百分号
fn formatted_csv(report: &Report) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(labels::display_headers(report.normalized))?;

    for row in report.display_rows() {
        let pct = row
            .pct_change
            .map(|v| format!("{:.2}%", v))
            .unwrap_or_else(|| "N/A".to_string());
        writer.write_record([
            row.date.format("%Y-%m-%d").to_string(),
            row.code,
            row.name,
            row.data_source.to_string(),
            format_optional(Some(row.close), 2),
            pct,
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| anyhow!("写入 CSV 失败: {}", e))
}
