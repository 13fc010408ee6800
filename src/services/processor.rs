//! 数据处理
//!
//! 标准化、收益率计算、统计摘要和展示表格

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::models::{ComparisonRow, DataInfo, DisplayRow, SummaryStats, SymbolSeries};

/// 年化系数使用的交易日数
const TRADING_DAYS: f64 = 252.0;
/// 滚动波动率窗口
const VOLATILITY_WINDOW: usize = 20;

/// 标准化价格，使所有序列在首个共同日期均为 100
///
/// 首个共同日期是所有非空序列都有记录的最早日期，早于该日期的记录被裁掉，
/// 开高低收都除以该日收盘价。返回基准日期；没有共同日期时不做任何修改并返回 `None`。
/// 基准价非正的序列保持原样
pub fn normalize(series: &mut [SymbolSeries]) -> Option<NaiveDate> {
    let base_date = first_common_date(series)?;

    for s in series.iter_mut() {
        s.records.retain(|r| r.date >= base_date);

        let Some(base) = s.records.iter().find(|r| r.date == base_date).map(|r| r.close) else {
            continue;
        };
        if base <= 0.0 {
            log::warn!("Invalid first day price for {}: {}", s.code, base);
            continue;
        }

        for r in s.records.iter_mut() {
            r.open = r.open / base * 100.0;
            r.high = r.high / base * 100.0;
            r.low = r.low / base * 100.0;
            r.close = r.close / base * 100.0;
        }
    }

    Some(base_date)
}

/// 所有非空序列日期的交集中最早的一天
fn first_common_date(series: &[SymbolSeries]) -> Option<NaiveDate> {
    let mut non_empty = series.iter().filter(|s| !s.records.is_empty());
    let mut common: BTreeSet<NaiveDate> = non_empty.next()?.records.iter().map(|r| r.date).collect();

    for s in non_empty {
        let dates: BTreeSet<NaiveDate> = s.records.iter().map(|r| r.date).collect();
        common.retain(|d| dates.contains(d));
    }

    common.into_iter().next()
}

/// 计算日收益率、累计收益率和 20 日年化波动率
///
/// 只有一条记录的序列不计算
pub fn calculate_returns(series: &mut [SymbolSeries]) {
    for s in series.iter_mut() {
        if s.records.len() < 2 {
            continue;
        }

        let mut cumulative = 1.0;
        let mut prev_close: Option<f64> = None;
        let mut daily = Vec::with_capacity(s.records.len());

        for r in s.records.iter_mut() {
            let ret = prev_close.and_then(|p| pct_change(p, r.close));
            if let Some(ret) = ret {
                cumulative *= 1.0 + ret;
                r.cumulative_return = Some(cumulative - 1.0);
            }
            r.daily_return = ret;
            daily.push(ret);
            prev_close = Some(r.close);
        }

        if s.records.len() >= VOLATILITY_WINDOW {
            for end in VOLATILITY_WINDOW..=s.records.len() {
                let window: Option<Vec<f64>> =
                    daily[end - VOLATILITY_WINDOW..end].iter().copied().collect();
                s.records[end - 1].volatility_20d = window
                    .and_then(|w| sample_std(&w))
                    .map(|std| std * TRADING_DAYS.sqrt());
            }
        }
    }
}

/// 各序列的统计摘要
pub fn generate_summary_stats(series: &[SymbolSeries]) -> Vec<SummaryStats> {
    series.iter().filter_map(summarize).collect()
}

fn summarize(s: &SymbolSeries) -> Option<SummaryStats> {
    let first = s.records.first()?;
    let last = s.records.last()?;
    let closes: Vec<f64> = s.records.iter().map(|r| r.close).collect();
    let returns = close_returns(&closes);

    let (volatility, sharpe) = if returns.is_empty() {
        (None, None)
    } else {
        let mean = mean(&returns);
        let std = sample_std(&returns).unwrap_or(f64::NAN);
        let sharpe = if std > 0.0 {
            mean / std * TRADING_DAYS.sqrt()
        } else {
            0.0
        };
        (Some(std * TRADING_DAYS.sqrt() * 100.0), Some(sharpe))
    };

    Some(SummaryStats {
        code: s.code.clone(),
        name: s.name.clone(),
        start_date: first.date,
        end_date: last.date,
        start_price: first.close,
        end_price: last.close,
        total_return_pct: (last.close / first.close - 1.0) * 100.0,
        max_price: closes.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        min_price: closes.iter().copied().fold(f64::INFINITY, f64::min),
        avg_volume: mean(&s.records.iter().map(|r| r.volume).collect::<Vec<_>>()),
        volatility_annual_pct: volatility,
        sharpe_ratio: sharpe,
    })
}

/// 多代码比较表，只有一个序列时为空
pub fn comparison_table(series: &[SymbolSeries]) -> Vec<ComparisonRow> {
    if series.len() <= 1 {
        return Vec::new();
    }

    series
        .iter()
        .filter_map(|s| summarize(s).map(|stats| (stats, s.records.len())))
        .map(|(stats, data_points)| ComparisonRow {
            code: stats.code,
            name: stats.name,
            start_price: stats.start_price,
            end_price: stats.end_price,
            total_return_pct: stats.total_return_pct,
            max_price: stats.max_price,
            min_price: stats.min_price,
            volatility_annual_pct: stats
                .volatility_annual_pct
                .filter(|v| v.is_finite())
                .unwrap_or(0.0),
            data_points,
        })
        .collect()
}

/// 数据概况
pub fn data_info(series: &[SymbolSeries]) -> DataInfo {
    let dates = series.iter().flat_map(|s| s.records.iter().map(|r| r.date));
    let span_days = match (dates.clone().min(), dates.max()) {
        (Some(first), Some(last)) => (last - first).num_days(),
        _ => 0,
    };
    let sources: BTreeSet<_> = series.iter().map(|s| s.data_source.as_str()).collect();

    DataInfo {
        symbols: series.len(),
        data_points: series.iter().map(|s| s.records.len()).sum(),
        span_days,
        data_sources: sources.len(),
    }
}

/// 数据表展示行，按序列顺序展开
pub fn prepare_display_rows(series: &[SymbolSeries]) -> Vec<DisplayRow> {
    series
        .iter()
        .flat_map(|s| {
            s.records.iter().map(move |r| DisplayRow {
                date: r.date,
                code: s.code.clone(),
                name: s.name.clone(),
                data_source: s.data_source,
                close: r.close,
                pct_change: r.pct_change,
            })
        })
        .collect()
}

fn pct_change(prev: f64, current: f64) -> Option<f64> {
    if prev == 0.0 {
        None
    } else {
        Some(current / prev - 1.0)
    }
}

fn close_returns(closes: &[f64]) -> Vec<f64> {
    closes
        .windows(2)
        .filter_map(|w| pct_change(w[0], w[1]))
        .collect()
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// 样本标准差（n - 1）
fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}
