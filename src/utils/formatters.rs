//! 展示与导出的格式化工具

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::SummaryStats;

/// 货币格式，如 `¥1,234.57`
pub fn format_currency(value: f64) -> String {
    if value.is_nan() {
        return "N/A".to_string();
    }
    let sign = if value < 0.0 { "-" } else { "" };
    format!("{}¥{}", sign, group_thousands(value.abs(), 2))
}

/// 百分比格式，如 `12.35%`
pub fn format_percentage(value: f64, decimals: usize) -> String {
    if value.is_nan() {
        return "N/A".to_string();
    }
    format!("{:.*}%", decimals, value)
}

/// 成交量按 亿 / 万 换算
pub fn format_volume(value: f64) -> String {
    if value.is_nan() || value == 0.0 {
        return "0".to_string();
    }

    if value >= 1e8 {
        format!("{:.2}亿", value / 1e8)
    } else if value >= 1e4 {
        format!("{:.2}万", value / 1e4)
    } else {
        format!("{:.0}", value)
    }
}

/// 可选数值，缺失时显示 `N/A`
pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if !v.is_nan() => format!("{:.*}", decimals, v),
        _ => "N/A".to_string(),
    }
}

pub fn format_date_range(start: NaiveDate, end: NaiveDate) -> String {
    format!("{} 至 {}", start.format("%Y-%m-%d"), end.format("%Y-%m-%d"))
}

/// 下载文件名
///
/// 最多列出 3 个代码，其余以 `_and_N_more` 表示
pub fn create_download_filename(
    prefix: &str,
    codes: &[String],
    extension: &str,
    now: NaiveDateTime,
) -> String {
    let mut codes_str = codes
        .iter()
        .take(3)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join("_");
    if codes.is_empty() {
        codes_str.push_str("data");
    }
    if codes.len() > 3 {
        codes_str.push_str(&format!("_and_{}_more", codes.len() - 3));
    }

    format!(
        "{}_{}_{}.{}",
        prefix,
        codes_str,
        now.format("%Y%m%d_%H%M%S"),
        extension
    )
}

/// 统计摘要的展示文本，按表格列顺序返回 (列名, 值)
pub fn format_summary_stats(stats: &SummaryStats) -> Vec<(&'static str, String)> {
    let mut formatted = vec![
        ("Code", stats.code.clone()),
        ("Name", stats.name.clone()),
        ("Start Date", stats.start_date.format("%Y-%m-%d").to_string()),
        ("End Date", stats.end_date.format("%Y-%m-%d").to_string()),
        ("Start Price", format_currency(stats.start_price)),
        ("End Price", format_currency(stats.end_price)),
        ("Total Return (%)", format_percentage(stats.total_return_pct, 2)),
        ("Max Price", format_currency(stats.max_price)),
        ("Min Price", format_currency(stats.min_price)),
        ("Avg Volume", format_volume(stats.avg_volume)),
    ];

    if let Some(volatility) = stats.volatility_annual_pct {
        formatted.push(("Volatility (Annual %)", format_percentage(volatility, 2)));
    }
    if let Some(sharpe) = stats.sharpe_ratio {
        formatted.push(("Sharpe Ratio", format!("{:.3}", sharpe)));
    }

    formatted
}

fn group_thousands(value: f64, decimals: usize) -> String {
    let fixed = format!("{:.*}", decimals, value);
    let (int_part, frac_part) = match fixed.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (fixed.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(f) => format!("{}.{}", grouped, f),
        None => grouped,
    }
}
