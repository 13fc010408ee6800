//! 输入校验
//!
//! 股票/基金/指数代码格式、代码列表拆分和日期范围校验

use chrono::{Duration, NaiveDate};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use thiserror::Error;

lazy_static! {
    /// A 股代码：6 位数字
    static ref VALID_CODE: Regex = Regex::new(r"^[0-9]{6}$").expect("valid code regex");
}

/// 输入校验错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("请输入股票或指数代码 | Please enter stock or index codes")]
    EmptyInput,
    #[error("没有有效的股票或指数代码 | No valid stock or index codes")]
    NoValidCodes,
    #[error("无效的代码格式: {0} | Invalid code format: {0}")]
    InvalidCode(String),
    #[error("无法解析日期: {0} | Invalid date: {0}")]
    InvalidDate(String),
    #[error("开始日期不能晚于结束日期 | Start date must be before end date")]
    StartAfterEnd,
    #[error("结束日期不能晚于今天 | End date cannot be in the future")]
    EndInFuture,
    #[error("开始日期不能早于 {0} | Start date cannot be earlier than {0}")]
    StartTooEarly(NaiveDate),
    #[error("未知的复权方式: {0} | Unknown price adjustment: {0}")]
    InvalidAdjust(String),
    #[error("未知的图表区间: {0} | Unknown chart range: {0}")]
    InvalidRange(String),
}

/// 校验单个代码格式
pub fn validate_stock_code(code: &str) -> bool {
    let code = code.trim();
    !code.is_empty() && VALID_CODE.is_match(code)
}

/// 拆分并校验多个代码
///
/// 支持半角逗号、全角逗号和空白分隔，返回 (有效代码, 无效代码)，均保持输入顺序
pub fn validate_multiple_codes(input: &str) -> (Vec<String>, Vec<String>) {
    let mut valid = Vec::new();
    let mut invalid = Vec::new();

    for code in input
        .split(|c: char| c == ',' || c == '，' || c.is_whitespace())
        .map(str::trim)
        .filter(|c| !c.is_empty())
    {
        if validate_stock_code(code) {
            valid.push(code.to_string());
        } else {
            invalid.push(code.to_string());
        }
    }

    (valid, invalid)
}

/// 清理并去重，保留首次出现的顺序
pub fn sanitize_codes(codes: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    codes
        .iter()
        .map(|c| c.trim().to_uppercase())
        .filter(|c| !c.is_empty() && seen.insert(c.clone()))
        .collect()
}

/// 校验日期范围
///
/// 结束日期不能晚于 `today`，开始日期不能早于 `today` 往前 `max_history_years` 年
pub fn validate_date_range(
    start: NaiveDate,
    end: NaiveDate,
    today: NaiveDate,
    max_history_years: u32,
) -> Result<(), ValidationError> {
    if start > end {
        return Err(ValidationError::StartAfterEnd);
    }

    if end > today {
        return Err(ValidationError::EndInFuture);
    }

    // 回溯年数超出日期范围时不设下限
    let earliest = Duration::try_days(365 * i64::from(max_history_years))
        .and_then(|span| today.checked_sub_signed(span));
    if let Some(earliest) = earliest {
        if start < earliest {
            return Err(ValidationError::StartTooEarly(earliest));
        }
    }

    Ok(())
}

/// 解析日期，支持 `YYYY-MM-DD` 和 `YYYYMMDD`
pub fn parse_date(input: &str) -> Result<NaiveDate, ValidationError> {
    let input = input.trim();
    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(input, "%Y%m%d"))
        .map_err(|_| ValidationError::InvalidDate(input.to_string()))
}
