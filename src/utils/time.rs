//! 北京时间辅助函数

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Asia::Shanghai;
use chrono_tz::Tz;

/// 获取北京时间（UTC+8）
pub fn beijing_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&Shanghai)
}

/// 北京时间的当日日期，A 股交易日以此为准
pub fn beijing_today() -> NaiveDate {
    beijing_now().date_naive()
}
