//! 行情数据 TTL 缓存
//!
//! 相同 (代码, 日期范围, 复权方式) 的请求在有效期内直接复用结果

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::HistoryRequest;
use crate::models::SymbolSeries;

pub type CacheKey = HistoryRequest;

struct CacheEntry {
    inserted_at: Instant,
    series: Arc<SymbolSeries>,
}

/// 按 TTL 失效的缓存，过期条目在读取时忽略、写入时覆盖
pub struct SeriesCache {
    ttl: Duration,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
}

impl SeriesCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<Arc<SymbolSeries>> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|entry| entry.inserted_at.elapsed() < self.ttl)
            .map(|entry| Arc::clone(&entry.series))
    }

    pub fn insert(&self, key: CacheKey, series: Arc<SymbolSeries>) {
        let mut entries = self.entries.write();
        entries.retain(|_, entry| entry.inserted_at.elapsed() < self.ttl);
        entries.insert(
            key,
            CacheEntry {
                inserted_at: Instant::now(),
                series,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Adjust, DataSource};
    use chrono::NaiveDate;

    fn key(code: &str) -> CacheKey {
        HistoryRequest {
            code: code.to_string(),
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 6, 30).unwrap(),
            adjust: Adjust::Forward,
        }
    }

    fn series(code: &str) -> Arc<SymbolSeries> {
        Arc::new(SymbolSeries {
            code: code.to_string(),
            name: code.to_string(),
            data_source: DataSource::Stock,
            records: Vec::new(),
        })
    }

    #[test]
    fn test_hit_and_miss() {
        let cache = SeriesCache::new(Duration::from_secs(60));
        cache.insert(key("600000"), series("600000"));

        assert_eq!(cache.get(&key("600000")).unwrap().code, "600000");
        assert!(cache.get(&key("510300")).is_none());

        let mut other_adjust = key("600000");
        other_adjust.adjust = Adjust::None;
        assert!(cache.get(&other_adjust).is_none());
    }

    #[test]
    fn test_expired_entries() {
        let cache = SeriesCache::new(Duration::ZERO);
        cache.insert(key("600000"), series("600000"));
        assert!(cache.get(&key("600000")).is_none());

        cache.insert(key("510300"), series("510300"));
        assert_eq!(cache.len(), 1);
    }
}
