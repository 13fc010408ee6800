//! 配置模块
//!
//! 支持从 JSON 文件加载系统配置

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// 监听地址
    #[serde(default = "default_host")]
    pub host: String,
    /// 监听端口
    #[serde(default = "default_port")]
    pub port: u16,
    /// 工作线程数（0 表示使用 CPU 核心数）
    #[serde(default)]
    pub workers: usize,
}

/// API 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// API Key（为空则不启用认证）
    #[serde(default)]
    pub api_key: String,
    /// 请求超时时间（秒）
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// 连接超时时间（秒）
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// 东方财富历史行情接口地址
    #[serde(default = "default_eastmoney_base_url")]
    pub eastmoney_base_url: String,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    /// 日志级别: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

/// 行情数据配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// 缓存有效期（秒）
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,
    /// 最大并发请求数
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    /// 单只代码的获取超时（秒）
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
    /// 默认开始日期
    #[serde(default = "default_start_date")]
    pub default_start_date: NaiveDate,
    /// 日期选择器允许的最早日期
    #[serde(default = "default_min_date")]
    pub min_date: NaiveDate,
    /// 最多允许回溯的年数
    #[serde(default = "default_max_history_years")]
    pub max_history_years: u32,
}

/// 图表配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    #[serde(default = "default_chart_width")]
    pub width: u32,
    #[serde(default = "default_chart_height")]
    pub height: u32,
    /// 成交量图高度
    #[serde(default = "default_volume_height")]
    pub volume_height: u32,
    /// 曲线颜色，按代码顺序循环使用
    #[serde(default = "default_chart_colors")]
    pub colors: Vec<String>,
}

/// 应用配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// 服务器配置
    #[serde(default)]
    pub server: ServerConfig,
    /// API 配置
    #[serde(default)]
    pub api: ApiConfig,
    /// 日志配置
    #[serde(default)]
    pub log: LogConfig,
    /// 行情数据配置
    #[serde(default)]
    pub data: DataConfig,
    /// 图表配置
    #[serde(default)]
    pub chart: ChartConfig,
}

// 默认值函数
fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }
fn default_timeout() -> u64 { 30 }
fn default_connect_timeout() -> u64 { 10 }
fn default_eastmoney_base_url() -> String { "https://push2his.eastmoney.com".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_cache_ttl() -> u64 { 3600 }
fn default_max_workers() -> usize { 10 }
fn default_fetch_timeout() -> u64 { 60 }
fn default_start_date() -> NaiveDate { NaiveDate::from_ymd_opt(2023, 1, 1).unwrap_or_default() }
fn default_min_date() -> NaiveDate { NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or_default() }
fn default_max_history_years() -> u32 { 25 }
fn default_chart_width() -> u32 { 1100 }
fn default_chart_height() -> u32 { 600 }
fn default_volume_height() -> u32 { 400 }

fn default_chart_colors() -> Vec<String> {
    [
        "#1f77b4", "#ff7f0e", "#2ca02c", "#d62728", "#9467bd",
        "#8c564b", "#e377c2", "#7f7f7f", "#bcbd22", "#17becf",
    ]
    .iter()
    .map(|c| c.to_string())
    .collect()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: 0,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            timeout_secs: default_timeout(),
            connect_timeout_secs: default_connect_timeout(),
            eastmoney_base_url: default_eastmoney_base_url(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            cache_ttl_secs: default_cache_ttl(),
            max_workers: default_max_workers(),
            fetch_timeout_secs: default_fetch_timeout(),
            default_start_date: default_start_date(),
            min_date: default_min_date(),
            max_history_years: default_max_history_years(),
        }
    }
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            width: default_chart_width(),
            height: default_chart_height(),
            volume_height: default_volume_height(),
            colors: default_chart_colors(),
        }
    }
}

impl AppConfig {
    /// 从 JSON 文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// 加载配置，优先从文件，失败则使用默认值
    ///
    /// 环境变量 `API_KEY` 会覆盖文件中的 api_key
    pub fn load() -> Self {
        let mut config = Self::load_file();

        if let Ok(key) = env::var("API_KEY") {
            config.api.api_key = key;
        }

        config
    }

    fn load_file() -> Self {
        let config_paths = ["config.json", "config/config.json"];

        for path in config_paths {
            if Path::new(path).exists() {
                match Self::from_file(path) {
                    Ok(config) => {
                        log::info!("从 {} 加载配置成功", path);
                        return config;
                    }
                    Err(e) => {
                        log::warn!("加载配置文件 {} 失败: {}", path, e);
                    }
                }
            }
        }

        log::info!("使用默认配置");
        Self::default()
    }

    /// 获取服务器绑定地址
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.bind_addr(), "0.0.0.0:8080");
        assert_eq!(config.data.cache_ttl_secs, 3600);
        assert_eq!(config.data.max_workers, 10);
        assert_eq!(config.chart.colors.len(), 10);
        assert_eq!(config.chart.colors[0], "#1f77b4");
        assert_eq!(
            config.data.default_start_date,
            NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
        );
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let json = r#"{
            "server": { "port": 9000 },
            "data": { "max_workers": 4, "default_start_date": "2024-03-01" }
        }"#;
        let config: AppConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.data.max_workers, 4);
        assert_eq!(config.data.cache_ttl_secs, 3600);
        assert_eq!(
            config.data.default_start_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
        assert_eq!(config.api.eastmoney_base_url, "https://push2his.eastmoney.com");
        assert_eq!(config.chart.height, 600);
    }
}
