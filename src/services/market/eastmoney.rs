//! 东方财富日K线接口实现
//!
//! 对接 https://push2his.eastmoney.com/api/qt/stock/kline/get
//! 股票、ETF 基金和指数共用同一接口，区别在于 secid 的市场前缀

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use futures::future::BoxFuture;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::{HistoryRequest, HistorySource, RawHistory};
use crate::config::ApiConfig;
use crate::models::{Adjust, DataSource, PriceRecord};

/// 日K线接口路径
const KLINE_PATH: &str = "/api/qt/stock/kline/get";
/// 接口公开的 ut 参数
const EASTMONEY_UT: &str = "7eea3edcaed734bea9cbfc24409ed989";
/// f51..f61: 日期,开盘,收盘,最高,最低,成交量,成交额,振幅,涨跌幅,涨跌额,换手率
const KLINE_FIELDS: &str = "f51,f52,f53,f54,f55,f56,f57,f58,f59,f60,f61";
/// 日线
const KLINE_DAILY: &str = "101";

#[derive(Debug, Deserialize)]
struct KlineResponse {
    #[serde(default)]
    data: Option<KlineData>,
}

#[derive(Debug, Deserialize)]
struct KlineData {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    klines: Vec<String>,
}

/// 东方财富历史行情客户端
pub struct EastmoneyClient {
    client: Client,
    base_url: String,
}

impl EastmoneyClient {
    /// 按 API 配置创建客户端（超时、接口地址）
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()?;

        Ok(Self {
            client,
            base_url: config.eastmoney_base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn fetch_category(
        &self,
        category: DataSource,
        request: &HistoryRequest,
    ) -> Result<RawHistory> {
        let fqt = fqt_param(category, request.adjust);
        let beg = request.start.format("%Y%m%d").to_string();
        let end = request.end.format("%Y%m%d").to_string();

        let prefixes = market_prefixes(category, &request.code);
        if prefixes.is_empty() {
            log::debug!("{} 不属于{}代码段，跳过", request.code, category);
            return Ok(RawHistory::default());
        }

        let mut errors = Vec::new();
        for prefix in prefixes {
            let secid = format!("{}.{}", prefix, request.code);
            log::debug!("请求 {} 日K线 secid={} fqt={}", category, secid, fqt);

            let response = self
                .client
                .get(format!("{}{}", self.base_url, KLINE_PATH))
                .query(&[
                    ("secid", secid.as_str()),
                    ("ut", EASTMONEY_UT),
                    ("fields1", "f1,f2,f3,f4,f5,f6"),
                    ("fields2", KLINE_FIELDS),
                    ("klt", KLINE_DAILY),
                    ("fqt", fqt),
                    ("beg", beg.as_str()),
                    ("end", end.as_str()),
                ])
                .header("Referer", "https://quote.eastmoney.com/")
                .send()
                .await;

            match read_kline(response).await {
                Ok(raw) if !raw.records.is_empty() => return Ok(raw),
                Ok(_) => {}
                Err(e) => {
                    log::warn!("secid={} 获取{}数据失败: {}", secid, category, e);
                    errors.push(format!("{}: {}", secid, e));
                }
            }
        }

        // 所有市场都失败才返回错误
        if errors.len() == prefixes.len() {
            return Err(anyhow!("获取{}数据失败: {}", category, errors.join("; ")));
        }
        Ok(RawHistory::default())
    }
}

impl HistorySource for EastmoneyClient {
    fn fetch_history<'a>(
        &'a self,
        category: DataSource,
        request: &'a HistoryRequest,
    ) -> BoxFuture<'a, Result<RawHistory>> {
        Box::pin(self.fetch_category(category, request))
    }
}

async fn read_kline(response: reqwest::Result<reqwest::Response>) -> Result<RawHistory> {
    let response = response?;
    if !response.status().is_success() {
        return Err(anyhow!("HTTP {}", response.status()));
    }
    let text = response.text().await?;
    parse_kline_response(&text)
}

/// secid 市场前缀，按顺序尝试，不属于该类别代码段时为空
///
/// - 股票：60/68 为沪市(1)；00/30 为深市(0)；4/8/92 为北交所(0)
/// - 基金：5 开头为沪市 ETF(1)；15/16 为深市(0)
/// - 指数：000 开头的代码在沪深两市都有，依次尝试 1、0、2(中证)、47
fn market_prefixes(category: DataSource, code: &str) -> &'static [&'static str] {
    let starts = |prefixes: &[&str]| prefixes.iter().any(|p| code.starts_with(*p));
    match category {
        DataSource::Stock if starts(&["60", "68"][..]) => &["1"],
        DataSource::Stock if starts(&["00", "30", "4", "8", "92"][..]) => &["0"],
        DataSource::Fund if starts(&["5"][..]) => &["1"],
        DataSource::Fund if starts(&["15", "16"][..]) => &["0"],
        DataSource::Stock | DataSource::Fund => &[],
        DataSource::Index => &["1", "0", "2", "47"],
    }
}

/// 指数不复权，股票和基金按请求复权
fn fqt_param(category: DataSource, adjust: Adjust) -> &'static str {
    match (category, adjust) {
        (DataSource::Index, _) | (_, Adjust::None) => "0",
        (_, Adjust::Forward) => "1",
        (_, Adjust::Backward) => "2",
    }
}

/// 解析接口响应，`data` 为 null 时返回空记录
fn parse_kline_response(text: &str) -> Result<RawHistory> {
    let response: KlineResponse =
        serde_json::from_str(text).context("解析K线响应失败")?;

    let Some(data) = response.data else {
        return Ok(RawHistory::default());
    };

    let records = data
        .klines
        .iter()
        .map(|line| parse_kline_line(line))
        .collect::<Result<Vec<_>>>()?;

    Ok(RawHistory {
        name: data.name.filter(|n| !n.trim().is_empty()),
        records,
    })
}

/// 解析单行K线：日期,开盘,收盘,最高,最低,成交量,成交额,振幅,涨跌幅,涨跌额,换手率
fn parse_kline_line(line: &str) -> Result<PriceRecord> {
    let fields: Vec<&str> = line.split(',').collect();
    if fields.len() < 6 {
        return Err(anyhow!("K线字段不足: {}", line));
    }

    let date = NaiveDate::parse_from_str(fields[0], "%Y-%m-%d")
        .with_context(|| format!("无效的日期: {}", fields[0]))?;
    let number = |idx: usize| -> Result<f64> {
        fields[idx]
            .parse::<f64>()
            .with_context(|| format!("无效的数值: {}", fields[idx]))
    };
    let optional = |idx: usize| fields.get(idx).and_then(|v| v.parse::<f64>().ok());

    let mut record = PriceRecord::ohlcv(date, number(1)?, number(2)?, number(3)?, number(4)?, number(5)?);
    record.amount = optional(6);
    record.amplitude = optional(7);
    record.pct_change = optional(8);
    record.price_change = optional(9);
    record.turnover = optional(10);

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DataConfig;
    use crate::services::market::MarketDataFetcher;
    use std::sync::Arc;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> EastmoneyClient {
        let config = ApiConfig {
            eastmoney_base_url: server.uri(),
            ..ApiConfig::default()
        };
        EastmoneyClient::new(&config).unwrap()
    }

    fn request(code: &str, adjust: Adjust) -> HistoryRequest {
        HistoryRequest {
            code: code.to_string(),
            start: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
            adjust,
        }
    }

    #[test]
    fn test_market_prefixes() {
        assert_eq!(market_prefixes(DataSource::Stock, "600000"), &["1"]);
        assert_eq!(market_prefixes(DataSource::Stock, "000001"), &["0"]);
        assert_eq!(market_prefixes(DataSource::Stock, "300750"), &["0"]);
        assert_eq!(market_prefixes(DataSource::Fund, "510300"), &["1"]);
        assert_eq!(market_prefixes(DataSource::Fund, "159919"), &["0"]);
        assert_eq!(market_prefixes(DataSource::Stock, "830799"), &["0"]);
        assert_eq!(market_prefixes(DataSource::Index, "000001").len(), 4);

        // 深市指数和 ETF 不属于股票代码段
        assert!(market_prefixes(DataSource::Stock, "399001").is_empty());
        assert!(market_prefixes(DataSource::Stock, "159919").is_empty());
        assert!(market_prefixes(DataSource::Stock, "510300").is_empty());
        assert!(market_prefixes(DataSource::Fund, "399006").is_empty());
        assert!(market_prefixes(DataSource::Fund, "600000").is_empty());
    }

    #[test]
    fn test_fqt_param() {
        assert_eq!(fqt_param(DataSource::Stock, Adjust::Forward), "1");
        assert_eq!(fqt_param(DataSource::Fund, Adjust::Backward), "2");
        assert_eq!(fqt_param(DataSource::Stock, Adjust::None), "0");
        assert_eq!(fqt_param(DataSource::Index, Adjust::Forward), "0");
    }

    #[test]
    fn test_parse_kline_line() {
        let record =
            parse_kline_line("2023-01-03,7.19,7.23,7.25,7.16,330129,237669984.00,1.25,0.56,0.04,0.11")
                .unwrap();
        assert_eq!(record.date, NaiveDate::from_ymd_opt(2023, 1, 3).unwrap());
        assert_eq!(record.open, 7.19);
        assert_eq!(record.close, 7.23);
        assert_eq!(record.high, 7.25);
        assert_eq!(record.low, 7.16);
        assert_eq!(record.volume, 330129.0);
        assert_eq!(record.pct_change, Some(0.56));
        assert_eq!(record.turnover, Some(0.11));
        assert!(record.daily_return.is_none());

        assert!(parse_kline_line("2023-01-03,7.19").is_err());
        assert!(parse_kline_line("bad-date,1,1,1,1,1").is_err());
    }

    #[test]
    fn test_parse_null_data() {
        let raw = parse_kline_response(r#"{"rc":0,"data":null}"#).unwrap();
        assert!(raw.records.is_empty());
        assert!(raw.name.is_none());
    }

    #[tokio::test]
    async fn test_fetch_stock_history() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KLINE_PATH))
            .and(query_param("secid", "1.600000"))
            .and(query_param("fqt", "1"))
            .and(query_param("beg", "20230101"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "rc": 0,
                "data": {
                    "code": "600000",
                    "name": "浦发银行",
                    "klines": [
                        "2023-01-03,7.19,7.23,7.25,7.16,330129,237669984.00,1.25,0.56,0.04,0.11",
                        "2023-01-04,7.23,7.27,7.30,7.20,280000,203000000.00,1.38,0.55,0.04,0.10"
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let raw = client
            .fetch_history(DataSource::Stock, &request("600000", Adjust::Forward))
            .await
            .unwrap();

        assert_eq!(raw.name.as_deref(), Some("浦发银行"));
        assert_eq!(raw.records.len(), 2);
        assert_eq!(raw.records[1].close, 7.27);
    }

    #[tokio::test]
    async fn test_index_tries_next_market() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KLINE_PATH))
            .and(query_param("secid", "1.399001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "rc": 0, "data": null
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(KLINE_PATH))
            .and(query_param("secid", "0.399001"))
            .and(query_param("fqt", "0"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "rc": 0,
                "data": {
                    "name": "深证成指",
                    "klines": ["2023-01-03,11015.95,11216.21,11216.21,10958.77,309999999,380000000000.00,2.35,2.01,220.99,1.21"]
                }
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let raw = client
            .fetch_history(DataSource::Index, &request("399001", Adjust::Forward))
            .await
            .unwrap();

        assert_eq!(raw.name.as_deref(), Some("深证成指"));
        assert_eq!(raw.records.len(), 1);
    }

    #[tokio::test]
    async fn test_http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KLINE_PATH))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let result = client
            .fetch_history(DataSource::Fund, &request("510300", Adjust::None))
            .await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("503"));
    }

    fn kline_body(name: &str) -> serde_json::Value {
        serde_json::json!({
            "rc": 0,
            "data": {
                "name": name,
                "klines": ["2023-01-03,11015.95,11216.21,11216.21,10958.77,309999999,380000000000.00,2.35,2.01,220.99,1.21"]
            }
        })
    }

    #[tokio::test]
    async fn test_index_continues_after_market_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KLINE_PATH))
            .and(query_param("secid", "1.000300"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(KLINE_PATH))
            .and(query_param("secid", "0.000300"))
            .respond_with(ResponseTemplate::new(200).set_body_json(kline_body("沪深300")))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let raw = client
            .fetch_history(DataSource::Index, &request("000300", Adjust::None))
            .await
            .unwrap();

        assert_eq!(raw.name.as_deref(), Some("沪深300"));
        assert_eq!(raw.records.len(), 1);
    }

    #[tokio::test]
    async fn test_index_fails_only_when_every_market_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(KLINE_PATH))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .fetch_history(DataSource::Index, &request("000300", Adjust::None))
            .await
            .unwrap_err()
            .to_string();

        assert!(err.contains("1.000300"));
        assert!(err.contains("47.000300"));
    }

    #[tokio::test]
    async fn test_shenzhen_index_detected_as_index() {
        let server = MockServer::start().await;
        // 接口对深市指数同样响应 0.399001，无论复权参数
        Mock::given(method("GET"))
            .and(path(KLINE_PATH))
            .and(query_param("secid", "0.399001"))
            .respond_with(ResponseTemplate::new(200).set_body_json(kline_body("深证成指")))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(KLINE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "rc": 0, "data": null
            })))
            .mount(&server)
            .await;

        let fetcher = MarketDataFetcher::new(Arc::new(client_for(&server)), &DataConfig::default());
        let series = fetcher
            .fetch_single(
                "399001",
                NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2023, 1, 31).unwrap(),
                Adjust::Forward,
            )
            .await
            .unwrap();

        assert_eq!(series.data_source, DataSource::Index);
        assert_eq!(series.name, "深证成指");

        let requests = server.received_requests().await.unwrap();
        assert!(requests.iter().all(|r| !r.url.query().unwrap_or("").contains("fqt=1")));
    }
}
