//! 多股票和指数可视化服务
//!
//! 提供 A 股股票、ETF 基金和指数的日K线获取、比较图表和数据下载
//! 数据来源：东方财富

mod config;     // 配置加载
mod handlers;   // HTTP 请求处理器
mod middleware; // 中间件
mod models;     // 数据模型定义
mod services;   // 业务逻辑服务
mod utils;      // 校验、格式化等工具

use actix_web::{middleware::Logger, web, App, HttpServer};
use env_logger::Env;
use std::io;
use std::sync::Arc;

use crate::config::AppConfig;
use crate::handlers::AppState;
use crate::middleware::ApiKeyMiddleware;
use crate::services::market::{EastmoneyClient, MarketDataFetcher};

/// 应用程序入口
///
/// 启动 HTTP 服务器，监听配置中的地址（默认 0.0.0.0:8080）
#[actix_web::main]
async fn main() -> io::Result<()> {
    let config = AppConfig::load();

    // 初始化日志系统，RUST_LOG 优先于配置文件
    env_logger::init_from_env(Env::default().default_filter_or(config.log.level.as_str()));

    let client = EastmoneyClient::new(&config.api)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, format!("创建 HTTP 客户端失败: {}", e)))?;
    let fetcher = MarketDataFetcher::new(Arc::new(client), &config.data);

    let bind_addr = config.bind_addr();
    let workers = config.server.workers;
    let api_key = config.api.api_key.clone();
    let state = web::Data::new(AppState::new(config, fetcher));

    log::info!("启动可视化服务: http://{}", bind_addr);

    let mut server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::default()) // 请求日志
            .wrap(ApiKeyMiddleware::new(api_key.clone())) // API Key 认证
            .configure(handlers::config)
    });
    if workers > 0 {
        server = server.workers(workers);
    }

    server.bind(bind_addr)?.run().await
}
