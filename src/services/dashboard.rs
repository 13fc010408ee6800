//! 可视化页面
//!
//! 服务端渲染的 HTML 页面：侧边栏输入、图表选项卡、数据表和下载链接。
//! 图表以 `<img>` 引用 `/api/v1/charts/*.svg`，数据由缓存复用

use chrono::NaiveDate;
use url::form_urlencoded;

use super::chart::ChartRange;
use super::export::ExportKind;
use super::report::{DashboardRequest, Report};
use crate::config::AppConfig;
use crate::models::{labels, Adjust, VisualizeQuery};
use crate::utils::formatters::{
    format_currency, format_date_range, format_optional, format_percentage, format_summary_stats,
};

const PAGE_TITLE: &str = "多股票和指数可视化工具 | Multi-Stock & Index Visualization";
const MAX_WIDTH: u32 = 1200;

/// 页面状态
pub enum DashboardState {
    /// 没有输入或输入无效，展示示例图表
    Prompt { error: Option<String> },
    /// 输入有效但所有代码都没有数据
    Empty {
        request: DashboardRequest,
        failures: Vec<String>,
    },
    Ready {
        request: DashboardRequest,
        report: Report,
    },
}

/// 渲染整个页面
pub fn render_page(
    state: &DashboardState,
    query: &VisualizeQuery,
    config: &AppConfig,
    today: NaiveDate,
) -> String {
    let mut body = String::new();
    render_header(&mut body);

    match state {
        DashboardState::Prompt { error } => {
            if let Some(error) = error {
                message(&mut body, "error", error);
            }
            render_example_section(&mut body, query.api_key.as_deref());
        }
        DashboardState::Empty { request, failures } => {
            for warning in request.warnings() {
                message(&mut body, "warning", &warning);
            }
            for failure in failures {
                message(&mut body, "warning", failure);
            }
            message(
                &mut body,
                "error",
                "无法获取数据，请检查代码和日期范围 | Failed to fetch data, please check codes and date range",
            );
        }
        DashboardState::Ready { request, report } => {
            render_report(&mut body, request, report, query.api_key.as_deref());
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>{style}</style>
</head>
<body>
<aside class="sidebar">{sidebar}</aside>
<main class="main">{body}</main>
</body>
</html>"#,
        title = escape(PAGE_TITLE),
        style = stylesheet(),
        sidebar = render_sidebar(query, config, today),
        body = body,
    )
}

fn render_header(out: &mut String) {
    out.push_str("<h1>📊 股票与指数可视化工具 | Stock &amp; Index Visualization Tool</h1>");
    out.push_str(
        "<p>使用此工具可视化和比较多个股票或指数的表现。| Use this tool to visualize and compare multiple stocks or indices performance.</p><hr>",
    );
}

fn render_sidebar(query: &VisualizeQuery, config: &AppConfig, today: NaiveDate) -> String {
    let start = query
        .start_date
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| config.data.default_start_date.to_string());
    let end = query
        .end_date
        .clone()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| today.to_string());
    let selected_adjust = query
        .adjust
        .as_deref()
        .and_then(|a| a.parse::<Adjust>().ok())
        .unwrap_or_default();

    let mut html = String::new();
    html.push_str(r#"<h2>输入参数 | Input Parameters</h2><form method="get" action="/">"#);
    if let Some(key) = query.api_key.as_deref() {
        html.push_str(&format!(r#"<input type="hidden" name="api_key" value="{}">"#, escape(key)));
    }

    html.push_str(&format!(
        r#"<h3>股票/指数代码 | Stock/Index Codes</h3>
<label for="codes">输入股票或指数代码，用逗号分隔 | Enter stock or index codes, separated by commas</label>
<textarea id="codes" name="codes" rows="3" placeholder="600000,601288,000001" title="例如: 600000,601288,000001,399001 | Example: 600000,601288,000001,399001">{codes}</textarea>
<h3>日期范围 | Date Range</h3>
<label for="start_date">开始日期 | Start Date</label>
<input type="date" id="start_date" name="start_date" value="{start}" min="{min}" max="{max}">
<label for="end_date">结束日期 | End Date</label>
<input type="date" id="end_date" name="end_date" value="{end}" min="{min}" max="{max}">
<label class="checkbox"><input type="checkbox" name="normalize" value="on"{checked}> 标准化价格 (首日=100) | Normalize Prices (First Day=100)</label>
<label for="adjust">价格调整方式 | Price Adjustment</label>
<select id="adjust" name="adjust">"#,
        codes = escape(query.codes.as_deref().unwrap_or("")),
        start = escape(&start),
        end = escape(&end),
        min = config.data.min_date,
        max = today,
        checked = if query.normalize_enabled() { " checked" } else { "" },
    ));
    for adjust in Adjust::ALL {
        html.push_str(&format!(
            r#"<option value="{}"{}>{}</option>"#,
            adjust.as_str(),
            if adjust == selected_adjust { " selected" } else { "" },
            adjust.label()
        ));
    }
    html.push_str(r#"</select><button type="submit">查询 | Submit</button></form>"#);

    html.push_str(
        r#"<hr><div class="info"><strong>信息 | Info:</strong><ul>
<li>股票代码: 6位数字，例如 600000 (股票)</li>
<li>基金代码: 6位数字，例如 510300 (ETF基金)</li>
<li>指数代码: 6位数字，例如 000001 (上证指数)</li>
</ul><p>系统会自动检测代码类型并从适当的数据源获取数据。<br>System will automatically detect code type and fetch data from appropriate source.</p></div>
<details><summary>示例代码 | Example Codes</summary>
<p><strong>热门股票 | Popular Stocks:</strong></p><ul><li>600000 (浦发银行)</li><li>000001 (平安银行)</li><li>601318 (中国平安)</li><li>000002 (万科A)</li></ul>
<p><strong>主要指数 | Major Indices:</strong></p><ul><li>000001 (上证指数)</li><li>399001 (深证成指)</li><li>399006 (创业板指)</li></ul>
<p><strong>热门ETF | Popular ETFs:</strong></p><ul><li>510300 (沪深300ETF)</li><li>510500 (中证500ETF)</li><li>159919 (沪深300ETF)</li></ul>
</details>"#,
    );

    html
}

fn render_example_section(out: &mut String, api_key: Option<&str>) {
    message(out, "info", "请在侧边栏输入股票或指数代码 | Please enter stock or index codes in the sidebar");
    out.push_str("<h3>示例图表 | Example Chart</h3>");
    out.push_str("<p>输入股票或指数代码后将显示类似下面的图表 | After entering stock or index codes, you'll see a chart similar to the one below</p>");

    let mut src = "/api/v1/charts/example.svg".to_string();
    if let Some(key) = api_key {
        let qs = form_urlencoded::Serializer::new(String::new())
            .append_pair("api_key", key)
            .finish();
        src = format!("{}?{}", src, qs);
    }
    out.push_str(&format!(r#"<img class="chart" src="{}" alt="example chart">"#, escape(&src)));

    out.push_str(
        r#"<h3>功能特点 | Key Features</h3><div class="columns">
<div><strong>📈 多数据源支持</strong><ul><li>股票数据</li><li>ETF基金数据</li><li>指数数据</li><li>自动检测数据类型</li></ul></div>
<div><strong>📊 丰富的可视化</strong><ul><li>交互式价格图表</li><li>成交量分析</li><li>收益率比较</li><li>标准化对比</li></ul></div>
<div><strong>📋 数据分析工具</strong><ul><li>统计摘要</li><li>股票比较</li><li>多格式下载</li><li>实时数据缓存</li></ul></div>
</div>"#,
    );
}

fn render_report(out: &mut String, request: &DashboardRequest, report: &Report, api_key: Option<&str>) {
    for warning in request.warnings() {
        message(out, "warning", &warning);
    }
    for failure in &report.failures {
        message(out, "warning", &format!("No data found for {}: {}", failure.code, failure.message));
    }
    for warning in &report.warnings {
        message(out, "warning", warning);
    }
    message(
        out,
        "success",
        &format!(
            "成功获取 {} 个股票/指数的数据 | Successfully fetched data for {} stocks/indices ({})",
            report.series.len(),
            report.series.len(),
            format_date_range(report.start_date, report.end_date)
        ),
    );
    message(out, "info", &format!("Data sources used: {}", report.source_info()));

    out.push_str("<h3>📈 图表分析 | Chart Analysis</h3>");
    render_charts(out, request, api_key);

    out.push_str("<h3>📋 数据分析 | Data Analysis</h3>");
    render_data_info(out, report);
    render_data_table(out, request, report, api_key);
    render_summary(out, request, report, api_key);
    render_comparison(out, request, report, api_key);
}

fn render_charts(out: &mut String, request: &DashboardRequest, api_key: Option<&str>) {
    out.push_str(r#"<div class="ranges">"#);
    for range in ChartRange::ALL {
        let qs = link_query(request, api_key, Some(range));
        out.push_str(&format!(
            r#"<a class="range{}" href="/?{}">{}</a>"#,
            if range == request.range { " active" } else { "" },
            escape(&qs),
            range.label()
        ));
    }
    out.push_str("</div>");

    let qs = escape(&link_query(request, api_key, None));
    let tabs = [
        ("price", "价格走势 | Price Trends"),
        ("volume", "成交量 | Volume"),
        ("returns", "收益率 | Returns"),
    ];

    out.push_str(r#"<div class="tabs">"#);
    for (i, (kind, title)) in tabs.iter().enumerate() {
        out.push_str(&format!(
            r#"<input type="radio" name="tab" id="tab-{kind}"{checked}><label for="tab-{kind}">{title}</label><div class="tab"><img class="chart" src="/api/v1/charts/{kind}.svg?{qs}" alt="{title}"></div>"#,
            kind = kind,
            title = title,
            qs = qs,
            checked = if i == 0 { " checked" } else { "" },
        ));
    }
    out.push_str("</div>");
}

fn render_data_info(out: &mut String, report: &Report) {
    let info = report.data_info();
    let metrics = [
        ("股票数量 | Number of Stocks", info.symbols.to_string()),
        ("数据点总数 | Total Data Points", info.data_points.to_string()),
        ("时间跨度 (天) | Time Span (Days)", info.span_days.to_string()),
        ("数据源数量 | Data Sources", info.data_sources.to_string()),
    ];

    out.push_str(r#"<div class="columns metrics">"#);
    for (label, value) in metrics {
        out.push_str(&format!(
            r#"<div class="metric"><span class="label">{}</span><span class="value">{}</span></div>"#,
            label, value
        ));
    }
    out.push_str("</div>");
}

fn render_data_table(out: &mut String, request: &DashboardRequest, report: &Report, api_key: Option<&str>) {
    out.push_str("<details><summary>查看数据表 &amp; 下载 | View Data Table &amp; Download</summary>");
    out.push_str(r#"<div class="scroll"><table><thead><tr>"#);
    for header in labels::display_headers(report.normalized) {
        out.push_str(&format!("<th>{}</th>", header));
    }
    out.push_str("</tr></thead><tbody>");
    for row in report.display_rows() {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            row.date,
            escape(&row.code),
            escape(&row.name),
            row.data_source,
            format_optional(Some(row.close), 2),
            row.pct_change
                .map(|v| format_percentage(v, 2))
                .unwrap_or_else(|| "N/A".to_string()),
        ));
    }
    out.push_str("</tbody></table></div>");

    out.push_str("<h4>下载数据 | Download Data</h4>");
    download_links(
        out,
        request,
        api_key,
        &[ExportKind::RawCsv, ExportKind::FormattedCsv, ExportKind::Json],
    );
    out.push_str("</details>");
}

fn render_summary(out: &mut String, request: &DashboardRequest, report: &Report, api_key: Option<&str>) {
    out.push_str("<details><summary>统计摘要 | Summary Statistics</summary>");
    if report.summary.is_empty() {
        message(out, "info", "无法生成统计摘要 | Cannot generate summary statistics");
        out.push_str("</details>");
        return;
    }

    let rows: Vec<_> = report.summary.iter().map(format_summary_stats).collect();
    let headers = rows.iter().max_by_key(|r| r.len()).cloned().unwrap_or_default();

    out.push_str("<table><thead><tr>");
    for (header, _) in &headers {
        out.push_str(&format!("<th>{}</th>", header));
    }
    out.push_str("</tr></thead><tbody>");
    for row in &rows {
        out.push_str("<tr>");
        for (header, _) in &headers {
            let value = row
                .iter()
                .find(|(k, _)| k == header)
                .map(|(_, v)| v.as_str())
                .unwrap_or("N/A");
            out.push_str(&format!("<td>{}</td>", escape(value)));
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    download_links(out, request, api_key, &[ExportKind::SummaryCsv]);
    out.push_str("</details>");
}

fn render_comparison(out: &mut String, request: &DashboardRequest, report: &Report, api_key: Option<&str>) {
    if report.comparison.is_empty() {
        return;
    }

    out.push_str("<details><summary>股票比较 | Stock Comparison</summary><table><thead><tr>");
    for header in [
        "代码 | Code",
        "名称 | Name",
        "起始价格 | Start Price",
        "结束价格 | End Price",
        "总收益率 (%) | Total Return (%)",
        "最高价 | Max Price",
        "最低价 | Min Price",
        "年化波动率 (%) | Annual Volatility (%)",
        "数据点数 | Data Points",
    ] {
        out.push_str(&format!("<th>{}</th>", header));
    }
    out.push_str("</tr></thead><tbody>");
    for row in &report.comparison {
        out.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            escape(&row.code),
            escape(&row.name),
            format_currency(row.start_price),
            format_currency(row.end_price),
            format_percentage(row.total_return_pct, 2),
            format_currency(row.max_price),
            format_currency(row.min_price),
            format_percentage(row.volatility_annual_pct, 2),
            row.data_points,
        ));
    }
    out.push_str("</tbody></table>");
    download_links(out, request, api_key, &[ExportKind::ComparisonCsv]);
    out.push_str("</details>");
}

fn download_links(out: &mut String, request: &DashboardRequest, api_key: Option<&str>, kinds: &[ExportKind]) {
    let qs = escape(&link_query(request, api_key, None));
    out.push_str(r#"<div class="downloads">"#);
    for kind in kinds {
        out.push_str(&format!(
            r#"<a class="download" href="/api/v1/export/{}?{}">{}</a>"#,
            kind.path(),
            qs,
            kind.label()
        ));
    }
    out.push_str("</div>");
}

fn message(out: &mut String, level: &str, text: &str) {
    out.push_str(&format!(r#"<div class="msg {}">{}</div>"#, level, escape(text)));
}

/// 把请求还原成查询字符串，供图表、区间按钮和下载链接使用
pub fn link_query(request: &DashboardRequest, api_key: Option<&str>, range: Option<ChartRange>) -> String {
    let mut qs = form_urlencoded::Serializer::new(String::new());
    qs.append_pair("codes", &request.codes.join(","))
        .append_pair("start_date", &request.start.to_string())
        .append_pair("end_date", &request.end.to_string())
        .append_pair("adjust", request.adjust.as_str())
        .append_pair("range", range.unwrap_or(request.range).as_str());
    if request.normalize {
        qs.append_pair("normalize", "on");
    }
    if let Some(key) = api_key {
        qs.append_pair("api_key", key);
    }
    qs.finish()
}

/// HTML 转义
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(ch),
        }
    }
    escaped
}

fn stylesheet() -> String {
    format!(
        r#"
body {{ margin: 0; display: flex; font-family: sans-serif; background-color: #f5f7f9; color: #0e1117; }}
.sidebar {{ width: 320px; padding: 1rem; background-color: #f0f2f6; min-height: 100vh; box-sizing: border-box; }}
.sidebar label {{ display: block; margin-top: 0.5rem; font-size: 0.9rem; }}
.sidebar textarea, .sidebar input[type=date], .sidebar select {{ width: 100%; box-sizing: border-box; }}
.sidebar label.checkbox {{ margin-top: 1rem; }}
.sidebar button {{ margin-top: 1rem; width: 100%; }}
.main {{ flex: 1; max-width: {max_width}px; margin: 0 auto; padding: 2rem; }}
.msg {{ padding: 0.75rem 1rem; border-radius: 0.5rem; margin: 0.5rem 0; }}
.msg.error {{ background: #ffe0e0; }}
.msg.warning {{ background: #fff5d6; }}
.msg.success {{ background: #ddf5e3; }}
.msg.info {{ background: #e1effe; }}
.chart {{ width: 100%; background: white; border: 1px solid #ddd; border-radius: 0.5rem; }}
.columns {{ display: flex; gap: 1rem; }}
.metric .label {{ display: block; font-size: 0.85rem; color: #555; }}
.metric .value {{ display: block; font-size: 1.6rem; }}
.columns > div {{ flex: 1; background: white; border: 1px solid #ddd; padding: 1rem; border-radius: 0.5rem; box-shadow: 0 1px 3px rgba(0,0,0,0.12); }}
.tabs > input {{ display: none; }}
.tabs > label {{ display: inline-block; padding: 0.5rem 1rem; cursor: pointer; border-bottom: 2px solid transparent; }}
.tabs > input:checked + label {{ border-bottom-color: #ff6b6b; }}
.tabs > .tab {{ display: none; }}
.tabs > input:checked + label + .tab {{ display: block; }}
.ranges a {{ margin-right: 0.5rem; }}
.ranges a.active {{ font-weight: bold; }}
.scroll {{ max-height: 400px; overflow: auto; }}
table {{ border-collapse: collapse; width: 100%; background: white; }}
th, td {{ padding: 0.25rem 0.5rem; border-bottom: 1px solid #eee; text-align: left; }}
a.download {{ display: inline-block; background-color: #ff6b6b; color: white; border-radius: 4px; padding: 0.5rem 1rem; margin: 0.5rem 0.5rem 0 0; text-decoration: none; font-weight: 500; }}
a.download:hover {{ background-color: #ff5252; }}
"#,
        max_width = MAX_WIDTH
    )
}
