//! 图表渲染
//!
//! 使用 plotters 的 SVGBackend 在服务端生成价格走势、成交量、累计收益率和示例图表

use anyhow::{anyhow, Result};
use chrono::{Datelike, Months, NaiveDate, Weekday};
use plotters::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::fmt::Display;
use std::str::FromStr;

use super::processor;
use crate::config::ChartConfig;
use crate::models::{DataSource, PriceRecord, SymbolSeries};
use crate::utils::validators::ValidationError;

/// 图表时间区间（对应页面上的区间按钮）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChartRange {
    OneMonth,
    ThreeMonths,
    SixMonths,
    OneYear,
    #[default]
    All,
}

impl ChartRange {
    pub const ALL: [ChartRange; 5] = [
        ChartRange::OneMonth,
        ChartRange::ThreeMonths,
        ChartRange::SixMonths,
        ChartRange::OneYear,
        ChartRange::All,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ChartRange::OneMonth => "1m",
            ChartRange::ThreeMonths => "3m",
            ChartRange::SixMonths => "6m",
            ChartRange::OneYear => "1y",
            ChartRange::All => "all",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ChartRange::OneMonth => "1月 | 1M",
            ChartRange::ThreeMonths => "3月 | 3M",
            ChartRange::SixMonths => "6月 | 6M",
            ChartRange::OneYear => "1年 | 1Y",
            ChartRange::All => "全部 | All",
        }
    }

    fn months(&self) -> Option<u32> {
        match self {
            ChartRange::OneMonth => Some(1),
            ChartRange::ThreeMonths => Some(3),
            ChartRange::SixMonths => Some(6),
            ChartRange::OneYear => Some(12),
            ChartRange::All => None,
        }
    }

    /// 以所有序列中最晚的日期为终点，向前截取区间
    pub fn apply(&self, series: &[SymbolSeries]) -> Vec<SymbolSeries> {
        let mut trimmed = series.to_vec();
        let cutoff = self.months().and_then(|months| {
            let latest = series.iter().filter_map(|s| s.last_date()).max()?;
            latest.checked_sub_months(Months::new(months))
        });

        if let Some(cutoff) = cutoff {
            for s in trimmed.iter_mut() {
                s.records.retain(|r| r.date >= cutoff);
            }
        }
        trimmed
    }
}

impl FromStr for ChartRange {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "1m" | "1month" => Ok(ChartRange::OneMonth),
            "3m" | "3months" => Ok(ChartRange::ThreeMonths),
            "6m" | "6months" => Ok(ChartRange::SixMonths),
            "1y" | "1year" => Ok(ChartRange::OneYear),
            "all" => Ok(ChartRange::All),
            other => Err(ValidationError::InvalidRange(other.to_string())),
        }
    }
}

/// 图表种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartKind {
    Price,
    Volume,
    Returns,
}

impl FromStr for ChartKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim_end_matches(".svg") {
            "price" => Ok(ChartKind::Price),
            "volume" => Ok(ChartKind::Volume),
            "returns" => Ok(ChartKind::Returns),
            other => Err(format!("未知的图表类型: {}", other)),
        }
    }
}

/// 一条折线
struct Line {
    label: String,
    color: RGBColor,
    points: Vec<(NaiveDate, f64)>,
}

/// SVG 图表渲染器
pub struct ChartRenderer {
    width: u32,
    height: u32,
    volume_height: u32,
    colors: Vec<RGBColor>,
}

impl ChartRenderer {
    pub fn new(config: &ChartConfig) -> Self {
        let mut colors: Vec<RGBColor> = config.colors.iter().filter_map(|c| parse_hex_color(c)).collect();
        if colors.is_empty() {
            log::warn!("图表颜色配置无效，使用默认颜色");
            colors.push(BLUE);
        }

        Self {
            width: config.width,
            height: config.height,
            volume_height: config.volume_height,
            colors,
        }
    }

    fn color(&self, idx: usize) -> RGBColor {
        self.colors[idx % self.colors.len()]
    }

    pub fn render(&self, kind: ChartKind, series: &[SymbolSeries], normalized: bool) -> Result<String> {
        match kind {
            ChartKind::Price => self.price_chart(series, normalized),
            ChartKind::Volume => self.volume_chart(series),
            ChartKind::Returns => self.returns_chart(series),
        }
    }

    /// 价格走势图，每个代码一条曲线
    pub fn price_chart(&self, series: &[SymbolSeries], normalized: bool) -> Result<String> {
        let lines = self.lines(series, |r| Some(r.close));

        let mut title = "股票/指数价格走势 | Stock/Index Price Trends".to_string();
        if normalized {
            title.push_str(" (标准化: 首日=100 | Normalized: First Day=100)");
        }
        let y_desc = if normalized {
            "标准化价格指数 | Normalized Price Index"
        } else {
            "价格 | Price"
        };

        self.line_chart(&title, y_desc, lines, false)
    }

    /// 累计收益率图（%），带零线
    pub fn returns_chart(&self, series: &[SymbolSeries]) -> Result<String> {
        let lines = self.lines(series, |r| r.cumulative_return.map(|v| v * 100.0));
        self.line_chart(
            "累计收益率 | Cumulative Returns",
            "累计收益率 (%) | Cumulative Returns (%)",
            lines,
            true,
        )
    }

    /// 成交量柱状图
    pub fn volume_chart(&self, series: &[SymbolSeries]) -> Result<String> {
        let bars: Vec<Line> = self.lines(series, |r| Some(r.volume));
        let (x_range, _) = bounds(&bars).ok_or_else(|| anyhow!("成交量数据不可用 | Volume data not available"))?;
        let y_max = bars
            .iter()
            .flat_map(|b| b.points.iter().map(|p| p.1))
            .fold(0.0_f64, f64::max)
            .max(1.0)
            * 1.1;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.volume_height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption("成交量 | Trading Volume", ("sans-serif", 22).into_font())
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(80)
                .build_cartesian_2d(x_range.0..x_range.1, 0.0..y_max)
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .x_desc("日期 | Date")
                .y_desc("成交量 | Volume")
                .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
                .draw()
                .map_err(draw_err)?;

            for bar in &bars {
                let style = bar.color.mix(0.7).filled();
                chart
                    .draw_series(bar.points.iter().map(|&(date, volume)| {
                        let next = date.succ_opt().unwrap_or(date);
                        Rectangle::new([(date, 0.0), (next, volume)], style)
                    }))
                    .map_err(draw_err)?
                    .label(bar.label.as_str())
                    .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], style));
            }

            chart
                .configure_series_labels()
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(draw_err)?;

            root.present().map_err(draw_err)?;
        }

        Ok(svg)
    }

    /// 示例图表：三只标的 2023 年工作日的模拟走势，标准化后展示
    pub fn example_chart(&self) -> Result<String> {
        let mut series = example_series();
        processor::normalize(&mut series);
        self.price_chart(&series, true)
    }

    fn lines<F>(&self, series: &[SymbolSeries], value: F) -> Vec<Line>
    where
        F: Fn(&PriceRecord) -> Option<f64>,
    {
        series
            .iter()
            .enumerate()
            .map(|(idx, s)| Line {
                label: s.display_name(),
                color: self.color(idx),
                points: s
                    .records
                    .iter()
                    .filter_map(|r| value(r).filter(|v| v.is_finite()).map(|v| (r.date, v)))
                    .collect(),
            })
            .filter(|line| !line.points.is_empty())
            .collect()
    }

    fn line_chart(&self, title: &str, y_desc: &str, lines: Vec<Line>, zero_line: bool) -> Result<String> {
        let (x_range, (mut y_min, mut y_max)) =
            bounds(&lines).ok_or_else(|| anyhow!("无法显示图表：数据为空 | Cannot display charts: No data available"))?;
        if zero_line {
            y_min = y_min.min(0.0);
            y_max = y_max.max(0.0);
        }
        let padding = (y_max - y_min).max(1e-8) * 0.1;

        let mut svg = String::new();
        {
            let root = SVGBackend::with_string(&mut svg, (self.width, self.height)).into_drawing_area();
            root.fill(&WHITE).map_err(draw_err)?;

            let mut chart = ChartBuilder::on(&root)
                .caption(title, ("sans-serif", 22).into_font())
                .margin(15)
                .x_label_area_size(40)
                .y_label_area_size(70)
                .build_cartesian_2d(x_range.0..x_range.1, (y_min - padding)..(y_max + padding))
                .map_err(draw_err)?;

            chart
                .configure_mesh()
                .x_desc("日期 | Date")
                .y_desc(y_desc)
                .x_label_formatter(&|d: &NaiveDate| d.format("%Y-%m-%d").to_string())
                .draw()
                .map_err(draw_err)?;

            if zero_line {
                chart
                    .draw_series(LineSeries::new(
                        vec![(x_range.0, 0.0), (x_range.1, 0.0)],
                        BLACK.mix(0.4).stroke_width(1),
                    ))
                    .map_err(draw_err)?;
            }

            for line in lines {
                let color = line.color;
                chart
                    .draw_series(LineSeries::new(line.points, color.stroke_width(2)))
                    .map_err(draw_err)?
                    .label(line.label)
                    .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
            }

            chart
                .configure_series_labels()
                .position(SeriesLabelPosition::UpperLeft)
                .background_style(WHITE.mix(0.8))
                .border_style(BLACK)
                .draw()
                .map_err(draw_err)?;

            root.present().map_err(draw_err)?;
        }

        Ok(svg)
    }
}

fn draw_err<E: Display>(e: E) -> anyhow::Error {
    anyhow!("绘制图表失败: {}", e)
}

/// 所有折线的日期范围和数值范围
fn bounds(lines: &[Line]) -> Option<((NaiveDate, NaiveDate), (f64, f64))> {
    let points = lines.iter().flat_map(|l| l.points.iter());
    let mut x_min: Option<NaiveDate> = None;
    let mut x_max: Option<NaiveDate> = None;
    let mut y_min = f64::INFINITY;
    let mut y_max = f64::NEG_INFINITY;

    for &(date, value) in points {
        x_min = Some(x_min.map_or(date, |d| d.min(date)));
        x_max = Some(x_max.map_or(date, |d| d.max(date)));
        y_min = y_min.min(value);
        y_max = y_max.max(value);
    }

    let (x_min, mut x_max) = (x_min?, x_max?);
    if x_max <= x_min {
        x_max = x_min.succ_opt().unwrap_or(x_min);
    }
    Some(((x_min, x_max), (y_min, y_max)))
}

fn parse_hex_color(hex: &str) -> Option<RGBColor> {
    let hex = hex.trim().strip_prefix('#')?;
    if hex.len() != 6 {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(hex.get(i..i + 2)?, 16).ok();
    Some(RGBColor(channel(0)?, channel(2)?, channel(4)?))
}

/// 示例数据，固定随机种子保证每次一致
fn example_series() -> Vec<SymbolSeries> {
    let examples = [("600000", "浦发银行"), ("601288", "农业银行"), ("000001", "上证指数")];
    let mut rng = StdRng::seed_from_u64(42);

    let (Some(start), Some(end)) = (
        NaiveDate::from_ymd_opt(2023, 1, 1),
        NaiveDate::from_ymd_opt(2023, 12, 31),
    ) else {
        return Vec::new();
    };
    let business_days: Vec<NaiveDate> = start
        .iter_days()
        .take_while(|d| *d <= end)
        .filter(|d| !matches!(d.weekday(), Weekday::Sat | Weekday::Sun))
        .collect();

    examples
        .iter()
        .enumerate()
        .map(|(i, (code, name))| {
            let volatility = 0.01 + i as f64 * 0.005;
            let mut price = 100.0 + i as f64 * 20.0;
            let records = business_days
                .iter()
                .enumerate()
                .map(|(day, &date)| {
                    if day > 0 {
                        price *= 1.0 + 0.0003 + volatility * standard_normal(&mut rng);
                    }
                    PriceRecord::ohlcv(date, price, price, price, price, 0.0)
                })
                .collect();

            SymbolSeries {
                code: code.to_string(),
                name: name.to_string(),
                data_source: DataSource::Stock,
                records,
            }
        })
        .collect()
}

/// Box-Muller 变换
fn standard_normal(rng: &mut StdRng) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
