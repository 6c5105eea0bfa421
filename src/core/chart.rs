use crate::domain::model::MinuteCount;
use crate::domain::ports::ConfigProvider;
use crate::utils::error::{AnalyzerError, Result};
use crate::utils::validation::{validate_file_extension, FONT_EXTENSIONS};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::NaiveDateTime;
use std::fmt::Write as _;
use std::path::Path;

/// Font stack that covers CJK glyphs on common hosts.
pub const DEFAULT_FONT_FAMILIES: [&str; 6] = [
    "Noto Sans CJK TC",
    "Noto Sans CJK SC",
    "Noto Sans TC",
    "Microsoft JhengHei",
    "PingFang TC",
    "sans-serif",
];

const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 30.0;
const MARGIN_TOP: f64 = 50.0;
const MARGIN_BOTTOM: f64 = 60.0;
const MAX_X_TICKS: i64 = 8;
const X_TICK_STEPS_MINUTES: [i64; 12] = [1, 2, 5, 10, 15, 30, 60, 120, 180, 360, 720, 1440];

/// A font file to embed into rendered charts.
#[derive(Debug, Clone, PartialEq)]
pub struct FontAsset {
    pub family: String,
    pub extension: String,
    pub bytes: Vec<u8>,
}

impl FontAsset {
    pub fn from_upload(file_name: &str, bytes: Vec<u8>) -> Result<Self> {
        let extension = validate_file_extension("font", file_name, FONT_EXTENSIONS).map_err(
            |e| AnalyzerError::UnsupportedUploadError {
                file_name: file_name.to_string(),
                reason: e.to_string(),
            },
        )?;
        if bytes.is_empty() {
            return Err(AnalyzerError::UnsupportedUploadError {
                file_name: file_name.to_string(),
                reason: "font file is empty".to_string(),
            });
        }

        let family: String = Path::new(file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .chars()
            .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
            .collect();
        let family = if family.trim().is_empty() {
            "UploadedFont".to_string()
        } else {
            family.trim().to_string()
        };

        Ok(Self {
            family,
            extension,
            bytes,
        })
    }

    /// Builds the asset from a font already read from `path`.
    pub fn from_file(path: &str, bytes: Vec<u8>) -> Result<Self> {
        let file_name = Path::new(path)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(path);
        Self::from_upload(file_name, bytes)
    }

    fn css_format(&self) -> (&'static str, &'static str) {
        match self.extension.as_str() {
            "otf" => ("font/otf", "opentype"),
            "ttc" => ("font/collection", "collection"),
            "woff" => ("font/woff", "woff"),
            "woff2" => ("font/woff2", "woff2"),
            _ => ("font/ttf", "truetype"),
        }
    }

    fn font_face_css(&self) -> String {
        let (mime, format) = self.css_format();
        format!(
            "@font-face{{font-family:'{}';src:url(data:{};base64,{}) format('{}');}}",
            self.family,
            mime,
            STANDARD.encode(&self.bytes),
            format
        )
    }
}

#[derive(Debug, Clone)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    pub title: Option<String>,
    pub font_families: Vec<String>,
    pub font: Option<FontAsset>,
}

impl Default for ChartOptions {
    fn default() -> Self {
        Self {
            width: 1000,
            height: 500,
            title: None,
            font_families: DEFAULT_FONT_FAMILIES.iter().map(|f| f.to_string()).collect(),
            font: None,
        }
    }
}

impl ChartOptions {
    pub fn from_config<C: ConfigProvider + ?Sized>(config: &C) -> Self {
        let defaults = Self::default();
        Self {
            width: config.chart_width().unwrap_or(defaults.width),
            height: config.chart_height().unwrap_or(defaults.height),
            title: config.chart_title().map(str::to_string),
            font_families: config
                .font_families()
                .map(<[String]>::to_vec)
                .unwrap_or(defaults.font_families),
            font: None,
        }
    }

    fn font_stack(&self) -> String {
        let uploaded = self.font.as_ref().map(|f| f.family.as_str());
        uploaded
            .into_iter()
            .chain(self.font_families.iter().map(String::as_str))
            .map(|family| {
                if is_generic_family(family) {
                    family.to_string()
                } else {
                    format!("'{}'", family.replace('\'', ""))
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

fn is_generic_family(family: &str) -> bool {
    matches!(
        family,
        "serif" | "sans-serif" | "monospace" | "cursive" | "fantasy" | "system-ui"
    )
}

pub fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Smallest of 1, 2, 5 times a power of ten that keeps about five ticks.
fn nice_step(max: usize) -> usize {
    let mut magnitude = 1usize;
    loop {
        for factor in [1, 2, 5] {
            let step = factor * magnitude;
            if max.div_ceil(step) <= 5 {
                return step;
            }
        }
        magnitude *= 10;
    }
}

fn x_tick_step(span_minutes: i64) -> i64 {
    X_TICK_STEPS_MINUTES
        .iter()
        .copied()
        .find(|step| span_minutes / step < MAX_X_TICKS)
        .unwrap_or_else(|| (span_minutes / MAX_X_TICKS / 1440 + 1) * 1440)
}

/// Renders per-minute counts as an SVG line chart with markers and grid.
pub fn render_svg(per_minute: &[MinuteCount], options: &ChartOptions) -> String {
    let width = f64::from(options.width);
    let height = f64::from(options.height);
    let plot_w = (width - MARGIN_LEFT - MARGIN_RIGHT).max(1.0);
    let plot_h = (height - MARGIN_TOP - MARGIN_BOTTOM).max(1.0);
    let bottom = MARGIN_TOP + plot_h;
    let stack = escape_xml(&options.font_stack());

    let mut svg = String::new();
    let _ = write!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" font-family="{stack}">"#,
        w = options.width,
        h = options.height,
        stack = stack,
    );
    svg.push_str("<defs><style>");
    if let Some(font) = &options.font {
        svg.push_str(&font.font_face_css());
    }
    let _ = write!(
        svg,
        ".grid{{stroke:#dddddd;stroke-width:1}}.axis{{stroke:#333333;stroke-width:1}}\
         .series{{fill:none;stroke:#1f77b4;stroke-width:2}}.marker{{fill:#1f77b4}}\
         text{{font-family:{stack};font-size:12px;fill:#333333}}.title{{font-size:16px}}"
    );
    svg.push_str("</style></defs>");
    let _ = write!(
        svg,
        r##"<rect x="0" y="0" width="{}" height="{}" fill="#ffffff"/>"##,
        options.width, options.height
    );

    if let Some(title) = &options.title {
        let _ = write!(
            svg,
            r#"<text class="title" x="{:.1}" y="28" text-anchor="middle">{}</text>"#,
            width / 2.0,
            escape_xml(title)
        );
    }

    let (Some(first), Some(last)) = (per_minute.first(), per_minute.last()) else {
        let _ = write!(
            svg,
            r#"<text class="empty" x="{:.1}" y="{:.1}" text-anchor="middle">無資料</text></svg>"#,
            width / 2.0,
            height / 2.0
        );
        return svg;
    };

    let span_minutes = (last.minute - first.minute).num_minutes();
    let x_of = |minute: NaiveDateTime| -> f64 {
        if span_minutes == 0 {
            MARGIN_LEFT + plot_w / 2.0
        } else {
            let offset = (minute - first.minute).num_seconds() as f64;
            MARGIN_LEFT + offset / (span_minutes as f64 * 60.0) * plot_w
        }
    };

    let max_count = per_minute.iter().map(|m| m.count).max().unwrap_or(0).max(1);
    let y_step = nice_step(max_count);
    let y_max = max_count.div_ceil(y_step) * y_step;
    let y_of = |count: usize| -> f64 { bottom - count as f64 / y_max as f64 * plot_h };

    // y 軸格線與刻度
    let mut tick = 0usize;
    while tick <= y_max {
        let y = y_of(tick);
        let _ = write!(
            svg,
            r#"<line class="grid" x1="{:.1}" y1="{y:.1}" x2="{:.1}" y2="{y:.1}"/><text x="{:.1}" y="{:.1}" text-anchor="end">{tick}</text>"#,
            MARGIN_LEFT,
            MARGIN_LEFT + plot_w,
            MARGIN_LEFT - 8.0,
            y + 4.0,
        );
        tick += y_step;
    }

    // x 軸格線與時間刻度
    let label_format = if first.minute.date() == last.minute.date() {
        "%H:%M"
    } else {
        "%m-%d %H:%M"
    };
    let x_step = x_tick_step(span_minutes);
    let mut offset = 0i64;
    while offset <= span_minutes {
        let minute = first.minute + chrono::Duration::minutes(offset);
        let x = x_of(minute);
        let _ = write!(
            svg,
            r#"<line class="grid" x1="{x:.1}" y1="{:.1}" x2="{x:.1}" y2="{bottom:.1}"/><text x="{x:.1}" y="{:.1}" text-anchor="middle">{}</text>"#,
            MARGIN_TOP,
            bottom + 18.0,
            minute.format(label_format),
        );
        if span_minutes == 0 {
            break;
        }
        offset += x_step;
    }

    let _ = write!(
        svg,
        r#"<line class="axis" x1="{l:.1}" y1="{b:.1}" x2="{r:.1}" y2="{b:.1}"/><line class="axis" x1="{l:.1}" y1="{t:.1}" x2="{l:.1}" y2="{b:.1}"/>"#,
        l = MARGIN_LEFT,
        r = MARGIN_LEFT + plot_w,
        t = MARGIN_TOP,
        b = bottom,
    );

    let points: Vec<String> = per_minute
        .iter()
        .map(|m| format!("{:.1},{:.1}", x_of(m.minute), y_of(m.count)))
        .collect();
    let _ = write!(
        svg,
        r#"<polyline class="series" points="{}"/>"#,
        points.join(" ")
    );
    for m in per_minute {
        let _ = write!(
            svg,
            r#"<circle class="marker" cx="{:.1}" cy="{:.1}" r="4"><title>{} : {}</title></circle>"#,
            x_of(m.minute),
            y_of(m.count),
            m.minute.format("%Y-%m-%d %H:%M"),
            m.count
        );
    }

    let _ = write!(
        svg,
        r#"<text x="{:.1}" y="{:.1}" text-anchor="middle">時間（分鐘）</text><text x="18" y="{:.1}" text-anchor="middle" transform="rotate(-90 18 {:.1})">筆數</text>"#,
        MARGIN_LEFT + plot_w / 2.0,
        height - 14.0,
        MARGIN_TOP + plot_h / 2.0,
        MARGIN_TOP + plot_h / 2.0,
    );

    svg.push_str("</svg>");
    svg
}
