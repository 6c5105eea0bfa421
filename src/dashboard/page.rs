use crate::core::chart::escape_xml as escape;
use crate::core::{Analysis, WarningLog};
use crate::domain::model::TimeRange;
use chrono::NaiveDateTime;
use std::fmt::Write as _;

const INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

pub struct IndexView<'a> {
    pub log: Option<&'a WarningLog>,
    pub analysis: Option<Analysis>,
    pub chart_svg: Option<String>,
    pub font_family: Option<String>,
    pub error: Option<String>,
}

fn datetime_input(
    name: &str,
    label: &str,
    value: NaiveDateTime,
    min: NaiveDateTime,
    max: NaiveDateTime,
) -> String {
    format!(
        r#"<label>{label} <input type="datetime-local" name="{name}" step="60" value="{}" min="{}" max="{}"></label>"#,
        value.format(INPUT_FORMAT),
        min.format(INPUT_FORMAT),
        max.format(INPUT_FORMAT),
    )
}

fn render_sidebar(html: &mut String, font_family: Option<&str>) {
    html.push_str(r#"<aside class="sidebar"><h3>字型</h3>"#);
    match font_family {
        Some(family) => {
            let _ = write!(html, "<p>目前字型：{}</p>", escape(family));
        }
        None => html.push_str("<p>使用系統 CJK 字型</p>"),
    }
    html.push_str(
        r#"<form action="/font" method="post" enctype="multipart/form-data"><input type="file" name="font" accept=".ttf,.otf,.ttc,.woff,.woff2"><button type="submit">上傳字型</button></form></aside>"#,
    );
}

fn render_range_form(html: &mut String, value: TimeRange, bounds: TimeRange) {
    html.push_str(
        r#"<form class="range" action="/" method="get"><fieldset><legend>時間範圍（分鐘）</legend>"#,
    );
    html.push_str(&datetime_input("start", "開始", value.start, bounds.start, bounds.end));
    html.push_str(&datetime_input("end", "結束", value.end, bounds.start, bounds.end));
    html.push_str(r#"<button type="submit">套用</button> <a href="/">重設</a></fieldset></form>"#);
}

fn render_analysis(html: &mut String, log: &WarningLog, analysis: &Analysis, chart_svg: &str) {
    let Some(range) = analysis.range else {
        let _ = write!(
            html,
            "<p class=\"warning\">{} 沒有可解析的時間戳（略過 {} 列）</p>",
            escape(&log.source_name),
            log.dropped_rows
        );
        return;
    };
    render_range_form(html, range, log.bounds().unwrap_or(range));

    let _ = write!(
        html,
        "<p class=\"caption\">筆數：{}</p>",
        analysis.matched_records
    );
    if analysis.dropped_rows > 0 {
        let _ = write!(
            html,
            "<p class=\"note\">略過 {} 列無法解析時間的資料</p>",
            analysis.dropped_rows
        );
    }

    let _ = write!(html, "<figure class=\"chart\">{}</figure>", chart_svg);

    if let Some(peak) = analysis.peak() {
        let _ = write!(
            html,
            "<p class=\"note\">尖峰：{} 共 {} 筆</p>",
            peak.minute.format("%Y-%m-%d %H:%M"),
            peak.count
        );
    }

    for breakdown in &analysis.breakdowns {
        let _ = write!(
            html,
            "<table class=\"breakdown\"><caption>{}</caption><tr><th>值</th><th>筆數</th></tr>",
            breakdown.field.column_name()
        );
        for entry in &breakdown.entries {
            let _ = write!(
                html,
                "<tr><td>{}</td><td>{}</td></tr>",
                escape(&entry.value),
                entry.count
            );
        }
        html.push_str("</table>");
    }
}

pub fn render_index(view: &IndexView<'_>) -> String {
    let mut html = String::from(
        r#"<!DOCTYPE html><html lang="zh-Hant"><head><meta charset="utf-8"><title>Warnings Analyzer (Web)</title><style>
body{margin:0;display:flex;font-family:'Noto Sans CJK TC','Noto Sans TC','Microsoft JhengHei',sans-serif}
.sidebar{width:240px;padding:16px;background:#f0f2f6;min-height:100vh}
main{flex:1;padding:16px 32px}
.caption{color:#555}
.error{color:#b00020}
.chart svg{max-width:100%;height:auto}
.breakdown{display:inline-table;margin:8px 16px 8px 0;border-collapse:collapse}
.breakdown td,.breakdown th{border:1px solid #ddd;padding:2px 8px}
</style></head><body>"#,
    );

    render_sidebar(&mut html, view.font_family.as_deref());

    html.push_str("<main><h1>Warnings Analyzer — Web</h1>");
    html.push_str(
        r#"<form action="/upload" method="post" enctype="multipart/form-data"><label>上傳 WarningsLog.txt / CSV / TXT（無表頭） <input type="file" name="file" accept=".txt,.csv"></label> <button type="submit">上傳</button></form>"#,
    );

    if let Some(error) = &view.error {
        let _ = write!(html, "<p class=\"error\">❌ {}</p>", escape(error));
    }

    if let Some(log) = view.log {
        let _ = write!(
            html,
            "<p class=\"note\">檔案：{}（{} 列）</p>",
            escape(&log.source_name),
            log.total_rows
        );
        if let (Some(analysis), Some(svg)) = (&view.analysis, &view.chart_svg) {
            render_analysis(&mut html, log, analysis, svg);
        } else if let Some(bounds) = log.bounds() {
            // 範圍錯誤時仍提供完整範圍的表單
            render_range_form(&mut html, bounds, bounds);
        }
    }

    html.push_str("</main></body></html>");
    html
}
