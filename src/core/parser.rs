use crate::core::aggregate::floor_minute;
use crate::domain::model::{WarningLog, WarningRecord, COLUMNS};
use crate::utils::error::{AnalyzerError, Result};
use chrono::{DateTime, NaiveDate, NaiveDateTime};

/// Formats the warnings exporter writes; tried first and in this order.
pub const PRIMARY_FORMATS: [&str; 2] = ["%d/%m/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"];

const LENIENT_DATETIME_FORMATS: [&str; 11] = [
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
    "%Y/%m/%d %H:%M",
    "%d-%m-%Y %H:%M:%S",
];

const LENIENT_DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%d/%m/%Y"];

#[derive(Debug, Clone)]
pub struct ParserOptions {
    pub delimiter: u8,
    /// Tried after the primary formats and before the lenient fallbacks.
    pub extra_formats: Vec<String>,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            extra_formats: Vec::new(),
        }
    }
}

pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    parse_timestamp_with(value, &[])
}

pub fn parse_timestamp_with(value: &str, extra_formats: &[String]) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    for format in PRIMARY_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(value, format) {
            return Some(ts);
        }
    }

    for format in extra_formats {
        if let Some(ts) = parse_with_format(value, format) {
            return Some(ts);
        }
    }

    parse_lenient(value)
}

fn parse_with_format(value: &str, format: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, format)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(value, format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

fn parse_lenient(value: &str) -> Option<NaiveDateTime> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        // 保留時區上的牆上時間，與日誌其他列一致
        return Some(ts.naive_local());
    }

    LENIENT_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            LENIENT_DATE_FORMATS.iter().find_map(|format| {
                NaiveDate::parse_from_str(value, format)
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
            })
        })
}

/// Parses a user-supplied range bound; blank means unbounded.
pub fn parse_range_bound(
    field: &str,
    value: Option<&str>,
    extra_formats: &[String],
) -> Result<Option<NaiveDateTime>> {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    parse_timestamp_with(value, extra_formats)
        .map(Some)
        .ok_or_else(|| AnalyzerError::TimeRangeError {
            message: format!("cannot parse {} '{}'", field, value),
        })
}

/// Parses a headerless warnings log.
///
/// Rows are positional (see [`COLUMNS`]). Short rows leave the trailing
/// columns empty; fields past the seventh are folded back into the message.
/// Rows whose timestamp cannot be parsed are dropped and counted.
pub fn parse_log(source_name: &str, data: &[u8], options: &ParserOptions) -> Result<WarningLog> {
    let data = data.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(data);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .delimiter(options.delimiter)
        .from_reader(data);

    let joiner = char::from(options.delimiter).to_string();
    let mut records = Vec::new();
    let mut total_rows = 0usize;
    let mut dropped_rows = 0usize;

    for (index, row) in reader.byte_records().enumerate() {
        let row = row?;
        let raw: Vec<String> = row
            .iter()
            .map(|field| String::from_utf8_lossy(field).into_owned())
            .collect();
        let fields: Vec<&str> = raw.iter().map(|field| field.trim()).collect();

        if fields.iter().all(|f| f.is_empty()) {
            continue;
        }
        total_rows += 1;

        let Some(timestamp) = parse_timestamp_with(fields[0], &options.extra_formats) else {
            tracing::debug!("Dropping row {}: unparseable timestamp '{}'", index + 1, fields[0]);
            dropped_rows += 1;
            continue;
        };

        let column = |i: usize| {
            fields
                .get(i)
                .filter(|f| !f.is_empty())
                .map(|f| f.to_string())
        };
        // 多出的欄位是訊息裡的分隔符，保留原本的空白
        let message = if raw.len() > COLUMNS.len() {
            Some(raw[COLUMNS.len() - 1..].join(&joiner).trim().to_string())
                .filter(|m| !m.is_empty())
        } else {
            column(6)
        };

        records.push(WarningRecord {
            timestamp,
            minute: floor_minute(timestamp),
            code: column(1),
            status: column(2),
            subsystem: column(3),
            category: column(4),
            detail1: column(5),
            message,
        });
    }

    if total_rows == 0 {
        return Err(AnalyzerError::EmptyInputError {
            source_name: source_name.to_string(),
        });
    }

    if dropped_rows > 0 {
        tracing::warn!(
            "⚠️ {} of {} rows in {} had unparseable timestamps and were dropped",
            dropped_rows,
            total_rows,
            source_name
        );
    }

    Ok(WarningLog {
        source_name: source_name.to_string(),
        records,
        total_rows,
        dropped_rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[test]
    fn test_primary_formats() {
        assert_eq!(
            parse_timestamp("05/03/2024 14:22:09"),
            Some(at(2024, 3, 5, 14, 22, 9))
        );
        assert_eq!(
            parse_timestamp("2024-03-05 14:22:09"),
            Some(at(2024, 3, 5, 14, 22, 9))
        );
    }

    #[test]
    fn test_day_first_wins_over_month_first() {
        // 01/02 是 2 月 1 日
        assert_eq!(
            parse_timestamp("01/02/2024 00:00:00"),
            Some(at(2024, 2, 1, 0, 0, 0))
        );
    }

    #[test]
    fn test_lenient_fallbacks() {
        assert_eq!(
            parse_timestamp("2024-03-05T14:22:09"),
            Some(at(2024, 3, 5, 14, 22, 9))
        );
        assert_eq!(
            parse_timestamp("2024-03-05T14:22:09+08:00"),
            Some(at(2024, 3, 5, 14, 22, 9))
        );
        assert_eq!(parse_timestamp("2024-03-05"), Some(at(2024, 3, 5, 0, 0, 0)));
        assert_eq!(
            parse_timestamp("  2024-03-05 14:22  "),
            Some(at(2024, 3, 5, 14, 22, 0))
        );
        assert!(parse_timestamp("not a time").is_none());
        assert!(parse_timestamp("").is_none());
        assert!(parse_timestamp("31/02/2024 10:00:00").is_none());
    }

    #[test]
    fn test_extra_formats() {
        let extra = vec!["%Y%m%d %H%M%S".to_string()];
        assert_eq!(
            parse_timestamp_with("20240305 142209", &extra),
            Some(at(2024, 3, 5, 14, 22, 9))
        );
        assert!(parse_timestamp("20240305 142209").is_none());
    }

    #[test]
    fn test_parse_range_bound() {
        assert_eq!(parse_range_bound("start", None, &[]).unwrap(), None);
        assert_eq!(parse_range_bound("start", Some("  "), &[]).unwrap(), None);
        assert_eq!(
            parse_range_bound("end", Some("2024-03-05T14:22"), &[]).unwrap(),
            Some(at(2024, 3, 5, 14, 22, 0))
        );
        assert!(matches!(
            parse_range_bound("end", Some("tomorrow"), &[]),
            Err(AnalyzerError::TimeRangeError { .. })
        ));
    }

    #[test]
    fn test_parse_log_columns_and_drops() {
        let data = "\
05/03/2024 14:22:09,W100,Active,Hydraulics,Pressure,P1,壓力過低
05/03/2024 14:22:40,W101,Cleared
garbage,W102,Active,X,Y,Z,msg

2024-03-05 14:23:01,W103,Active,Nav,GPS,D,lost fix,retrying,3
";
        let log = parse_log("WarningsLog.txt", data.as_bytes(), &ParserOptions::default()).unwrap();

        assert_eq!(log.total_rows, 4);
        assert_eq!(log.dropped_rows, 1);
        assert_eq!(log.records.len(), 3);

        let first = &log.records[0];
        assert_eq!(first.code.as_deref(), Some("W100"));
        assert_eq!(first.message.as_deref(), Some("壓力過低"));
        assert_eq!(first.minute, at(2024, 3, 5, 14, 22, 0));

        let short = &log.records[1];
        assert_eq!(short.status.as_deref(), Some("Cleared"));
        assert!(short.subsystem.is_none());
        assert!(short.message.is_none());

        let long = &log.records[2];
        assert_eq!(long.message.as_deref(), Some("lost fix,retrying,3"));
    }

    #[test]
    fn test_folded_message_keeps_spacing() {
        let data = "2024-03-05 14:23:01,W103,Active,Engine,Caution,Oil, Oil low, check pump \n";
        let log = parse_log("WarningsLog.txt", data.as_bytes(), &ParserOptions::default()).unwrap();

        let record = &log.records[0];
        assert_eq!(record.detail1.as_deref(), Some("Oil"));
        assert_eq!(record.message.as_deref(), Some("Oil low, check pump"));
    }

    #[test]
    fn test_parse_log_strips_bom_and_handles_quotes() {
        let data = "\u{feff}2024-03-05 14:22:09,W1,Active,Sys,Cat,D,\"a, quoted message\"\n";
        let log = parse_log("log.csv", data.as_bytes(), &ParserOptions::default()).unwrap();
        assert_eq!(log.records.len(), 1);
        assert_eq!(log.records[0].message.as_deref(), Some("a, quoted message"));
    }

    #[test]
    fn test_parse_log_custom_delimiter() {
        let options = ParserOptions {
            delimiter: b';',
            ..ParserOptions::default()
        };
        let data = "2024-03-05 14:22:09;W1;Active\n";
        let log = parse_log("log.txt", data.as_bytes(), &options).unwrap();
        assert_eq!(log.records[0].status.as_deref(), Some("Active"));
    }

    #[test]
    fn test_parse_log_empty_input() {
        let err = parse_log("empty.txt", b"\n\n", &ParserOptions::default()).unwrap_err();
        assert!(matches!(err, AnalyzerError::EmptyInputError { .. }));
    }

    #[test]
    fn test_parse_log_all_rows_dropped_is_not_an_error() {
        let log = parse_log("bad.txt", b"x,y\nz,w\n", &ParserOptions::default()).unwrap();
        assert!(log.is_empty());
        assert_eq!(log.dropped_rows, 2);
        assert!(log.bounds().is_none());
    }
}
