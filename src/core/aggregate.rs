use crate::domain::model::{
    Analysis, Breakdown, BreakdownEntry, MinuteCount, RecordField, TimeRange, WarningLog,
    WarningRecord,
};
use crate::utils::error::{AnalyzerError, Result};
use chrono::{NaiveDateTime, Timelike};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Default)]
pub struct AnalysisOptions {
    pub start: Option<NaiveDateTime>,
    pub end: Option<NaiveDateTime>,
    pub top_n: usize,
}

pub fn floor_minute(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0)
        .and_then(|t| t.with_second(0))
        .unwrap_or(ts)
}

/// Resolves the selected range against the log bounds.
///
/// Missing ends default to the bounds; given ends are floored to the minute
/// and clamped into the bounds. A window lying wholly outside the bounds is
/// kept as requested, so it matches no records.
pub fn resolve_range(
    log: &WarningLog,
    start: Option<NaiveDateTime>,
    end: Option<NaiveDateTime>,
) -> Result<Option<TimeRange>> {
    if let (Some(s), Some(e)) = (start, end) {
        if floor_minute(s) > floor_minute(e) {
            return Err(AnalyzerError::TimeRangeError {
                message: format!("start {} is after end {}", s, e),
            });
        }
    }

    let Some(bounds) = log.bounds() else {
        return Ok(None);
    };

    let start = start.map(floor_minute);
    let end = end.map(floor_minute);

    let after_data = start.is_some_and(|s| s > bounds.end);
    let before_data = end.is_some_and(|e| e < bounds.start);
    if after_data || before_data {
        if let (Some(s), Some(e)) = (start.or(end), end.or(start)) {
            return Ok(Some(TimeRange { start: s, end: e }));
        }
    }

    let clamp = |ts: NaiveDateTime| ts.clamp(bounds.start, bounds.end);
    let range = TimeRange {
        start: start.map(clamp).unwrap_or(bounds.start),
        end: end.map(clamp).unwrap_or(bounds.end),
    };

    Ok(Some(range))
}

pub fn filter<'a>(log: &'a WarningLog, range: &TimeRange) -> Vec<&'a WarningRecord> {
    log.records
        .iter()
        .filter(|r| range.contains(r.minute))
        .collect()
}

/// One entry per minute that has records, ascending.
pub fn count_per_minute(records: &[&WarningRecord]) -> Vec<MinuteCount> {
    let mut counts: BTreeMap<NaiveDateTime, usize> = BTreeMap::new();
    for record in records {
        *counts.entry(record.minute).or_default() += 1;
    }
    counts
        .into_iter()
        .map(|(minute, count)| MinuteCount { minute, count })
        .collect()
}

/// Most frequent values of `field`; records without a value are skipped.
pub fn breakdown(records: &[&WarningRecord], field: RecordField, top_n: usize) -> Breakdown {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in records.iter().filter_map(|r| r.field(field)) {
        *counts.entry(value).or_default() += 1;
    }

    let mut entries: Vec<BreakdownEntry> = counts
        .into_iter()
        .map(|(value, count)| BreakdownEntry {
            value: value.to_string(),
            count,
        })
        .collect();
    entries.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.value.cmp(&b.value)));
    entries.truncate(top_n);

    Breakdown { field, entries }
}

pub fn analyze(log: &WarningLog, options: &AnalysisOptions) -> Result<Analysis> {
    let range = resolve_range(log, options.start, options.end)?;

    let matched: Vec<&WarningRecord> = match &range {
        Some(range) => filter(log, range),
        None => Vec::new(),
    };

    let per_minute = count_per_minute(&matched);
    let breakdowns = if options.top_n == 0 {
        Vec::new()
    } else {
        RecordField::ALL
            .iter()
            .map(|field| breakdown(&matched, *field, options.top_n))
            .filter(|b| !b.entries.is_empty())
            .collect()
    };

    tracing::debug!(
        "Analyzed {}: {} of {} records in range, {} minute buckets",
        log.source_name,
        matched.len(),
        log.records.len(),
        per_minute.len()
    );

    Ok(Analysis {
        source_name: log.source_name.clone(),
        range,
        total_records: log.records.len(),
        matched_records: matched.len(),
        dropped_rows: log.dropped_rows,
        per_minute,
        breakdowns,
    })
}
