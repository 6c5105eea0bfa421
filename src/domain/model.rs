use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Column names of a headerless warnings log, in file order.
pub const COLUMNS: [&str; 7] = [
    "Timestamp",
    "Code",
    "Status",
    "Subsystem",
    "Category",
    "Detail1",
    "Message",
];

/// One row of a warnings log whose timestamp parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarningRecord {
    pub timestamp: NaiveDateTime,
    pub minute: NaiveDateTime,
    pub code: Option<String>,
    pub status: Option<String>,
    pub subsystem: Option<String>,
    pub category: Option<String>,
    pub detail1: Option<String>,
    pub message: Option<String>,
}

impl WarningRecord {
    pub fn field(&self, field: RecordField) -> Option<&str> {
        match field {
            RecordField::Code => self.code.as_deref(),
            RecordField::Status => self.status.as_deref(),
            RecordField::Subsystem => self.subsystem.as_deref(),
            RecordField::Category => self.category.as_deref(),
        }
    }
}

/// Text columns that get a count breakdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordField {
    Code,
    Status,
    Subsystem,
    Category,
}

impl RecordField {
    pub const ALL: [RecordField; 4] = [
        RecordField::Code,
        RecordField::Status,
        RecordField::Subsystem,
        RecordField::Category,
    ];

    pub fn column_name(self) -> &'static str {
        match self {
            RecordField::Code => "Code",
            RecordField::Status => "Status",
            RecordField::Subsystem => "Subsystem",
            RecordField::Category => "Category",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WarningLog {
    pub source_name: String,
    pub records: Vec<WarningRecord>,
    pub total_rows: usize,
    pub dropped_rows: usize,
}

impl WarningLog {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Sorted distinct minute buckets.
    pub fn minutes(&self) -> Vec<NaiveDateTime> {
        let mut minutes: Vec<NaiveDateTime> = self.records.iter().map(|r| r.minute).collect();
        minutes.sort_unstable();
        minutes.dedup();
        minutes
    }

    /// First and last minute bucket, `None` for an empty log.
    pub fn bounds(&self) -> Option<TimeRange> {
        let start = self.records.iter().map(|r| r.minute).min()?;
        let end = self.records.iter().map(|r| r.minute).max()?;
        Some(TimeRange { start, end })
    }
}

/// Inclusive, minute-aligned range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn contains(&self, minute: NaiveDateTime) -> bool {
        minute >= self.start && minute <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MinuteCount {
    pub minute: NaiveDateTime,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownEntry {
    pub value: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakdown {
    pub field: RecordField,
    pub entries: Vec<BreakdownEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Analysis {
    pub source_name: String,
    pub range: Option<TimeRange>,
    pub total_records: usize,
    pub matched_records: usize,
    pub dropped_rows: usize,
    pub per_minute: Vec<MinuteCount>,
    pub breakdowns: Vec<Breakdown>,
}

impl Analysis {
    pub fn peak(&self) -> Option<&MinuteCount> {
        self.per_minute
            .iter()
            .max_by(|a, b| a.count.cmp(&b.count).then(b.minute.cmp(&a.minute)))
    }
}

/// Output of the transform stage: the analysis plus its rendered chart.
#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub analysis: Analysis,
    pub chart_svg: String,
}
