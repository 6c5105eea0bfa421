use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyzerError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Configuration validation error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Input contains no rows: {source_name}")]
    EmptyInputError { source_name: String },

    #[error("No warnings log has been uploaded")]
    NoDatasetError,

    #[error("Unsupported upload '{file_name}': {reason}")]
    UnsupportedUploadError { file_name: String, reason: String },

    #[error("Upload exceeds the {limit_bytes} byte limit")]
    UploadTooLargeError { limit_bytes: usize },

    #[error("Invalid time range: {message}")]
    TimeRangeError { message: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },

    #[error("Server error: {message}")]
    ServerError { message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Data,
    Configuration,
    Input,
    Server,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl AnalyzerError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            AnalyzerError::IoError(_) | AnalyzerError::ZipError(_) => ErrorCategory::Io,
            AnalyzerError::CsvError(_)
            | AnalyzerError::SerializationError(_)
            | AnalyzerError::ProcessingError { .. } => ErrorCategory::Data,
            AnalyzerError::ConfigError { .. }
            | AnalyzerError::ConfigValidationError { .. }
            | AnalyzerError::MissingConfigError { .. }
            | AnalyzerError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            AnalyzerError::EmptyInputError { .. }
            | AnalyzerError::NoDatasetError
            | AnalyzerError::UnsupportedUploadError { .. }
            | AnalyzerError::UploadTooLargeError { .. }
            | AnalyzerError::TimeRangeError { .. } => ErrorCategory::Input,
            AnalyzerError::ServerError { .. } => ErrorCategory::Server,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            // 空輸入只是沒有東西可分析
            AnalyzerError::EmptyInputError { .. } | AnalyzerError::NoDatasetError => {
                ErrorSeverity::Low
            }
            AnalyzerError::TimeRangeError { .. }
            | AnalyzerError::UnsupportedUploadError { .. }
            | AnalyzerError::UploadTooLargeError { .. } => ErrorSeverity::Medium,
            AnalyzerError::IoError(_) | AnalyzerError::ServerError { .. } => {
                ErrorSeverity::Critical
            }
            _ => ErrorSeverity::High,
        }
    }

    pub fn recovery_suggestion(&self) -> String {
        match self {
            AnalyzerError::IoError(_) => "確認檔案路徑存在且具有讀寫權限".to_string(),
            AnalyzerError::ZipError(_) => "確認輸出目錄可寫入，或關閉壓縮輸出".to_string(),
            AnalyzerError::CsvError(_) => {
                "確認檔案為無表頭的 CSV/TXT，欄位以逗號分隔".to_string()
            }
            AnalyzerError::SerializationError(_) => "檢查輸出資料內容是否完整".to_string(),
            AnalyzerError::ConfigError { .. }
            | AnalyzerError::ConfigValidationError { .. }
            | AnalyzerError::InvalidConfigValueError { .. } => {
                "檢查設定檔或命令列參數的值".to_string()
            }
            AnalyzerError::MissingConfigError { field } => format!("請提供設定值: {}", field),
            AnalyzerError::EmptyInputError { .. } => "上傳包含至少一筆資料的檔案".to_string(),
            AnalyzerError::NoDatasetError => "先上傳 WarningsLog.txt 或 CSV 檔案".to_string(),
            AnalyzerError::UnsupportedUploadError { .. } => {
                "只接受 .txt / .csv 日誌，字型接受 .ttf / .otf / .ttc / .woff / .woff2".to_string()
            }
            AnalyzerError::UploadTooLargeError { limit_bytes } => format!(
                "檔案不可超過 {} MB，或調整 dashboard.max_upload_mb",
                limit_bytes / (1024 * 1024)
            ),
            AnalyzerError::TimeRangeError { .. } => "開始時間必須早於或等於結束時間".to_string(),
            AnalyzerError::ProcessingError { .. } => "檢查輸入資料格式".to_string(),
            AnalyzerError::ServerError { .. } => "確認連接埠未被占用後重新啟動".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Io => format!("檔案存取失敗: {}", self),
            ErrorCategory::Data => format!("資料處理失敗: {}", self),
            ErrorCategory::Configuration => format!("設定錯誤: {}", self),
            ErrorCategory::Input => format!("輸入錯誤: {}", self),
            ErrorCategory::Server => format!("伺服器錯誤: {}", self),
        }
    }

    /// CLI 依嚴重程度決定的退出碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl From<toml::de::Error> for AnalyzerError {
    fn from(e: toml::de::Error) -> Self {
        AnalyzerError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalyzerError>;
