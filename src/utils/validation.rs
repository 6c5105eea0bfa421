use crate::utils::error::{AnalyzerError, Result};
use std::collections::HashSet;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub const LOG_EXTENSIONS: &[&str] = &["txt", "csv"];
pub const FONT_EXTENSIONS: &[&str] = &["ttf", "otf", "ttc", "woff", "woff2"];
pub const OUTPUT_FORMATS: &[&str] = &["csv", "json", "svg"];

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AnalyzerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(AnalyzerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

/// Returns the lower-cased extension when it is in `allowed_extensions`.
pub fn validate_file_extension(
    field_name: &str,
    file: &str,
    allowed_extensions: &[&str],
) -> Result<String> {
    let allowed_set: HashSet<&str> = allowed_extensions.iter().copied().collect();

    let extension = std::path::Path::new(file)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .ok_or_else(|| AnalyzerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        })?;

    if !allowed_set.contains(extension.as_str()) {
        return Err(AnalyzerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: file.to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        });
    }

    Ok(extension)
}

pub fn validate_output_formats(field_name: &str, formats: &[String]) -> Result<()> {
    if formats.is_empty() {
        return Err(AnalyzerError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    for (i, format) in formats.iter().enumerate() {
        if formats[..i].contains(format) {
            return Err(AnalyzerError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: "Format listed more than once".to_string(),
            });
        }
        if !OUTPUT_FORMATS.contains(&format.as_str()) {
            return Err(AnalyzerError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: format.clone(),
                reason: format!(
                    "Unsupported format. Valid formats: {}",
                    OUTPUT_FORMATS.join(", ")
                ),
            });
        }
    }
    Ok(())
}

pub fn validate_delimiter(field_name: &str, delimiter: &str) -> Result<u8> {
    match delimiter.as_bytes() {
        [byte] if byte.is_ascii() && *byte != b'\n' && *byte != b'\r' => Ok(*byte),
        _ => Err(AnalyzerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: delimiter.to_string(),
            reason: "Delimiter must be a single ASCII character".to_string(),
        }),
    }
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AnalyzerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(AnalyzerError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_file_extension() {
        assert_eq!(
            validate_file_extension("file", "WarningsLog.TXT", LOG_EXTENSIONS).unwrap(),
            "txt"
        );
        assert!(validate_file_extension("file", "export.csv", LOG_EXTENSIONS).is_ok());
        assert!(validate_file_extension("file", "export.xlsx", LOG_EXTENSIONS).is_err());
        assert!(validate_file_extension("file", "README", LOG_EXTENSIONS).is_err());
        assert!(validate_file_extension("font", "NotoSansTC.otf", FONT_EXTENSIONS).is_ok());
    }

    #[test]
    fn test_validate_output_formats() {
        let formats = vec!["csv".to_string(), "svg".to_string()];
        assert!(validate_output_formats("output_formats", &formats).is_ok());
        assert!(validate_output_formats("output_formats", &["tsv".to_string()]).is_err());
        assert!(validate_output_formats("output_formats", &[]).is_err());

        let repeated = vec!["csv".to_string(), "csv".to_string()];
        let err = validate_output_formats("output_formats", &repeated).unwrap_err();
        assert!(matches!(
            err,
            AnalyzerError::InvalidConfigValueError { ref value, .. } if value == "csv"
        ));
    }

    #[test]
    fn test_validate_delimiter() {
        assert_eq!(validate_delimiter("delimiter", ",").unwrap(), b',');
        assert_eq!(validate_delimiter("delimiter", "\t").unwrap(), b'\t');
        assert!(validate_delimiter("delimiter", "::").is_err());
        assert!(validate_delimiter("delimiter", "").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("port", 8501u16, 1, u16::MAX).is_ok());
        assert!(validate_range("port", 0u16, 1, u16::MAX).is_err());
    }
}
