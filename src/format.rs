//! Output formatting for command results.
//!
//! Commands hand their results to [`Formattable`] wrappers, which render
//! them as JSON or CSV.

use csv::Writer;
use serde_json::{Map, Value};
use std::str::FromStr;
use strum::EnumIter;

use crate::model::scalar_string;

pub const JSON: &str = "json";
pub const CSV: &str = "csv";

/// Error types that can occur during formatting operations
#[derive(Debug, thiserror::Error)]
pub enum FormattingError {
    /// Error when an unsupported output format is requested
    #[error("invalid output format {0}")]
    UnsupportedOutputFormat(String),
    /// Error specific to CSV operations
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    /// Error when converting bytes to UTF-8 string
    #[error("UTF-8 conversion error: {0}")]
    Utf8Error(#[from] std::string::FromUtf8Error),

    #[error("JSON serialization error: {0}")]
    JsonSerializationError(#[from] serde_json::Error),

    #[error("CSV writer into inner error: {0}")]
    CsvIntoInnerError(#[from] csv::IntoInnerError<csv::Writer<Vec<u8>>>),
}

#[derive(Debug, Clone, Default, PartialEq, PartialOrd)]
pub struct OutputFormatOptions {
    pub with_headers: bool,
    pub pretty: bool,
}

/// Enum representing the supported output formats
#[derive(Debug, Clone, PartialEq, PartialOrd, EnumIter)]
pub enum OutputFormat {
    /// CSV (Comma-Separated Values) format
    Csv(OutputFormatOptions),
    /// JSON (JavaScript Object Notation) format
    Json(OutputFormatOptions),
}

impl OutputFormat {
    /// Returns a vector of all supported format names as strings
    pub fn names() -> Vec<&'static str> {
        vec![JSON, CSV]
    }

    pub fn from_string_with_options(
        format_str: &str,
        options: OutputFormatOptions,
    ) -> Result<OutputFormat, FormattingError> {
        let normalized_format = format_str.to_lowercase();
        match normalized_format.as_str() {
            JSON => Ok(OutputFormat::Json(options)),
            CSV => Ok(OutputFormat::Csv(options)),
            _ => Err(FormattingError::UnsupportedOutputFormat(normalized_format)),
        }
    }
}

impl Default for OutputFormat {
    fn default() -> Self {
        OutputFormat::Json(OutputFormatOptions::default())
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            OutputFormat::Csv(_) => write!(f, "{}", CSV),
            OutputFormat::Json(_) => write!(f, "{}", JSON),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = FormattingError;

    fn from_str(format_str: &str) -> Result<OutputFormat, FormattingError> {
        Self::from_string_with_options(format_str, OutputFormatOptions::default())
    }
}

pub trait Formattable {
    fn format(&self, f: &OutputFormat) -> Result<String, FormattingError>;
}

fn to_json(value: &Value, options: &OutputFormatOptions) -> Result<String, FormattingError> {
    Ok(if options.pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    })
}

/// Writes `rows` as CSV. Columns are the union of the row keys in the order
/// they are first seen; missing cells are empty.
fn to_csv(rows: &[Map<String, Value>], with_headers: bool) -> Result<String, FormattingError> {
    let mut columns: Vec<&String> = Vec::new();
    for row in rows {
        for key in row.keys() {
            if !columns.contains(&key) {
                columns.push(key);
            }
        }
    }

    let mut writer = Writer::from_writer(Vec::new());
    if with_headers {
        writer.write_record(&columns)?;
    }
    for row in rows {
        writer.write_record(
            columns
                .iter()
                .map(|column| row.get(column.as_str()).map(scalar_string).unwrap_or_default()),
        )?;
    }
    writer.flush().map_err(csv::Error::from)?;

    Ok(String::from_utf8(writer.into_inner()?)?)
}

/// A list of records, such as serialized models
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Records(pub Vec<Map<String, Value>>);

impl Formattable for Records {
    fn format(&self, f: &OutputFormat) -> Result<String, FormattingError> {
        match f {
            OutputFormat::Json(options) => to_json(
                &Value::Array(self.0.iter().cloned().map(Value::Object).collect()),
                options,
            ),
            OutputFormat::Csv(options) => to_csv(&self.0, options.with_headers),
        }
    }
}

/// A single record, such as the current user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record(pub Map<String, Value>);

impl Formattable for Record {
    fn format(&self, f: &OutputFormat) -> Result<String, FormattingError> {
        match f {
            OutputFormat::Json(options) => to_json(&Value::Object(self.0.clone()), options),
            OutputFormat::Csv(options) => to_csv(std::slice::from_ref(&self.0), options.with_headers),
        }
    }
}

/// A member list keyed by one attribute.
///
/// In CSV the key becomes the `key_name` column; nested values spread into
/// one column per field and scalar values go to a `value` column.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberList {
    pub key_name: String,
    pub members: Map<String, Value>,
}

impl MemberList {
    pub fn new(key_name: &str, members: Map<String, Value>) -> Self {
        Self {
            key_name: key_name.to_string(),
            members,
        }
    }

    fn rows(&self) -> Vec<Map<String, Value>> {
        self.members
            .iter()
            .map(|(key, value)| {
                let mut row = Map::new();
                row.insert(self.key_name.clone(), Value::String(key.clone()));
                match value {
                    Value::Object(fields) => {
                        row.extend(fields.iter().map(|(k, v)| (k.clone(), v.clone())))
                    }
                    other => {
                        row.insert("value".to_string(), other.clone());
                    }
                }
                row
            })
            .collect()
    }
}

impl Formattable for MemberList {
    fn format(&self, f: &OutputFormat) -> Result<String, FormattingError> {
        match f {
            OutputFormat::Json(options) => to_json(&Value::Object(self.members.clone()), options),
            OutputFormat::Csv(options) => to_csv(&self.rows(), options.with_headers),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    fn csv_with_headers() -> OutputFormat {
        OutputFormat::Csv(OutputFormatOptions {
            with_headers: true,
            pretty: false,
        })
    }

    #[test]
    fn test_output_format_from_str() {
        assert_eq!(OutputFormat::from_str("JSON").unwrap(), OutputFormat::default());
        assert_eq!(OutputFormat::from_str("csv").unwrap().to_string(), "csv");
        assert!(matches!(
            OutputFormat::from_str("tree"),
            Err(FormattingError::UnsupportedOutputFormat(_))
        ));
    }

    #[test]
    fn test_records_as_csv_use_union_of_columns() {
        let records = Records(vec![
            object(json!({"id": "dev", "dns_zone": "dev.example.site"})),
            object(json!({"id": "live", "locked": true})),
        ]);
        let csv = records.format(&csv_with_headers()).unwrap();
        assert_eq!(
            csv,
            "id,dns_zone,locked\ndev,dev.example.site,\nlive,,true\n"
        );
    }

    #[test]
    fn test_records_as_json_array() {
        let records = Records(vec![object(json!({"id": "dev"}))]);
        let json = records.format(&OutputFormat::default()).unwrap();
        assert_eq!(json, r#"[{"id":"dev"}]"#);
    }

    #[test]
    fn test_member_list_scalar_values() {
        let list = MemberList::new("id", object(json!({"s1": "blog", "s2": "shop"})));
        assert_eq!(
            list.format(&csv_with_headers()).unwrap(),
            "id,value\ns1,blog\ns2,shop\n"
        );
        assert_eq!(
            list.format(&OutputFormat::default()).unwrap(),
            r#"{"s1":"blog","s2":"shop"}"#
        );
    }

    #[test]
    fn test_member_list_nested_values() {
        let list = MemberList::new(
            "id",
            object(json!({"s1": {"name": "blog", "framework": "wordpress"}})),
        );
        let csv = list
            .format(&OutputFormat::Csv(OutputFormatOptions::default()))
            .unwrap();
        assert_eq!(csv, "s1,blog,wordpress\n");
    }

    #[test]
    fn test_record_pretty_json() {
        let record = Record(object(json!({"id": "u1"})));
        let json = record
            .format(&OutputFormat::Json(OutputFormatOptions {
                with_headers: false,
                pretty: true,
            }))
            .unwrap();
        assert_eq!(json, "{\n  \"id\": \"u1\"\n}");
    }
}
