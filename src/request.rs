use std::fmt;
use std::path::{Path, PathBuf};

use serde::de::IgnoredAny;
use tracing::warn;

use crate::operation::Operation;

/// Multipart field name the file import attaches its payload under.
pub const FILE_FIELD: &str = "file";

/// A local file sent as a multipart part.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attachment {
    pub field: String,
    pub path: PathBuf,
}

/// Non-fatal problem noticed while assembling a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Diagnostic {
    /// Override key outside the operation's allow-list; it was not applied.
    RejectedOverride { key: String },
    /// Import payload could not be parsed as JSON; it was sent unchanged.
    MalformedPayload { message: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RejectedOverride { key } => write!(f, "{key} is not a valid key"),
            Self::MalformedPayload { message } => {
                write!(f, "import payload is not valid JSON: {message}")
            }
        }
    }
}

/// Ordered form body for one REDCap call.
///
/// Setting a key that already exists replaces its value in place, so the
/// field order always follows the operation's defaults.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    operation: Operation,
    fields: Vec<(String, String)>,
    attachment: Option<Attachment>,
    diagnostics: Vec<Diagnostic>,
}

impl RequestDescriptor {
    fn new(operation: Operation, token: &str) -> Self {
        let mut descriptor = Self {
            operation,
            fields: Vec::new(),
            attachment: None,
            diagnostics: Vec::new(),
        };
        descriptor.set("token", token);
        descriptor
    }

    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Body fields in send order.
    pub fn fields(&self) -> &[(String, String)] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    /// Problems recorded while building, in the order they were found.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    fn set(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.fields.iter_mut().find(|(name, _)| name == key) {
            Some((_, existing)) => *existing = value,
            None => self.fields.push((key.to_owned(), value)),
        }
    }

    fn with(mut self, key: &str, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    fn with_content(self) -> Self {
        let content = self.operation.definition().content;
        self.with("content", content)
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        warn!(operation = %self.operation, "{diagnostic}");
        self.diagnostics.push(diagnostic);
    }

    /// Overlays caller overrides, discarding keys outside the allow-list.
    fn apply_overrides(mut self, overrides: &[(&str, &str)]) -> Self {
        let definition = self.operation.definition();
        for (key, value) in overrides {
            if !definition.allows(key) {
                self.record(Diagnostic::RejectedOverride {
                    key: (*key).to_owned(),
                });
                continue;
            }

            if *key == FILE_FIELD && self.attachment.is_some() {
                self.attachment = Some(Attachment {
                    field: FILE_FIELD.to_owned(),
                    path: PathBuf::from(*value),
                });
            } else {
                self.set(key, *value);
            }
        }
        self
    }
}

pub fn export_events(token: &str, overrides: &[(&str, &str)]) -> RequestDescriptor {
    RequestDescriptor::new(Operation::ExportEvents, token)
        .with_content()
        .with("format", "json")
        .with("returnFormat", "json")
        .apply_overrides(overrides)
}

/// Data dictionary export (`content=metadata`).
pub fn export_metadata(token: &str, overrides: &[(&str, &str)]) -> RequestDescriptor {
    RequestDescriptor::new(Operation::ExportMetadata, token)
        .with_content()
        .with("format", "json")
        .with("returnFormat", "json")
        .apply_overrides(overrides)
}

pub fn export_survey_link(
    token: &str,
    instrument: &str,
    event: &str,
    record: &str,
    overrides: &[(&str, &str)],
) -> RequestDescriptor {
    RequestDescriptor::new(Operation::ExportSurveyLink, token)
        .with_content()
        .with("format", "json")
        .with("instrument", instrument)
        .with("event", event)
        .with("record", record)
        .with("returnFormat", "json")
        .apply_overrides(overrides)
}

pub fn export_survey_participants(
    token: &str,
    instrument: &str,
    event: &str,
    overrides: &[(&str, &str)],
) -> RequestDescriptor {
    RequestDescriptor::new(Operation::ExportSurveyParticipants, token)
        .with_content()
        .with("format", "json")
        .with("instrument", instrument)
        .with("event", event)
        .with("returnFormat", "json")
        .apply_overrides(overrides)
}

pub fn export_records(token: &str, overrides: &[(&str, &str)]) -> RequestDescriptor {
    RequestDescriptor::new(Operation::ExportRecords, token)
        .with_content()
        .with("format", "json")
        .with("type", "flat")
        .with("rawOrLabel", "raw")
        .with("rawOrLabelHeaders", "raw")
        .with("exportCheckboxLabel", "false")
        .with("exportSurveyFields", "false")
        .with("exportDataAccessGroups", "false")
        .with("returnFormat", "json")
        .apply_overrides(overrides)
}

/// Record import.
///
/// With `format=json`, a payload that is a single JSON object is wrapped
/// into a one-element array. A payload that fails to parse is sent as given.
pub fn import_records(token: &str, data: &str, overrides: &[(&str, &str)]) -> RequestDescriptor {
    let mut descriptor = RequestDescriptor::new(Operation::ImportRecords, token)
        .with_content()
        .with("format", "json")
        .with("type", "flat")
        .with("overwriteBehavior", "normal")
        .with("data", data)
        .with("dateFormat", "YMD")
        .with("returnContent", "count")
        .with("returnFormat", "json")
        .apply_overrides(overrides);

    if descriptor.get("format") != Some("json") {
        return descriptor;
    }

    let payload = descriptor.get("data").unwrap_or_default().to_owned();
    match wrap_json_payload(&payload) {
        Ok(Some(wrapped)) => descriptor.set("data", wrapped),
        Ok(None) => {}
        Err(err) => descriptor.record(Diagnostic::MalformedPayload {
            message: err.to_string(),
        }),
    }
    descriptor
}

/// Returns the array form of a JSON payload, or `None` if it already is one.
///
/// The payload is only validated; the caller's text is wrapped as-is so key
/// order and number formatting reach REDCap untouched.
fn wrap_json_payload(payload: &str) -> Result<Option<String>, serde_json::Error> {
    if payload.trim_start().starts_with('[') {
        return Ok(None);
    }
    serde_json::from_str::<IgnoredAny>(payload)?;
    Ok(Some(format!("[{payload}]")))
}

/// Deletes a single record (`records[0]`).
pub fn delete_record(token: &str, record: &str, overrides: &[(&str, &str)]) -> RequestDescriptor {
    RequestDescriptor::new(Operation::DeleteRecord, token)
        .with("action", "delete")
        .with_content()
        .with("records[0]", record)
        .apply_overrides(overrides)
}

/// Deletes the file stored in one field of one (repeating) form instance.
pub fn delete_form_field(
    token: &str,
    record: &str,
    field: &str,
    event: &str,
    repeat_instance: u32,
    overrides: &[(&str, &str)],
) -> RequestDescriptor {
    RequestDescriptor::new(Operation::DeleteFormField, token)
        .with_content()
        .with("action", "delete")
        .with("record", record)
        .with("field", field)
        .with("event", event)
        .with("repeat_instance", repeat_instance.to_string())
        .apply_overrides(overrides)
}

/// Uploads `path` into a file-upload field.
///
/// `repeat_instance` is one-based and only sent when given.
pub fn import_file(
    token: &str,
    record: &str,
    field: &str,
    event: &str,
    path: &Path,
    repeat_instance: Option<u32>,
    overrides: &[(&str, &str)],
) -> RequestDescriptor {
    let mut descriptor = RequestDescriptor::new(Operation::ImportFile, token)
        .with_content()
        .with("format", "json")
        .with("action", "import")
        .with("record", record)
        .with("field", field)
        .with("event", event)
        .with("returnFormat", "json");
    descriptor.attachment = Some(Attachment {
        field: FILE_FIELD.to_owned(),
        path: path.to_path_buf(),
    });
    if let Some(instance) = repeat_instance {
        descriptor.set("repeat_instance", instance.to_string());
    }
    descriptor.apply_overrides(overrides)
}

pub fn delete_file(
    token: &str,
    record: &str,
    field: &str,
    event: &str,
    repeat_instance: Option<u32>,
    overrides: &[(&str, &str)],
) -> RequestDescriptor {
    let mut descriptor = RequestDescriptor::new(Operation::DeleteFile, token)
        .with_content()
        .with("action", "delete")
        .with("record", record)
        .with("field", field)
        .with("event", event)
        .with("returnFormat", "json");
    if let Some(instance) = repeat_instance {
        descriptor.set("repeat_instance", instance.to_string());
    }
    descriptor.apply_overrides(overrides)
}
