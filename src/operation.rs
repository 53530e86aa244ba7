use std::fmt;

use crate::response::ResponseContext;

/// One logical REDCap API call.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    ExportEvents,
    ExportMetadata,
    ExportSurveyLink,
    ExportSurveyParticipants,
    ExportRecords,
    ImportRecords,
    DeleteRecord,
    DeleteFormField,
    ImportFile,
    DeleteFile,
}

/// Static metadata for one [`Operation`].
#[derive(Clone, Copy, Debug)]
pub struct OperationDefinition {
    pub operation: Operation,
    /// Stable snake-case name, used by the CLI and in log output.
    pub name: &'static str,
    /// Value of the `content` body field.
    pub content: &'static str,
    /// Field names callers may override.
    pub allowed_overrides: &'static [&'static str],
    /// How the response body of this operation is classified.
    pub context: ResponseContext,
}

impl OperationDefinition {
    /// Returns `true` if `key` is in this operation's allow-list.
    pub fn allows(&self, key: &str) -> bool {
        self.allowed_overrides.contains(&key)
    }
}

const EXPORT_EVENTS: OperationDefinition = OperationDefinition {
    operation: Operation::ExportEvents,
    name: "export_events",
    content: "event",
    allowed_overrides: &["token", "content", "format", "arms", "returnFormat"],
    context: ResponseContext::Standard,
};

const EXPORT_METADATA: OperationDefinition = OperationDefinition {
    operation: Operation::ExportMetadata,
    name: "export_metadata",
    content: "metadata",
    allowed_overrides: &["token", "content", "format", "fields", "forms", "returnFormat"],
    context: ResponseContext::Standard,
};

const EXPORT_SURVEY_LINK: OperationDefinition = OperationDefinition {
    operation: Operation::ExportSurveyLink,
    name: "export_survey_link",
    content: "surveyLink",
    allowed_overrides: &["token", "content", "format", "returnFormat"],
    context: ResponseContext::Standard,
};

const EXPORT_SURVEY_PARTICIPANTS: OperationDefinition = OperationDefinition {
    operation: Operation::ExportSurveyParticipants,
    name: "export_survey_participants",
    content: "participantList",
    allowed_overrides: &["token", "content", "format", "returnFormat"],
    context: ResponseContext::Standard,
};

const EXPORT_RECORDS: OperationDefinition = OperationDefinition {
    operation: Operation::ExportRecords,
    name: "export_records",
    content: "record",
    allowed_overrides: &[
        "fields",
        "forms",
        "events",
        "token",
        "content",
        "format",
        "type",
        "rawOrLabel",
        "rawOrLabelHeaders",
        "exportCheckboxLabel",
        "exportSurveyFields",
        "exportDataAccessGroups",
        "returnFormat",
    ],
    context: ResponseContext::Standard,
};

const IMPORT_RECORDS: OperationDefinition = OperationDefinition {
    operation: Operation::ImportRecords,
    name: "import_records",
    content: "record",
    allowed_overrides: &[
        "token",
        "content",
        "format",
        "type",
        "overwriteBehavior",
        "data",
        "dateFormat",
        "returnContent",
        "returnFormat",
    ],
    context: ResponseContext::Standard,
};

const DELETE_RECORD: OperationDefinition = OperationDefinition {
    operation: Operation::DeleteRecord,
    name: "delete_record",
    content: "record",
    allowed_overrides: &["token", "content", "records[0]", "arm"],
    context: ResponseContext::Standard,
};

const DELETE_FORM_FIELD: OperationDefinition = OperationDefinition {
    operation: Operation::DeleteFormField,
    name: "delete_form_field",
    content: "file",
    allowed_overrides: &[
        "token",
        "content",
        "action",
        "record",
        "field",
        "event",
        "repeat_instance",
    ],
    context: ResponseContext::FileDelete,
};

const IMPORT_FILE: OperationDefinition = OperationDefinition {
    operation: Operation::ImportFile,
    name: "import_file",
    content: "file",
    allowed_overrides: &[
        "token",
        "content",
        "format",
        "action",
        "record",
        "field",
        "event",
        "returnContent",
        "file",
    ],
    context: ResponseContext::FileImport,
};

const DELETE_FILE: OperationDefinition = OperationDefinition {
    operation: Operation::DeleteFile,
    name: "delete_file",
    content: "file",
    allowed_overrides: &[
        "token",
        "content",
        "action",
        "record",
        "field",
        "event",
        "repeat_instance",
        "returnFormat",
    ],
    context: ResponseContext::FileDelete,
};

const OPERATIONS: &[OperationDefinition] = &[
    EXPORT_EVENTS,
    EXPORT_METADATA,
    EXPORT_SURVEY_LINK,
    EXPORT_SURVEY_PARTICIPANTS,
    EXPORT_RECORDS,
    IMPORT_RECORDS,
    DELETE_RECORD,
    DELETE_FORM_FIELD,
    IMPORT_FILE,
    DELETE_FILE,
];

impl Operation {
    /// Returns the static definition of this operation.
    pub fn definition(self) -> &'static OperationDefinition {
        match self {
            Self::ExportEvents => &EXPORT_EVENTS,
            Self::ExportMetadata => &EXPORT_METADATA,
            Self::ExportSurveyLink => &EXPORT_SURVEY_LINK,
            Self::ExportSurveyParticipants => &EXPORT_SURVEY_PARTICIPANTS,
            Self::ExportRecords => &EXPORT_RECORDS,
            Self::ImportRecords => &IMPORT_RECORDS,
            Self::DeleteRecord => &DELETE_RECORD,
            Self::DeleteFormField => &DELETE_FORM_FIELD,
            Self::ImportFile => &IMPORT_FILE,
            Self::DeleteFile => &DELETE_FILE,
        }
    }

    /// Looks up an operation by its snake-case name.
    pub fn from_name(name: &str) -> Option<Self> {
        OPERATIONS
            .iter()
            .find(|definition| definition.name == name)
            .map(|definition| definition.operation)
    }

    pub fn name(self) -> &'static str {
        self.definition().name
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the definitions of every supported operation.
pub fn operations() -> &'static [OperationDefinition] {
    OPERATIONS
}
