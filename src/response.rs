use std::fmt;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::Event;
use regex::Regex;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use url::Url;

use crate::ClientError;

static URL_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://\S+$").expect("URL pattern is valid"));

/// Call context that changes how a response body is read.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseContext {
    #[default]
    Standard,
    /// File upload: an empty body means the upload succeeded.
    FileImport,
    /// File deletion: an empty body, or "no file to delete", means success.
    FileDelete,
}

/// Normalized REDCap response.
#[derive(Clone, Debug, PartialEq)]
pub enum Response {
    /// Body was exactly a URL (survey link export).
    Url(String),
    /// File import/delete acknowledged with an empty body or a no-op message.
    Success,
    /// Decoded JSON body, including JSON bodies carrying an `error` key.
    Json(Value),
    /// Text extracted from an `<hash><error>` envelope.
    XmlError(String),
    /// Body that matched none of the above, unchanged.
    Raw(String),
}

impl Response {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Self::Json(value) => Some(value),
            _ => None,
        }
    }

    /// Converts into a JSON value; textual variants become strings and
    /// [`Response::Success`] becomes `true`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Success => Value::Bool(true),
            Self::Json(value) => value,
            Self::Url(text) | Self::XmlError(text) | Self::Raw(text) => Value::String(text),
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("true"),
            Self::Json(value) => write!(f, "{value}"),
            Self::Url(text) | Self::XmlError(text) | Self::Raw(text) => f.write_str(text),
        }
    }
}

struct Input<'a> {
    body: &'a str,
    status: StatusCode,
    context: ResponseContext,
}

type Classifier = fn(&Input<'_>) -> Option<Response>;

// Tried in order; the first match wins.
const CLASSIFIERS: &[Classifier] = &[
    url_body,
    empty_file_body,
    no_file_to_delete,
    json_body,
    xml_error_body,
];

/// Classifies a raw response body.
///
/// Never fails: a body nothing recognizes is logged and returned as
/// [`Response::Raw`].
pub fn normalize(body: &str, status: StatusCode, context: ResponseContext) -> Response {
    let input = Input {
        body,
        status,
        context,
    };
    CLASSIFIERS
        .iter()
        .find_map(|classify| classify(&input))
        .unwrap_or_else(|| {
            warn!(
                %status,
                "data returned from REDCap was neither JSON nor an XML error: {body}"
            );
            Response::Raw(body.to_owned())
        })
}

/// Normalizes a transport result, applying strict checks when requested.
pub(crate) fn resolve(
    status: StatusCode,
    body: String,
    context: ResponseContext,
    strict: bool,
) -> Result<Response, ClientError> {
    if !status.is_success() {
        warn!(%status, "REDCap returned a non-success status");
    }

    let response = normalize(&body, status, context);
    if !strict {
        return Ok(response);
    }

    match response {
        Response::Success => Ok(response),
        _ if !status.is_success() => Err(ClientError::HttpStatus { status, body }),
        Response::Raw(_) => Err(ClientError::UnrecognizedResponse(body)),
        _ => Ok(response),
    }
}

fn url_body(input: &Input<'_>) -> Option<Response> {
    let body = input.body;
    if URL_BODY.is_match(body) && Url::parse(body).is_ok() {
        Some(Response::Url(body.to_owned()))
    } else {
        None
    }
}

fn empty_file_body(input: &Input<'_>) -> Option<Response> {
    let file_call = matches!(
        input.context,
        ResponseContext::FileImport | ResponseContext::FileDelete
    );
    (file_call && input.status.is_success() && input.body.trim().is_empty())
        .then_some(Response::Success)
}

fn no_file_to_delete(input: &Input<'_>) -> Option<Response> {
    (input.context == ResponseContext::FileDelete
        && !input.status.is_success()
        && input.body.to_ascii_lowercase().contains("no file to delete"))
    .then_some(Response::Success)
}

fn json_body(input: &Input<'_>) -> Option<Response> {
    serde_json::from_str(input.body).ok().map(Response::Json)
}

fn xml_error_body(input: &Input<'_>) -> Option<Response> {
    extract_xml_error(input.body).map(Response::XmlError)
}

/// Returns the text of the first `error` element inside a `hash` element.
fn extract_xml_error(body: &str) -> Option<String> {
    let mut reader = Reader::from_str(body);
    let mut hash_depth = 0usize;
    let mut error_depth = 0usize;
    let mut text = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(element)) => match element.local_name().as_ref() {
                b"hash" => hash_depth += 1,
                b"error" if hash_depth > 0 => error_depth += 1,
                _ => {}
            },
            Ok(Event::Empty(element))
                if hash_depth > 0
                    && error_depth == 0
                    && element.local_name().as_ref() == b"error" =>
            {
                return Some(String::new());
            }
            Ok(Event::Text(content)) if error_depth > 0 => {
                text.push_str(&content.unescape().ok()?);
            }
            Ok(Event::CData(content)) if error_depth > 0 => {
                text.push_str(&String::from_utf8_lossy(&content.into_inner()));
            }
            Ok(Event::End(element)) => match element.local_name().as_ref() {
                b"error" if error_depth > 0 => {
                    error_depth -= 1;
                    if error_depth == 0 {
                        return Some(text);
                    }
                }
                b"hash" => hash_depth = hash_depth.saturating_sub(1),
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => return None,
            Ok(_) => {}
        }
    }
}
