use std::path::Path;

use reqwest::Url;
use reqwest::multipart::{Form, Part};
use serde::Serialize;
use tracing::{debug, error};

use crate::request::{self, Attachment, RequestDescriptor};
use crate::response::{self, Response};
use crate::{ClientError, ClientOptions};

/// Async REDCap API client.
///
/// This is the async counterpart of [`crate::BlockingRedcapClient`]; it
/// builds the same requests and normalizes responses the same way.
#[derive(Clone, Debug)]
pub struct RedcapClient {
    api_url: Url,
    token: String,
    options: ClientOptions,
    http: reqwest::Client,
}

impl RedcapClient {
    /// Creates a client for the given API URL and project token.
    pub fn new(api_url: impl AsRef<str>, token: impl Into<String>) -> Result<Self, ClientError> {
        Self::with_options(api_url, token, ClientOptions::default())
    }

    /// Creates a client with explicit [`ClientOptions`].
    pub fn with_options(
        api_url: impl AsRef<str>,
        token: impl Into<String>,
        options: ClientOptions,
    ) -> Result<Self, ClientError> {
        let api_url = Url::parse(api_url.as_ref())
            .map_err(|_| ClientError::InvalidBaseUrl(api_url.as_ref().to_owned()))?;
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!options.verify_ssl)
            .build()?;

        Ok(Self {
            api_url,
            token: token.into(),
            options,
            http,
        })
    }

    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    pub async fn export_events(&self, overrides: &[(&str, &str)]) -> Result<Response, ClientError> {
        self.send(&request::export_events(&self.token, overrides))
            .await
    }

    /// Exports the data dictionary.
    pub async fn export_metadata(
        &self,
        overrides: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.send(&request::export_metadata(&self.token, overrides))
            .await
    }

    /// Exports one survey link. On success the response is a [`Response::Url`].
    pub async fn export_survey_link(
        &self,
        instrument: &str,
        event: &str,
        record: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.send(&request::export_survey_link(
            &self.token,
            instrument,
            event,
            record,
            overrides,
        ))
        .await
    }

    pub async fn export_survey_participants(
        &self,
        instrument: &str,
        event: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.send(&request::export_survey_participants(
            &self.token,
            instrument,
            event,
            overrides,
        ))
        .await
    }

    pub async fn export_records(
        &self,
        overrides: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.send(&request::export_records(&self.token, overrides))
            .await
    }

    pub async fn import_records(
        &self,
        data: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.send(&request::import_records(&self.token, data, overrides))
            .await
    }

    /// Serializes `data` to JSON and imports it.
    pub async fn import_records_json<T: Serialize + ?Sized>(
        &self,
        data: &T,
        overrides: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        let payload = serde_json::to_string(data)?;
        self.import_records(&payload, overrides).await
    }

    pub async fn delete_record(
        &self,
        record: &str,
        overrides: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.send(&request::delete_record(&self.token, record, overrides))
            .await
    }

    pub async fn delete_form_field(
        &self,
        record: &str,
        field: &str,
        event: &str,
        repeat_instance: u32,
        overrides: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.send(&request::delete_form_field(
            &self.token,
            record,
            field,
            event,
            repeat_instance,
            overrides,
        ))
        .await
    }

    /// Uploads a local file into a file-upload field.
    pub async fn import_file(
        &self,
        record: &str,
        field: &str,
        event: &str,
        path: impl AsRef<Path>,
        repeat_instance: Option<u32>,
        overrides: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.send(&request::import_file(
            &self.token,
            record,
            field,
            event,
            path.as_ref(),
            repeat_instance,
            overrides,
        ))
        .await
    }

    pub async fn delete_file(
        &self,
        record: &str,
        field: &str,
        event: &str,
        repeat_instance: Option<u32>,
        overrides: &[(&str, &str)],
    ) -> Result<Response, ClientError> {
        self.send(&request::delete_file(
            &self.token,
            record,
            field,
            event,
            repeat_instance,
            overrides,
        ))
        .await
    }

    /// Sends a prepared request and normalizes the response.
    pub async fn send(&self, descriptor: &RequestDescriptor) -> Result<Response, ClientError> {
        let operation = descriptor.operation();
        debug!(%operation, url = %self.api_url, "sending REDCap request");

        let request = self.http.post(self.api_url.clone());
        let request = match descriptor.attachment() {
            Some(attachment) => request.multipart(multipart_form(descriptor, attachment).await?),
            None => request.form(descriptor.fields()),
        };

        let response = request
            .send()
            .await
            .inspect_err(|err| error!(%operation, "REDCap request failed: {err}"))?;
        let status = response.status();
        let body = response.text().await?;

        response::resolve(
            status,
            body,
            operation.definition().context,
            self.options.strict_errors,
        )
    }
}

async fn multipart_form(
    descriptor: &RequestDescriptor,
    attachment: &Attachment,
) -> Result<Form, ClientError> {
    let contents = tokio::fs::read(&attachment.path)
        .await
        .map_err(|source| ClientError::Attachment {
            path: attachment.path.clone(),
            source,
        })?;
    let mut part = Part::bytes(contents);
    if let Some(name) = attachment.path.file_name() {
        part = part.file_name(name.to_string_lossy().into_owned());
    }

    Ok(descriptor
        .fields()
        .iter()
        .fold(Form::new(), |form, (name, value)| {
            form.text(name.clone(), value.clone())
        })
        .part(attachment.field.clone(), part))
}
