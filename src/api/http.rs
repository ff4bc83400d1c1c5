//! Implements the `Backend` trait with `reqwest`, against the classification service's HTTP API.

use crate::api::{Backend, CategoryMap, FilePart, UploadPayload, PDF_FIELD};
use crate::error::{Error, ErrorType, IntoResult, Res};
use crate::model::SessionResult;
use crate::{Config, Result};
use anyhow::{anyhow, Context};
use reqwest::multipart::{Form, Part};
use reqwest::RequestBuilder;
use serde_json::{json, Value};
use tracing::{debug, trace};
use url::Url;

const UPLOAD: &str = "upload";
const CATEGORIES: &str = "clasificaciones";
const KEYWORDS: &str = "keywords";

/// Message used when a mutation succeeds but the server does not say anything.
const DEFAULT_MESSAGE: &str = "Done";

/// Talks to the classification service at `Config::api_base_url`.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base: Url,
}

impl HttpBackend {
    pub fn new(config: &Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.request_timeout() {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .context("Unable to create the HTTP client")
            .pub_result(ErrorType::Config)?;
        Ok(Self {
            client,
            base: config.api_base_url().clone(),
        })
    }

    fn url(&self, segments: &[&str], trailing_slash: bool) -> Result<Url> {
        endpoint(&self.base, segments, trailing_slash).pub_result(ErrorType::Config)
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn upload(&self, payload: UploadPayload) -> Result<SessionResult> {
        let url = self.url(&[UPLOAD], true)?;
        let form = multipart(payload).pub_result(ErrorType::Io)?;
        let reply = send(self.client.post(url).multipart(form), "upload").await?;
        decode_upload(&reply)
    }

    async fn list_categories(&self) -> Result<CategoryMap> {
        let url = self.url(&[CATEGORIES], true)?;
        let reply = send(self.client.get(url), "list categories").await?;
        decode_categories(&reply)
    }

    async fn create_category(&self, name: &str, keywords: &[String]) -> Result<String> {
        let url = self.url(&[CATEGORIES], true)?;
        let body = json!({ "name": name, "keywords": keywords });
        let reply = send(self.client.post(url).json(&body), "create category").await?;
        decode_message(&reply)
    }

    async fn add_keyword(&self, category: &str, keyword: &str) -> Result<String> {
        let mut url = self.url(&[CATEGORIES, category, KEYWORDS], true)?;
        url.query_pairs_mut().append_pair("keyword", keyword);
        let reply = send(self.client.post(url), "add keyword").await?;
        decode_message(&reply)
    }

    async fn delete_category(&self, category: &str) -> Result<String> {
        let url = self.url(&[CATEGORIES, category], false)?;
        let reply = send(self.client.delete(url), "delete category").await?;
        decode_message(&reply)
    }

    async fn delete_keyword(&self, category: &str, keyword: &str) -> Result<String> {
        let url = self.url(&[CATEGORIES, category, KEYWORDS, keyword], false)?;
        let reply = send(self.client.delete(url), "delete keyword").await?;
        decode_message(&reply)
    }
}

/// The status and body of a completed round trip.
#[derive(Debug, Clone)]
struct Reply {
    status: u16,
    body: String,
}

impl Reply {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Appends `segments` to the path of `base`, percent-encoding each one.
fn endpoint(base: &Url, segments: &[&str], trailing_slash: bool) -> Res<Url> {
    let mut url = base.clone();
    {
        let mut path = url
            .path_segments_mut()
            .map_err(|_| anyhow!("The API base URL '{base}' cannot be used as a base"))?;
        path.pop_if_empty().extend(segments);
        if trailing_slash {
            path.push("");
        }
    }
    Ok(url)
}

fn multipart(payload: UploadPayload) -> Res<Form> {
    let mut form = Form::new();
    for (field, FilePart { file_name, bytes }) in payload.into_parts() {
        let mime = if field == PDF_FIELD {
            "application/pdf"
        } else {
            "text/csv"
        };
        debug!("Adding {file_name} ({} bytes) as '{field}'", bytes.len());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str(mime)
            .with_context(|| format!("Invalid content type '{mime}'"))?;
        form = form.part(field, part);
    }
    Ok(form)
}

async fn send(request: RequestBuilder, what: &str) -> Result<Reply> {
    let response = request
        .send()
        .await
        .with_context(|| format!("Unable to send the {what} request"))
        .pub_result(ErrorType::Transport)?;
    let status = response.status().as_u16();
    trace!("{what} answered with status {status}");
    let body = response
        .text()
        .await
        .with_context(|| format!("Unable to read the {what} response"))
        .pub_result(ErrorType::Transport)?;
    Ok(Reply { status, body })
}

/// Parses the reply body as JSON and turns failure statuses and error payloads into
/// `ErrorType::Server`.
fn checked_json(reply: &Reply) -> Result<Value> {
    let value = serde_json::from_str::<Value>(&reply.body);
    if !reply.is_success() {
        let message = value.ok().as_ref().and_then(failure_message);
        return Err(Error::server(Some(reply.status), message));
    }
    let value = value
        .context("The response body is not JSON")
        .pub_result(ErrorType::Malformed)?;
    if let Some(message) = error_payload(&value) {
        return Err(Error::server(Some(reply.status), Some(message)));
    }
    Ok(value)
}

fn decode_upload(reply: &Reply) -> Result<SessionResult> {
    let value = checked_json(reply)?;
    let result: SessionResult = serde_json::from_value(value)
        .context("The upload response does not have the expected shape")
        .pub_result(ErrorType::Malformed)?;
    debug!(
        "Received {} tickets, {} time series points, {} category totals",
        result.tickets().len(),
        result.time_series().len(),
        result.category_totals().len()
    );
    Ok(result)
}

fn decode_categories(reply: &Reply) -> Result<CategoryMap> {
    let value = checked_json(reply)?;
    serde_json::from_value(value)
        .context("The category list does not have the expected shape")
        .pub_result(ErrorType::Malformed)
}

fn decode_message(reply: &Reply) -> Result<String> {
    let value = checked_json(reply)?;
    Ok(value
        .get("message")
        .map(text)
        .unwrap_or_else(|| DEFAULT_MESSAGE.to_string()))
}

/// Finds an `error` field in a body. The service sometimes answers a failure with
/// a success status and a `[{"error": ...}, status]` pair, so arrays are searched too.
fn error_payload(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("error").map(text),
        Value::Array(items) => items.first().and_then(error_payload),
        _ => None,
    }
}

fn failure_message(value: &Value) -> Option<String> {
    error_payload(value)
        .or_else(|| value.get("detail").map(text))
        .or_else(|| value.get("message").map(text))
}

fn text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
