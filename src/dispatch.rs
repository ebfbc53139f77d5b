//! Request dispatch for both API families
//!
//! The [`Dispatcher`] owns the HTTP client and the session's diagnostic
//! state. Every call goes through one of three entry points:
//! - [`Dispatcher::send`] for legacy query-string calls
//! - [`Dispatcher::send_job`] for the export API
//! - [`Dispatcher::fetch`] for raw downloads of export archives
//!
//! None of them return a transport failure as anything but an [`Error`]
//! value, and each one overwrites [`Diagnostics`] wholesale.

use crate::classify::{classify_job, classify_legacy, classify_legacy_raw, job_http_status};
use crate::config::{Config, RetryConfig};
use crate::error::{Error, Result};
use crate::params::{LegacyArgs, encode_legacy};
use crate::retry::with_retry;
use crate::types::{Diagnostics, Outcome, Product};
use reqwest::Method;
use serde_json::Value;
use tracing::{debug, warn};

/// Header carrying the API token on the export API
pub const API_TOKEN_HEADER: &str = "X-API-TOKEN";

/// File uploaded with a multipart legacy request
#[derive(Clone, Debug)]
pub struct FilePart {
    /// Form field name
    pub field: String,
    /// File name reported to the server
    pub file_name: String,
    /// File content
    pub content: Vec<u8>,
}

impl FilePart {
    /// Create a file part
    pub fn new(
        field: impl Into<String>,
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            field: field.into(),
            file_name: file_name.into(),
            content: content.into(),
        }
    }
}

/// One legacy API call
///
/// The transport method follows from the content: a raw body makes it a
/// POST, files make it a multipart POST, otherwise it is a GET.
#[derive(Clone, Debug)]
pub struct RequestDescriptor {
    /// API action name (`Request` parameter)
    pub request: String,
    /// Product family selecting the endpoint
    pub product: Product,
    /// Call arguments
    pub args: LegacyArgs,
    /// Raw POST body
    pub body: Option<String>,
    /// Files for a multipart POST
    pub files: Vec<FilePart>,
}

impl RequestDescriptor {
    /// Describe a GET call to the control panel API
    pub fn new(request: impl Into<String>) -> Self {
        Self {
            request: request.into(),
            product: Product::default(),
            args: LegacyArgs::default(),
            body: None,
            files: Vec::new(),
        }
    }

    /// Target another product family
    pub fn product(mut self, product: Product) -> Self {
        self.product = product;
        self
    }

    /// Set the call arguments
    pub fn args(mut self, args: LegacyArgs) -> Self {
        self.args = args;
        self
    }

    /// Send `body` as the raw POST body
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Attach a file (multipart POST)
    pub fn file(mut self, part: FilePart) -> Self {
        self.files.push(part);
        self
    }

    /// Transport method this call will use
    pub fn method(&self) -> Method {
        if self.body.is_some() || !self.files.is_empty() {
            Method::POST
        } else {
            Method::GET
        }
    }
}

/// One export API call
#[derive(Clone, Debug)]
pub struct JobRequest {
    /// HTTP method; only GET and POST are supported
    pub method: Method,
    /// Path relative to the export endpoint (empty for the collection itself)
    pub path: String,
    /// JSON body for POST
    pub body: Option<Value>,
}

impl JobRequest {
    /// GET `path`
    pub fn get(path: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            path: path.into(),
            body: None,
        }
    }

    /// POST `body` to `path`
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            path: path.into(),
            body: Some(body),
        }
    }
}

struct RawResponse {
    status: u16,
    url: String,
    body: Vec<u8>,
}

/// HTTP dispatcher holding the session's diagnostic state
pub struct Dispatcher {
    client: reqwest::Client,
    config: Config,
    diagnostics: Diagnostics,
}

impl Dispatcher {
    /// Build a dispatcher from configuration
    pub fn new(config: Config) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.http.timeout)
            .danger_accept_invalid_certs(config.http.accept_invalid_certs);
        if let Some(user_agent) = &config.http.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let client = builder.build().map_err(|e| {
            Error::config(format!("failed to create HTTP client: {}", e), "http")
        })?;

        Ok(Self {
            client,
            config,
            diagnostics: Diagnostics::default(),
        })
    }

    /// Session configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Diagnostic state of the last call
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Endpoint of a legacy product family
    pub fn legacy_url(&self, product: Product) -> &str {
        if let Some(url) = &self.config.endpoints.override_url {
            return url;
        }
        match product {
            Product::ControlPanel => &self.config.endpoints.control_panel_url,
            Product::Contacts => &self.config.endpoints.contacts_url,
        }
    }

    /// Absolute URL of an export API path
    pub fn job_url(&self, path: &str) -> String {
        let base = self.config.endpoints.exports_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        if path.is_empty() {
            base.to_string()
        } else {
            format!("{}/{}", base, path)
        }
    }

    /// Dispatch a legacy API call and classify its response
    pub async fn send(&mut self, descriptor: &RequestDescriptor) -> Outcome {
        let url = self.legacy_url(descriptor.product).to_string();
        let params = encode_legacy(
            &self.config.credentials,
            &self.config.api_version,
            &descriptor.request,
            &descriptor.args,
        );
        let method = descriptor.method();

        debug!(
            request = %descriptor.request,
            product = descriptor.product.code(),
            %method,
            %url,
            "dispatching legacy request"
        );
        self.begin();

        let client = &self.client;
        let response = execute(&self.config.retry, &url, || {
            let builder = client.request(method.clone(), &url).query(params.as_pairs());
            if let Some(body) = &descriptor.body {
                builder.body(body.clone())
            } else if !descriptor.files.is_empty() {
                builder.multipart(multipart_form(&descriptor.files))
            } else {
                builder
            }
        })
        .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.record_transport_failure(&e);
                return Outcome::Error(e);
            }
        };
        let text = self.record_response(&response);

        if response.status == 403 {
            return self.finish(Outcome::Error(Error::Forbidden));
        }

        let outcome = match serde_json::from_str::<Value>(&text) {
            Ok(document) => {
                self.diagnostics.last_json = Some(document.clone());
                classify_legacy(&descriptor.request, document)
            }
            Err(_) => classify_legacy_raw(
                response.status,
                text,
                descriptor.args.response_format().allows_raw(),
            ),
        };
        self.finish(outcome)
    }

    /// Dispatch an export API call and classify its response
    ///
    /// On success the outcome carries the document's `result` object. Methods
    /// other than GET and POST are a caller defect and are rejected before
    /// anything is sent or recorded.
    pub async fn send_job(&mut self, request: &JobRequest) -> Outcome {
        if request.method != Method::GET && request.method != Method::POST {
            return Outcome::Error(Error::NotSupported(format!(
                "HTTP method {} is not supported by the export API",
                request.method
            )));
        }

        let url = self.job_url(&request.path);
        debug!(method = %request.method, %url, "dispatching export API request");
        self.begin();

        let client = &self.client;
        let token = self.config.credentials.token.as_str();
        let response = execute(&self.config.retry, &url, || {
            let builder = client
                .request(request.method.clone(), &url)
                .header(API_TOKEN_HEADER, token);
            match &request.body {
                Some(body) => builder.json(body),
                None => builder,
            }
        })
        .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.record_transport_failure(&e);
                return Outcome::Error(e);
            }
        };
        let text = self.record_response(&response);

        let (document, outcome) = classify_job(response.status, &text);
        if let Some(document) = &document {
            debug!(
                http_status = job_http_status(document).unwrap_or("unknown"),
                "export API response"
            );
        }
        self.diagnostics.last_json = document;
        self.finish(outcome)
    }

    /// Download raw bytes from an export file URL
    ///
    /// The token header is sent along since export files are not public.
    pub async fn fetch(&mut self, url: &str) -> Result<Vec<u8>> {
        debug!(%url, "downloading export file");
        self.begin();

        let client = &self.client;
        let token = self.config.credentials.token.as_str();
        let response = execute(&self.config.retry, url, || {
            client.get(url).header(API_TOKEN_HEADER, token)
        })
        .await;

        let response = match response {
            Ok(response) => response,
            Err(e) => {
                self.record_transport_failure(&e);
                return Err(e);
            }
        };
        self.diagnostics.last_url = Some(response.url.clone());
        self.diagnostics.last_status_code = Some(response.status);

        if (200..300).contains(&response.status) {
            self.diagnostics.last_error = None;
            return Ok(response.body);
        }

        let text = String::from_utf8_lossy(&response.body).into_owned();
        let (_, outcome) = classify_job(response.status, &text);
        self.diagnostics.last_response = Some(text);
        match self.finish(outcome) {
            Outcome::Error(e) => Err(e),
            _ => Err(Error::http(response.status)),
        }
    }

    /// Record a failure detected above the transport (archive validation, polling policy)
    pub(crate) fn record_failure(&mut self, error: &Error) {
        warn!(kind = ?error.kind(), error = %error, "request failed");
        self.diagnostics.last_error = Some(error.to_string());
        self.diagnostics.last_json = None;
    }

    fn begin(&mut self) {
        self.diagnostics = Diagnostics::default();
    }

    fn record_response(&mut self, response: &RawResponse) -> String {
        let text = String::from_utf8_lossy(&response.body).into_owned();
        self.diagnostics.last_url = Some(response.url.clone());
        self.diagnostics.last_status_code = Some(response.status);
        self.diagnostics.last_response = Some(text.clone());
        text
    }

    fn record_transport_failure(&mut self, error: &Error) {
        self.diagnostics.last_url = Some(String::new());
        self.diagnostics.last_status_code = None;
        self.diagnostics.last_response = None;
        self.record_failure(error);
    }

    fn finish(&mut self, outcome: Outcome) -> Outcome {
        match &outcome {
            Outcome::Error(e) => self.record_failure(e),
            _ => self.diagnostics.last_error = None,
        }
        outcome
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("diagnostics", &self.diagnostics)
            .finish()
    }
}

async fn execute<F>(retry: &RetryConfig, url: &str, build: F) -> Result<RawResponse>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let response = with_retry(retry, || build().send())
        .await
        .map_err(|e| transport_error(url, &e))?;

    let status = response.status().as_u16();
    let final_url = response.url().to_string();
    let body = response
        .bytes()
        .await
        .map_err(|e| transport_error(url, &e))?
        .to_vec();

    Ok(RawResponse {
        status,
        url: final_url,
        body,
    })
}

fn multipart_form(files: &[FilePart]) -> reqwest::multipart::Form {
    files
        .iter()
        .fold(reqwest::multipart::Form::new(), |form, file| {
            let part = reqwest::multipart::Part::bytes(file.content.clone())
                .file_name(file.file_name.clone());
            form.part(file.field.clone(), part)
        })
}

/// Describe a transport failure with its full cause chain
///
/// `url` is the endpoint without query parameters so the token never ends up
/// in an error message.
fn transport_error(url: &str, error: &reqwest::Error) -> Error {
    let mut cause = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(inner) = source {
        cause.push_str(": ");
        cause.push_str(&inner.to_string());
        source = inner.source();
    }
    Error::Network(format!(
        "Max retries exceeded with url: {} (Caused by {})",
        url, cause
    ))
}
