//! Request parameter encoding for the legacy query-string API
//!
//! Turns an action name plus structured arguments into the flat, ordered
//! parameter list the legacy API expects, either as a query string or as a
//! form body. Nested embedded data is flattened with bracket notation:
//!
//! ```text
//! {"SubjectID": "CLE10235", "Zip": "74534"}  =>  ED[SubjectID]=CLE10235&ED[Zip]=74534
//! ```

use crate::config::Credentials;
use std::collections::BTreeMap;

/// Key/value metadata attached to a response or recipient record
pub type EmbeddedData = BTreeMap<String, String>;

/// Response format requested from the legacy API
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResponseFormat {
    /// `Format=JSON`; a non-JSON answer is a protocol error
    #[default]
    Json,
    /// Caller chose the format explicitly; `None` omits the key so the server
    /// answers in its own default (XML for survey documents). A non-JSON answer
    /// is handed back verbatim.
    Requested(Option<String>),
}

impl ResponseFormat {
    /// Whether a body that is not JSON may be returned as raw text
    pub fn allows_raw(&self) -> bool {
        matches!(self, ResponseFormat::Requested(_))
    }

    fn value(&self) -> Option<&str> {
        match self {
            ResponseFormat::Json => Some("JSON"),
            ResponseFormat::Requested(format) => format.as_deref(),
        }
    }
}

/// Flat, ordered parameter list
///
/// Keys are unique; pushing an existing key replaces its value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParamSet {
    pairs: Vec<(String, String)>,
}

impl ParamSet {
    /// Create an empty parameter list
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` to `value`, keeping the key's original position if present
    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.pairs.iter_mut().find(|(k, _)| *k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key, value)),
        }
    }

    /// Remove `key` if present
    pub fn remove(&mut self, key: &str) {
        self.pairs.retain(|(k, _)| k != key);
    }

    /// Value of `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether `key` is present
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Iterate over the pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of parameters
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    /// Whether the list is empty
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Borrow the raw pairs (suitable for `RequestBuilder::query`)
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// Arguments of one legacy API call
///
/// Optional arguments set to `None` are dropped entirely so the server applies
/// its own default.
#[derive(Clone, Debug, Default)]
pub struct LegacyArgs {
    args: Vec<(String, Option<String>)>,
    embedded_data: EmbeddedData,
    version: Option<String>,
    format: ResponseFormat,
}

impl LegacyArgs {
    /// Create an empty argument set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required argument
    ///
    /// `Format` and `Version` are base keys: passing them here is the same as
    /// calling [`format`](Self::format) or [`version`](Self::version).
    pub fn arg(self, key: impl Into<String>, value: impl ToString) -> Self {
        self.push_arg(key.into(), Some(value.to_string()))
    }

    /// Add an optional argument; `None` is omitted from the request
    ///
    /// `opt("Format", None)` omits the `Format` key so the server answers in
    /// its own default, and `opt("Version", None)` keeps the session version.
    pub fn opt<T: ToString>(self, key: impl Into<String>, value: Option<T>) -> Self {
        self.push_arg(key.into(), value.map(|v| v.to_string()))
    }

    fn push_arg(mut self, key: String, value: Option<String>) -> Self {
        match key.as_str() {
            "Format" => self.format = ResponseFormat::Requested(value),
            "Version" => self.version = value,
            _ => self.args.push((key, value)),
        }
        self
    }

    /// Replace the embedded data map
    pub fn embedded_data(mut self, data: EmbeddedData) -> Self {
        self.embedded_data = data;
        self
    }

    /// Add one embedded data entry
    pub fn ed(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.embedded_data.insert(key.into(), value.into());
        self
    }

    /// Override the session's API version for this call
    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Request a specific response format
    pub fn format(mut self, format: ResponseFormat) -> Self {
        self.format = format;
        self
    }

    /// Requested response format
    pub fn response_format(&self) -> &ResponseFormat {
        &self.format
    }
}

/// Encode a legacy API call into its parameter list
///
/// Base keys come first (`User`, `Token`, `Format`, `Version`, `Request`),
/// followed by the call's arguments in the order given and finally one
/// `ED[<key>]` entry per embedded data item.
pub fn encode_legacy(
    credentials: &Credentials,
    default_version: &str,
    request: &str,
    args: &LegacyArgs,
) -> ParamSet {
    let mut params = ParamSet::new();
    params.push("User", credentials.user.as_str());
    params.push("Token", credentials.token.as_str());
    // Server default format: the key must be absent, not empty.
    if let Some(format) = args.format.value() {
        params.push("Format", format);
    }
    params.push(
        "Version",
        args.version.as_deref().unwrap_or(default_version),
    );
    params.push("Request", request);

    for (key, value) in &args.args {
        if let Some(value) = value {
            params.push(key.as_str(), value.as_str());
        }
    }

    for (key, value) in &args.embedded_data {
        params.push(format!("ED[{}]", key), value.as_str());
    }

    params
}
