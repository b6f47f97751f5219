use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
        }
    }

    /// GET and HEAD requests never carry a body.
    pub fn allows_body(&self) -> bool {
        !matches!(self, HttpMethod::Get | HttpMethod::Head)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct HeaderKV {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

impl HeaderKV {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            id: String::new(),
            key: key.into(),
            value: value.into(),
            enabled: true,
        }
    }
}

pub type QueryParamKV = HeaderKV;

fn enabled_by_default() -> bool {
    true
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AuthType {
    #[default]
    None,
    Bearer,
    Basic,
    ApiKey,
    Oauth2,
    Digest,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyLocation {
    #[default]
    Header,
    Query,
    Cookie,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct ApiKeyItem {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub location: ApiKeyLocation,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(rename = "type", default)]
    pub auth_type: AuthType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub api_keys: Vec<ApiKeyItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oauth2_scope: Option<String>,
}

impl AuthConfig {
    pub fn bearer(token: impl Into<String>) -> Self {
        Self {
            auth_type: AuthType::Bearer,
            token: Some(token.into()),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
pub enum BodyType {
    #[default]
    #[serde(rename = "none")]
    None,
    #[serde(rename = "raw")]
    Raw,
    #[serde(rename = "form-data")]
    FormData,
    #[serde(rename = "x-www-form-urlencoded")]
    UrlEncoded,
    #[serde(rename = "binary")]
    Binary,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RawBodyType {
    #[default]
    Json,
    Xml,
    Html,
    Text,
    Javascript,
    Graphql,
    Yaml,
}

impl RawBodyType {
    pub fn content_type(&self) -> &'static str {
        match self {
            RawBodyType::Json => "application/json",
            RawBodyType::Xml => "application/xml",
            RawBodyType::Html => "text/html",
            RawBodyType::Text => "text/plain",
            RawBodyType::Javascript => "application/javascript",
            RawBodyType::Graphql => "application/graphql",
            RawBodyType::Yaml => "application/x-yaml",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormDataKind {
    #[default]
    Text,
    File,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FormDataItem {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(rename = "type", default)]
    pub kind: FormDataKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    /// Base64 data URL (`data:<mime>;base64,<payload>`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_mime_type: Option<String>,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestBody {
    #[serde(rename = "type", default)]
    pub body_type: BodyType,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_type: Option<RawBodyType>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub form_data: Vec<FormDataItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub binary_mime_type: Option<String>,
}

impl RequestBody {
    pub fn raw_json(content: impl Into<String>) -> Self {
        Self {
            body_type: BodyType::Raw,
            content: content.into(),
            raw_type: Some(RawBodyType::Json),
            ..Default::default()
        }
    }
}

/// A fully described HTTP request as stored in a collection or inlined in a
/// request node.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpRequest {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub method: HttpMethod,
    pub url: String,
    #[serde(default)]
    pub query_params: Vec<QueryParamKV>,
    #[serde(default)]
    pub headers: Vec<HeaderKV>,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub body: RequestBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pre_request_script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub post_request_script: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push(HeaderKV::new(key, value));
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_params.push(HeaderKV::new(key, value));
        self
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseBodyType {
    Json,
    #[default]
    Text,
}

/// Outcome of one HTTP call. Transport failures are expressed as
/// `status == 0` with `error` set rather than as an `Err`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpResponse {
    pub status: u16,
    #[serde(default)]
    pub status_text: String,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub body_type: ResponseBodyType,
    #[serde(default)]
    pub time_ms: u64,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl HttpResponse {
    /// Builds a response, classifying the body as JSON when it parses.
    pub fn new(status: u16, status_text: impl Into<String>, body: impl Into<String>) -> Self {
        let body = body.into();
        let body_type = if serde_json::from_str::<serde_json::Value>(&body).is_ok() {
            ResponseBodyType::Json
        } else {
            ResponseBodyType::Text
        };
        Self {
            status,
            status_text: status_text.into(),
            headers: BTreeMap::new(),
            size_bytes: body.len() as u64,
            body,
            body_type,
            time_ms: 0,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>, time_ms: u64) -> Self {
        Self {
            status: 0,
            status_text: "Error".to_string(),
            time_ms,
            error: Some(error.into()),
            ..Default::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub requests: Vec<HttpRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_id: Option<String>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Collection {
    pub fn request(&self, request_id: &str) -> Option<&HttpRequest> {
        self.requests.iter().find(|r| r.id == request_id)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EnvironmentVariable {
    #[serde(default)]
    pub id: String,
    pub key: String,
    #[serde(default)]
    pub value: String,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Environment {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub variables: Vec<EnvironmentVariable>,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
}

impl Environment {
    /// Key/value map of the enabled variables. Later duplicates win.
    pub fn enabled_variables(&self) -> BTreeMap<String, String> {
        self.variables
            .iter()
            .filter(|v| v.enabled)
            .map(|v| (v.key.clone(), v.value.clone()))
            .collect()
    }
}
