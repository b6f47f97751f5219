//! HTTP-execution collaborator.
//!
//! The engine hands a fully resolved [`HttpRequest`] to an [`HttpExecutor`]
//! and stores whatever [`HttpResponse`] comes back. Non-2xx statuses are not
//! failures; transport failures come back as `status == 0` with `error` set.

use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use tracing::{debug, warn};

use crate::core::cancellation::CancellationHandle;
use crate::domain::model::{
    ApiKeyLocation, AuthType, BodyType, FormDataKind, HttpRequest, HttpResponse, RequestBody,
};
use crate::error::NodeError;

#[async_trait]
pub trait HttpExecutor: Send + Sync {
    /// Sends the request. Returns `Err(NodeError::Cancelled)` when the handle
    /// fires before the response is complete.
    async fn execute(
        &self,
        request: &HttpRequest,
        cancel: &CancellationHandle,
    ) -> Result<HttpResponse, NodeError>;
}

#[derive(Debug, Clone)]
pub struct HttpPoolConfig {
    pub pool_max_idle_per_host: usize,
    pub pool_idle_timeout: Duration,
    pub default_timeout: Duration,
    pub tcp_keepalive: Option<Duration>,
    pub http2_enabled: bool,
}

impl Default for HttpPoolConfig {
    fn default() -> Self {
        Self {
            pool_max_idle_per_host: 10,
            pool_idle_timeout: Duration::from_secs(90),
            default_timeout: Duration::from_secs(30),
            tcp_keepalive: Some(Duration::from_secs(60)),
            http2_enabled: true,
        }
    }
}

/// [`HttpExecutor`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestHttpExecutor {
    client: reqwest::Client,
    config: HttpPoolConfig,
}

/// Request parts that do not depend on the client.
#[derive(Debug)]
struct PreparedRequest {
    url: reqwest::Url,
    headers: HeaderMap,
    body: PreparedBody,
}

#[derive(Debug)]
enum PreparedBody {
    Empty,
    Bytes(Vec<u8>),
    Form(Vec<(String, String)>),
    Multipart(Vec<MultipartField>),
}

#[derive(Debug)]
enum MultipartField {
    Text {
        key: String,
        value: String,
    },
    File {
        key: String,
        file_name: String,
        mime: String,
        bytes: Vec<u8>,
    },
}

impl ReqwestHttpExecutor {
    pub fn new(config: HttpPoolConfig) -> Result<Self, NodeError> {
        let client = Self::apply_pool_options(reqwest::Client::builder(), &config)
            .build()
            .map_err(|e| NodeError::HttpError(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &HttpPoolConfig {
        &self.config
    }

    fn apply_pool_options(
        mut builder: reqwest::ClientBuilder,
        config: &HttpPoolConfig,
    ) -> reqwest::ClientBuilder {
        builder = builder
            .pool_max_idle_per_host(config.pool_max_idle_per_host)
            .pool_idle_timeout(config.pool_idle_timeout)
            .tcp_keepalive(config.tcp_keepalive)
            .timeout(config.default_timeout);

        if !config.http2_enabled {
            builder = builder.http1_only();
        }

        builder
    }

    fn build_request(&self, request: &HttpRequest, prepared: PreparedRequest) -> reqwest::RequestBuilder {
        let method = reqwest::Method::from_bytes(request.method.as_str().as_bytes())
            .unwrap_or(reqwest::Method::GET);
        let builder = self
            .client
            .request(method, prepared.url)
            .headers(prepared.headers);

        if !request.method.allows_body() {
            return builder;
        }

        match prepared.body {
            PreparedBody::Empty => builder,
            PreparedBody::Bytes(bytes) => builder.body(bytes),
            PreparedBody::Form(pairs) => builder.form(&pairs),
            PreparedBody::Multipart(fields) => {
                let mut form = reqwest::multipart::Form::new();
                for field in fields {
                    form = match field {
                        MultipartField::Text { key, value } => form.text(key, value),
                        MultipartField::File {
                            key,
                            file_name,
                            mime,
                            bytes,
                        } => {
                            let part = reqwest::multipart::Part::bytes(bytes).file_name(file_name);
                            let part = match part.mime_str(&mime) {
                                Ok(part) => part,
                                Err(e) => {
                                    warn!(mime = %mime, error = %e, "invalid multipart mime type");
                                    continue;
                                }
                            };
                            form.part(key, part)
                        }
                    };
                }
                builder.multipart(form)
            }
        }
    }

    async fn send(&self, request: &HttpRequest) -> HttpResponse {
        let start = Instant::now();
        let elapsed = |start: Instant| start.elapsed().as_millis() as u64;

        let prepared = match prepare_request(request) {
            Ok(prepared) => prepared,
            Err(message) => return HttpResponse::failed(message, elapsed(start)),
        };

        debug!(method = request.method.as_str(), url = %prepared.url, "sending request");
        let response = match self.build_request(request, prepared).send().await {
            Ok(response) => response,
            Err(e) => return HttpResponse::failed(e.to_string(), elapsed(start)),
        };

        let status = response.status();
        let mut headers: BTreeMap<String, String> = BTreeMap::new();
        for (name, value) in response.headers() {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            headers
                .entry(name.as_str().to_ascii_lowercase())
                .and_modify(|existing| {
                    existing.push_str(", ");
                    existing.push_str(&value);
                })
                .or_insert(value);
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => return HttpResponse::failed(e.to_string(), elapsed(start)),
        };

        let mut result = HttpResponse::new(
            status.as_u16(),
            status.canonical_reason().unwrap_or(""),
            body,
        );
        result.headers = headers;
        result.time_ms = elapsed(start);
        result
    }
}

#[async_trait]
impl HttpExecutor for ReqwestHttpExecutor {
    async fn execute(
        &self,
        request: &HttpRequest,
        cancel: &CancellationHandle,
    ) -> Result<HttpResponse, NodeError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                debug!(url = %request.url, "request cancelled");
                Err(NodeError::Cancelled)
            }
            response = self.send(request) => Ok(response),
        }
    }
}

/// Resolves URL, headers and body of a request without sending it.
fn prepare_request(request: &HttpRequest) -> Result<PreparedRequest, String> {
    let mut url = reqwest::Url::parse(&request.url).map_err(|e| format!("Invalid URL: {}", e))?;

    {
        let enabled_params: Vec<_> = request
            .query_params
            .iter()
            .filter(|p| p.enabled && !p.key.is_empty())
            .collect();
        let query_keys: Vec<_> = if request.auth.auth_type == AuthType::ApiKey {
            request
                .auth
                .api_keys
                .iter()
                .filter(|k| k.enabled && k.location == ApiKeyLocation::Query)
                .collect()
        } else {
            Vec::new()
        };
        if !enabled_params.is_empty() || !query_keys.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for param in enabled_params {
                pairs.append_pair(&param.key, &param.value);
            }
            for key in query_keys {
                pairs.append_pair(&key.key, &key.value);
            }
        }
    }

    let mut headers: Vec<(String, String)> = request
        .headers
        .iter()
        .filter(|h| h.enabled && !h.key.is_empty())
        .map(|h| (h.key.clone(), h.value.clone()))
        .collect();

    let auth = &request.auth;
    let non_empty = |s: &Option<String>| s.as_deref().filter(|s| !s.is_empty()).map(str::to_string);
    match auth.auth_type {
        AuthType::Bearer => {
            if let Some(token) = non_empty(&auth.token) {
                headers.push((AUTHORIZATION.to_string(), format!("Bearer {}", token)));
            }
        }
        // Digest is sent as Basic.
        AuthType::Basic | AuthType::Digest => {
            if let (Some(user), Some(pass)) = (non_empty(&auth.username), non_empty(&auth.password)) {
                let encoded = BASE64_STANDARD.encode(format!("{}:{}", user, pass));
                headers.push((AUTHORIZATION.to_string(), format!("Basic {}", encoded)));
            }
        }
        AuthType::Oauth2 => {
            if let Some(token) = non_empty(&auth.oauth2_access_token) {
                headers.push((AUTHORIZATION.to_string(), format!("Bearer {}", token)));
            }
        }
        AuthType::ApiKey => {
            headers.extend(
                auth.api_keys
                    .iter()
                    .filter(|k| k.enabled && k.location == ApiKeyLocation::Header)
                    .map(|k| (k.key.clone(), k.value.clone())),
            );
        }
        AuthType::None => {}
    }

    let has_content_type = headers
        .iter()
        .any(|(k, _)| k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
    if !has_content_type {
        match request.body.body_type {
            BodyType::Raw => headers.push((CONTENT_TYPE.to_string(), "application/json".into())),
            BodyType::UrlEncoded => headers.push((
                CONTENT_TYPE.to_string(),
                "application/x-www-form-urlencoded".into(),
            )),
            _ => {}
        }
    }

    let (body, body_content_type) = prepare_body(&request.body)?;
    if let Some(content_type) = body_content_type {
        headers.retain(|(k, _)| !k.eq_ignore_ascii_case(CONTENT_TYPE.as_str()));
        headers.push((CONTENT_TYPE.to_string(), content_type));
    }

    let mut header_map = HeaderMap::new();
    for (key, value) in headers {
        match (
            HeaderName::from_bytes(key.as_bytes()),
            HeaderValue::from_str(&value),
        ) {
            (Ok(name), Ok(value)) => {
                header_map.insert(name, value);
            }
            _ => warn!(header = %key, "skipping invalid header"),
        }
    }

    Ok(PreparedRequest {
        url,
        headers: header_map,
        body,
    })
}

/// The body plus the content type it forces, if any.
fn prepare_body(body: &RequestBody) -> Result<(PreparedBody, Option<String>), String> {
    match body.body_type {
        BodyType::None => Ok((PreparedBody::Empty, None)),
        BodyType::Raw => {
            let raw_type = body.raw_type.unwrap_or_default();
            Ok((
                PreparedBody::Bytes(body.content.clone().into_bytes()),
                Some(raw_type.content_type().to_string()),
            ))
        }
        BodyType::UrlEncoded => {
            let pairs = body
                .form_data
                .iter()
                .filter(|item| item.enabled && !item.key.is_empty())
                .map(|item| (item.key.clone(), item.value.clone()))
                .collect();
            Ok((
                PreparedBody::Form(pairs),
                Some("application/x-www-form-urlencoded".to_string()),
            ))
        }
        BodyType::FormData => {
            let mut fields = Vec::new();
            for item in body.form_data.iter().filter(|i| i.enabled && !i.key.is_empty()) {
                match (&item.kind, &item.file_content, &item.file_name) {
                    (FormDataKind::File, Some(content), Some(file_name)) if !content.is_empty() => {
                        fields.push(MultipartField::File {
                            key: item.key.clone(),
                            file_name: file_name.clone(),
                            mime: item
                                .file_mime_type
                                .clone()
                                .unwrap_or_else(|| "application/octet-stream".to_string()),
                            bytes: decode_data_url(content)?,
                        });
                    }
                    _ => fields.push(MultipartField::Text {
                        key: item.key.clone(),
                        value: item.value.clone(),
                    }),
                }
            }
            // reqwest sets the multipart boundary header itself.
            Ok((PreparedBody::Multipart(fields), None))
        }
        BodyType::Binary => match body.binary_content.as_deref() {
            Some(content) if !content.is_empty() => Ok((
                PreparedBody::Bytes(decode_data_url(content)?),
                Some(
                    body.binary_mime_type
                        .clone()
                        .unwrap_or_else(|| "application/octet-stream".to_string()),
                ),
            )),
            _ => Ok((PreparedBody::Empty, None)),
        },
    }
}

/// Decodes the payload of a `data:<mime>;base64,<payload>` URL.
fn decode_data_url(content: &str) -> Result<Vec<u8>, String> {
    let payload = content.split_once(',').map(|(_, p)| p).unwrap_or_default();
    BASE64_STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("Invalid base64 content: {}", e))
}
