//! HTTP client bound to a single API server.

use std::{env, time::Duration};

use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{Certificate, Client, Identity, Method, RequestBuilder, Response, Url, header};
use tracing::debug;

use argo_submit_types::ApiStatus;

use crate::{
    ApiError,
    config::{Auth, ClusterConfig, ConfigError},
};

/// Upper bound for establishing a connection. Watches are long-lived, so no
/// overall request timeout is set.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Thin wrapper around a configured `reqwest::Client` for one API server.
///
/// Authentication and TLS material are baked into the client at construction;
/// requests are built relative to the server URL, which may carry a path
/// prefix when the API is reached through a proxy.
#[derive(Debug, Clone)]
pub struct ClusterClient {
    base_url: String,
    http: Client,
}

impl ClusterClient {
    pub fn new(config: &ClusterConfig) -> Result<Self, ApiError> {
        let mut default_headers = header::HeaderMap::new();
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));
        if let Some(mut authorization) = authorization_header(&config.auth)? {
            authorization.set_sensitive(true);
            default_headers.insert(header::AUTHORIZATION, authorization);
        }

        let mut builder = Client::builder()
            .default_headers(default_headers)
            .user_agent(format!("argo-submit/{}; {}", env!("CARGO_PKG_VERSION"), env::consts::OS))
            .connect_timeout(CONNECT_TIMEOUT);

        if let Some(ca_pem) = &config.tls.ca_pem {
            for certificate in Certificate::from_pem_bundle(ca_pem)? {
                builder = builder.add_root_certificate(certificate);
            }
        }
        if let Some(identity_pem) = &config.tls.client_identity_pem {
            builder = builder.identity(Identity::from_pem(identity_pem)?);
        }
        if config.tls.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            base_url: config.server.as_str().trim_end_matches('/').to_string(),
            http: builder.build()?,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request for an API-relative path such as `/apis/...`.
    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "building request");
        self.http.request(method, url)
    }

    /// Resolve an API-relative path into an absolute URL.
    pub fn url_for(&self, path: &str) -> Result<Url, ApiError> {
        let raw = format!("{}{}", self.base_url, path);
        Url::parse(&raw).map_err(|err| {
            ApiError::Config(ConfigError::InvalidServer {
                url: raw,
                reason: err.to_string(),
            })
        })
    }
}

fn authorization_header(auth: &Auth) -> Result<Option<header::HeaderValue>, ApiError> {
    let value = match auth {
        Auth::None => return Ok(None),
        Auth::Bearer(token) => format!("Bearer {}", token),
        Auth::Basic { username, password } => format!("Basic {}", STANDARD.encode(format!("{}:{}", username, password))),
    };
    header::HeaderValue::from_str(&value)
        .map(Some)
        .map_err(|_| ApiError::Config(ConfigError::Invalid("credentials contain characters not allowed in an HTTP header".into())))
}

/// Pass successful responses through; turn failures into [`ApiError::Status`].
///
/// The body of a failed response is decoded as a Kubernetes `Status` when
/// possible, otherwise its text becomes the message.
pub(crate) async fn ensure_success(response: Response) -> Result<Response, ApiError> {
    let code = response.status();
    if code.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    let status = serde_json::from_str::<ApiStatus>(&text).unwrap_or_else(|_| ApiStatus {
        status: Some("Failure".into()),
        message: Some(text.trim().to_string()).filter(|message| !message.is_empty()),
        reason: code.canonical_reason().map(str::to_string),
        code: Some(code.as_u16()),
    });
    Err(ApiError::Status {
        code: code.as_u16(),
        status,
    })
}
