//! Shared API client: status handling, envelope decoding and bearer auth

use crate::core::error::{ClientError, ClientResult};
use crate::core::query::{ApiResponse, PaginatedResponse};
use crate::core::transport::{ApiRequest, HttpResponse, HttpTransport, ResponseKind};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Opaque binary payload returned by export endpoints
#[derive(Debug, Clone, PartialEq)]
pub struct Blob {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Blob {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Cloneable handle over a transport, shared by every store of a context
///
/// The bearer token lives here so that logging in once authenticates all
/// stores built from the same client.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn HttpTransport>,
    token: Arc<RwLock<Option<String>>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("authenticated", &self.bearer_token().is_some())
            .finish()
    }
}

impl ApiClient {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            token: Arc::new(RwLock::new(None)),
        }
    }

    /// Install or remove the bearer token sent with every request
    pub fn set_bearer_token(&self, token: Option<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    pub fn bearer_token(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Send a request and reject any non-2xx response
    pub async fn execute(&self, mut request: ApiRequest) -> ClientResult<HttpResponse> {
        if request.header_value("authorization").is_none() {
            if let Some(token) = self.bearer_token() {
                request
                    .headers
                    .push(("Authorization".to_string(), format!("Bearer {token}")));
            }
        }

        let method = request.method.clone();
        let path = request.path.clone();
        tracing::debug!(%method, path = %path, "dispatching API request");

        let response = self.transport.send(request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            tracing::debug!(
                %method,
                path = %path,
                status = response.status,
                "API request rejected"
            );
            Err(ClientError::from_response(response.status, &response.body))
        }
    }

    /// Decode a single-item envelope and return its `data`
    ///
    /// `success` is checked before `data` is decoded, so a failure envelope
    /// reports the server message whatever its `data` holds.
    pub async fn single<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let path = request.path.clone();
        let response = self.execute(request).await?;
        let envelope: ApiResponse<Value> = decode(&path, &response)?;

        if !envelope.success {
            return Err(ClientError::Server {
                status: response.status,
                message: envelope.message,
                details: None,
            });
        }

        serde_json::from_value(envelope.data.unwrap_or(Value::Null)).map_err(|e| {
            ClientError::Malformed {
                path,
                reason: e.to_string(),
            }
        })
    }

    /// Decode a paginated envelope
    pub async fn paginated<T: DeserializeOwned>(
        &self,
        request: ApiRequest,
    ) -> ClientResult<PaginatedResponse<T>> {
        let path = request.path.clone();
        let response = self.execute(request).await?;
        decode(&path, &response)
    }

    /// Decode a bare JSON body with no envelope
    pub async fn json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let path = request.path.clone();
        let response = self.execute(request).await?;
        decode(&path, &response)
    }

    /// Fetch an opaque binary body
    pub async fn blob(&self, request: ApiRequest) -> ClientResult<Blob> {
        let response = self.execute(request.expect(ResponseKind::Blob)).await?;
        Ok(Blob {
            bytes: response.body,
            content_type: response.content_type,
        })
    }

    /// Send a request whose response body is irrelevant
    pub async fn send(&self, request: ApiRequest) -> ClientResult<()> {
        self.execute(request).await.map(|_| ())
    }
}

fn decode<T: DeserializeOwned>(path: &str, response: &HttpResponse) -> ClientResult<T> {
    if response.body.is_empty() {
        return Err(ClientError::Malformed {
            path: path.to_string(),
            reason: "empty response body".to_string(),
        });
    }

    serde_json::from_slice(&response.body).map_err(|e| ClientError::Malformed {
        path: path.to_string(),
        reason: e.to_string(),
    })
}
