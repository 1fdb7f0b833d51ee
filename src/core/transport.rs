//! Transport abstraction between the stores and the network
//!
//! The stores never talk to an HTTP library directly. They build an
//! [`ApiRequest`] and hand it to an [`HttpTransport`]; the production
//! implementation is [`ReqwestTransport`](crate::http::ReqwestTransport).

use crate::core::error::ClientResult;
use crate::core::query::QueryParams;
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// What the caller expects back from the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResponseKind {
    /// A JSON envelope
    #[default]
    Json,
    /// An opaque binary payload (exports, downloads)
    Blob,
}

/// A file attached to a multipart request
#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl FileUpload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: None,
            bytes: bytes.into(),
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// Value of one multipart part
#[derive(Debug, Clone, PartialEq)]
pub enum FormValue {
    Text(String),
    File(FileUpload),
}

/// One named part of a multipart body
#[derive(Debug, Clone, PartialEq)]
pub struct FormPart {
    pub name: String,
    pub value: FormValue,
}

impl FormPart {
    pub fn text(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: FormValue::Text(value.into()),
        }
    }

    pub fn file(name: impl Into<String>, file: FileUpload) -> Self {
        Self {
            name: name.into(),
            value: FormValue::File(file),
        }
    }
}

/// Build multipart parts from a payload plus indexed attachments
///
/// Every non-null top-level field of `payload` becomes a text part (strings
/// verbatim, other values in their JSON form). Each attachment becomes a file
/// part named `{array_field}[{index}]`.
pub fn multipart_parts<P: Serialize + ?Sized>(
    payload: &P,
    array_field: &str,
    attachments: &[FileUpload],
) -> ClientResult<Vec<FormPart>> {
    let mut parts = Vec::new();

    if let Value::Object(fields) = serde_json::to_value(payload)? {
        for (key, value) in fields {
            match value {
                Value::Null => {}
                Value::String(s) => parts.push(FormPart::text(key, s)),
                other => parts.push(FormPart::text(key, other.to_string())),
            }
        }
    }

    parts.extend(
        attachments
            .iter()
            .enumerate()
            .map(|(index, file)| FormPart::file(format!("{array_field}[{index}]"), file.clone())),
    );

    Ok(parts)
}

/// Request body
#[derive(Debug, Clone, PartialEq, Default)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(Value),
    Multipart(Vec<FormPart>),
}

/// A transport-agnostic API request
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    pub method: Method,
    /// Path relative to the API base URL (e.g., "/api/users/me")
    pub path: String,
    pub query: QueryParams,
    pub body: RequestBody,
    pub headers: Vec<(String, String)>,
    pub expect: ResponseKind,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: QueryParams::new(),
            body: RequestBody::Empty,
            headers: Vec::new(),
            expect: ResponseKind::Json,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(Method::PATCH, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, query: QueryParams) -> Self {
        self.query = query;
        self
    }

    /// Attach a JSON body
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> ClientResult<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn expect(mut self, kind: ResponseKind) -> Self {
        self.expect = kind;
        self
    }

    /// First header value with a case-insensitive name match
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// A raw response; status interpretation is left to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
        Self {
            status,
            content_type: None,
            body: body.into(),
        }
    }

    /// JSON response with the given status
    pub fn json(status: u16, value: &Value) -> Self {
        Self {
            status,
            content_type: Some("application/json".to_string()),
            body: value.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP collaborator used by every store
///
/// Implementations return `Ok` for any response the server produced, whatever
/// its status; `Err` is reserved for failures where no response exists.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: ApiRequest) -> ClientResult<HttpResponse>;
}
