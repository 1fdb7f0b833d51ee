//! Core module containing the building blocks shared by every store

pub mod api;
pub mod calendar;
pub mod entity;
pub mod error;
pub mod query;
pub mod transport;

pub use api::{ApiClient, Blob};
pub use entity::{Entity, NoFilter, Resource};
pub use error::{ClientError, ClientResult};
pub use query::{ApiResponse, PaginatedResponse, QueryParams};
pub use transport::{
    ApiRequest, FileUpload, FormPart, FormValue, HttpResponse, HttpTransport, RequestBody,
    ResponseKind,
};
