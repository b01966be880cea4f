//! Core data model: requests, responses and their parts.

mod body;
mod headers;
mod method;
mod options;
mod private;
mod request;
mod response;

pub use body::Body;
pub use headers::{HeaderValue, Headers, HTTP_DATE_FORMAT};
pub use method::Method;
pub use options::{Auth, RequestOptions, TIMEOUT_MS_OPTION};
pub use private::{PrivateContext, PROXY_URL_KEY, TRANSPORT_POOL_KEY};
pub use request::Request;
pub use response::{Exchange, Outcome, Response};
