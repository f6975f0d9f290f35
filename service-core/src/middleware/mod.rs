pub mod metrics;
pub mod request_id;
pub mod security_headers;

pub use self::metrics::metrics_middleware;
pub use self::request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
pub use self::security_headers::security_headers_middleware;
