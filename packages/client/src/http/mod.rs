//! Request and response types exchanged with a `Transport`

pub mod request;
pub mod response;

pub use request::HttpRequest;
pub use response::HttpResponse;
