mod client;
mod request;
mod response;

pub use client::{RequestDoer, ReqwestDoer};
pub use request::{parse_method, OutgoingRequest, PreparedRequest};
pub use response::{headers_to_json, ResponseRecord};
