pub mod http;
pub mod traits;

pub use http::HttpDeliveryClient;
pub use traits::{DeliveryClient, DeliveryError, OutboundMessage};
