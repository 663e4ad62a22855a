//! Payment provider client

mod http_gateway;

pub use http_gateway::{HttpGatewayConfig, HttpPaymentGateway};
