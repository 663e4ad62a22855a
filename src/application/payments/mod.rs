//! Payment use cases

pub mod callback;
pub mod service;

pub use callback::{CallbackAck, CallbackProcessor, ACK_BODY};
pub use service::{InitiatePayment, PaymentInitiated, PaymentService};
