//! Payment records and provider callbacks

pub mod callback;
pub mod model;

pub use callback::{decode_payload, encode_payload, CallbackPayload, CallbackSigner, ProviderStatus};
pub use model::{Payment, PaymentMethod, PaymentStatus, PaymentType};
