//! Payment provider callback payloads
//!
//! A callback carries two fields: `data`, a base64 blob (with `-`/`_` in
//! place of `+`/`/`) wrapping URL-encoded key/value pairs, and `ss1`, the
//! lowercase hex HMAC-MD5 of the raw `data` string keyed with the project
//! sign password.

use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use base64::Engine;
use hmac::{Hmac, Mac};
use md5::Md5;
use subtle::ConstantTimeEq;

use crate::shared::errors::{DomainError, DomainResult};

type HmacMd5 = Hmac<Md5>;

const PROVIDER_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Computes and checks callback signatures.
#[derive(Clone)]
pub struct CallbackSigner {
    password: Vec<u8>,
}

impl std::fmt::Debug for CallbackSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CallbackSigner").finish_non_exhaustive()
    }
}

impl CallbackSigner {
    pub fn new(password: impl AsRef<[u8]>) -> Self {
        Self {
            password: password.as_ref().to_vec(),
        }
    }

    /// Lowercase hex HMAC-MD5 of `data`.
    pub fn sign(&self, data: &str) -> String {
        // HMAC accepts keys of any length
        let mut mac = match HmacMd5::new_from_slice(&self.password) {
            Ok(mac) => mac,
            Err(_) => return String::new(),
        };
        mac.update(data.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    /// Constant-time comparison of `signature` against the expected one.
    pub fn verify(&self, data: &str, signature: &str) -> DomainResult<()> {
        let expected = self.sign(data);
        let provided = signature.trim().to_ascii_lowercase();
        let matches: bool = expected.as_bytes().ct_eq(provided.as_bytes()).into();
        if matches && !expected.is_empty() {
            Ok(())
        } else {
            Err(DomainError::InvalidSignature)
        }
    }
}

/// Outcome code reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    /// `1`: payment executed
    Succeeded,
    /// `0`: payment not executed
    NotExecuted,
    /// `2`: accepted, waiting for execution
    Accepted,
    /// `3`: additional payment information
    AdditionalInfo,
    Unrecognized(String),
}

impl ProviderStatus {
    pub fn from_code(code: &str) -> Self {
        match code {
            "1" => Self::Succeeded,
            "0" => Self::NotExecuted,
            "2" => Self::Accepted,
            "3" => Self::AdditionalInfo,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::Succeeded => "1",
            Self::NotExecuted => "0",
            Self::Accepted => "2",
            Self::AdditionalInfo => "3",
            Self::Unrecognized(code) => code,
        }
    }
}

/// Decoded callback data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackPayload {
    pub order_id: String,
    pub status: ProviderStatus,
    /// Minor currency units, when present
    pub amount: Option<i64>,
    pub currency: Option<String>,
    pub request_id: Option<String>,
}

/// Decode the `data` field of a callback.
pub fn decode_payload(data: &str) -> DomainResult<CallbackPayload> {
    let normalized: String = data
        .trim()
        .chars()
        .map(|c| match c {
            '-' => '+',
            '_' => '/',
            other => other,
        })
        .collect();

    let bytes = PROVIDER_BASE64
        .decode(normalized.as_bytes())
        .map_err(|e| DomainError::MalformedCallback(format!("invalid base64: {e}")))?;

    let mut order_id = None;
    let mut status = None;
    let mut amount = None;
    let mut currency = None;
    let mut request_id = None;

    for (key, value) in form_urlencoded::parse(&bytes) {
        match key.as_ref() {
            "orderid" => order_id = Some(value.into_owned()),
            "status" => status = Some(value.into_owned()),
            "amount" => {
                let parsed = value.trim().parse::<i64>().map_err(|_| {
                    DomainError::MalformedCallback(format!("amount '{value}' is not an integer"))
                })?;
                amount = Some(parsed);
            }
            "currency" => currency = Some(value.into_owned()),
            "requestid" => request_id = Some(value.into_owned()),
            _ => {}
        }
    }

    let order_id = order_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| DomainError::MalformedCallback("missing orderid".into()))?;

    Ok(CallbackPayload {
        order_id,
        status: ProviderStatus::from_code(status.as_deref().unwrap_or_default()),
        amount,
        currency,
        request_id,
    })
}

/// Encode key/value pairs the way the provider does.
pub fn encode_payload(pairs: &[(&str, &str)]) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .extend_pairs(pairs)
        .finish();
    PROVIDER_BASE64
        .encode(query.as_bytes())
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            other => other,
        })
        .collect()
}
