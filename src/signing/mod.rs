//! K3 Cloud request signing
//!
//! Reproduces the credential scheme of the Kingdee WebApi SDK: an API-gateway
//! signature keyed by a client secret recovered from the obfuscated app ID,
//! and a KD-native signature keyed by the app secret.
//!
//! This is a fragile third-party contract, not a security boundary. The ROT13
//! step, the session-code template and the hex-then-base64 signature encoding
//! must match the SDK byte for byte or the gateway rejects the request with an
//! opaque HTTP error. Callers only see [`RequestSigner`], so a change to the
//! remote scheme stays inside this module.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;

use crate::config::K3Credentials;
use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

/// Length of an encoded client secret accepted by [`recover_secret`]
pub const ENCODED_SECRET_LEN: usize = 32;

/// Fixed session-code template. One random decimal digit follows each block.
pub const SESSION_TEMPLATE: [&str; 4] = ["0054s397", "p6234378", "o09pn7q3", "r5qropr7"];

/// Build a session code from four decimal digits (`1000..=9999`).
pub fn session_code(digits: u16) -> String {
    let digits = digits.to_string();
    SESSION_TEMPLATE
        .iter()
        .zip(digits.chars())
        .map(|(block, digit)| format!("{block}{digit}"))
        .collect()
}

/// Session code with four pseudo-random digits, as the SDK generates per call.
pub fn random_session_code() -> String {
    session_code(rand::rng().random_range(1000..10000))
}

/// ROT13 over ASCII letters; everything else passes through.
pub fn rot13(input: &str) -> String {
    input
        .chars()
        .map(|ch| match ch {
            'a'..='z' => (((ch as u8 - b'a' + 13) % 26) + b'a') as char,
            'A'..='Z' => (((ch as u8 - b'A' + 13) % 26) + b'A') as char,
            _ => ch,
        })
        .collect()
}

/// XOR keystream: the first 8 characters of each 9-character session block,
/// ROT13-substituted.
///
/// The random digit sits at offset 8 of each block and is never part of the
/// keystream, so the recovered secret does not depend on it.
fn keystream(session_code: &str) -> Vec<u8> {
    let chars: Vec<char> = session_code.chars().collect();
    let gene: String = (0..4)
        .flat_map(|i| {
            let start = (i * 9).min(chars.len());
            let end = (i * 9 + 8).min(chars.len());
            chars[start..end].iter().copied()
        })
        .collect();
    rot13(&gene).into_bytes()
}

/// Recover the client secret from its encoded form.
///
/// Returns an empty string when `encoded` is not exactly
/// [`ENCODED_SECRET_LEN`] characters or is not valid base64; callers treat
/// that as an authentication failure.
pub fn recover_secret(encoded: &str) -> String {
    recover_secret_with(encoded, &random_session_code())
}

/// [`recover_secret`] with an explicit session code.
pub fn recover_secret_with(encoded: &str, session_code: &str) -> String {
    if encoded.len() != ENCODED_SECRET_LEN {
        return String::new();
    }

    let decoded = match STANDARD.decode(encoded) {
        Ok(bytes) => bytes,
        Err(e) => {
            log::warn!("Encoded client secret is not valid base64: {}", e);
            return String::new();
        }
    };

    let key = keystream(session_code);
    let xored: Vec<u8> = decoded
        .iter()
        .zip(key.iter().cycle())
        .map(|(b, k)| b ^ k)
        .collect();

    STANDARD.encode(xored)
}

/// HMAC-SHA256 of `content` keyed by `key`, hex-encoded, then base64-encoded.
pub fn sign(content: &str, key: &str) -> String {
    // HMAC accepts keys of any length, including empty
    let mut mac = match HmacSha256::new_from_slice(key.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(content.as_bytes());
    let hex_digest = hex::encode(mac.finalize().into_bytes());
    STANDARD.encode(hex_digest)
}

/// Percent-encode a URL path for the gateway signing string (`/` becomes `%2F`).
pub fn encode_path(path: &str) -> String {
    urlencoding::encode(path).into_owned()
}

/// The canonical string signed for `X-Api-Signature`.
pub fn gateway_signing_string(path: &str, nonce: &str, timestamp: &str) -> String {
    format!(
        "POST\n{}\n\nx-api-nonce:{}\nx-api-timestamp:{}\n",
        encode_path(path),
        nonce,
        timestamp
    )
}

/// Request headers in the order they are sent
pub type SignedHeaders = Vec<(&'static str, String)>;

/// Produces the credential headers for one request.
pub trait RequestSigner: Send + Sync {
    /// Sign a POST to `path` (URL path only, no scheme or host) at `timestamp`
    /// (unix seconds).
    fn sign_request(&self, path: &str, timestamp: i64) -> Result<SignedHeaders, ApiError>;
}

/// Signer implementing the Kingdee WebApi SDK 7.3 scheme
#[derive(Debug, Clone)]
pub struct K3Signer {
    app_id: String,
    app_secret: String,
    client_id: String,
    client_secret: String,
    app_data: String,
}

impl K3Signer {
    /// Derive signing material from configured credentials.
    ///
    /// An `app_id` without the `<clientId>_<secret>` shape leaves both gateway
    /// values empty, which the SDK also tolerates; the gateway then rejects
    /// the request.
    pub fn new(creds: &K3Credentials) -> Self {
        let (client_id, client_secret) = match creds.app_id.split('_').collect::<Vec<_>>()[..] {
            [id, encoded] => (id.to_string(), recover_secret(encoded)),
            _ => (String::new(), String::new()),
        };

        let app_data = format!(
            "{},{},{},{}",
            creds.acct_id, creds.user_name, creds.lcid, creds.org_num
        );

        Self {
            app_id: creds.app_id.clone(),
            app_secret: creds.app_secret.clone(),
            client_id,
            client_secret,
            app_data,
        }
    }
}

impl RequestSigner for K3Signer {
    fn sign_request(&self, path: &str, timestamp: i64) -> Result<SignedHeaders, ApiError> {
        if self.client_secret.is_empty() {
            return Err(ApiError::MissingSecret);
        }

        let timestamp = timestamp.to_string();
        let nonce = timestamp.clone();

        let api_signature = sign(
            &gateway_signing_string(path, &nonce, &timestamp),
            &self.client_secret,
        );
        let kd_signature = sign(
            &format!("{}{}", self.app_id, self.app_data),
            &self.app_secret,
        );

        Ok(vec![
            ("X-Api-ClientID", self.client_id.clone()),
            ("X-Api-Auth-Version", "2.0".to_string()),
            ("X-Api-Timestamp", timestamp),
            ("X-Api-Nonce", nonce),
            ("X-Api-SignHeaders", "x-api-timestamp,x-api-nonce".to_string()),
            ("X-Api-Signature", api_signature),
            ("X-KD-AppKey", self.app_id.clone()),
            ("X-KD-AppData", STANDARD.encode(&self.app_data)),
            ("X-KD-Signature", kd_signature),
        ])
    }
}
