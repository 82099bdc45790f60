//! Access token claim decoding.
//!
//! Tokens are compact `header.payload.signature` strings. Only the payload
//! segment is decoded here; the signature is checked by the API, never by the
//! client. Decoding fails closed: every malformed input yields `None`.

use std::sync::OnceLock;

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::session::User;

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_decode_padding_mode(DecodePaddingMode::Indifferent)
    .with_decode_allow_trailing_bits(true);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Transport encoding tried when decoding a token segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentEncoding {
    /// base64url (`-` and `_`), the encoding JWTs are specified with
    UrlSafe,
    /// classic base64 (`+` and `/`), emitted by some token issuers
    Standard,
}

impl SegmentEncoding {
    fn engine(self) -> &'static GeneralPurpose {
        match self {
            SegmentEncoding::UrlSafe => &URL_SAFE_LENIENT,
            SegmentEncoding::Standard => &STANDARD_LENIENT,
        }
    }
}

/// Ordered list of segment decoding strategies.
///
/// Built once and reused; the first strategy whose output parses as a JSON
/// object wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentDecoder {
    strategies: Vec<SegmentEncoding>,
}

impl Default for SegmentDecoder {
    fn default() -> Self {
        Self {
            strategies: vec![SegmentEncoding::UrlSafe, SegmentEncoding::Standard],
        }
    }
}

impl SegmentDecoder {
    /// Creates a decoder trying the given encodings in order.
    pub fn new(strategies: impl IntoIterator<Item = SegmentEncoding>) -> Self {
        Self {
            strategies: strategies.into_iter().collect(),
        }
    }

    /// Decodes the payload of a three-part token into its claim set.
    pub fn decode_claims(&self, token: &str) -> Option<Claims> {
        let mut parts = token.split('.');
        let (Some(_header), Some(payload), Some(_signature), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return None;
        };

        self.strategies.iter().find_map(|encoding| {
            let bytes = encoding.engine().decode(payload).ok()?;
            match serde_json::from_slice::<Value>(&bytes).ok()? {
                Value::Object(map) => Some(Claims(map)),
                _ => None,
            }
        })
    }
}

fn default_decoder() -> &'static SegmentDecoder {
    static DECODER: OnceLock<SegmentDecoder> = OnceLock::new();
    DECODER.get_or_init(SegmentDecoder::default)
}

/// Decodes a token's claim set with the default decoding strategies.
///
/// Returns `None` unless the token has exactly three dot-separated segments
/// and the middle one decodes to a JSON object.
pub fn decode_claims(token: &str) -> Option<Claims> {
    default_decoder().decode_claims(token)
}

/// Decoded token payload: an open map of claims.
///
/// Conventional keys (`sub`, `username`, `iat`, `exp`) get typed accessors;
/// a claim that is absent or has an unexpected type reads as `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Claims(Map<String, Value>);

impl Claims {
    /// Returns a raw claim value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Returns the subject claim rendered as a string.
    pub fn sub(&self) -> Option<String> {
        match self.0.get("sub")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.0.get("username").and_then(Value::as_str)
    }

    /// Issued-at, epoch seconds.
    pub fn issued_at(&self) -> Option<i64> {
        self.0.get("iat").and_then(Value::as_i64)
    }

    /// Expiry, epoch seconds.
    pub fn expires_at(&self) -> Option<i64> {
        self.0.get("exp").and_then(Value::as_i64)
    }

    /// Expiry as a UTC timestamp.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.expires_at()?, 0)
    }

    /// Returns true if the token carries an expiry that is not after `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiry().is_some_and(|exp| now >= exp)
    }

    /// Numeric user id taken from `sub`.
    ///
    /// Numeric subjects are used as-is (fractions truncated); string subjects
    /// are read up to the first non-digit, so `"42"` and `"42abc"` both give 42.
    pub fn user_id(&self) -> Option<i64> {
        match self.0.get("sub")? {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| {
                    n.as_f64()
                        .filter(|f| f.is_finite())
                        .map(|f| f.trunc() as i64)
                })
                .filter(|id| *id != 0),
            Value::String(s) => parse_leading_int(s),
            _ => None,
        }
    }

    /// Builds the session identity carried by this token.
    pub fn to_user(&self) -> User {
        User {
            id: self.user_id(),
            username: self.username().map(ToString::to_string),
        }
    }
}

fn parse_leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let (negative, digits) = match s.as_bytes().first()? {
        b'-' => (true, &s[1..]),
        b'+' => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    let value: i64 = digits[..end].parse().ok()?;
    Some(if negative { -value } else { value })
}

/// Returns a masked version of a token for display (first 12 chars + ...).
pub fn mask_token(token: &str) -> String {
    if token.chars().count() <= 16 {
        return "***".to_string();
    }
    let head: String = token.chars().take(12).collect();
    format!("{head}...")
}
