//! Signed cookie sessions.
//!
//! A session is a small key/value map carried entirely by the client. The cookie
//! value is `<payload>.<signature>`:
//!
//! - `payload`: unpadded base64url of `{"values": {..}, "iat": <unix seconds>}`
//! - `signature`: unpadded base64url of `HMAC-SHA256(key, "<name>.<payload>")`
//!
//! The cookie name is part of the signed message, so a value minted for one
//! cookie cannot be replayed under another. Cookies older than the configured
//! max age are rejected even if the browser still sends them.

use axum::http::{
    header::{InvalidHeaderValue, COOKIE},
    HeaderMap, HeaderValue,
};
use base64ct::{Base64UrlUnpadded, Encoding};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::Sha256;
use std::collections::BTreeMap;
use std::time::SystemTime;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const DEFAULT_SESSION_NAME: &str = "session-name";
pub const DEFAULT_SESSION_MAX_AGE_SECONDS: u64 = 30 * 24 * 60 * 60;
pub const MIN_SESSION_KEY_LEN: usize = 32;

/// Session key set once an admin login succeeds.
pub const AUTHENTICATED: &str = "authenticated";

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session key must be at least {} bytes", MIN_SESSION_KEY_LEN)]
    KeyTooShort,
    #[error("invalid session cookie name: {0:?}")]
    InvalidName(String),
    #[error("invalid session cookie format")]
    Format,
    #[error("invalid base64url encoding")]
    Base64,
    #[error("invalid session payload")]
    Json(#[from] serde_json::Error),
    #[error("invalid session signature")]
    Signature,
    #[error("session expired")]
    Expired,
    #[error("invalid cookie header")]
    Header(#[from] InvalidHeaderValue),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    values: BTreeMap<String, Value>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.get(AUTHENTICATED), Some(Value::Bool(true)))
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Serialize, Deserialize)]
struct Payload {
    values: BTreeMap<String, Value>,
    iat: u64,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    name: String,
    max_age_seconds: u64,
    secure: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_SESSION_NAME.to_string(),
            max_age_seconds: DEFAULT_SESSION_MAX_AGE_SECONDS,
            secure: false,
        }
    }
}

impl SessionConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_name(mut self, name: String) -> Self {
        self.name = name;
        self
    }

    #[must_use]
    pub fn with_max_age_seconds(mut self, seconds: u64) -> Self {
        self.max_age_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn max_age_seconds(&self) -> u64 {
        self.max_age_seconds
    }

    #[must_use]
    pub fn secure(&self) -> bool {
        self.secure
    }
}

/// Signs, verifies, and (de)serializes session cookies.
pub struct CookieStore {
    key: SecretString,
    config: SessionConfig,
}

impl std::fmt::Debug for CookieStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieStore")
            .field("key", &"***")
            .field("config", &self.config)
            .finish()
    }
}

pub(crate) fn now_unix_seconds() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl CookieStore {
    /// # Errors
    /// Returns [`SessionError::KeyTooShort`] if the key is under 32 bytes and
    /// [`SessionError::InvalidName`] if the cookie name is not a valid token.
    pub fn new(key: SecretString, config: SessionConfig) -> Result<Self, SessionError> {
        if key.expose_secret().len() < MIN_SESSION_KEY_LEN {
            return Err(SessionError::KeyTooShort);
        }
        if !is_cookie_token(&config.name) {
            return Err(SessionError::InvalidName(config.name));
        }
        Ok(Self { key, config })
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    fn mac(&self, payload: &str) -> Result<HmacSha256, SessionError> {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret().as_bytes())
            .map_err(|_| SessionError::KeyTooShort)?;
        mac.update(self.config.name.as_bytes());
        mac.update(b".");
        mac.update(payload.as_bytes());
        Ok(mac)
    }

    /// Serialize and sign a session issued at `now`.
    ///
    /// # Errors
    /// Returns an error if the session values cannot be serialized.
    pub fn encode(&self, session: &Session, now: u64) -> Result<String, SessionError> {
        let payload = serde_json::to_vec(&Payload {
            values: session.values.clone(),
            iat: now,
        })?;
        let payload = Base64UrlUnpadded::encode_string(&payload);
        let signature = self.mac(&payload)?.finalize().into_bytes();

        Ok(format!(
            "{payload}.{}",
            Base64UrlUnpadded::encode_string(&signature)
        ))
    }

    /// Verify and deserialize a cookie value as seen at `now`.
    ///
    /// # Errors
    /// Returns an error if the value is malformed, the signature does not match,
    /// or the session is older than the configured max age.
    pub fn decode(&self, value: &str, now: u64) -> Result<Session, SessionError> {
        let (payload, signature) = value.split_once('.').ok_or(SessionError::Format)?;
        let signature =
            Base64UrlUnpadded::decode_vec(signature).map_err(|_| SessionError::Base64)?;

        self.mac(payload)?
            .verify_slice(&signature)
            .map_err(|_| SessionError::Signature)?;

        let payload = Base64UrlUnpadded::decode_vec(payload).map_err(|_| SessionError::Base64)?;
        let payload: Payload = serde_json::from_slice(&payload)?;

        if payload.iat.saturating_add(self.config.max_age_seconds) < now {
            return Err(SessionError::Expired);
        }

        Ok(Session {
            values: payload.values,
        })
    }

    /// Load the session carried by the request.
    ///
    /// A request without the cookie yields an empty session.
    ///
    /// # Errors
    /// Returns an error if the cookie is present but fails verification.
    pub fn load(&self, headers: &HeaderMap) -> Result<Session, SessionError> {
        match extract_cookie(headers, &self.config.name) {
            Some(value) => self.decode(&value, now_unix_seconds()),
            None => Ok(Session::new()),
        }
    }

    /// Build the `Set-Cookie` header value persisting `session`.
    ///
    /// # Errors
    /// Returns an error if the session cannot be encoded.
    pub fn save(&self, session: &Session) -> Result<HeaderValue, SessionError> {
        let value = self.encode(session, now_unix_seconds())?;
        let mut cookie = format!(
            "{}={value}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
            self.config.name, self.config.max_age_seconds
        );
        if self.config.secure {
            cookie.push_str("; Secure");
        }
        Ok(HeaderValue::from_str(&cookie)?)
    }
}

/// Whether `name` is a cookie-name token (RFC 6265 section 4.1.1): visible
/// ASCII without separators.
#[must_use]
pub fn is_cookie_token(name: &str) -> bool {
    !name.is_empty()
        && name.bytes().all(|b| {
            b.is_ascii_graphic()
                && !matches!(
                    b,
                    b'(' | b')'
                        | b'<'
                        | b'>'
                        | b'@'
                        | b','
                        | b';'
                        | b':'
                        | b'\\'
                        | b'"'
                        | b'/'
                        | b'['
                        | b']'
                        | b'?'
                        | b'='
                        | b'{'
                        | b'}'
                )
        })
}

fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|pair| {
            let (key, val) = pair.trim().split_once('=')?;
            (key.trim() == name).then(|| val.trim().to_string())
        })
}
