//! One-shot flash messages carried across a redirect.
//!
//! The browser holds an opaque random token in the `enroll.sid` cookie; messages
//! live in process memory keyed by that token. Reading the flash removes it.
//! Unknown or expired tokens are never adopted: writing flash for them issues a
//! fresh token.
//!
//! Expired sessions are purged at most once per [`PURGE_INTERVAL`]; lookups check
//! expiry on the entry they touch. The number of live sessions is capped, and the
//! session closest to expiry is evicted to make room.

use anyhow::{Context, Result};
use axum::http::{header::COOKIE, HeaderMap, HeaderValue};
use base64ct::{Base64UrlUnpadded, Encoding};
use rand::{rngs::OsRng, RngCore};
use std::{
    collections::{BTreeMap, HashMap},
    time::{Duration, Instant},
};
use tokio::sync::Mutex;
use tracing::debug;

pub const SESSION_COOKIE_NAME: &str = "enroll.sid";
pub const FLASH_ERRORS: &str = "erros";
pub const FLASH_SUCCESS: &str = "success";

const DEFAULT_SESSION_TTL_SECONDS: u64 = 60 * 60 * 24 * 7;
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;
pub const PURGE_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Clone, Copy, Debug)]
pub struct SessionConfig {
    ttl: Duration,
    cookie_secure: bool,
    max_sessions: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionConfig {
    /// Seven day sessions, cookie not marked `Secure`, at most
    /// [`DEFAULT_MAX_SESSIONS`] live at once.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECONDS),
            cookie_secure: false,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }

    #[must_use]
    pub fn with_max_sessions(mut self, max_sessions: usize) -> Self {
        self.max_sessions = max_sessions.max(1);
        self
    }

    #[must_use]
    pub fn max_sessions(&self) -> usize {
        self.max_sessions
    }

    #[must_use]
    pub fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl = Duration::from_secs(seconds.max(1));
        self
    }

    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

/// Pending messages grouped by flash key, in insertion order per key.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Flash {
    messages: BTreeMap<String, Vec<String>>,
}

impl Flash {
    #[must_use]
    pub fn get(&self, key: &str) -> &[String] {
        self.messages.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.values().all(Vec::is_empty)
    }

    fn push(&mut self, key: &str, messages: impl IntoIterator<Item = String>) {
        self.messages
            .entry(key.to_string())
            .or_default()
            .extend(messages);
    }
}

#[derive(Debug)]
struct SessionEntry {
    flash: Flash,
    expires_at: Instant,
}

#[derive(Debug)]
struct Sessions {
    entries: HashMap<String, SessionEntry>,
    next_purge: Instant,
}

impl Sessions {
    fn purge_if_due(&mut self, now: Instant) {
        if now < self.next_purge {
            return;
        }
        self.purge(now);
    }

    fn purge(&mut self, now: Instant) {
        self.entries.retain(|_, entry| entry.expires_at > now);
        self.next_purge = now + PURGE_INTERVAL;
    }

    /// Live entry for `token`; an expired one is removed on the way.
    fn live(&mut self, token: &str, now: Instant) -> Option<&mut SessionEntry> {
        if self
            .entries
            .get(token)
            .is_some_and(|entry| entry.expires_at <= now)
        {
            self.entries.remove(token);
        }
        self.entries.get_mut(token)
    }

    fn make_room(&mut self, max_sessions: usize, now: Instant) {
        if self.entries.len() < max_sessions {
            return;
        }
        self.purge(now);

        while self.entries.len() >= max_sessions {
            let Some(oldest) = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.expires_at)
                .map(|(token, _)| token.clone())
            else {
                break;
            };
            debug!("session limit reached, evicting the oldest session");
            self.entries.remove(&oldest);
        }
    }
}

#[derive(Debug)]
pub struct FlashStore {
    config: SessionConfig,
    sessions: Mutex<Sessions>,
}

impl FlashStore {
    #[must_use]
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            sessions: Mutex::new(Sessions {
                entries: HashMap::new(),
                next_purge: Instant::now() + PURGE_INTERVAL,
            }),
        }
    }

    #[must_use]
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Append `messages` under `key` and return the token the cookie must carry.
    ///
    /// # Errors
    /// Returns an error if a new session token cannot be generated.
    pub async fn push(
        &self,
        token: Option<&str>,
        key: &str,
        messages: impl IntoIterator<Item = String>,
    ) -> Result<String> {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sessions.purge_if_due(now);

        let known = token.is_some_and(|token| sessions.live(token, now).is_some());
        let token = match token {
            Some(token) if known => token.to_string(),
            _ => {
                sessions.make_room(self.config.max_sessions, now);
                generate_session_token()?
            }
        };

        let entry = sessions
            .entries
            .entry(token.clone())
            .or_insert_with(|| SessionEntry {
                flash: Flash::default(),
                expires_at: now,
            });
        entry.flash.push(key, messages);
        entry.expires_at = now + self.config.ttl;

        Ok(token)
    }

    /// Remove and return everything flashed for `token`.
    pub async fn take(&self, token: Option<&str>) -> Flash {
        let Some(token) = token else {
            return Flash::default();
        };

        let now = Instant::now();
        let mut sessions = self.sessions.lock().await;
        sessions.purge_if_due(now);

        match sessions.entries.remove(token) {
            Some(entry) if entry.expires_at > now => entry.flash,
            _ => {
                debug!("no flash pending for session");
                Flash::default()
            }
        }
    }

    /// Stored sessions, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.lock().await.entries.is_empty()
    }
}

/// Create a new random session token for the cookie.
///
/// # Errors
/// Returns an error if the OS random source fails.
pub fn generate_session_token() -> Result<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate session token")?;
    Ok(Base64UrlUnpadded::encode_string(&bytes))
}

/// Extract the session token from the request `Cookie` headers, if present.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Build the `HttpOnly` session cookie for `token`.
///
/// # Errors
/// Returns an error if the token contains characters not allowed in a header.
pub fn session_cookie(config: &SessionConfig, token: &str) -> Result<HeaderValue> {
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.ttl().as_secs()
    );
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).context("failed to build session cookie")
}
