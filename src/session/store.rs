use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use cookie::Cookie;
use parking_lot::RwLock;
use reqwest::Url;
use reqwest::header::HeaderValue;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Cookie the auth service sets next to the JWT; its presence means the
/// user is logged in.
pub const AUTH_COOKIE: &str = "auth";

/// Cookie carrying the signed token.
pub const JWT_COOKIE: &str = "JWT";

/// Authentication state as seen by forms and views. Forms only read it;
/// the logout action is the one caller of `clear`.
pub trait SessionStore: Send + Sync {
    fn is_authenticated(&self) -> bool;
    fn clear(&self);
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to read session file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write session file {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("session file {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to encode session: {0}")]
    Encode(#[source] serde_json::Error),
}

/// One cookie as kept in the jar. `expires_at_ms` is a Unix timestamp in
/// milliseconds; `None` keeps the cookie until it is replaced or cleared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredCookie {
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at_ms: Option<i64>,
}

impl StoredCookie {
    pub fn is_live_at(&self, now_ms: i64) -> bool {
        !self.value.is_empty() && self.expires_at_ms.is_none_or(|at| at > now_ms)
    }
}

/// On-disk form of the cookie jar.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    #[serde(default)]
    cookies: BTreeMap<String, StoredCookie>,
}

pub fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

// ============================================================================
// Cookie-backed session
// ============================================================================

/// Cookie jar shared by every service client. All three services live on
/// the same host, so cookies are kept per name only. Expired cookies are
/// invisible to every reader and are dropped on load and save.
#[derive(Debug, Default)]
pub struct CookieSession {
    cookies: RwLock<BTreeMap<String, StoredCookie>>,
}

impl CookieSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a jar saved by [`CookieSession::save`]. A missing file is an
    /// empty session.
    pub fn load(path: &Path) -> Result<Self, SessionError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::new()),
            Err(source) => {
                return Err(SessionError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let file: SessionFile =
            serde_json::from_str(&content).map_err(|source| SessionError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        let now = now_ms();
        let cookies: BTreeMap<_, _> = file
            .cookies
            .into_iter()
            .filter(|(_, cookie)| cookie.is_live_at(now))
            .collect();

        debug!(path = %path.display(), cookies = cookies.len(), "loaded session");
        Ok(Self {
            cookies: RwLock::new(cookies),
        })
    }

    pub fn save(&self, path: &Path) -> Result<(), SessionError> {
        let now = now_ms();
        let file = SessionFile {
            cookies: self
                .cookies
                .read()
                .iter()
                .filter(|(_, cookie)| cookie.is_live_at(now))
                .map(|(name, cookie)| (name.clone(), cookie.clone()))
                .collect(),
        };
        let json = serde_json::to_string_pretty(&file).map_err(SessionError::Encode)?;
        std::fs::write(path, json).map_err(|source| SessionError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Value of a cookie that has not expired.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let now = now_ms();
        self.cookies
            .read()
            .get(name)
            .filter(|cookie| cookie.is_live_at(now))
            .map(|cookie| cookie.value.clone())
    }

    /// Store a cookie without an expiry.
    pub fn insert(&self, name: impl Into<String>, value: impl Into<String>) {
        self.cookies.write().insert(
            name.into(),
            StoredCookie {
                value: value.into(),
                expires_at_ms: None,
            },
        );
    }

    /// Number of live cookies.
    pub fn len(&self) -> usize {
        let now = now_ms();
        self.cookies
            .read()
            .values()
            .filter(|cookie| cookie.is_live_at(now))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply one `Set-Cookie` header value.
    pub fn apply_set_cookie(&self, header: &str) {
        match parse_set_cookie(header, now_ms()) {
            Some(SetCookie::Store { name, cookie }) => {
                debug!(cookie = %name, expires_at_ms = ?cookie.expires_at_ms, "session cookie stored");
                self.cookies.write().insert(name, cookie);
            }
            Some(SetCookie::Remove { name }) => {
                debug!(cookie = %name, "session cookie removed");
                self.cookies.write().remove(&name);
            }
            None => debug!("ignored malformed Set-Cookie header"),
        }
    }

    /// The `Cookie` request header value, if any live cookie is held.
    pub fn cookie_header(&self) -> Option<String> {
        let now = now_ms();
        let cookies = self.cookies.read();
        let pairs: Vec<String> = cookies
            .iter()
            .filter(|(_, cookie)| cookie.is_live_at(now))
            .map(|(name, cookie)| format!("{}={}", name, cookie.value))
            .collect();
        if pairs.is_empty() {
            None
        } else {
            Some(pairs.join("; "))
        }
    }
}

impl SessionStore for CookieSession {
    fn is_authenticated(&self) -> bool {
        self.cookie(AUTH_COOKIE).is_some()
    }

    fn clear(&self) {
        self.cookies.write().clear();
    }
}

impl reqwest::cookie::CookieStore for CookieSession {
    fn set_cookies(&self, cookie_headers: &mut dyn Iterator<Item = &HeaderValue>, _url: &Url) {
        for header in cookie_headers {
            if let Ok(text) = header.to_str() {
                self.apply_set_cookie(text);
            }
        }
    }

    fn cookies(&self, _url: &Url) -> Option<HeaderValue> {
        self.cookie_header()
            .and_then(|header| HeaderValue::from_str(&header).ok())
    }
}

// ============================================================================
// Set-Cookie parsing
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetCookie {
    Store { name: String, cookie: StoredCookie },
    Remove { name: String },
}

/// Interpret a `Set-Cookie` header received at `now_ms`. `Max-Age` wins
/// over `Expires`; a cookie that is already expired or has an empty value
/// removes any stored cookie of that name.
pub fn parse_set_cookie(header: &str, now_ms: i64) -> Option<SetCookie> {
    let parsed = Cookie::parse(header).ok()?;
    let name = parsed.name().trim();
    if name.is_empty() {
        return None;
    }

    let expires_at_ms = match parsed.max_age() {
        Some(age) => {
            let age_ms = i64::try_from(age.whole_milliseconds()).unwrap_or(i64::MAX);
            Some(now_ms.saturating_add(age_ms))
        }
        None => parsed
            .expires_datetime()
            .map(|at| i64::try_from(at.unix_timestamp_nanos() / 1_000_000).unwrap_or(i64::MIN)),
    };

    let cookie = StoredCookie {
        value: parsed.value().trim_matches('"').to_string(),
        expires_at_ms,
    };

    let name = name.to_string();
    if cookie.is_live_at(now_ms) {
        Some(SetCookie::Store { name, cookie })
    } else {
        Some(SetCookie::Remove { name })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: i64 = 1_700_000_000_000;

    #[test]
    fn max_age_becomes_absolute_expiry() {
        let parsed =
            parse_set_cookie("auth=pass; Path=/; Max-Age=3600; Secure; SameSite=Lax", NOW);
        assert_eq!(
            parsed,
            Some(SetCookie::Store {
                name: "auth".into(),
                cookie: StoredCookie {
                    value: "pass".into(),
                    expires_at_ms: Some(NOW + 3_600_000),
                },
            })
        );
    }

    #[test]
    fn zero_max_age_removes() {
        let parsed = parse_set_cookie("JWT=abc; Max-Age=0", NOW);
        assert_eq!(parsed, Some(SetCookie::Remove { name: "JWT".into() }));
    }

    #[test]
    fn past_expires_removes() {
        let parsed = parse_set_cookie("auth=pass; Expires=Thu, 01 Jan 1970 00:00:00 GMT", NOW);
        assert_eq!(parsed, Some(SetCookie::Remove { name: "auth".into() }));
    }

    #[test]
    fn max_age_wins_over_expires() {
        let parsed = parse_set_cookie(
            "auth=pass; Expires=Thu, 01 Jan 1970 00:00:00 GMT; Max-Age=60",
            NOW,
        );
        assert!(matches!(parsed, Some(SetCookie::Store { .. })));
    }

    #[test]
    fn stored_cookie_dies_at_expiry() {
        let cookie = StoredCookie {
            value: "pass".into(),
            expires_at_ms: Some(NOW),
        };
        assert!(cookie.is_live_at(NOW - 1));
        assert!(!cookie.is_live_at(NOW));
    }

    #[test]
    fn rejects_headers_without_pair() {
        assert_eq!(parse_set_cookie("Secure; HttpOnly", NOW), None);
        assert_eq!(parse_set_cookie("=value", NOW), None);
    }
}
