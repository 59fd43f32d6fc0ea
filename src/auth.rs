use axum::http::{header, HeaderMap, HeaderValue};
use sha2::Sha256;
use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

pub const SESSION_COOKIE: &str = "helpdesk_session";

const HASH_METHOD: &str = "pbkdf2:sha256";
const HASH_ROUNDS: u32 = 260_000;
const HASH_LEN: usize = 32;

const ANONYMOUS_TTL: Duration = Duration::from_secs(10 * 60);
const SESSION_TTL: Duration = Duration::from_secs(24 * 60 * 60);
const MAX_SESSIONS: usize = 10_000;

/// Hashes as `pbkdf2:sha256:<rounds>$<salt hex>$<hash hex>`.
pub fn hash_password(password: &str) -> Result<String, getrandom::Error> {
    let mut salt = [0u8; 16];
    getrandom::getrandom(&mut salt)?;
    Ok(format!(
        "{HASH_METHOD}:{HASH_ROUNDS}${}${}",
        hex::encode(salt),
        hex::encode(derive_key(password, &salt, HASH_ROUNDS))
    ))
}

fn derive_key(password: &str, salt: &[u8], rounds: u32) -> [u8; HASH_LEN] {
    let mut key = [0u8; HASH_LEN];
    pbkdf2::pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, rounds, &mut key);
    key
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    let (Some(method), Some(salt), Some(expected)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let Some(rounds) = method
        .strip_prefix(HASH_METHOD)
        .and_then(|rest| rest.strip_prefix(':'))
        .and_then(|rounds| rounds.parse::<u32>().ok())
        .filter(|rounds| *rounds > 0)
    else {
        return false;
    };
    let (Ok(salt), Ok(expected)) = (hex::decode(salt), hex::decode(expected)) else {
        return false;
    };
    constant_time_eq(&derive_key(password, &salt, rounds), &expected)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashLevel {
    Success,
    Info,
    Warning,
    Danger,
}

impl FlashLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            FlashLevel::Success => "success",
            FlashLevel::Info => "info",
            FlashLevel::Warning => "warning",
            FlashLevel::Danger => "danger",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Flash {
    pub level: FlashLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: Option<u64>,
    pub flashes: Vec<Flash>,
    last_seen: Instant,
}

impl Session {
    fn new(user_id: Option<u64>, flashes: Vec<Flash>, now: Instant) -> Self {
        Self {
            user_id,
            flashes,
            last_seen: now,
        }
    }

    /// Anonymous sessions only carry flashes across a redirect, so they idle
    /// out much sooner than logged-in ones.
    fn expired(&self, now: Instant) -> bool {
        let ttl = if self.user_id.is_some() {
            SESSION_TTL
        } else {
            ANONYMOUS_TTL
        };
        now.saturating_duration_since(self.last_seen) > ttl
    }
}

type Sessions = HashMap<String, Session>;

/// Returns the session for `token`, dropping it if it has idled out.
fn live<'a>(sessions: &'a mut Sessions, token: &str, now: Instant) -> Option<&'a mut Session> {
    if sessions.get(token)?.expired(now) {
        sessions.remove(token);
        return None;
    }
    let session = sessions.get_mut(token)?;
    session.last_seen = now;
    Some(session)
}

/// Sweeps idle sessions, then evicts the least recently seen (anonymous
/// first) until there is room for one more.
fn insert_session(sessions: &mut Sessions, capacity: usize, token: String, session: Session, now: Instant) {
    sessions.retain(|_, existing| !existing.expired(now));
    while sessions.len() >= capacity.max(1) {
        let Some(oldest) = sessions
            .iter()
            .min_by_key(|(_, existing)| (existing.user_id.is_some(), existing.last_seen))
            .map(|(token, _)| token.clone())
        else {
            break;
        };
        sessions.remove(&oldest);
    }
    sessions.insert(token, session);
}

/// In-memory cookie sessions with idle expiry and a size cap. Sessions do not
/// survive a restart.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Mutex<Sessions>>,
    capacity: usize,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::with_capacity(MAX_SESSIONS)
    }
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(HashMap::new())),
            capacity,
        }
    }

    /// Number of sessions currently held.
    pub async fn count(&self) -> usize {
        self.inner.lock().await.len()
    }

    pub async fn get(&self, token: &str) -> Option<Session> {
        live(&mut *self.inner.lock().await, token, Instant::now()).cloned()
    }

    pub async fn user_id(&self, headers: &HeaderMap) -> Option<u64> {
        let token = session_token(headers)?;
        live(&mut *self.inner.lock().await, token, Instant::now()).and_then(|s| s.user_id)
    }

    /// Starts a fresh session for `user_id`, replacing any previous one.
    pub async fn login(&self, headers: &HeaderMap, user_id: u64) -> Result<String, getrandom::Error> {
        let token = new_token()?;
        let now = Instant::now();
        let mut sessions = self.inner.lock().await;
        let flashes = session_token(headers)
            .and_then(|old| sessions.remove(old))
            .filter(|old| !old.expired(now))
            .map(|old| old.flashes)
            .unwrap_or_default();
        insert_session(
            &mut sessions,
            self.capacity,
            token.clone(),
            Session::new(Some(user_id), flashes, now),
            now,
        );
        Ok(token)
    }

    pub async fn logout(&self, headers: &HeaderMap) {
        if let Some(token) = session_token(headers) {
            if let Some(session) = live(&mut *self.inner.lock().await, token, Instant::now()) {
                session.user_id = None;
            }
        }
    }

    /// Queues a flash message. Returns a new token when the caller had no
    /// session yet; the response must then set the cookie.
    pub async fn flash(
        &self,
        headers: &HeaderMap,
        level: FlashLevel,
        message: impl Into<String>,
    ) -> Result<Option<String>, getrandom::Error> {
        let flash = Flash {
            level,
            message: message.into(),
        };
        let now = Instant::now();
        let mut sessions = self.inner.lock().await;
        if let Some(session) = session_token(headers).and_then(|t| live(&mut sessions, t, now)) {
            session.flashes.push(flash);
            return Ok(None);
        }
        let token = new_token()?;
        insert_session(
            &mut sessions,
            self.capacity,
            token.clone(),
            Session::new(None, vec![flash], now),
            now,
        );
        Ok(Some(token))
    }

    /// Queues a flash on a session the caller just created.
    pub async fn flash_token(&self, token: &str, level: FlashLevel, message: impl Into<String>) {
        if let Some(session) = live(&mut *self.inner.lock().await, token, Instant::now()) {
            session.flashes.push(Flash {
                level,
                message: message.into(),
            });
        }
    }

    pub async fn take_flashes(&self, headers: &HeaderMap) -> Vec<Flash> {
        let Some(token) = session_token(headers) else {
            return Vec::new();
        };
        live(&mut *self.inner.lock().await, token, Instant::now())
            .map(|s| std::mem::take(&mut s.flashes))
            .unwrap_or_default()
    }
}

fn new_token() -> Result<String, getrandom::Error> {
    let mut bytes = [0u8; 32];
    getrandom::getrandom(&mut bytes)?;
    Ok(hex::encode(bytes))
}

pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

pub fn session_cookie(token: &str) -> HeaderValue {
    let cookie = format!("{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax");
    HeaderValue::from_str(&cookie).unwrap_or_else(|_| HeaderValue::from_static(""))
}
