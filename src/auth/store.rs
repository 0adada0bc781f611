//! Persistent storage for the session token.
//!
//! The store holds at most one token. Only the session machine saves to it;
//! the gateway's unauthorized interceptor may clear it.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use tracing::{debug, warn};
use url::Url;

use super::cookie::{AUTH_COOKIE_NAME, format_cookie, get_cookie};
use super::errors::StoreError;
use super::types::Token;

/// A single named slot holding the current token.
pub trait SessionStore: Send + Sync {
    fn save(&self, token: &Token) -> Result<(), StoreError>;

    /// Returns `None` when nothing usable is stored. Never fails.
    fn load(&self) -> Option<Token>;

    /// Remove the token. Clearing an empty slot is a no-op.
    fn clear(&self);
}

/// Cookie file scoped to one API origin, surviving client restarts.
#[derive(Debug, Clone)]
pub struct CookieJarStore {
    path: PathBuf,
}

impl CookieJarStore {
    /// Store for `origin` inside `dir`. Each origin gets its own file.
    pub fn new(dir: impl AsRef<Path>, origin: &Url) -> Self {
        Self {
            path: dir.as_ref().join(cookie_file_name(origin)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn cookie_file_name(origin: &Url) -> String {
    let host: String = origin
        .host_str()
        .unwrap_or("local")
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '.' || c == '-' { c } else { '_' })
        .collect();
    match origin.port_or_known_default() {
        Some(port) => format!("{}_{}_{}.cookie", origin.scheme(), host, port),
        None => format!("{}_{}.cookie", origin.scheme(), host),
    }
}

impl SessionStore for CookieJarStore {
    fn save(&self, token: &Token) -> Result<(), StoreError> {
        let to_store_error = |source| StoreError {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(to_store_error)?;
        }
        std::fs::write(
            &self.path,
            format_cookie(AUTH_COOKIE_NAME, token.as_str()),
        )
        .map_err(to_store_error)?;

        debug!(path = %self.path.display(), "Session cookie saved");
        Ok(())
    }

    fn load(&self) -> Option<Token> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to read session cookie");
                return None;
            }
        };

        get_cookie(content.trim(), AUTH_COOKIE_NAME).map(Token::new)
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "Session cookie cleared"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to clear session cookie")
            }
        }
    }
}

/// In-process store. Nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    slot: RwLock<Option<Token>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `token`, as if left behind by an earlier session.
    pub fn with_token(token: Token) -> Self {
        Self {
            slot: RwLock::new(Some(token)),
        }
    }
}

impl SessionStore for MemoryStore {
    fn save(&self, token: &Token) -> Result<(), StoreError> {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }

    fn load(&self) -> Option<Token> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear(&self) {
        self.slot
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "bankabc-store-{}-{}",
            name,
            std::process::id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        dir
    }

    fn origin() -> Url {
        Url::parse("http://localhost:8080").unwrap()
    }

    #[test]
    fn test_cookie_file_name() {
        assert_eq!(cookie_file_name(&origin()), "http_localhost_8080.cookie");
        assert_eq!(
            cookie_file_name(&Url::parse("https://bank.example").unwrap()),
            "https_bank.example_443.cookie"
        );
    }

    #[test]
    fn test_cookie_store_round_trip() {
        let dir = temp_dir("round-trip");
        let store = CookieJarStore::new(&dir, &origin());

        assert_eq!(store.load(), None);
        store.save(&Token::new("a.b.c")).unwrap();
        assert_eq!(store.load(), Some(Token::new("a.b.c")));

        let content = std::fs::read_to_string(store.path()).unwrap();
        assert_eq!(content, "auth_token=a.b.c; Path=/; SameSite=Strict");

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_cookie_store_survives_new_instance() {
        let dir = temp_dir("reload");
        CookieJarStore::new(&dir, &origin())
            .save(&Token::new("x.y.z"))
            .unwrap();

        let reloaded = CookieJarStore::new(&dir, &origin());
        assert_eq!(reloaded.load(), Some(Token::new("x.y.z")));

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_cookie_store_scoped_to_origin() {
        let dir = temp_dir("scope");
        CookieJarStore::new(&dir, &origin())
            .save(&Token::new("x.y.z"))
            .unwrap();

        let other = CookieJarStore::new(&dir, &Url::parse("http://localhost:9090").unwrap());
        assert_eq!(other.load(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_cookie_store_clear_idempotent() {
        let dir = temp_dir("clear");
        let store = CookieJarStore::new(&dir, &origin());

        store.clear();
        store.save(&Token::new("a.b.c")).unwrap();
        store.clear();
        store.clear();
        assert_eq!(store.load(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_cookie_store_ignores_garbage() {
        let dir = temp_dir("garbage");
        let store = CookieJarStore::new(&dir, &origin());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(store.path(), "something else entirely").unwrap();

        assert_eq!(store.load(), None);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryStore::new();
        assert_eq!(store.load(), None);

        store.save(&Token::new("t")).unwrap();
        assert_eq!(store.load(), Some(Token::new("t")));

        store.clear();
        store.clear();
        assert_eq!(store.load(), None);
    }
}
