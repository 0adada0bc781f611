//! Client configuration shared by the gateway and the session store.

use std::path::PathBuf;
use std::time::Duration;

use url::Url;

/// Backend used by the BankABC frontend during development.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080";

/// Directory (relative to the working directory) holding session cookies.
pub const DEFAULT_COOKIE_DIR: &str = ".bankabc";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL of the remote banking service. Always ends with `/`.
    pub api_base: Url,
    /// Directory holding one cookie file per API origin
    pub cookie_dir: PathBuf,
    /// Timeout applied to every request, including login
    pub request_timeout: Duration,
}

impl ClientConfig {
    pub fn new(api_base: Url, cookie_dir: impl Into<PathBuf>, request_timeout: Duration) -> Self {
        Self {
            api_base: normalize_base(api_base),
            cookie_dir: cookie_dir.into(),
            request_timeout,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        let api_base = Url::parse(DEFAULT_API_BASE).expect("default API base is a valid URL");
        Self::new(api_base, DEFAULT_COOKIE_DIR, DEFAULT_REQUEST_TIMEOUT)
    }
}

/// Make relative joins append to the base path instead of replacing its last segment.
fn normalize_base(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url.set_query(None);
    url.set_fragment(None);
    url
}
