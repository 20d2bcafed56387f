//! Locator Resolution
//!
//! Turns local file paths into URLs the display can load. Two strategies:
//!
//! - [`FileUrlResolver`]: plain `file://` URLs (display has filesystem access)
//! - [`FileServerResolver`]: URLs served by a loopback file server, with the
//!   path carried as an unpadded URL-safe base64 id
//!
//! Resolution must be stable and idempotent: the same path always yields the
//! same URL, and resolving an already-resolved URL returns it unchanged.

use std::borrow::Cow;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Converts a local locator into a loadable URL
pub trait LocatorResolver: Send + Sync {
    /// Resolve a path (or pass through an existing URL)
    fn resolve(&self, locator: &str) -> String;
}

fn is_url(locator: &str) -> bool {
    ["file://", "http://", "https://", "data:"]
        .iter()
        .any(|scheme| locator.starts_with(scheme))
}

/// Resolver producing `file://` URLs
#[derive(Clone, Copy, Debug, Default)]
pub struct FileUrlResolver;

impl LocatorResolver for FileUrlResolver {
    fn resolve(&self, locator: &str) -> String {
        if is_url(locator) {
            return locator.to_string();
        }
        let normalized = locator.replace('\\', "/");
        if normalized.starts_with('/') || has_drive(&normalized) {
            return file_url(&normalized);
        }
        // Relative paths resolve against the working directory
        match std::path::absolute(locator) {
            Ok(path) => file_url(&path.to_string_lossy().replace('\\', "/")),
            Err(e) => {
                tracing::warn!(locator, error = %e, "Cannot make locator absolute");
                file_url(&format!("/{normalized}"))
            }
        }
    }
}

/// `C:/...` style path
fn has_drive(path: &str) -> bool {
    path.split('/').next().is_some_and(is_drive)
}

fn is_drive(segment: &str) -> bool {
    let bytes = segment.as_bytes();
    bytes.len() == 2 && bytes[0].is_ascii_alphabetic() && bytes[1] == b':'
}

/// Build a `file://` URL from an absolute, `/`-separated path
fn file_url(path: &str) -> String {
    let encoded: Vec<Cow<'_, str>> = path
        .split('/')
        .map(|segment| {
            if is_drive(segment) {
                Cow::Borrowed(segment)
            } else {
                urlencoding::encode(segment)
            }
        })
        .collect();
    let joined = encoded.join("/");
    if joined.starts_with('/') {
        format!("file://{joined}")
    } else {
        format!("file:///{joined}")
    }
}

/// Resolver producing loopback file-server URLs
#[derive(Clone, Debug)]
pub struct FileServerResolver {
    host: String,
    port: u16,
}

impl FileServerResolver {
    /// Resolver for a file server on `127.0.0.1:port`
    #[must_use]
    pub fn new(port: u16) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port,
        }
    }

    /// Base URL prefix of served files
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}:{}/file/", self.host, self.port)
    }
}

impl LocatorResolver for FileServerResolver {
    fn resolve(&self, locator: &str) -> String {
        if is_url(locator) {
            return locator.to_string();
        }
        format!("{}{}", self.base_url(), encode_file_id(locator))
    }
}

/// Encode a path as a file-server id
#[must_use]
pub fn encode_file_id(path: &str) -> String {
    URL_SAFE_NO_PAD.encode(path.as_bytes())
}

/// Decode a file-server id back to the original path
///
/// Returns `None` for ids that are not valid base64 or not UTF-8.
#[must_use]
pub fn decode_file_id(id: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(id.trim_end_matches('=')).ok()?;
    String::from_utf8(bytes).ok()
}
