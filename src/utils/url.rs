//! URL utilities for recognising m3u8 stream URLs

use url::Url;

/// File extension every accepted playlist URL path must end with
pub const PLAYLIST_EXTENSION: &str = ".m3u8";

/// Check if the URL carries both a scheme and a non-empty host
pub fn has_scheme_and_host(url: &Url) -> bool {
    !url.scheme().is_empty() && url.host_str().is_some_and(|host| !host.is_empty())
}

/// Check if the URL path ends with the playlist extension.
///
/// Only the path is inspected, so query strings (signed CDN tokens) and
/// fragments do not affect the result.
pub fn has_playlist_extension(url: &Url) -> bool {
    url.path()
        .to_ascii_lowercase()
        .ends_with(PLAYLIST_EXTENSION)
}

/// Check if the URL can be probed with an HTTP HEAD request
pub fn is_http_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}
