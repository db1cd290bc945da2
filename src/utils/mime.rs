//! MIME type utilities for judging probe responses

/// Content types servers use for HLS playlists
pub const PLAYLIST_MIME_TYPES: &[&str] = &[
    "application/vnd.apple.mpegurl",
    "application/x-mpegurl",
    "audio/mpegurl",
    "audio/x-mpegurl",
];

/// Strip parameters (`; charset=...`) and normalize case
pub fn essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Check if MIME type is an HLS playlist type
pub fn is_playlist_mime(content_type: &str) -> bool {
    let essence = essence(content_type);
    PLAYLIST_MIME_TYPES.contains(&essence.as_str())
}

/// Check if MIME type is a video format
pub fn is_video_mime(content_type: &str) -> bool {
    essence(content_type).starts_with("video/")
}

/// Check if MIME type is an audio format
pub fn is_audio_mime(content_type: &str) -> bool {
    essence(content_type).starts_with("audio/")
}

/// Whether a probe response looks like something ffmpeg can consume.
///
/// Advisory only: servers frequently label playlists as
/// `application/octet-stream` or `text/plain`.
pub fn is_expected_stream_mime(content_type: &str) -> bool {
    is_playlist_mime(content_type) || is_video_mime(content_type) || is_audio_mime(content_type)
}
