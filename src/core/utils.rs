/// Maximum length of a display title, in characters
pub const MAX_TITLE_LEN: usize = 50;

/// Title used when sanitization leaves nothing behind
pub const FALLBACK_TITLE: &str = "video";

/// A video title in its two sanitized forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTitle {
    /// Alphanumerics and spaces only, at most 50 characters
    pub display: String,
    /// `display` collapsed to `[A-Za-z0-9_]`, safe inside a header value
    pub filename: String,
}

/// Strips everything outside `[A-Za-z0-9 ]`, trims and truncates to 50 chars.
///
/// # Example
///
/// ```
/// use tubedrop::core::utils::sanitize_display_title;
///
/// assert_eq!(sanitize_display_title("Rick Astley - Never Gonna (Official)"), "Rick Astley  Never Gonna Official");
/// ```
pub fn sanitize_display_title(raw: &str) -> String {
    let kept: String = raw.chars().filter(|c| c.is_ascii_alphanumeric() || *c == ' ').collect();
    let truncated: String = kept.trim().chars().take(MAX_TITLE_LEN).collect();
    truncated.trim_end().to_string()
}

/// Replaces every character outside `[A-Za-z0-9_]` with `_`.
///
/// # Example
///
/// ```
/// use tubedrop::core::utils::sanitize_filename;
///
/// assert_eq!(sanitize_filename("song name 2"), "song_name_2");
/// ```
pub fn sanitize_filename(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect()
}

/// Runs both sanitization passes over a raw yt-dlp title.
pub fn resolve_title_forms(raw: &str) -> ResolvedTitle {
    let mut display = sanitize_display_title(raw);
    if display.is_empty() {
        display = FALLBACK_TITLE.to_string();
    }
    let filename = sanitize_filename(&display);
    ResolvedTitle { display, filename }
}
