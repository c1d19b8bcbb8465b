//! Notification text formatting.

/// Default maximum body length in a push notification.
pub const DEFAULT_PREVIEW_LENGTH: usize = 500;

const ELLIPSIS: &str = "...";

/// Truncate `body` to at most `limit` characters, ending in `"..."` when cut.
///
/// Counts characters rather than bytes so a multi-byte body is never split
/// mid-codepoint. Bodies at or under the limit are returned unchanged. A
/// limit too short to hold the ellipsis cuts without one.
pub fn truncate_preview(body: &str, limit: usize) -> String {
    if body.chars().count() <= limit {
        return body.to_string();
    }
    if limit < ELLIPSIS.len() {
        return body.chars().take(limit).collect();
    }
    let keep = limit.saturating_sub(ELLIPSIS.len());
    let mut out: String = body.chars().take(keep).collect();
    out.push_str(ELLIPSIS);
    out
}

/// Format the alert text for a direct message.
///
/// ```
/// use slackwatch_core::text::format_notification;
///
/// assert_eq!(format_notification("Jane", "hi", 500), "DM from Jane: hi");
/// ```
pub fn format_notification(display_name: &str, body: &str, limit: usize) -> String {
    format!("DM from {display_name}: {}", truncate_preview(body, limit))
}
