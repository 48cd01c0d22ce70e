//! Notification message composition and segmentation.

use crate::domain::{EmergencyAlert, LocationInfo};

/// Compose the notification body for a dispatched alert.
pub fn compose(alert: &EmergencyAlert, location: Option<&LocationInfo>) -> String {
    let mut body = format!(
        "EMERGENCY ({}): {} at {}.",
        alert.severity(),
        alert.alert_type().phrase(),
        alert.created_at().format("%Y-%m-%d %H:%M:%S UTC"),
    );

    if let Some(message) = alert.custom_message() {
        body.push(' ');
        body.push_str(message);
    }

    match location {
        Some(location) => {
            body.push_str(" Last known location: ");
            body.push_str(&location.to_string());
            body.push('.');
        }
        None => body.push_str(" Location unavailable."),
    }

    body
}

/// Compose the notice sent when an already-dispatched alert is cancelled.
pub fn compose_cancellation(alert: &EmergencyAlert) -> String {
    format!(
        "CANCELLED: the emergency alert sent at {} was cancelled by the user. No action is needed.",
        alert.created_at().format("%Y-%m-%d %H:%M:%S UTC"),
    )
}

/// Split a body into transport-sized segments.
///
/// Splits on the last whitespace inside each window when one exists,
/// falling back to a hard cut for unbroken runs. Counts characters, not
/// bytes, since transports size their segments in characters.
pub fn segment(body: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = body.chars().collect();
    if chars.len() <= max_chars {
        return vec![body.to_string()];
    }

    let mut segments = Vec::new();
    let mut start = 0;
    while start < chars.len() {
        let end = (start + max_chars).min(chars.len());
        let cut = if end < chars.len() {
            // Prefer a whitespace break inside the window
            chars[start..end]
                .iter()
                .rposition(|c| c.is_whitespace())
                .map(|pos| start + pos)
                .filter(|&pos| pos > start)
                .unwrap_or(end)
        } else {
            end
        };

        let piece: String = chars[start..cut].iter().collect();
        let trimmed = piece.trim();
        if !trimmed.is_empty() {
            segments.push(trimmed.to_string());
        }
        // Skip the whitespace we broke on
        start = cut;
        while start < chars.len() && chars[start].is_whitespace() {
            start += 1;
        }
    }

    segments
}
