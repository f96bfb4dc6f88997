//! Aggregate alert text.

use chrono::{DateTime, FixedOffset, Offset, Utc};

use nodemend_core::NodeObservation;

/// Render the alert for this cycle's candidates.
///
/// Check times are shown as `HH:MM:SS` at `utc_offset_hours`.
pub fn format_alert(title: &str, candidates: &[NodeObservation], utc_offset_hours: i32) -> String {
    let offset = FixedOffset::east_opt(utc_offset_hours.saturating_mul(3600)).unwrap_or(Utc.fix());

    let mut message = format!(
        "{title}\n\nFound {} node(s) ineligible! Restarting...",
        candidates.len()
    );
    for node in candidates {
        let port = node
            .port
            .map(|p| p.to_string())
            .unwrap_or_else(|| "?".to_string());
        let checked = DateTime::from_timestamp_millis(node.last_check_timestamp)
            .map(|t| t.with_timezone(&offset).format("%H:%M:%S").to_string())
            .unwrap_or_else(|| "--:--:--".to_string());
        message.push_str(&format!(
            "\n» Port {port} - {} (checked {checked})",
            node.cause_or_na()
        ));
    }
    message
}
