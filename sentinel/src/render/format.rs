//! Value formatting shared by the text and TUI renderers.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]

/// Format cumulative CPU time given in clock ticks.
///
/// `mm:ss.cc` below one hour, `XhYYmZZs` from one hour on.
pub fn format_cpu_time(ticks: u64, clock_ticks: u64) -> String {
    let centis = ticks.saturating_mul(100) / clock_ticks.max(1);
    let total_seconds = centis / 100;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{hours}h{minutes:02}m{seconds:02}s")
    } else {
        format!("{minutes:02}:{seconds:02}.{:02}", centis % 100)
    }
}

/// Format uptime as `HH:MM:SS`, prefixed with days when over a day
pub fn format_uptime(seconds: f64) -> String {
    let total = if seconds.is_finite() && seconds > 0.0 { seconds as u64 } else { 0 };
    let days = total / 86_400;
    let hours = (total % 86_400) / 3600;
    let minutes = (total % 3600) / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{days}d {hours:02}:{minutes:02}:{secs:02}")
    } else {
        format!("{hours:02}:{minutes:02}:{secs:02}")
    }
}

/// Format a size in kB with a binary unit suffix
pub fn format_kb(kb: u64) -> String {
    const MB: u64 = 1024;
    const GB: u64 = 1024 * 1024;
    if kb >= GB {
        format!("{:.1}G", kb as f64 / GB as f64)
    } else if kb >= MB {
        format!("{:.1}M", kb as f64 / MB as f64)
    } else {
        format!("{kb}K")
    }
}

/// First `max_chars` characters of `text`
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => &text[..cut],
        None => text,
    }
}

/// Truncate with an ellipsis when `text` is longer than `max_chars`
pub fn truncate_for_display(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars <= 3 {
        return truncate_chars(text, max_chars).to_string();
    }
    format!("{}...", truncate_chars(text, max_chars - 3))
}
