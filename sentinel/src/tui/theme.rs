//! TUI color theme
//!
//! Green-on-black monitor scheme with amber and red for load levels

use ratatui::style::Color;

pub const HUD_GREEN: Color = Color::Rgb(0, 255, 0);
pub const CRITICAL_RED: Color = Color::Rgb(255, 0, 0);
pub const CAUTION_AMBER: Color = Color::Rgb(255, 191, 0);
pub const INFO_DIM: Color = Color::Rgb(0, 180, 0);
pub const BACKGROUND: Color = Color::Rgb(0, 20, 0);

/// Color for a CPU share
/// - Above 50%: Critical (Red)
/// - Above 20%: Caution (Amber)
/// - Otherwise: Normal (Green)
#[must_use]
pub fn cpu_color(percentage: f64) -> Color {
    if percentage > 50.0 {
        CRITICAL_RED
    } else if percentage > 20.0 {
        CAUTION_AMBER
    } else {
        HUD_GREEN
    }
}

/// Color for a memory share
/// - Above 10%: Critical (Red)
/// - Above 5%: Caution (Amber)
/// - Otherwise: Normal (Green)
#[must_use]
pub fn memory_color(percentage: f64) -> Color {
    if percentage > 10.0 {
        CRITICAL_RED
    } else if percentage > 5.0 {
        CAUTION_AMBER
    } else {
        HUD_GREEN
    }
}

/// Color for the 1-minute load average relative to CPU count
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn load_color(load: f64, cpu_count: usize) -> Color {
    let cpus = cpu_count.max(1) as f64;
    if load > cpus {
        CRITICAL_RED
    } else if load > cpus * 0.7 {
        CAUTION_AMBER
    } else {
        HUD_GREEN
    }
}
