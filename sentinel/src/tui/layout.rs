//! Responsive layout engine for the TUI.
//!
//! Decides which table columns and panels fit the terminal, from minimal
//! (under 60 columns or 12 rows) to full (over 100 columns and 20 rows).

// Width breakpoints
const WIDTH_MINIMAL: u16 = 60; // Below this: PID, %CPU, %MEM, COMMAND only
const WIDTH_NARROW: u16 = 100; // Below this: drop PR, NI and VIRT

// Height breakpoints
const HEIGHT_MINIMAL: u16 = 12; // Below this: one-line header, no status bar
const HEIGHT_COMPACT: u16 = 20; // Below this: header without borders

/// Terminal size classification for layout decisions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TerminalSize {
    /// Height < 12: single header line, table only
    Minimal,
    /// Height 12-20: borderless header
    Compact,
    /// Height > 20: bordered header, table and status bar
    Normal,
}

/// Optional process table columns. PID, %CPU, %MEM and COMMAND always show.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct ColumnSet {
    pub user: bool,
    pub priority: bool,
    pub state: bool,
    pub virtual_size: bool,
    pub resident: bool,
    pub time: bool,
}

impl ColumnSet {
    const ALL: Self =
        Self { user: true, priority: true, state: true, virtual_size: true, resident: true, time: true };
}

/// Computed layout configuration based on terminal dimensions.
#[derive(Debug, Clone)]
pub struct LayoutConfig {
    pub size: TerminalSize,

    /// Header height in rows, borders included
    pub header_height: u16,

    /// Whether to show the key and message bar (bottom)
    pub show_status_bar: bool,

    pub columns: ColumnSet,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self { size: TerminalSize::Normal, header_height: 4, show_status_bar: true, columns: ColumnSet::ALL }
    }
}

/// Compute layout configuration based on terminal dimensions.
///
/// # Breakpoints
///
/// | Terminal Size | Behavior |
/// |---------------|----------|
/// | Width < 60    | PID, %CPU, %MEM and COMMAND only |
/// | Width 60-100  | Drop PR, NI and VIRT |
/// | Width > 100   | All columns |
/// | Height < 12   | Minimal: one-line header, no status bar |
/// | Height 12-20  | Compact: two-line header without borders |
/// | Height > 20   | Full layout |
pub fn compute_layout(width: u16, height: u16) -> LayoutConfig {
    let mut config = LayoutConfig::default();

    // Width breakpoints
    if width < WIDTH_MINIMAL {
        config.columns = ColumnSet {
            user: false,
            priority: false,
            state: false,
            virtual_size: false,
            resident: false,
            time: false,
        };
    } else if width <= WIDTH_NARROW {
        config.columns.priority = false;
        config.columns.virtual_size = false;
    }

    // Height breakpoints
    if height < HEIGHT_MINIMAL {
        config.size = TerminalSize::Minimal;
        config.header_height = 1;
        config.show_status_bar = false;
    } else if height <= HEIGHT_COMPACT {
        config.size = TerminalSize::Compact;
        config.header_height = 2;
    }

    config
}
