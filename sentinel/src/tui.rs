//! # Terminal User Interface (TUI)
//!
//! Full-screen process table using `ratatui`, redrawn every tick.
//!
//! ## View Modes
//!
//! - **Table** - Header, ranked process table and status bar (default)
//! - **Filter** - Text input narrowing rows by command, user or name
//! - **Confirm** - y/n prompt before a signal or priority change
//! - **Help** - Keyboard shortcuts
//! - **Settings** - Alert thresholds and webhooks, saved to the config file
//!
//! The run loop watches the config file, so saved settings take effect at
//! the next tick.
//!
//! Between ticks `TuiRenderer::wait` polls the keyboard. Sorting and
//! filtering return `Control::Rerank` so the run loop re-ranks the current
//! table without sampling again.
//!
//! ## Sub-Modules
//!
//! - `header` - Tasks, load, uptime and ranking summary
//! - `table` - Process rows, selection and scrolling
//! - `layout` - Column and panel breakpoints
//! - `theme` - Color scheme

// TUI rendering intentionally uses long functions for clarity
#![allow(clippy::too_many_lines, clippy::cast_possible_truncation)]

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Terminal,
};
use std::io::{self, Stdout};
use std::path::PathBuf;
use std::time::{Duration, Instant};

mod header;
pub mod layout; // Public for testing
pub mod table;
mod theme;

use header::HeaderPanel;
use layout::compute_layout;
use table::ProcessTableView;
use theme::{BACKGROUND, CAUTION_AMBER, CRITICAL_RED, HUD_GREEN, INFO_DIM};

use crate::config::Config;
use crate::control::{self, adjusted_niceness, Signal};
use crate::domain::Pid;
use crate::render::{Control, Renderer, Snapshot};
use crate::sampling::{ProcessRow, RankSettings, SortColumn, SortOrder, TickSummary};
use crate::shutdown::CancellationToken;

// =============================================================================
// STYLE CONSTANTS
// =============================================================================

const STYLE_HEADING: Style = Style::new().fg(HUD_GREEN).add_modifier(Modifier::BOLD);
const STYLE_DIM: Style = Style::new().fg(INFO_DIM);
const STYLE_KEY: Style = Style::new().fg(CAUTION_AMBER);
const STYLE_TEXT: Style = Style::new().fg(ratatui::style::Color::White);

/// Longest blocking keyboard poll
const INPUT_POLL: Duration = Duration::from_millis(100);

/// Rows moved by PageUp / PageDown
const PAGE_ROWS: isize = 10;

/// Niceness change for `n` / `N`
const NICE_STEP: i32 = 5;

// =============================================================================
// VIEW STATE
// =============================================================================

/// Owned copy of the last snapshot, kept for redraws between ticks
#[derive(Debug, Clone, Default)]
pub struct View {
    pub summary: TickSummary,
    pub rows: Vec<ProcessRow>,
    pub order: SortOrder,
    pub filter: Option<String>,
    pub tracked: usize,
    pub display_budget: usize,
    pub clock_ticks: u64,
    pub cpu_count: usize,
}

impl From<&Snapshot<'_>> for View {
    fn from(snapshot: &Snapshot<'_>) -> Self {
        Self {
            summary: snapshot.summary.clone(),
            rows: snapshot.rows.to_vec(),
            order: snapshot.order,
            filter: snapshot.filter.map(str::to_string),
            tracked: snapshot.tracked,
            display_budget: snapshot.display_budget,
            clock_ticks: snapshot.clock_ticks,
            cpu_count: snapshot.cpu_count,
        }
    }
}

/// Process targeted by a confirmation prompt
#[derive(Debug, Clone, PartialEq)]
struct Target {
    pid: Pid,
    name: String,
    niceness: i64,
}

impl From<&ProcessRow> for Target {
    fn from(row: &ProcessRow) -> Self {
        Self { pid: row.pid, name: row.display_name.to_string(), niceness: row.niceness }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ThresholdField {
    Cpu,
    Memory,
}

impl ThresholdField {
    fn label(self) -> &'static str {
        match self {
            ThresholdField::Cpu => "CPU",
            ThresholdField::Memory => "Memory",
        }
    }
}

/// Current view mode determines what's displayed and how keys are handled
#[derive(Debug, Clone, PartialEq)]
enum ViewMode {
    Table,
    Filter,
    ConfirmTerminate(Target),
    /// Target and the niceness change to apply
    ConfirmRenice(Target, i32),
    Help,
    Settings,
    EditThreshold(ThresholdField),
    WebhookName,
    /// Name already entered
    WebhookUrl(String),
    ConfirmDeleteWebhook(String),
}

/// Key handling result for a one-line text prompt
enum InputStep {
    Editing,
    Submitted(String),
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
struct StatusMessage {
    text: String,
    severity: Severity,
}

/// Result of handling one key press
#[derive(Debug, Clone, PartialEq)]
enum KeyOutcome {
    Ignored,
    Redraw,
    Rerank(RankSettings),
    Quit,
}

// =============================================================================
// APP
// =============================================================================

#[derive(Debug, Default)]
struct App {
    view: Option<View>,
    table: ProcessTableView,
    mode: Option<ViewMode>,
    order: SortOrder,
    filter_input: String,
    status: Option<StatusMessage>,
    /// Where the settings view loads and saves
    config_path: Option<PathBuf>,
    /// Config being edited; loaded fresh each time settings open
    settings: Option<Config>,
    webhook_selected: usize,
    input: String,
}

impl App {
    fn new() -> Self {
        Self { mode: Some(ViewMode::Table), ..Self::default() }
    }

    fn with_config_path(path: PathBuf) -> Self {
        Self { config_path: Some(path), ..Self::new() }
    }

    fn mode(&self) -> &ViewMode {
        self.mode.as_ref().unwrap_or(&ViewMode::Table)
    }

    fn rows(&self) -> &[ProcessRow] {
        self.view.as_ref().map(|view| view.rows.as_slice()).unwrap_or_default()
    }

    fn update(&mut self, snapshot: &Snapshot<'_>) {
        let view = View::from(snapshot);
        self.order = view.order;
        if *self.mode() != ViewMode::Filter {
            self.filter_input = view.filter.clone().unwrap_or_default();
        }
        self.table.sync(&view.rows);
        if let Some(alert) = snapshot.alerts.last() {
            self.set_status(Severity::Warning, alert.to_string());
        }
        self.view = Some(view);
    }

    fn set_status(&mut self, severity: Severity, text: String) {
        self.status = Some(StatusMessage { text, severity });
    }

    fn rank_settings(&self) -> RankSettings {
        let filter = Some(self.filter_input.clone()).filter(|f| !f.trim().is_empty());
        RankSettings { order: self.order, filter }
    }

    fn selected_target(&self) -> Option<Target> {
        self.table.selected(self.rows()).map(Target::from)
    }

    fn handle_key(&mut self, key: KeyEvent) -> KeyOutcome {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return KeyOutcome::Quit;
        }

        let mode = self.mode.take().unwrap_or(ViewMode::Table);
        let (next, outcome) = match mode {
            ViewMode::Table => self.handle_table_key(key.code),
            ViewMode::Help => (ViewMode::Table, KeyOutcome::Redraw),
            ViewMode::Filter => self.handle_filter_key(key.code),
            ViewMode::ConfirmTerminate(target) => {
                if matches!(key.code, KeyCode::Char('y' | 'Y')) {
                    self.signal(&target, Signal::Term);
                } else {
                    self.set_status(Severity::Info, "Cancelled".to_string());
                }
                (ViewMode::Table, KeyOutcome::Redraw)
            }
            ViewMode::ConfirmRenice(target, delta) => {
                if matches!(key.code, KeyCode::Char('y' | 'Y')) {
                    self.renice(&target, delta);
                } else {
                    self.set_status(Severity::Info, "Cancelled".to_string());
                }
                (ViewMode::Table, KeyOutcome::Redraw)
            }
            ViewMode::Settings => self.handle_settings_key(key.code),
            ViewMode::EditThreshold(field) => self.handle_threshold_input(field, key.code),
            ViewMode::WebhookName => self.handle_webhook_name_input(key.code),
            ViewMode::WebhookUrl(name) => self.handle_webhook_url_input(name, key.code),
            ViewMode::ConfirmDeleteWebhook(name) => {
                if matches!(key.code, KeyCode::Char('y' | 'Y')) {
                    if let Some(config) = self.settings.as_mut() {
                        config.alerts.remove_webhook(&name);
                    }
                    self.webhook_selected = self.webhook_selected.saturating_sub(1);
                    self.save_settings(format!("Deleted webhook '{name}'"));
                } else {
                    self.set_status(Severity::Info, "Cancelled".to_string());
                }
                (ViewMode::Settings, KeyOutcome::Redraw)
            }
        };
        self.mode = Some(next);
        outcome
    }

    fn handle_table_key(&mut self, code: KeyCode) -> (ViewMode, KeyOutcome) {
        let sort_column = match code {
            KeyCode::Char('c') => Some(SortColumn::Cpu),
            KeyCode::Char('m') => Some(SortColumn::Mem),
            KeyCode::Char('p') => Some(SortColumn::Pid),
            KeyCode::Char('u') => Some(SortColumn::User),
            KeyCode::Char('v') => Some(SortColumn::Vsize),
            KeyCode::Char('r') => Some(SortColumn::Rss),
            KeyCode::Char('t') => Some(SortColumn::Time),
            _ => None,
        };
        if let Some(column) = sort_column {
            self.order.toggle(column);
            return (ViewMode::Table, KeyOutcome::Rerank(self.rank_settings()));
        }

        let rows = self.view.as_ref().map(|view| view.rows.clone()).unwrap_or_default();
        match code {
            KeyCode::Char('q') => (ViewMode::Table, KeyOutcome::Quit),
            KeyCode::Char('?' | 'h') => (ViewMode::Help, KeyOutcome::Redraw),
            KeyCode::Char('/') => (ViewMode::Filter, KeyOutcome::Redraw),
            KeyCode::Char('s') => {
                if self.open_settings() {
                    (ViewMode::Settings, KeyOutcome::Redraw)
                } else {
                    (ViewMode::Table, KeyOutcome::Redraw)
                }
            }
            KeyCode::Esc if !self.filter_input.is_empty() => {
                self.filter_input.clear();
                (ViewMode::Table, KeyOutcome::Rerank(self.rank_settings()))
            }
            KeyCode::Up => {
                self.table.move_by(-1, &rows);
                (ViewMode::Table, KeyOutcome::Redraw)
            }
            KeyCode::Down => {
                self.table.move_by(1, &rows);
                (ViewMode::Table, KeyOutcome::Redraw)
            }
            KeyCode::PageUp => {
                self.table.move_by(-PAGE_ROWS, &rows);
                (ViewMode::Table, KeyOutcome::Redraw)
            }
            KeyCode::PageDown => {
                self.table.move_by(PAGE_ROWS, &rows);
                (ViewMode::Table, KeyOutcome::Redraw)
            }
            KeyCode::Home => {
                self.table.select_first(&rows);
                (ViewMode::Table, KeyOutcome::Redraw)
            }
            KeyCode::End => {
                self.table.select_last(&rows);
                (ViewMode::Table, KeyOutcome::Redraw)
            }
            KeyCode::Char('k') => match self.selected_target() {
                Some(target) => (ViewMode::ConfirmTerminate(target), KeyOutcome::Redraw),
                None => (ViewMode::Table, KeyOutcome::Ignored),
            },
            KeyCode::Char('K') => {
                if let Some(target) = self.selected_target() {
                    self.signal(&target, Signal::Kill);
                }
                (ViewMode::Table, KeyOutcome::Redraw)
            }
            KeyCode::Char('n') => match self.selected_target() {
                Some(target) => (ViewMode::ConfirmRenice(target, -NICE_STEP), KeyOutcome::Redraw),
                None => (ViewMode::Table, KeyOutcome::Ignored),
            },
            KeyCode::Char('N') => match self.selected_target() {
                Some(target) => (ViewMode::ConfirmRenice(target, NICE_STEP), KeyOutcome::Redraw),
                None => (ViewMode::Table, KeyOutcome::Ignored),
            },
            _ => (ViewMode::Table, KeyOutcome::Ignored),
        }
    }

    fn handle_filter_key(&mut self, code: KeyCode) -> (ViewMode, KeyOutcome) {
        match code {
            KeyCode::Enter => (ViewMode::Table, KeyOutcome::Redraw),
            KeyCode::Esc => {
                self.filter_input.clear();
                (ViewMode::Table, KeyOutcome::Rerank(self.rank_settings()))
            }
            KeyCode::Backspace => {
                self.filter_input.pop();
                (ViewMode::Filter, KeyOutcome::Rerank(self.rank_settings()))
            }
            KeyCode::Char(c) => {
                self.filter_input.push(c);
                (ViewMode::Filter, KeyOutcome::Rerank(self.rank_settings()))
            }
            _ => (ViewMode::Filter, KeyOutcome::Ignored),
        }
    }

    fn signal(&mut self, target: &Target, signal: Signal) {
        match control::send_signal(target.pid, signal) {
            Ok(()) => self.set_status(
                Severity::Info,
                format!("Sent {} to {} ({})", signal.name(), target.pid.0, target.name),
            ),
            Err(e) => self.set_status(Severity::Error, e.to_string()),
        }
    }

    /// Apply `delta` to the live niceness, falling back to the sampled one
    /// when it cannot be read.
    fn renice(&mut self, target: &Target, delta: i32) {
        let current = control::current_niceness(target.pid).map_or(target.niceness, i64::from);
        let nice = adjusted_niceness(current, delta);
        match control::set_niceness(target.pid, nice) {
            Ok(()) => self.set_status(
                Severity::Info,
                format!("Nice of {} ({}) set to {nice}", target.pid.0, target.name),
            ),
            Err(e) => self.set_status(Severity::Error, e.to_string()),
        }
    }

    // -------------------------------------------------------------------------
    // Settings
    // -------------------------------------------------------------------------

    fn open_settings(&mut self) -> bool {
        let Some(path) = self.config_path.as_ref() else {
            self.set_status(Severity::Warning, "No config file to edit".to_string());
            return false;
        };
        match Config::load_or_default(path) {
            Ok(config) => {
                self.settings = Some(config);
                self.webhook_selected = 0;
                true
            }
            Err(e) => {
                self.set_status(Severity::Error, e.to_string());
                false
            }
        }
    }

    fn save_settings(&mut self, done: String) {
        let (Some(path), Some(config)) = (self.config_path.as_ref(), self.settings.as_ref()) else {
            return;
        };
        match config.save(path) {
            Ok(()) => self.set_status(Severity::Info, done),
            Err(e) => self.set_status(Severity::Error, e.to_string()),
        }
    }

    fn webhook_names(&self) -> Vec<String> {
        self.settings.as_ref().map(|c| c.alerts.webhooks.keys().cloned().collect()).unwrap_or_default()
    }

    fn handle_settings_key(&mut self, code: KeyCode) -> (ViewMode, KeyOutcome) {
        let names = self.webhook_names();
        let selected = names.get(self.webhook_selected).cloned();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => (ViewMode::Table, KeyOutcome::Redraw),
            KeyCode::Char('e') => {
                self.input.clear();
                (ViewMode::EditThreshold(ThresholdField::Cpu), KeyOutcome::Redraw)
            }
            KeyCode::Char('m') => {
                self.input.clear();
                (ViewMode::EditThreshold(ThresholdField::Memory), KeyOutcome::Redraw)
            }
            KeyCode::Char('a') => {
                self.input.clear();
                (ViewMode::WebhookName, KeyOutcome::Redraw)
            }
            KeyCode::Char('d') => match selected {
                Some(name) => (ViewMode::ConfirmDeleteWebhook(name), KeyOutcome::Redraw),
                None => (ViewMode::Settings, KeyOutcome::Ignored),
            },
            KeyCode::Char('w') => match selected {
                Some(name) => {
                    if let Some(config) = self.settings.as_mut() {
                        config.alerts.activate_webhook(&name);
                    }
                    self.save_settings(format!("Alerts now post to '{name}'"));
                    (ViewMode::Settings, KeyOutcome::Redraw)
                }
                None => (ViewMode::Settings, KeyOutcome::Ignored),
            },
            KeyCode::Up => {
                self.webhook_selected = self.webhook_selected.saturating_sub(1);
                (ViewMode::Settings, KeyOutcome::Redraw)
            }
            KeyCode::Down => {
                self.webhook_selected = (self.webhook_selected + 1).min(names.len().saturating_sub(1));
                (ViewMode::Settings, KeyOutcome::Redraw)
            }
            _ => (ViewMode::Settings, KeyOutcome::Ignored),
        }
    }

    fn edit_input(&mut self, code: KeyCode) -> InputStep {
        match code {
            KeyCode::Enter => InputStep::Submitted(std::mem::take(&mut self.input).trim().to_string()),
            KeyCode::Esc => {
                self.input.clear();
                InputStep::Cancelled
            }
            KeyCode::Backspace => {
                self.input.pop();
                InputStep::Editing
            }
            KeyCode::Char(c) => {
                self.input.push(c);
                InputStep::Editing
            }
            _ => InputStep::Editing,
        }
    }

    fn handle_threshold_input(&mut self, field: ThresholdField, code: KeyCode) -> (ViewMode, KeyOutcome) {
        let text = match self.edit_input(code) {
            InputStep::Editing => return (ViewMode::EditThreshold(field), KeyOutcome::Redraw),
            InputStep::Cancelled => return (ViewMode::Settings, KeyOutcome::Redraw),
            InputStep::Submitted(text) => text,
        };
        let Some(value) = parse_threshold(&text) else {
            self.set_status(Severity::Error, format!("Threshold must be a number in (0, 100], got '{text}'"));
            return (ViewMode::Settings, KeyOutcome::Redraw);
        };
        if let Some(config) = self.settings.as_mut() {
            match field {
                ThresholdField::Cpu => config.alerts.cpu_threshold = value,
                ThresholdField::Memory => config.alerts.mem_threshold = value,
            }
        }
        self.save_settings(format!("{} threshold set to {value}%", field.label()));
        (ViewMode::Settings, KeyOutcome::Redraw)
    }

    fn handle_webhook_name_input(&mut self, code: KeyCode) -> (ViewMode, KeyOutcome) {
        match self.edit_input(code) {
            InputStep::Editing => (ViewMode::WebhookName, KeyOutcome::Redraw),
            InputStep::Cancelled => (ViewMode::Settings, KeyOutcome::Redraw),
            InputStep::Submitted(name) if name.is_empty() => {
                self.set_status(Severity::Error, "Webhook name is empty".to_string());
                (ViewMode::Settings, KeyOutcome::Redraw)
            }
            InputStep::Submitted(name) => (ViewMode::WebhookUrl(name), KeyOutcome::Redraw),
        }
    }

    fn handle_webhook_url_input(&mut self, name: String, code: KeyCode) -> (ViewMode, KeyOutcome) {
        let url = match self.edit_input(code) {
            InputStep::Editing => return (ViewMode::WebhookUrl(name), KeyOutcome::Redraw),
            InputStep::Cancelled => return (ViewMode::Settings, KeyOutcome::Redraw),
            InputStep::Submitted(url) => url,
        };
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            self.set_status(Severity::Error, format!("Not an http(s) URL: '{url}'"));
            return (ViewMode::Settings, KeyOutcome::Redraw);
        }
        if let Some(config) = self.settings.as_mut() {
            config.alerts.add_webhook(&name, &url);
        }
        self.save_settings(format!("Added webhook '{name}'"));
        (ViewMode::Settings, KeyOutcome::Redraw)
    }

    // -------------------------------------------------------------------------
    // Rendering
    // -------------------------------------------------------------------------

    fn render(&self, f: &mut ratatui::Frame) {
        let area = f.area();
        let layout = compute_layout(area.width, area.height);

        let mut constraints = vec![Constraint::Length(layout.header_height), Constraint::Min(0)];
        if layout.show_status_bar {
            constraints.push(Constraint::Length(3));
        }
        let chunks = Layout::default().direction(Direction::Vertical).constraints(constraints).split(area);

        match &self.view {
            Some(view) => {
                HeaderPanel::new(view).render(f, chunks[0], &layout);
                self.table.render(f, chunks[1], &view.rows, view.order, layout.columns, view.clock_ticks);
            }
            None => {
                let waiting = Paragraph::new(Line::from(Span::styled(" Waiting for first sample...", STYLE_DIM)));
                f.render_widget(waiting, chunks[1]);
            }
        }

        if layout.show_status_bar {
            self.render_status_bar(f, chunks[2]);
        }

        match self.mode() {
            ViewMode::Table => {}
            ViewMode::Help => render_help_overlay(f, area),
            ViewMode::Filter => render_filter_overlay(f, area, &self.filter_input),
            ViewMode::ConfirmTerminate(target) => render_confirm_overlay(
                f,
                area,
                &format!("Send SIGTERM to {} ({})?", target.pid.0, target.name),
            ),
            ViewMode::ConfirmRenice(target, delta) => {
                let nice = adjusted_niceness(target.niceness, *delta);
                render_confirm_overlay(
                    f,
                    area,
                    &format!("Change nice of {} ({}) from {} to {nice}?", target.pid.0, target.name, target.niceness),
                );
            }
            ViewMode::ConfirmDeleteWebhook(name) => {
                self.render_settings(f, area, None);
                render_confirm_overlay(f, area, &format!("Delete webhook '{name}'?"));
            }
            ViewMode::Settings => self.render_settings(f, area, None),
            ViewMode::EditThreshold(field) => {
                self.render_settings(f, area, Some(format!("{} threshold (%): {}_", field.label(), self.input)));
            }
            ViewMode::WebhookName => {
                self.render_settings(f, area, Some(format!("Webhook name: {}_", self.input)));
            }
            ViewMode::WebhookUrl(name) => {
                self.render_settings(f, area, Some(format!("URL for '{name}': {}_", self.input)));
            }
        }
    }

    fn render_settings(&self, f: &mut ratatui::Frame, area: Rect, prompt: Option<String>) {
        let Some(config) = &self.settings else {
            return;
        };
        let alerts = &config.alerts;
        let key = |k: &'static str, what: String| {
            Line::from(vec![Span::styled(format!("  {k:<3}"), STYLE_KEY), Span::styled(what, STYLE_TEXT)])
        };

        let mut lines = vec![
            Line::from(""),
            Line::from(Span::styled("  Alert thresholds", STYLE_HEADING)),
            key("e", format!("CPU     {}%", alerts.cpu_threshold)),
            key("m", format!("Memory  {}%", alerts.mem_threshold)),
            Line::from(""),
            Line::from(Span::styled("  Webhooks", STYLE_HEADING)),
        ];
        if alerts.webhooks.is_empty() {
            lines.push(Line::from(Span::styled("     none", STYLE_DIM)));
        }
        for (i, (name, url)) in alerts.webhooks.iter().enumerate() {
            let cursor = if i == self.webhook_selected { "▶" } else { " " };
            let active = if *name == alerts.active_webhook { "●" } else { "○" };
            let style = if i == self.webhook_selected { STYLE_KEY } else { STYLE_TEXT };
            lines.push(Line::from(vec![
                Span::styled(format!("  {cursor} {active} {name:<12}"), style),
                Span::styled(url.clone(), STYLE_DIM),
            ]));
        }
        lines.push(Line::from(""));
        match prompt {
            Some(prompt) => {
                lines.push(Line::from(Span::styled(format!("  {prompt}"), Style::new().fg(CAUTION_AMBER))));
            }
            None => lines.push(Line::from(vec![
                Span::styled("  a", STYLE_KEY),
                Span::styled(":Add ", STYLE_DIM),
                Span::styled("d", STYLE_KEY),
                Span::styled(":Delete ", STYLE_DIM),
                Span::styled("w", STYLE_KEY),
                Span::styled(":Activate ", STYLE_DIM),
                Span::styled("↑↓", STYLE_KEY),
                Span::styled(":Select ", STYLE_DIM),
                Span::styled("q", STYLE_KEY),
                Span::styled(":Back", STYLE_DIM),
            ])),
        }

        let height = u16::try_from(lines.len() + 2).unwrap_or(u16::MAX).min(area.height);
        let popup_area = centered_popup(area, 70, height);
        let settings = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .title(" Settings ")
                .style(Style::new().bg(BACKGROUND).fg(HUD_GREEN)),
        );
        f.render_widget(Clear, popup_area);
        f.render_widget(settings, popup_area);
    }

    fn render_status_bar(&self, f: &mut ratatui::Frame, area: Rect) {
        let line = match &self.status {
            Some(message) => {
                let color = match message.severity {
                    Severity::Info => HUD_GREEN,
                    Severity::Warning => CAUTION_AMBER,
                    Severity::Error => CRITICAL_RED,
                };
                Line::from(Span::styled(format!(" {}", message.text), Style::new().fg(color)))
            }
            None => Line::from(vec![
                Span::styled(" Q", STYLE_KEY),
                Span::styled(":Quit ", STYLE_DIM),
                Span::styled("/", STYLE_KEY),
                Span::styled(":Filter ", STYLE_DIM),
                Span::styled("c m p u v r t", STYLE_KEY),
                Span::styled(":Sort ", STYLE_DIM),
                Span::styled("k", STYLE_KEY),
                Span::styled(":Term ", STYLE_DIM),
                Span::styled("s", STYLE_KEY),
                Span::styled(":Settings ", STYLE_DIM),
                Span::styled("?", STYLE_KEY),
                Span::styled(":Help", STYLE_DIM),
            ]),
        };
        let status = Paragraph::new(vec![line])
            .block(Block::default().borders(Borders::ALL).border_style(Style::default().fg(HUD_GREEN)));
        f.render_widget(status, area);
    }
}

fn render_help_overlay(f: &mut ratatui::Frame, area: Rect) {
    let popup_area = centered_popup(area, 70, 19);
    let key = |k: &'static str, what: &'static str| {
        Line::from(vec![Span::styled(format!("  {k:<10}"), STYLE_KEY), Span::styled(what, STYLE_TEXT)])
    };

    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("  Keys", STYLE_HEADING)),
        key("↑↓ PgUp", "Select process"),
        key("c m p u", "Sort by CPU, memory, PID, user"),
        key("v r t", "Sort by virtual size, resident size, CPU time"),
        key("", "Same key again flips the direction"),
        key("/", "Filter by command, user or name (Esc clears)"),
        key("k", "Send SIGTERM (asks first)"),
        key("K", "Send SIGKILL immediately"),
        key("n / N", "Nice -5 / +5 (asks first)"),
        key("s", "Settings: thresholds and webhooks"),
        key("q Ctrl-C", "Quit"),
        Line::from(""),
        Line::from(Span::styled("  %CPU is the share of all busy CPU time since the last tick.", STYLE_DIM)),
        Line::from(""),
        Line::from(Span::styled("  Press any key to close", STYLE_DIM)),
    ];

    let help_widget = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Help ")
            .style(Style::new().bg(BACKGROUND).fg(HUD_GREEN)),
    );

    f.render_widget(Clear, popup_area);
    f.render_widget(help_widget, popup_area);
}

fn render_filter_overlay(f: &mut ratatui::Frame, area: Rect, query: &str) {
    let popup_area = centered_popup(area, 60, 3);
    let filter_widget = Paragraph::new(format!("Filter: {query}_"))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("Filter Processes (Enter to keep, Esc to clear)")
                .style(Style::default().bg(BACKGROUND).fg(HUD_GREEN)),
        )
        .style(Style::default().fg(CAUTION_AMBER));

    f.render_widget(Clear, popup_area);
    f.render_widget(filter_widget, popup_area);
}

fn render_confirm_overlay(f: &mut ratatui::Frame, area: Rect, question: &str) {
    let popup_area = centered_popup(area, 60, 4);
    let lines = vec![
        Line::from(Span::styled(format!(" {question}"), Style::new().fg(CAUTION_AMBER))),
        Line::from(vec![
            Span::styled(" y", STYLE_KEY),
            Span::styled(": confirm   ", STYLE_DIM),
            Span::styled("any other key", STYLE_KEY),
            Span::styled(": cancel", STYLE_DIM),
        ]),
    ];
    let confirm = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Confirm ")
            .border_style(Style::new().fg(CRITICAL_RED))
            .style(Style::new().bg(BACKGROUND)),
    );

    f.render_widget(Clear, popup_area);
    f.render_widget(confirm, popup_area);
}

/// Percentage in (0, 100]
fn parse_threshold(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|value| *value > 0.0 && *value <= 100.0)
}

/// Create a centered popup area with given width percentage and height in lines
fn centered_popup(area: Rect, width_percent: u16, height_lines: u16) -> Rect {
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Fill(1), Constraint::Length(height_lines), Constraint::Fill(1)])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - width_percent) / 2),
            Constraint::Percentage(width_percent),
            Constraint::Percentage((100 - width_percent) / 2),
        ])
        .split(vertical[1])[1]
}

// =============================================================================
// RENDERER
// =============================================================================

/// Full-screen renderer. Restores the terminal when dropped.
pub struct TuiRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    app: App,
}

impl TuiRenderer {
    /// Switch the terminal to raw mode and the alternate screen. The
    /// settings view edits the config at `config_path`.
    ///
    /// # Errors
    /// Returns error if the terminal cannot be set up.
    pub fn new(config_path: PathBuf) -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(e).context("Failed to enter alternate screen");
        }
        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => terminal,
            Err(e) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                return Err(e).context("Failed to create terminal");
            }
        };
        let mut renderer = Self { terminal, app: App::with_config_path(config_path) };
        renderer.draw()?;
        Ok(renderer)
    }

    fn draw(&mut self) -> Result<()> {
        let app = &self.app;
        self.terminal.draw(|f| app.render(f)).context("Failed to draw")?;
        Ok(())
    }
}

impl Renderer for TuiRenderer {
    fn render(&mut self, snapshot: &Snapshot<'_>) -> Result<()> {
        self.app.update(snapshot);
        self.draw()
    }

    fn wait(&mut self, timeout: Duration, token: &CancellationToken) -> Result<Control> {
        let deadline = Instant::now() + timeout;
        while !token.is_cancelled() {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            if !event::poll(remaining.min(INPUT_POLL))? {
                continue;
            }
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => match self.app.handle_key(key) {
                    KeyOutcome::Quit => token.cancel(),
                    KeyOutcome::Rerank(settings) => {
                        self.draw()?;
                        return Ok(Control::Rerank(settings));
                    }
                    KeyOutcome::Redraw => self.draw()?,
                    KeyOutcome::Ignored => {}
                },
                Event::Resize(..) => self.draw()?,
                _ => {}
            }
        }
        Ok(Control::Tick)
    }
}

impl Drop for TuiRenderer {
    fn drop(&mut self) {
        // Cleanup terminal
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}
