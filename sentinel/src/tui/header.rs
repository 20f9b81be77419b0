use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::layout::{LayoutConfig, TerminalSize};
use super::theme::{load_color, CAUTION_AMBER, HUD_GREEN, INFO_DIM};
use super::View;
use crate::render::format::format_uptime;

/// Summary panel - tasks, load, uptime and current ranking
pub struct HeaderPanel<'a> {
    view: &'a View,
}

impl<'a> HeaderPanel<'a> {
    pub fn new(view: &'a View) -> Self {
        Self { view }
    }

    fn system_line(&self) -> Line<'static> {
        let summary = &self.view.summary;
        let load = summary.load_averages;
        let dim = Style::default().fg(INFO_DIM);
        let value = Style::default().fg(HUD_GREEN);

        Line::from(vec![
            Span::styled(" SENTINEL", Style::default().fg(HUD_GREEN).add_modifier(Modifier::BOLD)),
            Span::styled(" | Tasks ", dim),
            Span::styled(format!("{}", summary.total_task_count), value),
            Span::styled(format!(" ({} running)", summary.running_task_count), dim),
            Span::styled(" | Load ", dim),
            Span::styled(
                format!("{:.2} {:.2} {:.2}", load.one, load.five, load.fifteen),
                Style::default().fg(load_color(load.one, self.view.cpu_count)),
            ),
            Span::styled(" | Up ", dim),
            Span::styled(format_uptime(summary.uptime_seconds), value),
            Span::styled(" | CPUs ", dim),
            Span::styled(format!("{}", self.view.cpu_count), value),
        ])
    }

    fn ranking_line(&self) -> Line<'static> {
        let dim = Style::default().fg(INFO_DIM);
        let order = self.view.order;
        let arrow = if order.descending { "▼" } else { "▲" };
        let filter = self.view.filter.clone().unwrap_or_else(|| "-".to_string());

        Line::from(vec![
            Span::styled(" Sort ", dim),
            Span::styled(format!("{} {arrow}", order.column.label()), Style::default().fg(CAUTION_AMBER)),
            Span::styled(" | Filter ", dim),
            Span::styled(filter, Style::default().fg(CAUTION_AMBER)),
            Span::styled(" | Showing ", dim),
            Span::styled(
                format!("{} of {}", self.view.rows.len(), self.view.tracked),
                Style::default().fg(HUD_GREEN),
            ),
            Span::styled(format!(" (max {})", self.view.display_budget), dim),
        ])
    }

    pub fn render(&self, f: &mut Frame, area: Rect, layout: &LayoutConfig) {
        let paragraph = match layout.size {
            TerminalSize::Minimal => Paragraph::new(vec![self.system_line()]),
            TerminalSize::Compact => Paragraph::new(vec![self.system_line(), self.ranking_line()]),
            TerminalSize::Normal => Paragraph::new(vec![self.system_line(), self.ranking_line()]).block(
                Block::default().borders(Borders::ALL).border_style(Style::default().fg(HUD_GREEN)),
            ),
        };
        f.render_widget(paragraph, area);
    }
}
