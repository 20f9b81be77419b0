use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

use super::layout::ColumnSet;
use super::theme::{cpu_color, memory_color, CAUTION_AMBER, HUD_GREEN, INFO_DIM};
use crate::domain::Pid;
use crate::render::format::{format_cpu_time, format_kb, truncate_for_display};
use crate::sampling::{ProcessRow, SortColumn, SortOrder};

// Selection indicators
const SEL_LEFT: &str = "▶";

/// Calculate scroll offset to keep selected item visible
pub fn visible_scroll_offset(selected: usize, current_offset: usize, visible_count: usize) -> usize {
    let visible_count = visible_count.max(1);
    if selected >= current_offset + visible_count {
        // Scroll down if selected is beyond visible window
        selected + 1 - visible_count
    } else if selected < current_offset {
        selected
    } else {
        current_offset
    }
}

/// Rows that fit inside a bordered area below the column header
fn visible_row_count(area: Rect) -> usize {
    area.height.saturating_sub(3).max(1) as usize
}

/// Selection state over the ranked rows.
///
/// Follows the selected pid across refreshes so re-ranking does not move
/// the cursor to a different process.
#[derive(Debug, Default)]
pub struct ProcessTableView {
    selected: usize,
    selected_pid: Option<Pid>,
}

impl ProcessTableView {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-anchor the selection after new rows arrive
    pub fn sync(&mut self, rows: &[ProcessRow]) {
        if let Some(index) =
            self.selected_pid.and_then(|pid| rows.iter().position(|row| row.pid == pid))
        {
            self.selected = index;
            return;
        }
        self.selected = self.selected.min(rows.len().saturating_sub(1));
        self.selected_pid = rows.get(self.selected).map(|row| row.pid);
    }

    pub fn move_by(&mut self, delta: isize, rows: &[ProcessRow]) {
        if rows.is_empty() {
            return;
        }
        let last = rows.len() - 1;
        self.selected = self.selected.saturating_add_signed(delta).min(last);
        self.selected_pid = Some(rows[self.selected].pid);
    }

    pub fn select_first(&mut self, rows: &[ProcessRow]) {
        self.selected = 0;
        self.selected_pid = rows.first().map(|row| row.pid);
    }

    pub fn select_last(&mut self, rows: &[ProcessRow]) {
        self.selected = rows.len().saturating_sub(1);
        self.selected_pid = rows.last().map(|row| row.pid);
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected<'a>(&self, rows: &'a [ProcessRow]) -> Option<&'a ProcessRow> {
        rows.get(self.selected)
    }

    pub fn render(
        &self,
        f: &mut Frame,
        area: Rect,
        rows: &[ProcessRow],
        order: SortOrder,
        columns: ColumnSet,
        clock_ticks: u64,
    ) {
        let visible = visible_row_count(area);
        let offset = visible_scroll_offset(self.selected, 0, visible);
        let command_width = command_width(area.width, columns);

        let mut lines = vec![header_line(columns, order)];
        for (index, row) in rows.iter().enumerate().skip(offset).take(visible) {
            lines.push(row_line(row, columns, clock_ticks, command_width, index == self.selected));
        }
        if rows.is_empty() {
            lines.push(Line::from(Span::styled("  no matching processes", Style::default().fg(INFO_DIM))));
        }

        let title = if rows.is_empty() {
            "[ PROCESSES ]".to_string()
        } else {
            format!("[ PROCESSES {}/{} ]", self.selected + 1, rows.len())
        };
        let paragraph = Paragraph::new(lines).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Plain)
                .title(title)
                .border_style(Style::default().fg(HUD_GREEN)),
        );
        f.render_widget(paragraph, area);
    }
}

// Fixed column widths, separator included
const PID_WIDTH: usize = 8;
const USER_WIDTH: usize = 11;
const PRIORITY_WIDTH: usize = 8;
const STATE_WIDTH: usize = 2;
const PERCENT_WIDTH: usize = 7;
const SIZE_WIDTH: usize = 8;
const TIME_WIDTH: usize = 10;
const MARKER_WIDTH: usize = 2;

fn command_width(area_width: u16, columns: ColumnSet) -> usize {
    let mut used = MARKER_WIDTH + PID_WIDTH + 2 * PERCENT_WIDTH + 2;
    if columns.user {
        used += USER_WIDTH;
    }
    if columns.priority {
        used += PRIORITY_WIDTH;
    }
    if columns.state {
        used += STATE_WIDTH;
    }
    if columns.virtual_size {
        used += SIZE_WIDTH;
    }
    if columns.resident {
        used += SIZE_WIDTH;
    }
    if columns.time {
        used += TIME_WIDTH;
    }
    (area_width as usize).saturating_sub(used).max(8)
}

fn label(column: SortColumn, order: SortOrder) -> String {
    if order.column == column {
        let arrow = if order.descending { "▼" } else { "▲" };
        format!("{}{arrow}", column.label())
    } else {
        column.label().to_string()
    }
}

fn header_line(columns: ColumnSet, order: SortOrder) -> Line<'static> {
    let mut text = format!("  {:>7} ", label(SortColumn::Pid, order));
    if columns.user {
        text.push_str(&format!("{:<10} ", label(SortColumn::User, order)));
    }
    if columns.priority {
        text.push_str(&format!("{:>3} {:>3} ", "PR", "NI"));
    }
    if columns.state {
        text.push_str("S ");
    }
    text.push_str(&format!("{:>6} {:>6} ", label(SortColumn::Cpu, order), label(SortColumn::Mem, order)));
    if columns.virtual_size {
        text.push_str(&format!("{:>7} ", label(SortColumn::Vsize, order)));
    }
    if columns.resident {
        text.push_str(&format!("{:>7} ", label(SortColumn::Rss, order)));
    }
    if columns.time {
        text.push_str(&format!("{:>9} ", label(SortColumn::Time, order)));
    }
    text.push_str("COMMAND");
    Line::from(Span::styled(text, Style::default().fg(CAUTION_AMBER).add_modifier(Modifier::BOLD)))
}

fn row_line(
    row: &ProcessRow,
    columns: ColumnSet,
    clock_ticks: u64,
    command_width: usize,
    is_selected: bool,
) -> Line<'static> {
    let base = if is_selected {
        Style::default().fg(Color::Black).bg(HUD_GREEN).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(HUD_GREEN)
    };
    // Selected rows keep one style so the highlight reads as a bar
    let colored = |color: Color| if is_selected { base } else { Style::default().fg(color) };

    let marker = if is_selected { SEL_LEFT } else { " " };
    let mut spans = vec![Span::styled(format!("{marker} {:>7} ", row.pid.0), base)];
    if columns.user {
        spans.push(Span::styled(format!("{:<10} ", truncate_for_display(row.user.as_str(), 10)), base));
    }
    if columns.priority {
        spans.push(Span::styled(format!("{:>3} {:>3} ", row.priority, row.niceness), colored(INFO_DIM)));
    }
    if columns.state {
        let color = if row.run_state.is_running() { CAUTION_AMBER } else { INFO_DIM };
        spans.push(Span::styled(format!("{} ", row.run_state), colored(color)));
    }
    spans.push(Span::styled(format!("{:>6.1} ", row.cpu_percent), colored(cpu_color(row.cpu_percent))));
    spans.push(Span::styled(
        format!("{:>6.1} ", row.memory_percent),
        colored(memory_color(row.memory_percent)),
    ));
    if columns.virtual_size {
        spans.push(Span::styled(format!("{:>7} ", format_kb(row.virtual_kb)), colored(INFO_DIM)));
    }
    if columns.resident {
        spans.push(Span::styled(format!("{:>7} ", format_kb(row.resident_kb)), base));
    }
    if columns.time {
        spans.push(Span::styled(
            format!("{:>9} ", format_cpu_time(row.cumulative_time.0, clock_ticks)),
            colored(INFO_DIM),
        ));
    }
    spans.push(Span::styled(truncate_for_display(row.command.as_str(), command_width), base));
    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RunState, Ticks};

    fn rows(pids: &[u32]) -> Vec<ProcessRow> {
        pids.iter()
            .map(|&pid| ProcessRow {
                pid: Pid(pid),
                user: "root".into(),
                priority: 20,
                niceness: 0,
                run_state: RunState('S'),
                cpu_percent: 0.0,
                memory_percent: 0.0,
                virtual_kb: 0,
                resident_kb: 0,
                cumulative_time: Ticks(0),
                display_name: "init".into(),
                command: "/sbin/init".into(),
            })
            .collect()
    }

    #[test]
    fn test_scroll_offset() {
        assert_eq!(visible_scroll_offset(0, 0, 10), 0);
        assert_eq!(visible_scroll_offset(9, 0, 10), 0);
        assert_eq!(visible_scroll_offset(10, 0, 10), 1);
        assert_eq!(visible_scroll_offset(25, 0, 10), 16);
        assert_eq!(visible_scroll_offset(3, 5, 10), 3);
    }

    #[test]
    fn test_selection_follows_pid() {
        let mut table = ProcessTableView::new();
        let first = rows(&[10, 20, 30]);
        table.sync(&first);
        table.move_by(1, &first);
        assert_eq!(table.selected(&first).unwrap().pid, Pid(20));

        let reordered = rows(&[30, 10, 20]);
        table.sync(&reordered);
        assert_eq!(table.selected_index(), 2);
        assert_eq!(table.selected(&reordered).unwrap().pid, Pid(20));
    }

    #[test]
    fn test_selection_clamped_when_pid_gone() {
        let mut table = ProcessTableView::new();
        let first = rows(&[1, 2, 3]);
        table.sync(&first);
        table.select_last(&first);

        let shorter = rows(&[1]);
        table.sync(&shorter);
        assert_eq!(table.selected_index(), 0);
        assert_eq!(table.selected(&shorter).unwrap().pid, Pid(1));
    }

    #[test]
    fn test_move_stays_in_bounds() {
        let mut table = ProcessTableView::new();
        let list = rows(&[1, 2, 3]);
        table.move_by(-5, &list);
        assert_eq!(table.selected_index(), 0);
        table.move_by(50, &list);
        assert_eq!(table.selected_index(), 2);
        table.select_first(&list);
        assert_eq!(table.selected_index(), 0);
        table.move_by(1, &[]);
        assert_eq!(table.selected_index(), 0);
    }

    #[test]
    fn test_sort_indicator_on_header() {
        let order = SortOrder { column: SortColumn::Mem, descending: false };
        assert_eq!(label(SortColumn::Mem, order), "%MEM▲");
        assert_eq!(label(SortColumn::Cpu, order), "%CPU");
    }
}
