use crate::app::{App, Focus};
use crate::halfblock;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, Paragraph, Wrap},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 24;

/// Max scroll for help content (generous to account for text wrapping on small screens)
pub const HELP_CONTENT_LINES: u16 = 50;

/// Number of lines in controls content
pub const CONTROLS_CONTENT_LINES: u16 = 12;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Main render function
pub fn render(frame: &mut Frame, app: &App) {
    let area = frame.area();

    if app.fullscreen_mode {
        render_canvas(frame, area, app);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], app);
        render_canvas(frame, layout[1], app);
    }

    if app.show_help {
        render_help_overlay(frame, area, app);
    }
}

/// Calculate the canvas size in characters (excluding borders)
pub fn get_canvas_size(frame_area: Rect, fullscreen: bool) -> (u16, u16) {
    if fullscreen {
        (frame_area.width.saturating_sub(2), frame_area.height.saturating_sub(2))
    } else {
        let canvas_width = frame_area.width.saturating_sub(SIDEBAR_WIDTH + 2);
        let canvas_height = frame_area.height.saturating_sub(2);
        (canvas_width, canvas_height)
    }
}

/// Visible lines in the controls box for a given terminal height
pub fn get_controls_visible_lines(terminal_height: u16) -> u16 {
    // Status (10) and parameter (8) boxes, plus the controls borders
    terminal_height.saturating_sub(10 + 8 + 2)
}

fn render_sidebar(frame: &mut Frame, area: Rect, app: &App) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(10), // Status
            Constraint::Length(8), // Parameters
            Constraint::Min(6),    // Controls
        ])
        .split(area);

    render_status_box(frame, sections[0], app);
    render_params_box(frame, sections[1], app);
    render_controls_box(frame, sections[2], app);
}

fn render_status_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Schelling ");
    let stats = &app.stats;

    // Bar of content agents
    let bar_width = (area.width.saturating_sub(4)) as usize;
    let filled = (stats.content_share() * bar_width as f32).round() as usize;
    let empty = bar_width.saturating_sub(filled);

    let status_text = app.state_label();
    let status_color = if app.paused {
        HIGHLIGHT_COLOR
    } else if app.simulation.is_settled() {
        Color::Green
    } else {
        BORDER_COLOR
    };

    let text = |s: String| Line::from(Span::styled(s, Style::default().fg(TEXT_COLOR)));
    let dim = |s: String| Line::from(Span::styled(s, Style::default().fg(DIM_TEXT_COLOR)));

    let mut content = vec![
        text(format!("Agents: {}", stats.occupied)),
        text(format!("Unhappy: {}", stats.unhappy)),
        text(format!("Moved: {}", app.last_report.relocations)),
        text(format!("Stranded: {}", app.last_report.stranded)),
        text(format!("Similar: {:.0}%", stats.mean_similarity * 100.0)),
        Line::from(vec![
            Span::styled("█".repeat(filled), Style::default().fg(Color::Green)),
            Span::styled("░".repeat(empty), Style::default().fg(Color::DarkGray)),
        ]),
        Line::from(vec![
            Span::styled(status_text, Style::default().fg(status_color)),
            Span::styled(
                format!(" t{} g{}", app.simulation.ticks(), app.simulation.generation()),
                Style::default().fg(DIM_TEXT_COLOR),
            ),
        ]),
    ];
    if let Some(message) = &app.message {
        content.push(dim(message.clone()));
    } else if let Some(name) = app.preset_name() {
        content.push(dim(format!("Preset: {}", name)));
    }

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_params_box(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block(" Parameters ");

    let make_line = |label: &str, value: String, focused: bool| {
        let prefix = if focused { "> " } else { "  " };
        let style = if focused {
            Style::default().fg(HIGHLIGHT_COLOR)
        } else {
            Style::default().fg(TEXT_COLOR)
        };
        Line::from(Span::styled(format!("{}{}: {}", prefix, label, value), style))
    };

    let params = &app.params;

    let content = vec![
        make_line("Cell", format!("{}", params.cell_size), app.focus == Focus::CellSize),
        make_line(
            "Occupied",
            format!("{:.0}%", params.occupancy * 100.0),
            app.focus == Focus::Occupancy,
        ),
        make_line("Groups", format!("{}", params.group_count), app.focus == Focus::Groups),
        make_line(
            "Prefer",
            format!("{:.0}%", params.preference * 100.0),
            app.focus == Focus::Preference,
        ),
        make_line("Speed", format!("{}", app.ticks_per_frame), app.focus == Focus::Speed),
        group_swatches(app),
    ];

    let scroll = scroll_to_line(app.focus.line_index(), area.height, content.len() as u16);
    let paragraph = Paragraph::new(content).block(block).scroll((scroll, 0));
    frame.render_widget(paragraph, area);
}

/// Scroll offset that keeps `line` inside a bordered box of `box_height`
fn scroll_to_line(line: u16, box_height: u16, content_height: u16) -> u16 {
    let visible = box_height.saturating_sub(2);
    if visible == 0 || visible >= content_height || line < visible {
        0
    } else {
        line + 1 - visible
    }
}

/// Title with a scroll hint when the content overflows its box
fn scroll_title(content_height: u16, box_height: u16, plain: &'static str, scrollable: &'static str) -> &'static str {
    if content_height > box_height.saturating_sub(2) {
        scrollable
    } else {
        plain
    }
}

/// One coloured block per group
fn group_swatches(app: &App) -> Line<'static> {
    let mut spans = vec![Span::raw("  ")];
    for group in 0..app.params.group_count {
        spans.push(Span::styled("██", Style::default().fg(app.palette.color(group))));
    }
    Line::from(spans)
}

fn render_controls_box(frame: &mut Frame, area: Rect, app: &App) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let make_control = |key: &str, desc: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let content = vec![
        make_control("Space", "pause/resume"),
        make_control("H/?", "help"),
        make_control("Tab", "next param"),
        make_control("←/→", "adjust"),
        make_control("R", "reshuffle"),
        make_control("C", "new colors"),
        make_control("P", "next preset"),
        make_control("+/-", "speed"),
        make_control("V", "fullscreen"),
        make_control("W", "save config"),
        make_control("X", "export png"),
        make_control("Q", "quit"),
    ];

    let title = scroll_title(content.len() as u16, area.height, " Controls ", " Controls (↑↓) ");

    let paragraph = Paragraph::new(content)
        .block(styled_block(title))
        .scroll((app.controls_scroll, 0));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, app: &App) {
    let block = styled_block("");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let cells = halfblock::render_to_halfblocks(
        app.simulation.grid(),
        app.params.cell_size,
        &app.palette,
        inner.width,
        inner.height,
    );

    let buf = frame.buffer_mut();
    for cell in cells {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            if let Some(target) = buf.cell_mut((x, y)) {
                target
                    .set_char(cell.char)
                    .set_style(Style::default().fg(cell.fg).bg(cell.bg));
            }
        }
    }
}

/// Help dialog centred over the canvas, never over the sidebar
fn help_rect(area: Rect, fullscreen: bool) -> Rect {
    let left = if fullscreen { 0 } else { SIDEBAR_WIDTH.min(area.width) };
    let canvas_width = area.width - left;
    let width = canvas_width.saturating_sub(4).min(56);
    let height = area.height.saturating_sub(4).min(36);
    Rect::new(
        area.x + left + (canvas_width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_help_overlay(frame: &mut Frame, area: Rect, app: &App) {
    let help_area = help_rect(area, app.fullscreen_mode);
    frame.render_widget(Clear, help_area);

    let heading = |s: &'static str| Line::from(Span::styled(s, Style::default().fg(HIGHLIGHT_COLOR)));
    let label = |s: &'static str| Line::from(Span::styled(s, Style::default().fg(TEXT_COLOR)));

    let content = vec![
        Line::from(""),
        Line::from(Span::styled("SCHELLING SEGREGATION MODEL", Style::default().fg(BORDER_COLOR))),
        Line::from(""),
        Line::from("Agents of several groups live on a wrapping grid. An agent is unhappy when the share of similar agents among its occupied neighbours falls below the preference. Every step, each unhappy agent moves to a random empty cell."),
        Line::from(""),
        Line::from("Even a mild preference produces strongly segregated neighbourhoods."),
        Line::from(""),
        heading("PARAMETERS:"),
        Line::from(""),
        label("Cell - size of one agent"),
        label("Occupied - chance a cell starts filled"),
        label("Groups - number of agent groups"),
        Line::from("Changing any of these builds a new grid."),
        Line::from(""),
        label("Prefer - similarity threshold"),
        Line::from("Changing it wakes a settled grid without rebuilding it."),
        Line::from(""),
        heading("STATUS:"),
        Line::from("RUNNING while agents still move, SETTLED once a step moves nobody. When the grid is full, unhappy agents have nowhere to go and it settles as is."),
        Line::from(""),
        heading("BASIC CONTROLS:"),
        Line::from("Space=Pause, R=Reshuffle, C=Colors, P=Presets, V=Fullscreen, Tab/Arrows=Adjust, +/-=Speed, W=Save config, X=PNG, Q=Quit"),
        Line::from(""),
    ];

    let title = scroll_title(
        content.len() as u16,
        help_area.height,
        " Help (H to close) ",
        " Help (J/K scroll, H to close) ",
    );

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(HIGHLIGHT_COLOR))
        .title(title);

    let paragraph = Paragraph::new(content)
        .block(block)
        .wrap(Wrap { trim: true })
        .scroll((app.help_scroll, 0));

    frame.render_widget(paragraph, help_area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canvas_size_excludes_sidebar_and_borders() {
        let area = Rect::new(0, 0, 100, 30);
        assert_eq!(get_canvas_size(area, false), (100 - SIDEBAR_WIDTH - 2, 28));
        assert_eq!(get_canvas_size(area, true), (98, 28));
        assert_eq!(get_canvas_size(Rect::new(0, 0, 10, 1), false), (0, 0));
    }

    #[test]
    fn test_scroll_keeps_focused_line_visible() {
        // Box of 5 rows shows 3 lines of content
        assert_eq!(scroll_to_line(1, 5, 6), 0);
        assert_eq!(scroll_to_line(3, 5, 6), 1);
        assert_eq!(scroll_to_line(5, 5, 6), 3);
        assert_eq!(scroll_to_line(5, 20, 6), 0);
    }

    #[test]
    fn test_help_rect_stays_over_canvas() {
        let rect = help_rect(Rect::new(0, 0, 120, 40), false);
        assert!(rect.x >= SIDEBAR_WIDTH);
        assert_eq!((rect.width, rect.height), (56, 36));
        assert!(rect.right() <= 120 && rect.bottom() <= 40);

        let tiny = help_rect(Rect::new(0, 0, 10, 3), false);
        assert_eq!((tiny.width, tiny.height), (0, 0));
    }
}
