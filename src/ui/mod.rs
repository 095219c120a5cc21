mod components;

use std::sync::OnceLock;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::app::{App, SPINNER_FRAMES};
use crate::theme::Theme;
use components::{InputWindow, ResultView};

static THEME: OnceLock<Theme> = OnceLock::new();

/// Install the theme before the first draw; later calls are ignored
pub fn init_theme(theme: Theme) {
    let _ = THEME.set(theme);
}

fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::default)
}

// Helper functions to get theme colors
fn accent() -> Color { theme().accent }
fn verified() -> Color { theme().verified }
fn rejected() -> Color { theme().rejected }
fn warning() -> Color { theme().warning }
fn text() -> Color { theme().text }
fn text_dim() -> Color { theme().text_dim }
fn inactive() -> Color { theme().inactive }
fn header() -> Color { theme().header }

pub fn draw(f: &mut Frame, app: &App) {
    let area = f.area();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .margin(0)
        .constraints([
            Constraint::Length(1), // Info line
            Constraint::Length(6), // Form box
            Constraint::Min(6),    // Result box
            Constraint::Length(1), // Footer
        ])
        .split(area);

    draw_info_line(f, app, chunks[0]);
    draw_form_box(f, app, chunks[1]);
    draw_result_box(f, app, chunks[2]);
    draw_footer(f, app, chunks[3]);

    if app.show_help {
        draw_help_popup(f);
    }
}

fn draw_info_line(f: &mut Frame, app: &App, area: Rect) {
    // Priority: status message > in-flight > service info
    let line = if let Some(ref status) = app.status_message {
        Line::from(Span::styled(status, Style::default().fg(warning())))
    } else if app.form.is_submitting() {
        Line::from(vec![
            Span::styled(SPINNER_FRAMES[app.spinner_frame], Style::default().fg(accent())),
            Span::styled(format!(" Asking {}", app.server_url), Style::default().fg(text_dim())),
        ])
    } else {
        let mut spans = vec![Span::styled(app.server_url.as_str(), Style::default().fg(text_dim()))];
        if let Some(ref health) = app.health {
            let color = if health.is_healthy() { verified() } else { rejected() };
            spans.push(Span::styled(" │ ", Style::default().fg(inactive())));
            spans.push(Span::styled(health.label(), Style::default().fg(color)));
        }
        Line::from(spans)
    };

    f.render_widget(Paragraph::new(line).alignment(Alignment::Center), area);
}

fn draw_form_box(f: &mut Frame, app: &App, area: Rect) {
    let busy = app.form.is_submitting();
    let border_color = if busy { inactive() } else { accent() };

    let block = Block::default()
        .title(Span::styled(
            " Title Verification System ",
            Style::default().fg(border_color).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Label
            Constraint::Length(1), // Input
            Constraint::Length(1), // Spacer
            Constraint::Length(1), // Submit control
        ])
        .split(inner);

    f.render_widget(
        Paragraph::new(Span::styled("Enter Title", Style::default().fg(header()))),
        rows[0],
    );

    // Two columns go to the "> " prompt
    let window = InputWindow::new(&app.form.query, rows[1].width.saturating_sub(2));
    let input = if app.form.query.is_empty() {
        Span::styled("Enter your title here", Style::default().fg(text_dim()).add_modifier(Modifier::ITALIC))
    } else if busy {
        Span::styled(window.visible, Style::default().fg(text_dim()))
    } else {
        Span::styled(window.visible, Style::default().fg(text()))
    };
    f.render_widget(
        Paragraph::new(Line::from(vec![Span::styled("> ", Style::default().fg(inactive())), input])),
        rows[1],
    );

    let button = if busy {
        Line::from(vec![
            Span::styled(SPINNER_FRAMES[app.spinner_frame], Style::default().fg(accent())),
            Span::styled(" Verifying", Style::default().fg(text_dim())),
        ])
    } else {
        Line::from(vec![
            Span::styled("[ ", Style::default().fg(inactive())),
            Span::styled("Verify Title", Style::default().fg(accent()).add_modifier(Modifier::BOLD)),
            Span::styled(" ]", Style::default().fg(inactive())),
        ])
    };
    f.render_widget(Paragraph::new(button).alignment(Alignment::Center), rows[3]);

    // Cursor sits after the text while the input is enabled
    if !busy && !app.show_help {
        let x = rows[1]
            .x
            .saturating_add(2)
            .saturating_add(window.cursor)
            .min(rows[1].right().saturating_sub(1));
        f.set_cursor_position((x, rows[1].y));
    }
}

fn draw_result_box(f: &mut Frame, app: &App, area: Rect) {
    let block = Block::default()
        .title(Span::styled(" Result ", Style::default().fg(inactive())))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(inactive()));
    let inner = block.inner(area);
    f.render_widget(block, area);

    let Some(result) = app.form.result.as_ref() else {
        let hint = Paragraph::new(Span::styled(
            "Type a title and press Enter to verify it",
            Style::default().fg(text_dim()),
        ))
        .alignment(Alignment::Center);
        f.render_widget(hint, inner);
        return;
    };

    let view = ResultView::from_result(result);
    let verdict_color = if view.verified { verified() } else { rejected() };

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // Heading
            Constraint::Length(2), // Reason
            Constraint::Length(1), // Gauge
            Constraint::Length(1), // Spacer
            Constraint::Min(0),    // Similar titles
        ])
        .split(inner);

    f.render_widget(
        Paragraph::new(Span::styled(
            view.heading,
            Style::default().fg(verdict_color).add_modifier(Modifier::BOLD),
        )),
        rows[0],
    );

    f.render_widget(
        Paragraph::new(Span::styled(view.reason.as_str(), Style::default().fg(text_dim())))
            .wrap(Wrap { trim: true }),
        rows[1],
    );

    let gauge = Gauge::default()
        .gauge_style(Style::default().fg(verdict_color).bg(inactive()))
        .ratio(view.ratio)
        .label(Span::styled(
            view.percent_label.as_str(),
            Style::default().fg(text()).add_modifier(Modifier::BOLD),
        ));
    f.render_widget(gauge, rows[2]);

    if view.has_similar_titles() {
        let mut lines = vec![Line::from(Span::styled(
            "Similar Titles:",
            Style::default().fg(header()).add_modifier(Modifier::BOLD),
        ))];
        lines.extend(view.similar_titles.iter().map(|title| {
            Line::from(vec![
                Span::styled("  • ", Style::default().fg(inactive())),
                Span::styled(title.as_str(), Style::default().fg(text())),
            ])
        }));
        f.render_widget(Paragraph::new(lines), rows[4]);
    }
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let hints: Vec<(&str, &str)> = if app.form.is_submitting() {
        vec![("Esc", "Quit"), ("F1", "Help")]
    } else {
        vec![
            ("Enter", "Verify"),
            ("Ctrl+U", "Clear"),
            ("F1", "Help"),
            ("Esc", "Quit"),
        ]
    };

    let hint_spans: Vec<Span> = hints
        .iter()
        .flat_map(|(key, action)| {
            vec![
                Span::styled(*key, Style::default().fg(accent())),
                Span::styled(format!(" {} │ ", action), Style::default().fg(text_dim())),
            ]
        })
        .collect();

    f.render_widget(Paragraph::new(Line::from(hint_spans)).alignment(Alignment::Center), area);
}

fn draw_help_popup(f: &mut Frame) {
    let area = f.area();
    let popup_area = centered_rect(
        if area.width < 80 { 95 } else { 70 },
        if area.height < 30 { 90 } else { 60 },
        area,
    );

    f.render_widget(Clear, popup_area);

    let key_line = |key: &'static str, what: &'static str| {
        Line::from(vec![
            Span::styled(format!("  {:<10}", key), Style::default().fg(accent())),
            Span::raw(what),
        ])
    };

    let help_text = vec![
        Line::from(Span::styled("═══ Keys ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        key_line("Enter", "Send the title for verification"),
        key_line("Backspace", "Delete the last character"),
        key_line("Ctrl+U", "Clear the title"),
        key_line("F1", "Toggle this help"),
        key_line("Esc", "Quit"),
        Line::from(""),
        Line::from(Span::styled("═══ Command Line ═══", Style::default().fg(header()).add_modifier(Modifier::BOLD))),
        key_line("--check T", "Verify one title and print the verdict as JSON"),
        key_line("--health", "Probe the service and print its status"),
        key_line("--server U", "Use another service for this run"),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Config: ", Style::default().fg(text_dim())),
            Span::styled("~/.config/titlecheck/config.toml", Style::default().fg(text())),
        ]),
        Line::from(vec![
            Span::styled("  Logs:   ", Style::default().fg(text_dim())),
            Span::styled("~/.cache/titlecheck/titlecheck.log", Style::default().fg(text())),
        ]),
        Line::from(""),
        Line::from(vec![
            Span::styled("  Press ", Style::default().fg(text_dim())),
            Span::styled("Esc", Style::default().fg(accent())),
            Span::styled(" to close", Style::default().fg(text_dim())),
        ]),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(Span::styled(" titlecheck Help ", Style::default().fg(accent())))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(accent())),
        )
        .wrap(Wrap { trim: false });

    f.render_widget(help, popup_area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::{RequestFailure, VerificationResult, Verifier};
    use async_trait::async_trait;
    use ratatui::{backend::TestBackend, layout::Position, Terminal};
    use std::sync::Arc;

    struct Unused;

    #[async_trait]
    impl Verifier for Unused {
        async fn verify(&self, _title: &str) -> Result<VerificationResult, RequestFailure> {
            Err(RequestFailure::Status(500))
        }
    }

    fn render(app: &App) -> String {
        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        screen_text(&terminal).join("\n")
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> Vec<String> {
        let buffer = terminal.backend().buffer();
        let width = buffer.area.width as usize;
        buffer
            .content
            .chunks(width)
            .map(|row| row.iter().map(|cell| cell.symbol()).collect::<String>())
            .collect()
    }

    fn app_with(result: Option<VerificationResult>) -> App {
        let mut app = App::new(Arc::new(Unused), "http://127.0.0.1:5000", false);
        app.form = app.form.clone().update_query("Morning Star");
        app.form.result = result;
        app
    }

    #[test]
    fn test_renders_verdict_percentage_and_titles() {
        let screen = render(&app_with(Some(VerificationResult {
            verified: true,
            probability: 0.87,
            reason: "ok".to_string(),
            similar_titles: Some(vec!["A".to_string(), "B".to_string()]),
        })));

        assert!(screen.contains("Title Verified"));
        assert!(screen.contains("87.0%"));
        assert!(screen.contains("Similar Titles:"));
        let a = screen.find("• A").unwrap();
        let b = screen.find("• B").unwrap();
        assert!(a < b);
    }

    #[test]
    fn test_no_similar_titles_section_when_absent() {
        let screen = render(&app_with(Some(VerificationResult {
            verified: false,
            probability: 0.0,
            reason: "Contains disallowed words".to_string(),
            similar_titles: None,
        })));

        assert!(screen.contains("Verification Failed"));
        assert!(screen.contains("0.0%"));
        assert!(!screen.contains("Similar Titles:"));
    }

    #[test]
    fn test_busy_form_shows_spinner_label() {
        let mut app = app_with(None);
        app.form = app.form.begin_submit().unwrap().0;

        let screen = render(&app);
        assert!(screen.contains("Verifying"));
        assert!(!screen.contains("Verify Title"));
    }

    #[test]
    fn test_very_long_query_keeps_tail_and_cursor_in_row() {
        let mut app = app_with(None);
        app.form = app.form.clone().update_query(format!("{}END", "a".repeat(65534)));

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();

        // Info line, then the form box border and label; input is the fourth row
        let rows = screen_text(&terminal);
        let input_row = rows[3].trim_end_matches(|c| c == ' ' || c == '│');
        assert!(input_row.ends_with("aaaEND"));
        assert_eq!(terminal.get_cursor_position().unwrap(), Position::new(78, 3));
    }

    #[test]
    fn test_short_query_cursor_follows_text() {
        let app = app_with(None);

        let mut terminal = Terminal::new(TestBackend::new(80, 30)).unwrap();
        terminal.draw(|f| draw(f, &app)).unwrap();

        // "> Morning Star" starts at column 1 inside the border
        assert!(screen_text(&terminal)[3].contains("> Morning Star"));
        assert_eq!(terminal.get_cursor_position().unwrap(), Position::new(1 + 2 + 12, 3));
    }
}
