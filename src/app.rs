use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Padding, Paragraph},
    Frame,
};

use crate::actions::Action;
use crate::config::MonitorConfig;
use crate::duration::format_duration;
use crate::monitor::{ActivityState, SessionView};

const ELLIPSIS: &str = "...";
const FOOTER_HEIGHT: u16 = 3;

/// Theme colors for the session cards
pub struct Theme {
    pub fg: Color,
    pub dim: Color,
    pub active: Color,
    pub thinking: Color,
    pub waiting: Color,
    pub command: Color,
    pub accent: Color,
    pub error: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            fg: Color::Rgb(220, 220, 220),
            dim: Color::Rgb(100, 100, 100),
            active: Color::Rgb(80, 200, 120),
            thinking: Color::Rgb(255, 193, 7),
            waiting: Color::Rgb(90, 140, 255),
            command: Color::Rgb(80, 200, 220),
            accent: Color::Rgb(217, 119, 87), // Claude orange
            error: Color::Rgb(220, 53, 69),
        }
    }
}

impl Theme {
    fn state_color(&self, state: ActivityState) -> Color {
        match state {
            ActivityState::Active => self.active,
            ActivityState::Thinking => self.thinking,
            ActivityState::Waiting => self.waiting,
            ActivityState::Idle => self.dim,
        }
    }
}

/// Main application state
pub struct App {
    /// Ranked sessions from the latest refresh
    pub sessions: Vec<SessionView>,
    /// Index of the first card drawn
    pub scroll: usize,
    /// Note about the latest degraded refresh
    pub error_message: Option<String>,
    /// Theme
    pub theme: Theme,
    /// Fixed card width
    pub card_width: u16,
    /// Seconds between refreshes, shown in the footer
    pub refresh_interval_secs: u64,
    /// Name shown on the assistant uptime line
    pub assistant_label: String,
}

impl App {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            sessions: Vec::new(),
            scroll: 0,
            error_message: None,
            theme: Theme::default(),
            card_width: config.card_width,
            refresh_interval_secs: config.refresh_interval_secs,
            assistant_label: config.assistant_token.clone(),
        }
    }

    /// Handle an action and return whether to quit
    pub fn handle_action(&mut self, action: Action) -> Result<bool> {
        match action {
            Action::KeyPress(key) => self.handle_key(key),
            Action::SessionsUpdated(sessions) => {
                self.sessions = sessions;
                self.error_message = None;
                // Keep scroll within range
                self.scroll = self.scroll.min(self.sessions.len().saturating_sub(1));
                Ok(false)
            }
            Action::Error(msg) => {
                self.error_message = Some(msg);
                Ok(false)
            }
            Action::Quit => Ok(true),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                return Ok(true);
            }
            KeyCode::Char('j') | KeyCode::Down => self.scroll_down(),
            KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
            KeyCode::Char('g') | KeyCode::Home => self.scroll = 0,
            _ => {}
        }
        Ok(false)
    }

    fn scroll_down(&mut self) {
        if self.scroll + 1 < self.sessions.len() {
            self.scroll += 1;
        }
    }

    /// Sessions with an assistant present
    pub fn assistant_count(&self) -> usize {
        self.sessions.iter().filter(|s| s.has_assistant()).count()
    }

    /// Footer summary: ` 3 tabs | 1 claude | 2s`
    pub fn summary_line(&self) -> String {
        format!(
            " {} tabs | {} {} | {}",
            self.sessions.len(),
            self.assistant_count(),
            self.assistant_label,
            format_duration(self.refresh_interval_secs)
        )
    }

    pub fn render(&mut self, frame: &mut Frame) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Length(self.card_width), // Sidebar
                Constraint::Min(0),
            ])
            .split(frame.area());

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(0),                // Cards
                Constraint::Length(FOOTER_HEIGHT), // Summary
            ])
            .split(columns[0]);

        self.render_cards(frame, chunks[0]);
        self.render_footer(frame, chunks[1]);
    }

    fn render_cards(&self, frame: &mut Frame, area: Rect) {
        if self.sessions.is_empty() {
            let empty = Paragraph::new(Line::from(Span::styled(
                "  No terminal sessions found",
                Style::default().fg(self.theme.dim),
            )));
            frame.render_widget(empty, area);
            return;
        }

        let mut y = area.y;
        let bottom = area.y + area.height;

        for session in self.sessions.iter().skip(self.scroll) {
            let lines = self.card_lines(session);
            let height = lines.len() as u16 + 2;
            if y + height > bottom {
                break;
            }

            let card_area = Rect::new(area.x, y, area.width, height);
            let border = Style::default().fg(self.theme.state_color(session.activity.state));
            let card = Paragraph::new(lines).block(
                Block::default()
                    .title(format!(" {} ", session.display_name))
                    .borders(Borders::ALL)
                    .border_style(border)
                    .padding(Padding::horizontal(1)),
            );
            frame.render_widget(card, card_area);
            y += height;
        }
    }

    fn card_lines(&self, session: &SessionView) -> Vec<Line<'static>> {
        let width = usize::from(self.card_width);
        let state = session.activity.state;
        let mut state_style = Style::default().fg(self.theme.state_color(state));
        if state != ActivityState::Idle {
            state_style = state_style.add_modifier(Modifier::BOLD);
        }

        let mut lines = vec![
            Line::from(Span::styled(
                format_duration(session.uptime_secs),
                Style::default().fg(self.theme.dim),
            )),
            Line::from(Span::styled(state.label(), state_style)),
        ];

        if let Some(action) = &session.activity.current_action {
            lines.push(Line::from(Span::styled(
                fit_action(action, width),
                Style::default().fg(self.theme.command),
            )));
        }

        if let Some(background) = fit_background(&session.activity.background, width) {
            lines.push(Line::from(Span::styled(
                format!("bg: {}", background),
                Style::default().fg(self.theme.command).add_modifier(Modifier::DIM),
            )));
        }

        if let Some(uptime) = session.assistant_uptime_secs {
            let mut spans = vec![
                Span::styled(
                    format!("{}: ", self.assistant_label),
                    Style::default().fg(self.theme.dim),
                ),
                Span::styled(format_duration(uptime), Style::default().fg(self.theme.accent)),
            ];
            if session.assistant_subprocesses > 0 {
                spans.push(Span::styled(
                    format!(" · {} procs", session.assistant_subprocesses),
                    Style::default().fg(self.theme.dim),
                ));
            }
            lines.push(Line::from(spans));
        }

        lines
    }

    fn render_footer(&self, frame: &mut Frame, area: Rect) {
        let mut content = vec![
            Line::from(""),
            Line::from(Span::styled(
                self.summary_line(),
                Style::default().fg(self.theme.fg).add_modifier(Modifier::DIM),
            )),
        ];

        if let Some(ref msg) = self.error_message {
            content.push(Line::from(Span::styled(
                truncate(msg, usize::from(self.card_width)),
                Style::default().fg(self.theme.error),
            )));
        }

        let footer = Paragraph::new(content).alignment(Alignment::Center);
        frame.render_widget(footer, area);
    }
}

/// Cut `text` to `max` characters, ending in an ellipsis when cut
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let head: String = text.chars().take(max.saturating_sub(ELLIPSIS.len())).collect();
    format!("{}{}", head, ELLIPSIS)
}

/// Current action line, fitted to the card interior
fn fit_action(action: &str, width: usize) -> String {
    truncate(action, width.saturating_sub(4))
}

/// Comma-joined background labels fitted after the `bg: ` prefix
fn fit_background(labels: &[String], width: usize) -> Option<String> {
    if labels.is_empty() {
        return None;
    }
    Some(truncate(&labels.join(", "), width.saturating_sub(8)))
}
