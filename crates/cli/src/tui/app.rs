//! TUI view state and the `update()` reducer.
//!
//! Conversation state lives in the session controller; this struct only keeps
//! what the surface needs between frames: the input line, the notice, the
//! picker, and cached status fields fed by session events.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use proto::{ModelProfile, SessionEvent, UserIntent, find_profile};
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph},
};

use super::action::{Action, Command, ModelRow};
use super::chat::{self, FeedView};
use super::status;
use super::theme::THEME;
use unicode_width::UnicodeWidthStr;

/// Severity of the dismissible notice line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Dismissible one-line notice above the status bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
}

/// Open model picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPicker {
    pub rows: Vec<ModelRow>,
    pub cursor: usize,
}

/// Parsed `/command` typed into the input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlashCommand {
    New,
    Model(String),
    Models,
    Copy,
    Help,
    Quit,
    Unknown(String),
}

const HELP_TEXT: &str =
    "/new  /model [id]  /models  /copy  /quit   F2 cycles models, End jumps to the newest message";

/// Parses `/command [arg]`. Returns `None` for ordinary text.
pub fn parse_slash_command(input: &str) -> Option<SlashCommand> {
    let input = input.trim();
    if !input.starts_with('/') {
        return None;
    }
    let mut parts = input.splitn(2, char::is_whitespace);
    let name = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    Some(match name {
        "/new" | "/clear" => SlashCommand::New,
        "/model" if arg.is_empty() => SlashCommand::Models,
        "/model" => SlashCommand::Model(arg.to_string()),
        "/models" => SlashCommand::Models,
        "/copy" => SlashCommand::Copy,
        "/help" => SlashCommand::Help,
        "/quit" | "/exit" => SlashCommand::Quit,
        other => SlashCommand::Unknown(other.to_string()),
    })
}

/// Screen regions for one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AppLayout {
    pub title: Rect,
    pub feed: Rect,
    pub notice: Rect,
    pub status: Rect,
    pub input: Rect,
}

/// View state of the chat screen.
pub struct TuiApp {
    pub model: ModelProfile,
    pub remaining: u32,
    pub catalog: Vec<ModelProfile>,
    pub input: String,
    /// Byte offset of the cursor in `input`.
    pub cursor_pos: usize,
    pub notice: Option<Notice>,
    pub model_picker: Option<ModelPicker>,
    pub can_submit: bool,
    pub online: bool,
    pub spinner_tick: u8,
    /// Visible feed rows in the last frame; used for page scrolling.
    pub page_rows: u16,
    pub version: String,
    pub should_quit: bool,
}

impl TuiApp {
    pub fn new(model: ModelProfile, remaining: u32, catalog: Vec<ModelProfile>) -> Self {
        Self {
            model,
            remaining,
            catalog,
            input: String::new(),
            cursor_pos: 0,
            notice: None,
            model_picker: None,
            can_submit: true,
            online: true,
            spinner_tick: 0,
            page_rows: 10,
            version: env!("CARGO_PKG_VERSION").to_string(),
            should_quit: false,
        }
    }

    // ── Input handling ───────────────────────────────────────

    /// Maps a key press to an action for the current view state.
    pub fn key_action(&self, key: KeyEvent) -> Option<Action> {
        if let (KeyModifiers::CONTROL, KeyCode::Char('c')) = (key.modifiers, key.code) {
            return Some(Action::Quit);
        }

        if self.model_picker.is_some() {
            return match key.code {
                KeyCode::Up => Some(Action::PickerUp),
                KeyCode::Down => Some(Action::PickerDown),
                KeyCode::Enter => Some(Action::PickerConfirm),
                KeyCode::Esc | KeyCode::F(2) => Some(Action::ClosePicker),
                _ => None,
            };
        }

        let page = self.page_rows.saturating_sub(1).max(1);
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('n')) => Some(Action::NewChat),
            (KeyModifiers::CONTROL, KeyCode::Char('l')) => Some(Action::OpenModelPicker),
            (_, KeyCode::F(2)) => Some(Action::NextModel),
            (_, KeyCode::Enter) => Some(Action::SubmitInput),
            (_, KeyCode::Esc) => Some(Action::DismissNotice),
            (_, KeyCode::Char(c)) => Some(Action::InsertChar(c)),
            (_, KeyCode::Backspace) => Some(Action::DeleteChar),
            (_, KeyCode::Left) => Some(Action::MoveCursorLeft),
            (_, KeyCode::Right) => Some(Action::MoveCursorRight),
            (_, KeyCode::Up) => Some(Action::ScrollUp(1)),
            (_, KeyCode::Down) => Some(Action::ScrollDown(1)),
            (_, KeyCode::PageUp) => Some(Action::ScrollUp(page)),
            (_, KeyCode::PageDown) => Some(Action::ScrollDown(page)),
            (_, KeyCode::End) => Some(Action::ScrollToBottom),
            _ => None,
        }
    }

    // ── Reducer ──────────────────────────────────────────────

    /// Applies an action and returns the side effect for the event loop.
    pub fn update(&mut self, action: Action) -> Command {
        match action {
            Action::InsertChar(c) => {
                self.input.insert(self.cursor_pos, c);
                self.cursor_pos += c.len_utf8();
                Command::None
            }
            Action::DeleteChar => {
                if self.cursor_pos > 0 {
                    let prev = self.prev_boundary();
                    self.input.drain(prev..self.cursor_pos);
                    self.cursor_pos = prev;
                }
                Command::None
            }
            Action::MoveCursorLeft => {
                self.cursor_pos = self.prev_boundary();
                Command::None
            }
            Action::MoveCursorRight => {
                if self.cursor_pos < self.input.len() {
                    self.cursor_pos = self.input[self.cursor_pos..]
                        .char_indices()
                        .nth(1)
                        .map(|(i, _)| self.cursor_pos + i)
                        .unwrap_or(self.input.len());
                }
                Command::None
            }
            Action::SubmitInput => self.submit_input(),

            Action::ScrollUp(n) => Command::ScrollBy(-f64::from(n)),
            Action::ScrollDown(n) => Command::ScrollBy(f64::from(n)),
            Action::ScrollToBottom => Command::Intent(UserIntent::ScrollToBottom),

            Action::NewChat => {
                self.notice = None;
                Command::Intent(UserIntent::NewChat)
            }
            Action::NextModel => match self.next_model() {
                Some(profile) => self.switch_to(profile),
                None => Command::None,
            },
            Action::OpenModelPicker => Command::LoadModelRows,
            Action::ShowModels(rows) => {
                let cursor = rows.iter().position(|row| row.active).unwrap_or(0);
                self.model_picker = Some(ModelPicker { rows, cursor });
                Command::None
            }
            Action::ConnectivityChanged(online) => {
                self.online = online;
                Command::Intent(UserIntent::ConnectivityChanged(online))
            }
            Action::Session(event) => {
                self.apply_session_event(event);
                Command::None
            }

            Action::PickerUp => {
                if let Some(picker) = self.model_picker.as_mut() {
                    picker.cursor = picker.cursor.saturating_sub(1);
                }
                Command::None
            }
            Action::PickerDown => {
                if let Some(picker) = self.model_picker.as_mut()
                    && picker.cursor + 1 < picker.rows.len()
                {
                    picker.cursor += 1;
                }
                Command::None
            }
            Action::PickerConfirm => {
                let Some(picker) = self.model_picker.take() else {
                    return Command::None;
                };
                let Some(row) = picker.rows.get(picker.cursor) else {
                    return Command::None;
                };
                match find_profile(&self.catalog, &row.id) {
                    Some(profile) if profile.id != self.model.id => {
                        let profile = profile.clone();
                        self.switch_to(profile)
                    }
                    _ => Command::None,
                }
            }
            Action::ClosePicker => {
                self.model_picker = None;
                Command::None
            }

            Action::ShowInfo(text) => {
                self.notice = Some(Notice {
                    level: NoticeLevel::Info,
                    text,
                });
                Command::None
            }
            Action::ShowError(text) => {
                self.notice = Some(Notice {
                    level: NoticeLevel::Error,
                    text,
                });
                Command::None
            }
            Action::DismissNotice => {
                self.notice = None;
                Command::None
            }

            Action::Tick => {
                self.spinner_tick = self.spinner_tick.wrapping_add(1);
                Command::None
            }
            Action::Quit => {
                self.should_quit = true;
                Command::None
            }
        }
    }

    fn submit_input(&mut self) -> Command {
        if self.input.trim().is_empty() {
            return Command::None;
        }

        if let Some(command) = parse_slash_command(&self.input) {
            self.take_input();
            return self.run_slash_command(command);
        }

        // Keep the draft while a reply is outstanding.
        if !self.can_submit {
            return Command::None;
        }
        let text = self.take_input();
        self.notice = None;
        Command::Intent(UserIntent::SubmitText(text))
    }

    fn run_slash_command(&mut self, command: SlashCommand) -> Command {
        match command {
            SlashCommand::New => self.update(Action::NewChat),
            SlashCommand::Model(id) => match find_profile(&self.catalog, &id) {
                Some(profile) => {
                    let profile = profile.clone();
                    self.switch_to(profile)
                }
                None => self.update(Action::ShowError(format!(
                    "Unknown model: {id} (try /models)"
                ))),
            },
            SlashCommand::Models => Command::LoadModelRows,
            SlashCommand::Copy => Command::CopyLastReply,
            SlashCommand::Help => self.update(Action::ShowInfo(HELP_TEXT.to_string())),
            SlashCommand::Quit => self.update(Action::Quit),
            SlashCommand::Unknown(name) => {
                self.update(Action::ShowError(format!("Unknown command: {name}")))
            }
        }
    }

    fn switch_to(&mut self, profile: ModelProfile) -> Command {
        self.notice = None;
        Command::Intent(UserIntent::SwitchModel(profile))
    }

    fn next_model(&self) -> Option<ModelProfile> {
        if self.catalog.is_empty() {
            return None;
        }
        let next = self
            .catalog
            .iter()
            .position(|profile| profile.id == self.model.id)
            .map(|i| (i + 1) % self.catalog.len())
            .unwrap_or(0);
        Some(self.catalog[next].clone())
    }

    fn apply_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::SendAvailabilityChanged(enabled) => self.can_submit = enabled,
            SessionEvent::QuotaChanged {
                model_id,
                remaining,
                ..
            } if model_id == self.model.id => self.remaining = remaining,
            SessionEvent::ModelSwitched(profile) => self.model = profile,
            SessionEvent::Notice(err) => {
                self.notice = Some(Notice {
                    level: NoticeLevel::Error,
                    text: err.to_string().lines().collect::<Vec<_>>().join(" · "),
                });
            }
            _ => {}
        }
    }

    fn prev_boundary(&self) -> usize {
        self.input[..self.cursor_pos]
            .char_indices()
            .last()
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Take the input buffer, leaving it empty.
    pub fn take_input(&mut self) -> String {
        self.cursor_pos = 0;
        std::mem::take(&mut self.input)
    }

    // ── Rendering ────────────────────────────────────────────

    /// Splits the screen: title(1) | feed(fill) | notice(0/1) | status(1) | input(3).
    pub fn layout(&self, area: Rect) -> AppLayout {
        let notice_height = u16::from(self.notice.is_some());
        let chunks = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(0),
            Constraint::Length(notice_height),
            Constraint::Length(1),
            Constraint::Length(3),
        ])
        .split(area);
        AppLayout {
            title: chunks[0],
            feed: chunks[1],
            notice: chunks[2],
            status: chunks[3],
            input: chunks[4],
        }
    }

    /// Render the entire TUI into the given frame.
    pub fn render(&self, frame: &mut Frame<'_>, feed: &FeedView) {
        let layout = self.layout(frame.area());

        self.render_title(frame, layout.title);
        chat::render(frame, layout.feed, feed);
        self.render_notice(frame, layout.notice);
        status::render(self, frame, layout.status);
        self.render_input(frame, layout.input);

        if let Some(picker) = &self.model_picker {
            render_picker(frame, layout.feed, picker);
        }
    }

    fn render_title(&self, frame: &mut Frame<'_>, area: Rect) {
        let quota_color = THEME.quota(self.remaining, self.model.daily_limit);
        let title = Line::from(vec![
            Span::styled(
                " incognito ",
                Style::default()
                    .fg(THEME.brand)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                format!(" {} ", self.model.title),
                Style::default().fg(THEME.model_title),
            ),
            Span::styled(
                format!(" {}/{} left today ", self.remaining, self.model.daily_limit),
                Style::default().fg(quota_color),
            ),
        ]);
        frame.render_widget(Paragraph::new(title), area);
    }

    fn render_notice(&self, frame: &mut Frame<'_>, area: Rect) {
        let Some(notice) = &self.notice else {
            return;
        };
        let (marker, color) = match notice.level {
            NoticeLevel::Info => (" ℹ ", THEME.notice_info),
            NoticeLevel::Error => (" ✗ ", THEME.notice_error),
        };
        let line = Line::from(vec![
            Span::styled(marker, Style::default().fg(color).add_modifier(Modifier::BOLD)),
            Span::styled(notice.text.clone(), Style::default().fg(color)),
            Span::styled("  (Esc to dismiss)", Style::default().fg(THEME.text_dim)),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }

    fn render_input(&self, frame: &mut Frame<'_>, area: Rect) {
        let border_color = if self.can_submit {
            THEME.frame_focus
        } else {
            THEME.frame
        };

        let (display_text, input_style) = if self.input.is_empty() {
            let hint = if self.can_submit {
                "Type a message or /help..."
            } else {
                "Waiting for the reply..."
            };
            (hint, Style::default().fg(THEME.text_dim))
        } else {
            (self.input.as_str(), Style::default().fg(THEME.text))
        };

        let input = Paragraph::new(Span::styled(display_text, input_style)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(border_color))
                .title(" Message "),
        );
        frame.render_widget(input, area);

        if self.model_picker.is_none() {
            let cursor_col = self.input[..self.cursor_pos].width() as u16;
            frame.set_cursor_position((area.x + 1 + cursor_col, area.y + 1));
        }
    }
}

fn render_picker(frame: &mut Frame<'_>, area: Rect, picker: &ModelPicker) {
    let height = (picker.rows.len() as u16 + 2).min(area.height);
    let width = 60.min(area.width);
    let popup = Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    };

    let items: Vec<ListItem<'_>> = picker
        .rows
        .iter()
        .map(|row| {
            let marker = if row.active { "● " } else { "  " };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(THEME.brand)),
                Span::raw(row.title.clone()),
                Span::styled(
                    format!("  {}/{}", row.remaining, row.limit),
                    Style::default().fg(THEME.quota(row.remaining, row.limit)),
                ),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(THEME.picker_frame))
                .title(" Models "),
        )
        .highlight_style(
            Style::default()
                .fg(THEME.picker_row_fg)
                .bg(THEME.picker_row_bg),
        );
    let mut state = ListState::default().with_selected(Some(picker.cursor));

    frame.render_widget(Clear, popup);
    frame.render_stateful_widget(list, popup, &mut state);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::{SessionError, default_catalog};
    use ratatui::{Terminal, backend::TestBackend};

    fn make_app() -> TuiApp {
        let catalog = default_catalog();
        TuiApp::new(catalog[0].clone(), 150, catalog)
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(app: &mut TuiApp, text: &str) {
        for c in text.chars() {
            app.update(Action::InsertChar(c));
        }
    }

    fn rows(app: &TuiApp) -> Vec<ModelRow> {
        app.catalog
            .iter()
            .map(|p| ModelRow {
                id: p.id.clone(),
                title: p.title.clone(),
                remaining: p.daily_limit,
                limit: p.daily_limit,
                active: p.id == app.model.id,
            })
            .collect()
    }

    #[test]
    fn parse_slash_command_variants() {
        assert_eq!(parse_slash_command("hello"), None);
        assert_eq!(parse_slash_command("/new"), Some(SlashCommand::New));
        assert_eq!(parse_slash_command("/model"), Some(SlashCommand::Models));
        assert_eq!(
            parse_slash_command("/model  xai/grok-3-mini "),
            Some(SlashCommand::Model("xai/grok-3-mini".to_string()))
        );
        assert_eq!(parse_slash_command("/copy"), Some(SlashCommand::Copy));
        assert_eq!(parse_slash_command("/exit"), Some(SlashCommand::Quit));
        assert_eq!(
            parse_slash_command("/nope"),
            Some(SlashCommand::Unknown("/nope".to_string()))
        );
    }

    #[test]
    fn key_action_maps_editing_and_session_keys() {
        let app = make_app();
        assert!(matches!(app.key_action(ctrl('c')), Some(Action::Quit)));
        assert!(matches!(app.key_action(ctrl('n')), Some(Action::NewChat)));
        assert!(matches!(app.key_action(key(KeyCode::F(2))), Some(Action::NextModel)));
        assert!(matches!(
            app.key_action(key(KeyCode::Char('a'))),
            Some(Action::InsertChar('a'))
        ));
        assert!(matches!(app.key_action(key(KeyCode::End)), Some(Action::ScrollToBottom)));
        assert!(matches!(app.key_action(key(KeyCode::PageUp)), Some(Action::ScrollUp(9))));
    }

    #[test]
    fn key_action_routes_to_picker_when_open() {
        let mut app = make_app();
        let rows = rows(&app);
        app.update(Action::ShowModels(rows));
        assert!(matches!(app.key_action(key(KeyCode::Down)), Some(Action::PickerDown)));
        assert!(matches!(app.key_action(key(KeyCode::Esc)), Some(Action::ClosePicker)));
        assert!(app.key_action(key(KeyCode::Char('x'))).is_none());
    }

    #[test]
    fn editing_handles_multibyte_input() {
        let mut app = make_app();
        type_text(&mut app, "héllo");
        app.update(Action::MoveCursorLeft);
        app.update(Action::DeleteChar);
        assert_eq!(app.input, "hélo");
        app.update(Action::MoveCursorRight);
        assert_eq!(app.cursor_pos, app.input.len());
    }

    #[test]
    fn submit_text_yields_intent_and_clears_input() {
        let mut app = make_app();
        type_text(&mut app, "Hello world");
        match app.update(Action::SubmitInput) {
            Command::Intent(UserIntent::SubmitText(text)) => assert_eq!(text, "Hello world"),
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(app.input.is_empty());
        assert_eq!(app.cursor_pos, 0);
    }

    #[test]
    fn submit_is_ignored_for_blank_input() {
        let mut app = make_app();
        type_text(&mut app, "   ");
        assert!(matches!(app.update(Action::SubmitInput), Command::None));
    }

    #[test]
    fn submit_keeps_draft_while_reply_outstanding() {
        let mut app = make_app();
        app.update(Action::Session(SessionEvent::SendAvailabilityChanged(false)));
        type_text(&mut app, "next question");
        assert!(matches!(app.update(Action::SubmitInput), Command::None));
        assert_eq!(app.input, "next question");

        app.update(Action::Session(SessionEvent::SendAvailabilityChanged(true)));
        assert!(matches!(
            app.update(Action::SubmitInput),
            Command::Intent(UserIntent::SubmitText(_))
        ));
    }

    #[test]
    fn slash_model_switches_to_catalog_entry() {
        let mut app = make_app();
        type_text(&mut app, "/model xai/grok-3-mini");
        match app.update(Action::SubmitInput) {
            Command::Intent(UserIntent::SwitchModel(profile)) => {
                assert_eq!(profile.id, "xai/grok-3-mini")
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn slash_model_with_unknown_id_shows_error() {
        let mut app = make_app();
        type_text(&mut app, "/model nope");
        assert!(matches!(app.update(Action::SubmitInput), Command::None));
        let notice = app.notice.expect("notice shown");
        assert_eq!(notice.level, NoticeLevel::Error);
        assert!(notice.text.contains("nope"));
    }

    #[test]
    fn next_model_wraps_around_catalog() {
        let mut app = make_app();
        let last = app.catalog.last().cloned().expect("catalog");
        app.update(Action::Session(SessionEvent::ModelSwitched(last)));
        assert!(matches!(
            app.update(Action::NextModel),
            Command::Intent(UserIntent::SwitchModel(p)) if p.id == "openai/gpt-4o-mini"
        ));
    }

    #[test]
    fn picker_confirm_switches_to_selected_row() {
        let mut app = make_app();
        let rows = rows(&app);
        app.update(Action::ShowModels(rows));
        assert_eq!(app.model_picker.as_ref().map(|p| p.cursor), Some(0));
        app.update(Action::PickerDown);
        app.update(Action::PickerDown);
        let command = app.update(Action::PickerConfirm);
        assert!(app.model_picker.is_none());
        assert!(matches!(
            command,
            Command::Intent(UserIntent::SwitchModel(ref p)) if p.daily_limit == 50
        ));
    }

    #[test]
    fn picker_confirm_on_active_model_is_noop() {
        let mut app = make_app();
        let rows = rows(&app);
        app.update(Action::ShowModels(rows));
        assert!(matches!(app.update(Action::PickerConfirm), Command::None));
    }

    #[test]
    fn session_events_update_cached_status() {
        let mut app = make_app();
        app.update(Action::Session(SessionEvent::QuotaChanged {
            model_id: "openai/gpt-4o-mini".to_string(),
            remaining: 149,
            limit: 150,
        }));
        assert_eq!(app.remaining, 149);

        app.update(Action::Session(SessionEvent::QuotaChanged {
            model_id: "xai/grok-3-mini".to_string(),
            remaining: 3,
            limit: 30,
        }));
        assert_eq!(app.remaining, 149);

        app.update(Action::Session(SessionEvent::Notice(SessionError::ServerDecode {
            status: 500,
            raw_body: "oops".to_string(),
            cause: "expected value".to_string(),
        })));
        let notice = app.notice.clone().expect("notice");
        assert!(!notice.text.contains('\n'));
        assert!(notice.text.contains("Status code: 500"));

        app.update(Action::DismissNotice);
        assert!(app.notice.is_none());
    }

    #[test]
    fn connectivity_change_is_forwarded() {
        let mut app = make_app();
        let command = app.update(Action::ConnectivityChanged(false));
        assert!(!app.online);
        assert!(matches!(
            command,
            Command::Intent(UserIntent::ConnectivityChanged(false))
        ));
    }

    #[test]
    fn notice_row_shrinks_feed() {
        let mut app = make_app();
        let area = Rect::new(0, 0, 80, 24);
        let without = app.layout(area);
        app.update(Action::ShowInfo("copied".to_string()));
        let with = app.layout(area);
        assert_eq!(without.feed.height, with.feed.height + 1);
        assert_eq!(with.notice.height, 1);
    }

    #[test]
    fn render_full_screen_with_picker() {
        let mut app = make_app();
        let rows = rows(&app);
        app.update(Action::ShowModels(rows));
        let view = FeedView {
            rows: Vec::new(),
            offset: 0,
            show_affordance: false,
        };
        let mut terminal = Terminal::new(TestBackend::new(80, 24)).unwrap();
        terminal.draw(|frame| app.render(frame, &view)).unwrap();
        let content: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol().chars().next().unwrap_or(' '))
            .collect();
        assert!(content.contains("X Grok 3 Mini"));
        assert!(content.contains("150/150 left today"));
    }

    #[test]
    fn input_cursor_accounts_for_wide_characters() {
        let mut app = make_app();
        type_text(&mut app, "日本x");
        let mut terminal = Terminal::new(TestBackend::new(40, 3)).unwrap();

        terminal
            .draw(|frame| app.render_input(frame, frame.area()))
            .unwrap();
        let pos = terminal.get_cursor_position().unwrap();
        assert_eq!((pos.x, pos.y), (6, 1));

        app.update(Action::MoveCursorLeft);
        terminal
            .draw(|frame| app.render_input(frame, frame.area()))
            .unwrap();
        let pos = terminal.get_cursor_position().unwrap();
        assert_eq!((pos.x, pos.y), (5, 1));
    }
}
