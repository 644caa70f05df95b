//! Status bar widget: reachability, request state, key hints, and version.

use super::app::TuiApp;
use super::theme::THEME;
use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
};

/// Braille-pattern spinner frames for the status bar animation.
const SPINNER: &[char] = &['⣾', '⣽', '⣻', '⢿', '⡿', '⣟', '⣯', '⣷'];

const IDLE_HINTS: &str = "  Enter:send  Ctrl+N:new  F2:model  PgUp/PgDn:scroll  End:bottom  Ctrl+C:quit";
const PICKER_HINTS: &str = "  ↑↓:select  Enter:switch  Esc:close";

/// Renders the status bar.
pub fn render(app: &TuiApp, frame: &mut Frame<'_>, area: Rect) {
    let mut spans = vec![if app.online {
        Span::styled(" ● online ", Style::default().fg(THEME.online))
    } else {
        Span::styled(" ○ offline ", Style::default().fg(THEME.offline))
    }];

    if !app.can_submit {
        let spinner = SPINNER[(app.spinner_tick as usize) % SPINNER.len()];
        spans.push(Span::styled(
            format!(" {spinner} Waiting for {}... ", app.model.title),
            Style::default().fg(THEME.spinner),
        ));
    } else if app.model_picker.is_some() {
        spans.push(Span::styled(PICKER_HINTS, Style::default().fg(THEME.hint)));
    } else {
        spans.push(Span::styled(IDLE_HINTS, Style::default().fg(THEME.hint)));
    }

    let chunks = Layout::horizontal([Constraint::Min(0), Constraint::Length(10)]).split(area);
    frame.render_widget(Paragraph::new(Line::from(spans)), chunks[0]);

    let version_text = Line::from(Span::styled(
        format!("{}  ", app.version),
        Style::default().fg(THEME.model_title),
    ));
    frame.render_widget(Paragraph::new(version_text).right_aligned(), chunks[1]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proto::default_catalog;
    use ratatui::{Terminal, backend::TestBackend};

    fn make_app() -> TuiApp {
        let catalog = default_catalog();
        TuiApp::new(catalog[0].clone(), 150, catalog)
    }

    fn render_status(app: &TuiApp) -> String {
        let backend = TestBackend::new(120, 1);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|frame| {
                render(app, frame, frame.area());
            })
            .unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    #[test]
    fn idle_status_shows_online_and_hints() {
        let app = make_app();
        let content = render_status(&app);
        assert!(content.contains("online"));
        assert!(content.contains("Enter:send"));
    }

    #[test]
    fn offline_status_is_flagged() {
        let mut app = make_app();
        app.online = false;
        assert!(render_status(&app).contains("offline"));
    }

    #[test]
    fn waiting_status_shows_spinner_and_model() {
        let mut app = make_app();
        app.can_submit = false;
        for tick in [0u8, 7, 8, 255] {
            app.spinner_tick = tick;
            let content = render_status(&app);
            assert!(content.contains("Waiting for OpenAI GPT-4o-mini"));
        }
    }

    #[test]
    fn render_shows_version() {
        let mut app = make_app();
        app.version = "1.2.3".to_string();
        assert!(render_status(&app).contains("1.2.3"));
    }

    #[test]
    fn spinner_constant_has_eight_frames() {
        assert_eq!(SPINNER.len(), 8);
    }
}
