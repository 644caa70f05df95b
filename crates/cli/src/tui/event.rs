//! Async event loop for the TUI: interleaves crossterm input, exchange
//! completions, reachability changes, and the reveal/spinner timers.

use std::time::Duration;

use crossterm::{
    event::{
        DisableMouseCapture, EnableMouseCapture, Event, EventStream, KeyEventKind, MouseEventKind,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use futures_util::StreamExt;
use proto::{Generation, RequestOutcome};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use session::{Completion, SessionController};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::action::{Action, Command, ModelRow};
use super::app::TuiApp;
use super::chat::{self, FeedView};

const SPINNER_INTERVAL: Duration = Duration::from_millis(100);
const MOUSE_SCROLL_ROWS: u16 = 3;

/// RAII guard that restores the terminal on drop (even on panic).
struct TerminalGuard;

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(std::io::stdout(), LeaveAlternateScreen, DisableMouseCapture);
    }
}

/// The exchange currently on the wire.
struct InFlight {
    task: JoinHandle<Completion>,
    meta: ExchangeMeta,
}

/// Identity of an exchange, kept outside its task.
struct ExchangeMeta {
    generation: Generation,
    model_id: String,
    utterance: String,
}

impl ExchangeMeta {
    /// Completion reported when the task died before producing one.
    fn failed(self, description: String) -> Completion {
        Completion {
            generation: self.generation,
            model_id: self.model_id,
            utterance: self.utterance,
            outcome: RequestOutcome::NetworkError { description },
        }
    }
}

/// Run the full-screen TUI until the user quits.
pub async fn run_tui(
    mut controller: SessionController,
    mut connectivity: Option<watch::Receiver<bool>>,
) -> anyhow::Result<()> {
    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = std::io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let _guard = TerminalGuard; // Drop restores terminal

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let (observer, mut session_rx) = controller.subscribe();
    let mut app = TuiApp::new(
        controller.active_model().clone(),
        controller.remaining(),
        controller.catalog().to_vec(),
    );
    app.can_submit = controller.can_submit();
    app.online = controller.is_online();
    debug!(model = %app.model.id, "TUI started");

    let mut crossterm_stream = EventStream::new();
    let mut in_flight: Option<InFlight> = None;

    let mut spinner_interval = tokio::time::interval(SPINNER_INTERVAL);
    spinner_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut reveal_interval = tokio::time::interval(controller.reveal_interval());
    reveal_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        while let Ok(event) = session_rx.try_recv() {
            app.update(Action::Session(event));
        }

        // Lay the feed out before drawing so the follower sees this frame's rows.
        let size = terminal.size()?;
        let layout = app.layout(Rect::new(0, 0, size.width, size.height));
        let inner = chat::inner(layout.feed);
        let rows = chat::build_rows(controller.timeline().messages(), inner.width);
        controller.surface_layout(rows.len() as f64, f64::from(inner.height));
        app.page_rows = inner.height;
        let view = FeedView {
            rows,
            offset: controller.feed().offset().round() as u16,
            show_affordance: controller.feed().new_content_affordance_visible(),
        };

        terminal.draw(|frame| app.render(frame, &view))?;

        let command = tokio::select! {
            maybe_event = crossterm_stream.next() => match maybe_event {
                Some(Ok(Event::Key(key))) if key.kind == KeyEventKind::Press => {
                    match app.key_action(key) {
                        Some(action) => app.update(action),
                        None => Command::None,
                    }
                }
                Some(Ok(Event::Mouse(mouse))) => match mouse.kind {
                    MouseEventKind::ScrollUp => app.update(Action::ScrollUp(MOUSE_SCROLL_ROWS)),
                    MouseEventKind::ScrollDown => app.update(Action::ScrollDown(MOUSE_SCROLL_ROWS)),
                    _ => Command::None,
                },
                // Resizes are picked up by the next layout pass.
                Some(Ok(_)) => Command::None,
                Some(Err(e)) => {
                    warn!(error = %e, "Terminal event stream error");
                    Command::None
                }
                None => app.update(Action::Quit),
            },

            result = async {
                match in_flight.as_mut() {
                    Some(flight) => (&mut flight.task).await,
                    None => std::future::pending().await,
                }
            } => {
                let Some(flight) = in_flight.take() else {
                    continue;
                };
                let completion = match result {
                    Ok(completion) => completion,
                    Err(join_err) => {
                        warn!(error = %join_err, "Exchange task failed");
                        flight.meta.failed(format!("Request task failed: {join_err}"))
                    }
                };
                controller.complete(completion);
                Command::None
            }

            Ok(()) = async {
                match connectivity.as_mut() {
                    Some(rx) => rx.changed().await,
                    None => std::future::pending().await,
                }
            } => {
                let online = connectivity.as_ref().map(|rx| *rx.borrow()).unwrap_or(true);
                app.update(Action::ConnectivityChanged(online))
            }

            _ = reveal_interval.tick(), if controller.is_revealing() => {
                controller.tick_reveal();
                Command::None
            }

            _ = spinner_interval.tick(), if controller.is_in_flight() => {
                app.update(Action::Tick)
            }
        };

        execute_command(command, &mut controller, &mut app, &mut in_flight);

        if app.should_quit {
            break;
        }
    }

    if let Some(flight) = in_flight.take() {
        flight.task.abort();
    }
    controller.unsubscribe(observer);

    // TerminalGuard::drop handles cleanup
    Ok(())
}

/// Runs a command returned by `TuiApp::update()` against the controller.
fn execute_command(
    command: Command,
    controller: &mut SessionController,
    app: &mut TuiApp,
    in_flight: &mut Option<InFlight>,
) {
    match command {
        Command::None => {}
        Command::Intent(intent) => {
            if let Some(exchange) = controller.handle(intent) {
                debug!(exchange = ?exchange, "Spawning exchange");
                let meta = ExchangeMeta {
                    generation: exchange.generation,
                    model_id: exchange.model_id.clone(),
                    utterance: exchange.utterance.clone(),
                };
                *in_flight = Some(InFlight {
                    task: tokio::spawn(exchange.run()),
                    meta,
                });
            }
        }
        Command::ScrollBy(delta) => controller.scroll_by(delta),
        Command::LoadModelRows => {
            let rows = model_rows(controller);
            app.update(Action::ShowModels(rows));
        }
        Command::CopyLastReply => {
            let reply = controller
                .timeline()
                .last_assistant()
                .map(|message| message.content.clone())
                .filter(|content| !content.is_empty());
            let action = match reply {
                Some(text) => match copy_to_clipboard(&text) {
                    Ok(()) => Action::ShowInfo("Copied the latest reply".to_string()),
                    Err(e) => Action::ShowError(format!("Clipboard unavailable: {e}")),
                },
                None => Action::ShowInfo("Nothing to copy yet".to_string()),
            };
            app.update(action);
        }
    }
}

/// Picker rows with today's remaining quota per model.
fn model_rows(controller: &SessionController) -> Vec<ModelRow> {
    let active = &controller.active_model().id;
    controller
        .catalog()
        .iter()
        .map(|profile| ModelRow {
            id: profile.id.clone(),
            title: profile.title.clone(),
            remaining: controller.ledger().remaining(profile),
            limit: profile.daily_limit,
            active: &profile.id == active,
        })
        .collect()
}

/// Copies `text` to the system clipboard.
fn copy_to_clipboard(text: &str) -> Result<(), arboard::Error> {
    let mut clipboard = arboard::Clipboard::new()?;
    clipboard.set_text(text.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use proto::UserIntent;
    use session::{ChatRequest, CompletionProvider, MemoryStore, SessionConfiguration};

    struct EchoProvider;

    #[async_trait]
    impl CompletionProvider for EchoProvider {
        async fn send(&self, request: ChatRequest) -> RequestOutcome {
            let last = request
                .messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default();
            RequestOutcome::Success {
                content: format!("echo {last}"),
            }
        }
    }

    fn controller() -> SessionController {
        SessionController::new(
            SessionConfiguration::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(EchoProvider),
        )
    }

    fn make_app(controller: &SessionController) -> TuiApp {
        TuiApp::new(
            controller.active_model().clone(),
            controller.remaining(),
            controller.catalog().to_vec(),
        )
    }

    #[test]
    fn terminal_guard_drop_path_is_safe() {
        let guard = TerminalGuard;
        drop(guard);
    }

    #[tokio::test]
    async fn submit_intent_spawns_exchange_that_completes() {
        let mut controller = controller();
        let mut app = make_app(&controller);
        let mut in_flight = None;

        execute_command(
            Command::Intent(UserIntent::SubmitText("hi".to_string())),
            &mut controller,
            &mut app,
            &mut in_flight,
        );
        let flight = in_flight.take().expect("exchange spawned");
        assert!(controller.is_in_flight());

        let completion = flight.task.await.expect("task joined");
        controller.complete(completion);
        while controller.tick_reveal().is_some() {}

        assert_eq!(
            controller
                .timeline()
                .last_assistant()
                .map(|m| m.content.as_str()),
            Some("echo hi")
        );
        assert_eq!(controller.remaining(), 149);
    }

    #[test]
    fn failed_task_becomes_network_error() {
        let meta = ExchangeMeta {
            generation: Generation(2),
            model_id: "openai/gpt-4o-mini".to_string(),
            utterance: "hi".to_string(),
        };
        let completion = meta.failed("boom".to_string());
        assert_eq!(completion.generation, Generation(2));
        assert_eq!(completion.utterance, "hi");
        assert!(matches!(
            completion.outcome,
            RequestOutcome::NetworkError { ref description } if description == "boom"
        ));
    }

    #[test]
    fn model_rows_mark_active_profile() {
        let controller = controller();
        let rows = model_rows(&controller);
        assert_eq!(rows.len(), controller.catalog().len());
        assert_eq!(rows.iter().filter(|row| row.active).count(), 1);
        assert!(rows[0].active);
        assert_eq!(rows[0].remaining, 150);
    }

    #[test]
    fn model_switch_leaves_scrolled_up_reader_in_place() {
        let mut controller = controller();
        let mut app = make_app(&controller);
        let mut in_flight = None;

        controller.surface_layout(40.0, 10.0);
        assert_eq!(controller.feed().offset(), 30.0);
        controller.scroll_by(-12.0);
        assert_eq!(controller.feed().offset(), 18.0);

        let command = app.update(Action::NextModel);
        execute_command(command, &mut controller, &mut app, &mut in_flight);
        controller.surface_layout(40.0, 10.0);

        assert_eq!(controller.active_model().id, "openai/gpt-4.1-mini");
        assert_eq!(controller.feed().offset(), 18.0);
        assert!(controller.feed().new_content_affordance_visible());
        assert!(in_flight.is_none());
    }

    #[test]
    fn load_model_rows_opens_picker() {
        let mut controller = controller();
        let mut app = make_app(&controller);
        let mut in_flight = None;
        execute_command(Command::LoadModelRows, &mut controller, &mut app, &mut in_flight);
        assert!(app.model_picker.is_some());
    }
}
