//! Elm Architecture (TEA) action and command types for the TUI.
//!
//! All view-state mutations flow through [`Action`], and side effects on the
//! session are expressed as [`Command`] values returned from
//! `TuiApp::update()`.

use proto::{SessionEvent, UserIntent};

// ─── Action ──────────────────────────────────────────────────────────────────

/// Every possible view-state mutation. `TuiApp::update()` is the only place
/// where `Action` variants are matched and applied.
#[derive(Debug, Clone)]
pub enum Action {
    // ── Input ────────────────────────────────────────────────
    /// Insert a character at the current cursor position.
    InsertChar(char),
    /// Delete the character before the cursor.
    DeleteChar,
    /// Move the input cursor one character to the left.
    MoveCursorLeft,
    /// Move the input cursor one character to the right.
    MoveCursorRight,
    /// Submit the current input (text or slash command).
    SubmitInput,

    // ── Navigation ───────────────────────────────────────────
    /// Scroll the feed up by `n` rows.
    ScrollUp(u16),
    /// Scroll the feed down by `n` rows.
    ScrollDown(u16),
    /// Jump to the bottom of the feed.
    ScrollToBottom,

    // ── Session ──────────────────────────────────────────────
    /// Start a new chat.
    NewChat,
    /// Switch to the next model in the catalog.
    NextModel,
    /// Ask the event loop for picker rows.
    OpenModelPicker,
    /// Open the picker with the given rows.
    ShowModels(Vec<ModelRow>),
    /// Reachability changed.
    ConnectivityChanged(bool),
    /// Apply an event emitted by the session controller.
    Session(SessionEvent),

    // ── Model picker ─────────────────────────────────────────
    PickerUp,
    PickerDown,
    PickerConfirm,
    ClosePicker,

    // ── Notices ──────────────────────────────────────────────
    /// Show an informational notice.
    ShowInfo(String),
    /// Show an error notice.
    ShowError(String),
    /// Dismiss the current notice.
    DismissNotice,

    // ── Misc ─────────────────────────────────────────────────
    /// Advance the spinner.
    Tick,
    /// Leave the TUI.
    Quit,
}

/// One row of the model picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRow {
    pub id: String,
    pub title: String,
    pub remaining: u32,
    pub limit: u32,
    pub active: bool,
}

// ─── Command ─────────────────────────────────────────────────────────────────

/// Side effects returned by `TuiApp::update()`. The event loop executes them
/// against the session controller.
#[derive(Debug)]
pub enum Command {
    /// No side effect.
    None,
    /// Hand an intent to the session controller.
    Intent(UserIntent),
    /// Scroll the feed by a relative number of rows.
    ScrollBy(f64),
    /// Build picker rows from the quota ledger.
    LoadModelRows,
    /// Copy the latest assistant reply to the system clipboard.
    CopyLastReply,
}
