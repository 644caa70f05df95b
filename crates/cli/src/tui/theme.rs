//! Color tokens for the chat screen, drawn from ratatui's Tailwind palette.

use ratatui::style::Color;
use ratatui::style::palette::tailwind;

/// Every color the chat screen paints with.
pub struct Theme {
    /// Message bodies and typed input.
    pub text: Color,
    /// Placeholders, hints, and secondary figures.
    pub text_dim: Color,
    /// Panel borders while sending is blocked.
    pub frame: Color,
    /// Input border while a message can be sent.
    pub frame_focus: Color,
    /// App name and picker markers.
    pub brand: Color,

    pub online: Color,
    pub offline: Color,

    // Quota readout, by how much of today's allowance is left.
    pub quota_ok: Color,
    pub quota_low: Color,
    pub quota_spent: Color,

    pub notice_info: Color,
    pub notice_error: Color,

    /// "You:" label.
    pub you_label: Color,
    /// "AI:" label.
    pub ai_label: Color,
    /// "New messages" marker shown while the reader is scrolled up.
    pub new_below: Color,

    pub model_title: Color,
    pub spinner: Color,
    pub hint: Color,

    pub picker_frame: Color,
    pub picker_row_fg: Color,
    pub picker_row_bg: Color,
}

impl Theme {
    pub const fn violet_night() -> Self {
        Self {
            text: tailwind::ZINC.c100,
            text_dim: tailwind::ZINC.c500,
            frame: tailwind::ZINC.c700,
            frame_focus: tailwind::VIOLET.c400,
            brand: tailwind::VIOLET.c400,

            online: tailwind::EMERALD.c500,
            offline: tailwind::ROSE.c500,

            quota_ok: tailwind::ZINC.c400,
            quota_low: tailwind::AMBER.c500,
            quota_spent: tailwind::ROSE.c500,

            notice_info: tailwind::SKY.c400,
            notice_error: tailwind::ROSE.c400,

            you_label: tailwind::CYAN.c400,
            ai_label: tailwind::FUCHSIA.c400,
            new_below: tailwind::AMBER.c400,

            model_title: tailwind::SKY.c400,
            spinner: tailwind::AMBER.c400,
            hint: tailwind::ZINC.c500,

            picker_frame: tailwind::VIOLET.c500,
            picker_row_fg: tailwind::ZINC.c50,
            picker_row_bg: tailwind::VIOLET.c800,
        }
    }

    /// Quota color: spent at zero, low at a tenth of the limit or less.
    pub const fn quota(&self, remaining: u32, limit: u32) -> Color {
        if remaining == 0 {
            self.quota_spent
        } else if remaining.saturating_mul(10) <= limit {
            self.quota_low
        } else {
            self.quota_ok
        }
    }
}

pub const THEME: Theme = Theme::violet_night();
