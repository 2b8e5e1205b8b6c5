//! Color themes.
//!
//! A `Theme` holds named `ratatui::style::Color` fields covering every surface the
//! review UI renders. Two built-in themes are provided:
//!
//! - `dark` uses ANSI 16 colors so it works on any terminal, including 256-color SSH
//!   sessions with no truecolor support.
//! - `catppuccin_mocha` uses the Catppuccin Mocha palette in RGB and needs truecolor.

use ratatui::style::Color;

/// All color values used across the UI.
#[derive(Debug, Clone)]
pub struct Theme {
    // Panel borders
    /// Border color for the currently focused panel.
    pub border_active: Color,
    /// Border color for unfocused panels.
    pub border_inactive: Color,

    // Document view
    /// Gutter line numbers.
    pub gutter: Color,
    /// Background of the focus line.
    pub focus_line_bg: Color,
    /// Plain G-code text.
    pub code_text: Color,
    /// Text after `;`.
    pub code_comment: Color,

    // Line badges
    pub badge_issue: Color,
    pub badge_patch: Color,
    pub badge_applied: Color,
    pub badge_modified: Color,

    // Word diff in the detail panel
    pub diff_added: Color,
    pub diff_removed: Color,
    pub diff_context: Color,

    // Issue severity badges
    pub badge_critical: Color,
    pub badge_major: Color,
    pub badge_minor: Color,
    pub badge_info: Color,

    // Status bar
    pub status_bar_bg: Color,
    pub status_bar_fg: Color,
    /// Mode indicator color in NORMAL mode.
    pub status_mode_normal: Color,
    /// Mode indicator color in INSERT mode.
    pub status_mode_insert: Color,
    /// Mode indicator color while a confirmation prompt is open.
    pub status_mode_prompt: Color,

    /// Application background (used for clearing areas).
    pub background: Color,
}

impl Theme {
    /// Built-in dark theme using ANSI 16 colors.
    pub fn dark() -> Self {
        Self {
            border_active: Color::Cyan,
            border_inactive: Color::DarkGray,

            gutter: Color::DarkGray,
            focus_line_bg: Color::Indexed(236),
            code_text: Color::Reset,
            code_comment: Color::DarkGray,

            badge_issue: Color::Red,
            badge_patch: Color::Yellow,
            badge_applied: Color::Green,
            badge_modified: Color::Magenta,

            diff_added: Color::Green,
            diff_removed: Color::Red,
            diff_context: Color::Reset,

            badge_critical: Color::Red,
            badge_major: Color::Yellow,
            badge_minor: Color::Blue,
            badge_info: Color::DarkGray,

            status_bar_bg: Color::DarkGray,
            status_bar_fg: Color::White,
            status_mode_normal: Color::Cyan,
            status_mode_insert: Color::Green,
            status_mode_prompt: Color::Yellow,

            background: Color::Reset,
        }
    }

    /// Catppuccin Mocha theme using RGB truecolor values.
    ///
    /// Palette source: <https://github.com/catppuccin/catppuccin> Mocha variant.
    pub fn catppuccin_mocha() -> Self {
        let green = Color::Rgb(166, 227, 161); // #a6e3a1
        let red = Color::Rgb(243, 139, 168); // #f38ba8
        let yellow = Color::Rgb(249, 226, 175); // #f9e2af
        let blue = Color::Rgb(137, 180, 250); // #89b4fa
        let mauve = Color::Rgb(203, 166, 247); // #cba6f7
        let lavender = Color::Rgb(180, 190, 254); // #b4befe
        let overlay1 = Color::Rgb(127, 132, 156); // #7f849c
        let surface0 = Color::Rgb(49, 50, 68); // #313244
        let surface1 = Color::Rgb(69, 71, 90); // #45475a
        let base = Color::Rgb(30, 30, 46); // #1e1e2e
        let text = Color::Rgb(205, 214, 244); // #cdd6f4
        let peach = Color::Rgb(250, 179, 135); // #fab387

        Self {
            border_active: lavender,
            border_inactive: overlay1,

            gutter: overlay1,
            focus_line_bg: surface0,
            code_text: text,
            code_comment: overlay1,

            badge_issue: red,
            badge_patch: yellow,
            badge_applied: green,
            badge_modified: mauve,

            diff_added: green,
            diff_removed: red,
            diff_context: text,

            badge_critical: red,
            badge_major: peach,
            badge_minor: blue,
            badge_info: overlay1,

            status_bar_bg: surface1,
            status_bar_fg: text,
            status_mode_normal: lavender,
            status_mode_insert: green,
            status_mode_prompt: peach,

            background: base,
        }
    }

    /// Resolves a theme name from config. Unknown names fall back to `dark()`.
    pub fn from_name(name: &str) -> Self {
        match name {
            "catppuccin-mocha" | "catppuccin_mocha" => Self::catppuccin_mocha(),
            "dark" => Self::dark(),
            other => {
                tracing::warn!(theme = other, "unknown theme, falling back to 'dark'");
                Self::dark()
            }
        }
    }
}
