//! CLI styles for clap.

use clap::builder::styling::{AnsiColor, Color, Style, Styles};

//--------------------------------------------------------------------------------------------------
// Macros
//--------------------------------------------------------------------------------------------------

/// Build an `Examples:` help section from `"command" # "description"` pairs.
#[macro_export]
macro_rules! examples {
    ($($cmd:literal # $desc:literal),* $(,)?) => {
        concat!(
            "\x1b[1;33mExamples:\x1b[0m\n",
            $("  \x1b[36m", $cmd, "\x1b[0m  \x1b[2m# ", $desc, "\x1b[0m\n",)*
        )
    };
}

//--------------------------------------------------------------------------------------------------
// Functions
//--------------------------------------------------------------------------------------------------

/// Help colors: yellow headers, green usage, cyan literals, red errors.
pub fn styles() -> Styles {
    Styles::styled()
        .header(bold(AnsiColor::Yellow))
        .usage(bold(AnsiColor::Green))
        .literal(plain(AnsiColor::Cyan))
        .placeholder(plain(AnsiColor::Cyan))
        .error(bold(AnsiColor::Red))
        .invalid(bold(AnsiColor::Red))
        .valid(bold(AnsiColor::Green))
}

fn bold(color: AnsiColor) -> Style {
    plain(color).bold()
}

fn plain(color: AnsiColor) -> Style {
    Style::new().fg_color(Some(Color::Ansi(color)))
}
