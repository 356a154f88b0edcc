//! Style roles for terminal output, mapped to `colored::Color`.
//!
//! Colouring only happens when the `enabled` flag passed to `paint()` is
//! true, so there is no global colour state.
//!
//! ```
//! use reposcan::core::styles::StyleRole;
//! assert_eq!(StyleRole::Warning.paint("careful", false), "careful");
//! assert!(StyleRole::Warning.paint("careful", true).starts_with("\x1b[33m"));
//! ```

use clap::builder::styling::AnsiColor;
use colored::Color;

use crate::scanner::events::MessageLevel;

macro_rules! style {
    ( $( $variant:ident => $color:expr ),+ $(,)? ) => {
        #[derive(Copy, Clone, Debug, PartialEq, Eq)]
        pub enum StyleRole { $( $variant ),+ }

        impl StyleRole {
            pub fn color(self) -> Option<Color> {
                match self { $( StyleRole::$variant => $color ),+ }
            }
        }
    }
}

style! {
    Header  => Some(Color::Yellow),
    Literal => Some(Color::Cyan),
    Info    => Some(Color::Blue),
    Warning => Some(Color::Yellow),
    Success => Some(Color::Green),
    Error   => Some(Color::BrightRed),
    Key     => Some(Color::BrightGreen),
    Value   => None,
    Dim     => Some(Color::BrightBlack),
}

impl StyleRole {
    pub fn ansi_code(self) -> Option<&'static str> {
        map_color_code(self.color()?)
    }

    pub fn paint(self, text: &str, enabled: bool) -> String {
        match self.ansi_code() {
            Some(code) if enabled => format!("\x1b[{}m{}\x1b[0m", code, text),
            _ => text.to_string(),
        }
    }

    /// prettytable style spec (`"Fg"` etc.) for this role
    pub fn to_prettytable_spec(self) -> Option<&'static str> {
        Some(match self.color()? {
            Color::Red => "Fr",
            Color::Green => "Fg",
            Color::Yellow => "Fy",
            Color::Blue => "Fb",
            Color::Cyan => "Fc",
            Color::BrightBlack => "FK",
            Color::BrightRed => "FR",
            Color::BrightGreen => "FG",
            _ => return None,
        })
    }
}

impl From<MessageLevel> for StyleRole {
    fn from(level: MessageLevel) -> Self {
        match level {
            MessageLevel::Info => StyleRole::Info,
            MessageLevel::Warning => StyleRole::Warning,
            MessageLevel::Success => StyleRole::Success,
            MessageLevel::Error => StyleRole::Error,
        }
    }
}

fn map_color_code(c: Color) -> Option<&'static str> {
    use Color::*;
    Some(match c {
        Red => "31",
        Green => "32",
        Yellow => "33",
        Blue => "34",
        Cyan => "36",
        BrightBlack => "90",
        BrightRed => "91",
        BrightGreen => "92",
        _ => return None,
    })
}

fn color_to_ansi(c: Color) -> Option<AnsiColor> {
    use self::AnsiColor as A;
    use Color::*;
    Some(match c {
        Red => A::Red,
        Green => A::Green,
        Yellow => A::Yellow,
        Blue => A::Blue,
        Cyan => A::Cyan,
        BrightBlack => A::BrightBlack,
        BrightRed => A::BrightRed,
        BrightGreen => A::BrightGreen,
        _ => return None,
    })
}

/// clap help styles built from the same roles
pub fn palette_to_clap(enabled: bool) -> clap::builder::Styles {
    use clap::builder::styling::{Color as ClapColor, Style};
    if !enabled {
        return clap::builder::Styles::plain();
    }

    let style = |role: StyleRole, bold: bool| {
        let mut s = Style::new();
        if let Some(col) = role.color().and_then(color_to_ansi) {
            s = s.fg_color(Some(ClapColor::Ansi(col)));
        }
        if bold {
            s = s.bold();
        }
        s
    };

    clap::builder::Styles::styled()
        .header(style(StyleRole::Header, true))
        .usage(style(StyleRole::Header, true))
        .literal(style(StyleRole::Literal, false))
        .placeholder(style(StyleRole::Success, false))
        .error(style(StyleRole::Error, false))
}
