use std::{
    fmt::Display,
    sync::{LazyLock, PoisonError, RwLock},
};

use nu_ansi_term::Color;
use serde::Serialize;

use crate::error::{CliError, CliResult};

pub static COLOR: LazyLock<RwLock<bool>> = LazyLock::new(|| RwLock::new(true));

pub fn set_color(enabled: bool) {
    *COLOR.write().unwrap_or_else(PoisonError::into_inner) = enabled;
}

pub struct Colored<T: Display>(pub Color, pub T);

impl<T: Display> Display for Colored<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let color = COLOR.read().unwrap_or_else(PoisonError::into_inner);
        if *color {
            write!(f, "{}", self.0.prefix())?;
            self.1.fmt(f)?;
            write!(f, "{}", self.0.suffix())
        } else {
            self.1.fmt(f)
        }
    }
}

/// Prints `value` as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) -> CliResult<()> {
    let json = serde_json::to_string_pretty(value).map_err(CliError::Json)?;
    println!("{json}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use nu_ansi_term::Color::Green;
    use serial_test::serial;

    use super::*;

    #[test]
    #[serial]
    fn test_colored_without_color() {
        set_color(false);
        assert_eq!(Colored(Green, "ok").to_string(), "ok");
        set_color(true);
        assert_eq!(Colored(Green, "ok").to_string(), Green.paint("ok").to_string());
    }
}
