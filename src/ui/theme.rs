//! Custom theme for cliclack prompts

use cliclack::ThemeState;
use console::Style;

/// Cachet's cliclack theme (blue accents)
#[derive(Debug, Clone, Default)]
pub struct CachetTheme;

impl CachetTheme {
    fn accent(state: &ThemeState) -> Style {
        match state {
            ThemeState::Active => Style::new().blue(),
            ThemeState::Error(_) => Style::new().red(),
            ThemeState::Cancel => Style::new().dim(),
            ThemeState::Submit => Style::new().blue().dim(),
        }
    }
}

impl cliclack::Theme for CachetTheme {
    fn bar_color(&self, state: &ThemeState) -> Style {
        Self::accent(state)
    }

    fn state_symbol_color(&self, state: &ThemeState) -> Style {
        match state {
            ThemeState::Submit => Style::new().green(),
            other => Self::accent(other),
        }
    }
}

/// Initialize the global theme
pub fn init_theme() {
    cliclack::set_theme(CachetTheme);
}
