//! Terminal setup and teardown for the TUI.

use anyhow::Result;
use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io::{self, Stdout};

/// Terminal type used across the app.
pub type Tui = Terminal<CrosstermBackend<Stdout>>;

/// Enter the alternate screen in raw mode.
pub fn init_terminal() -> Result<Tui> {
    install_panic_hook();
    // Raw mode so keys arrive one by one.
    enable_raw_mode()?;
    // Draw on the alternate screen so the shell is untouched on exit.
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    // Terminal over the crossterm backend.
    let backend = CrosstermBackend::new(stdout);
    Ok(Terminal::new(backend)?)
}

/// Put the terminal back the way we found it.
pub fn restore_terminal() -> Result<()> {
    // Back to line mode.
    disable_raw_mode()?;
    // Leave the alternate screen.
    execute!(io::stdout(), LeaveAlternateScreen)?;
    Ok(())
}

/// A panic inside the draw loop would otherwise leave the shell in raw mode.
fn install_panic_hook() {
    let previous = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        // Restore first so the panic message is readable.
        let _ = restore_terminal();
        tracing::error!("panic: {info}");
        previous(info);
    }));
}
