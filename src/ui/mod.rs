//! User interface module - interaction (prompts) and formatting.
//!
//! Separates concerns:
//! - `formatter` - Pure formatting functions
//! - This module - Interactive prompts and user input handling

use anyhow::Result;
use console::Term;

pub mod formatter;

// Re-export formatter functions for convenience
pub use formatter::{
    display_error, display_outcome, display_plan, display_status, display_success,
    format_outcome,
};

/// Prompts user to confirm an action with a yes/no prompt.
///
/// Accepts "y" or "yes" (case-insensitive). Default is "no" if user presses Enter.
/// When stdout is not a terminal, as on a CI runner, nobody can answer and the action
/// is confirmed without prompting.
pub fn confirm_action(prompt: &str) -> Result<bool> {
    let term = Term::stdout();
    if !term.is_term() {
        return Ok(true);
    }

    term.write_str(&format!("\n{} (y/N): ", prompt))?;
    let response = term.read_line()?.trim().to_lowercase();
    Ok(is_yes(&response))
}

fn is_yes(response: &str) -> bool {
    response == "y" || response == "yes"
}
