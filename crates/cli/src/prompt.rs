//! Interactive prompts
//!
//! Stdin is read on a blocking task raced against Ctrl-C, so an interrupt at
//! any prompt ends the run cleanly. The reader may still be parked in
//! `read_line` afterwards; `main` shuts the runtime down without waiting on it.

use anyhow::{Context, Result};
use colored::Colorize;
use sweep_lib::{SelectionEngine, SelectionResult, SelectionSet};

use crate::output::Console;

/// What came back from one prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Line(String),
    /// Ctrl-C or end of input
    Interrupted,
}

/// Print `prompt` and wait for one line
pub async fn read_line(console: Console, prompt: &str) -> Result<Reply> {
    console
        .prompt(&prompt.yellow().to_string())
        .context("Failed to write prompt")?;

    let reader = tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        std::io::stdin().read_line(&mut line).map(|read| (read, line))
    });

    tokio::select! {
        joined = reader => {
            let (read, line) = joined
                .context("Stdin reader task failed")?
                .context("Failed to read from stdin")?;
            if read == 0 {
                console.line("");
                Ok(Reply::Interrupted)
            } else {
                Ok(Reply::Line(line.trim_end_matches(['\r', '\n']).to_string()))
            }
        }
        _ = tokio::signal::ctrl_c() => {
            console.line("");
            Ok(Reply::Interrupted)
        }
    }
}

/// Ask a y/n question; anything but `y`/`yes` is no. `None` when interrupted.
pub async fn confirm(console: Console, question: &str) -> Result<Option<bool>> {
    match read_line(console, &format!("\n{} (y/n): ", question)).await? {
        Reply::Line(answer) => Ok(Some(parse_yes(&answer))),
        Reply::Interrupted => Ok(None),
    }
}

/// Ask until the operator gives a usable selection; `None` when cancelled
pub async fn select(console: Console, engine: &SelectionEngine<'_>) -> Result<Option<SelectionSet>> {
    console.line("");
    console.line("Enter numbers separated by commas (e.g. 1,3,5)");
    console.line("Or 'all' for everything, 'inactive' for no recorded activity, 'safe' for no warnings");
    console.line(&format!(
        "Or a variant: {}",
        engine.kind().variant_keywords().join(", ")
    ));
    console.line("Press Enter to select nothing, 'q' to quit");

    loop {
        let input = match read_line(console, "\nYour selection: ").await? {
            Reply::Line(input) => input,
            Reply::Interrupted => return Ok(None),
        };

        match engine.parse_selection(&input) {
            SelectionResult::Selected(selection) => return Ok(Some(selection)),
            SelectionResult::Cancelled => return Ok(None),
            SelectionResult::Retry(message) => console.error(&message),
        }
    }
}

fn parse_yes(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}
