//! Interactive prompts for confirmations before destructive steps.

use anyhow::{Context, Result};
use std::io::{self, Write};

/// Print `prompt` and read one trimmed line from stdin.
pub fn prompt_string(prompt: &str) -> Result<String> {
    print!("{prompt}: ");
    io::stdout().flush().context("Failed to flush prompt")?;

    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .context("Failed to read user input")?;

    Ok(input.trim().to_string())
}

/// Interpret a yes/no answer. Empty input means no.
pub fn parse_confirmation(input: &str) -> Option<bool> {
    match input.trim().to_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" | "" => Some(false),
        _ => None,
    }
}

/// Ask until the answer parses; empty input means no.
pub fn prompt_confirmation(prompt: &str) -> Result<bool> {
    loop {
        let input = prompt_string(&format!("{prompt} (y/N)"))?;
        match parse_confirmation(&input) {
            Some(answer) => return Ok(answer),
            None => eprintln!("Please enter 'y' for yes or 'n' for no."),
        }
    }
}

/// Ask unless `assume_yes`.
pub fn confirm_unless(assume_yes: bool, prompt: &str) -> Result<bool> {
    if assume_yes {
        Ok(true)
    } else {
        prompt_confirmation(prompt)
    }
}
