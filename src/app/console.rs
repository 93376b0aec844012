use anyhow::{Context, Result};
use dialoguer::{Input, Select};

/// Words that end an interactive loop.
pub const EXIT_WORDS: [&str; 2] = ["exit", "quit"];

pub fn is_exit(input: &str) -> bool {
    let input = input.trim();
    EXIT_WORDS.iter().any(|w| input.eq_ignore_ascii_case(w))
}

/// Read one line. `None` means the user typed an exit word.
pub fn read_line(prompt: &str) -> Result<Option<String>> {
    let line: String = Input::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .context("failed to read from terminal")?;
    if is_exit(&line) {
        return Ok(None);
    }
    Ok(Some(line.trim().to_string()))
}

/// Pick one of `items`; returns its index.
pub fn choose(prompt: &str, items: &[String]) -> Result<usize> {
    Select::new()
        .with_prompt(prompt)
        .items(items)
        .default(0)
        .interact()
        .context("failed to read selection")
}
