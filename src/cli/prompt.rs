//! Line-oriented operator input for the interactive menu.

use std::io::{self, BufRead, Write};

use anyhow::{Result, bail};

use crate::domain::DomainName;

/// A closed set of menu entries. Entry `n` is selected by typing `n`; the
/// back/exit entry is always `0`.
pub trait MenuChoice: Copy + 'static {
    const ENTRIES: &'static [Self];
    const BACK: Self;

    fn label(&self) -> &'static str;

    fn parse(input: &str) -> Option<Self> {
        match input.trim().parse::<usize>().ok()? {
            0 => Some(Self::BACK),
            n => Self::ENTRIES.get(n - 1).copied(),
        }
    }
}

/// Read one trimmed line. End of input is an error so loops terminate.
pub fn ask(prompt: &str) -> Result<String> {
    print!("{}", prompt);
    io::stdout().flush()?;

    let mut line = String::new();
    if io::stdin().lock().read_line(&mut line)? == 0 {
        bail!("End of input");
    }
    Ok(line.trim().to_string())
}

pub fn ask_required(prompt: &str) -> Result<String> {
    let answer = ask(prompt)?;
    if answer.is_empty() {
        bail!("A value is required");
    }
    Ok(answer)
}

pub fn ask_domain(prompt: &str) -> Result<DomainName> {
    Ok(ask_required(prompt)?.parse()?)
}

pub fn ask_optional(prompt: &str) -> Result<Option<String>> {
    let answer = ask(prompt)?;
    Ok(Some(answer).filter(|a| !a.is_empty()))
}

/// `[y/N]` question; anything but `y`/`yes` is no.
pub fn confirm(question: &str) -> Result<bool> {
    let answer = ask(&format!("{} [y/N]: ", question))?;
    Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
}

pub fn show_menu<M: MenuChoice>(title: &str, back_label: &str) {
    println!("\n== {} ==", title);
    for (index, entry) in M::ENTRIES.iter().enumerate() {
        println!("  {}. {}", index + 1, entry.label());
    }
    println!("  0. {}", back_label);
}

/// Show the menu until the operator picks a valid entry.
pub fn choose<M: MenuChoice>(title: &str, back_label: &str) -> Result<M> {
    loop {
        show_menu::<M>(title, back_label);
        let input = ask("Select: ")?;
        match M::parse(&input) {
            Some(choice) => return Ok(choice),
            None => eprintln!("Invalid selection: '{}'", input),
        }
    }
}
