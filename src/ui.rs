use anyhow::Result;
use std::io::{self, Write};

pub fn display_error(message: &str) {
    eprintln!("\x1b[31mERROR:\x1b[0m {}", message);
}

pub fn display_warning(message: &str) {
    eprintln!("\x1b[33mWARN:\x1b[0m {}", message);
}

pub fn display_success(message: &str) {
    println!("\x1b[32m✓\x1b[0m {}", message);
}

pub fn display_status(message: &str) {
    println!("\x1b[33m→\x1b[0m {}", message);
}

pub fn display_heading(title: &str) {
    println!("\n\x1b[1m{}\x1b[0m", title);
}

pub fn display_progress(percent: u8) {
    print!("\r  {:>3}%", percent);
    let _ = io::stdout().flush();
    if percent >= 100 {
        println!();
    }
}

pub fn confirm_action(prompt: &str) -> Result<bool> {
    print!("\n{} (y/N): ", prompt);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let answer = input.trim().to_lowercase();
    Ok(answer == "y" || answer == "yes" || answer == "j" || answer == "ja")
}
