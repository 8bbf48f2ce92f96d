//! Terminal side of the install engine: progress lines and the yes/no prompt.

use std::io::{self, BufRead, Write};

use ccr_install::{Confirm, Level, Reporter};

/// Prints progress with a bracketed tag. Warnings go to stderr.
#[derive(Debug, Default)]
pub struct ConsoleReporter;

impl Reporter for ConsoleReporter {
    fn report(&mut self, level: Level, message: &str) {
        match level {
            Level::Info => println!("[info] {message}"),
            Level::Success => println!("[ok] {message}"),
            Level::Warn => eprintln!("[warn] {message}"),
        }
    }
}

/// Asks on stdout and reads one line of the answer.
///
/// End of input, a read error, or anything but `y`/`yes` counts as no.
pub struct LineConfirm<R> {
    input: R,
}

impl<R: BufRead> LineConfirm<R> {
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl LineConfirm<io::StdinLock<'static>> {
    pub fn stdin() -> Self {
        Self::new(io::stdin().lock())
    }
}

impl<R: BufRead> Confirm for LineConfirm<R> {
    fn confirm(&mut self, question: &str) -> bool {
        print!("{question} [y/N] ");
        let _ = io::stdout().flush();
        let mut answer = String::new();
        match self.input.read_line(&mut answer) {
            Ok(0) | Err(_) => {
                println!();
                false
            }
            Ok(_) => is_yes(&answer),
        }
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}
