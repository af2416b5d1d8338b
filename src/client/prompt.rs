// src/client/prompt.rs

//! Interactive prompts
//!
//! Confirmation is strict: only a literal `Y` proceeds. `y`, `yes`, an
//! empty line and end of input all count as no.

use super::{ClientError, ClientResult};
use std::io::{BufRead, Write};

pub trait Prompter {
    /// Ask a yes/no question
    fn confirm(&mut self, question: &str) -> ClientResult<bool>;

    /// Pick one of `options`, returning its index
    fn choose(&mut self, question: &str, options: &[String]) -> ClientResult<usize>;

    /// Print a line for the user
    fn say(&mut self, text: &str) -> ClientResult<()>;
}

/// Line-oriented prompter over any reader and writer
pub struct StdinPrompter<R, W> {
    input: R,
    output: W,
}

impl StdinPrompter<std::io::StdinLock<'static>, std::io::Stdout> {
    /// Prompt on the process's stdin and stdout
    pub fn stdio() -> Self {
        Self::new(std::io::stdin().lock(), std::io::stdout())
    }
}

impl<R: BufRead, W: Write> StdinPrompter<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// None on end of input
    fn read_line(&mut self) -> ClientResult<Option<String>> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }
}

impl<R: BufRead, W: Write> Prompter for StdinPrompter<R, W> {
    fn confirm(&mut self, question: &str) -> ClientResult<bool> {
        write!(self.output, "{} [Y/n] ", question)?;
        self.output.flush()?;
        Ok(self.read_line()?.is_some_and(|answer| answer == "Y"))
    }

    fn choose(&mut self, question: &str, options: &[String]) -> ClientResult<usize> {
        writeln!(self.output, "{}", question)?;
        for (index, option) in options.iter().enumerate() {
            writeln!(self.output, "  {}) {}", index, option)?;
        }

        loop {
            write!(self.output, "Select [0-{}]: ", options.len().saturating_sub(1))?;
            self.output.flush()?;

            let Some(answer) = self.read_line()? else {
                return Err(ClientError::UserAborted);
            };
            match answer.trim().parse::<usize>() {
                Ok(index) if index < options.len() => return Ok(index),
                _ => writeln!(self.output, "Please enter a number from the list.")?,
            }
        }
    }

    fn say(&mut self, text: &str) -> ClientResult<()> {
        writeln!(self.output, "{}", text)?;
        Ok(())
    }
}
