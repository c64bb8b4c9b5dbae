//! Operator escalation for fatal conditions.
//!
//! The driver never decides how a human is asked; it hands the [`Fatal`] to an
//! [`Operator`] and blocks until that returns.

use std::io::{BufRead, Write};

use anyhow::{Context, Result, bail};

use crate::core::transition::Fatal;

/// Operator's answer to an escalation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acknowledgement {
    /// The condition was dealt with; resume in the halted phase.
    Resume,
    /// Stop the driver; persisted state keeps the halt for the next start.
    Abort,
}

pub trait Operator {
    fn acknowledge(&mut self, fatal: &Fatal) -> Result<Acknowledgement>;
}

/// Blocking text prompt on a reader/writer pair (stdin/stderr in the CLI).
pub struct ConsoleOperator<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> ConsoleOperator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }
}

impl<R: BufRead, W: Write> Operator for ConsoleOperator<R, W> {
    fn acknowledge(&mut self, fatal: &Fatal) -> Result<Acknowledgement> {
        loop {
            writeln!(self.output, "agent halted: {fatal}").context("write prompt")?;
            write!(self.output, "[r]esume once cleared, [a]bort: ").context("write prompt")?;
            self.output.flush().context("flush prompt")?;

            let mut line = String::new();
            let read = self.input.read_line(&mut line).context("read answer")?;
            if read == 0 {
                bail!("operator input closed while halted ({fatal})");
            }
            match line.trim().to_ascii_lowercase().as_str() {
                "r" | "resume" => return Ok(Acknowledgement::Resume),
                "a" | "abort" => return Ok(Acknowledgement::Abort),
                _ => continue,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::transition::FatalKind;
    use std::io::Cursor;

    #[test]
    fn console_operator_reprompts_until_valid_answer() {
        let mut output = Vec::new();
        let mut operator = ConsoleOperator::new(Cursor::new("maybe\nR\n"), &mut output);
        let fatal = Fatal::new(FatalKind::ReceptacleFull, "chest at (0, 1, 0)");

        let ack = operator.acknowledge(&fatal).expect("ack");
        assert_eq!(ack, Acknowledgement::Resume);

        let printed = String::from_utf8(output).expect("utf8");
        assert_eq!(printed.matches("agent halted").count(), 2);
        assert!(printed.contains("receptacle full: chest at (0, 1, 0)"));
    }

    #[test]
    fn closed_input_is_an_error() {
        let mut operator = ConsoleOperator::new(Cursor::new(""), Vec::new());
        let fatal = Fatal::new(FatalKind::NoFuel, "fuel chest empty");
        assert!(operator.acknowledge(&fatal).is_err());
    }
}
