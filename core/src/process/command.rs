//! Operator command lines.

use std::fmt;

use crate::error::{Error, Result};

/// A tokenized command: program plus arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program to execute.
    pub program: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
}

impl CommandLine {
    /// Creates a command line from already-split parts.
    pub fn new(program: impl Into<String>, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses operator input using shell-style quoting rules.
    ///
    /// Blank input yields `None`. Unbalanced quotes are an error.
    pub fn parse(input: &str) -> Result<Option<Self>> {
        if input.trim().is_empty() {
            return Ok(None);
        }

        let mut tokens = shlex::split(input)
            .ok_or_else(|| Error::InvalidCommand(format!("unbalanced quotes in '{}'", input)))?
            .into_iter();

        Ok(tokens.next().map(|program| Self {
            program,
            args: tokens.collect(),
        }))
    }

    /// Returns a copy with `arg` appended.
    pub fn with_arg(&self, arg: impl Into<String>) -> Self {
        let mut cmd = self.clone();
        cmd.args.push(arg.into());
        cmd
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let words = std::iter::once(self.program.as_str()).chain(self.args.iter().map(String::as_str));
        match shlex::try_join(words.clone()) {
            Ok(joined) => f.write_str(&joined),
            Err(_) => f.write_str(&words.collect::<Vec<_>>().join(" ")),
        }
    }
}
