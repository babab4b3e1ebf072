//! Operator prompts.
//!
//! The [`Prompter`] trait is the only way the session talks to the operator:
//! free-text questions, yes/no confirmations and status lines. [`LinePrompter`]
//! drives it over any line-oriented async stream (stdin/stdout in the binary),
//! [`ScriptedPrompter`] replays canned answers.

use std::collections::VecDeque;
use std::sync::Mutex as StdMutex;

use async_trait::async_trait;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Stdin, Stdout};
use tokio::sync::Mutex;

use crate::error::{Error, Result};

/// Interactive channel to the operator.
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Asks a free-text question. A blank answer yields `default` (or `""`).
    async fn input(&self, message: &str, default: Option<&str>) -> Result<String>;

    /// Asks a yes/no question. A blank answer yields `default`.
    async fn confirm(&self, message: &str, default: bool) -> Result<bool>;

    /// Shows a status line.
    async fn say(&self, message: &str);

    /// Shows a warning or error line.
    async fn warn(&self, message: &str);
}

/// Asks until the operator gives a non-blank answer.
pub async fn required_input(
    prompter: &dyn Prompter,
    message: &str,
    default: Option<&str>,
    complaint: &str,
) -> Result<String> {
    loop {
        let answer = prompter.input(message, default).await?;
        let answer = answer.trim();
        if !answer.is_empty() {
            return Ok(answer.to_string());
        }
        prompter.warn(complaint).await;
    }
}

/// Interprets a yes/no answer. Returns `None` for anything unrecognized.
pub fn parse_confirmation(answer: &str, default: bool) -> Option<bool> {
    match answer.trim().to_ascii_lowercase().as_str() {
        "" => Some(default),
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

/// Prompter over a line-oriented reader and writer.
pub struct LinePrompter<R, W> {
    reader: Mutex<R>,
    writer: Mutex<W>,
}

/// Prompter bound to the process's stdin and stdout.
pub type StdioPrompter = LinePrompter<BufReader<Stdin>, Stdout>;

/// Creates a prompter on stdin/stdout.
pub fn stdio() -> StdioPrompter {
    LinePrompter::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
}

impl<R, W> LinePrompter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Creates a prompter reading answers from `reader` and writing to `writer`.
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        }
    }

    /// Returns the reader and writer.
    pub fn into_inner(self) -> (R, W) {
        (self.reader.into_inner(), self.writer.into_inner())
    }

    async fn write_line(&self, text: &str) -> Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(text.as_bytes()).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await?;
        Ok(())
    }

    async fn ask(&self, question: &str) -> Result<String> {
        {
            let mut writer = self.writer.lock().await;
            writer.write_all(format!("? {} ", question).as_bytes()).await?;
            writer.flush().await?;
        }

        let mut line = String::new();
        let read = self.reader.lock().await.read_line(&mut line).await?;
        if read == 0 {
            return Err(Error::PromptClosed);
        }
        Ok(line.trim_end_matches(&['\r', '\n'][..]).to_string())
    }
}

#[async_trait]
impl<R, W> Prompter for LinePrompter<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn input(&self, message: &str, default: Option<&str>) -> Result<String> {
        let question = match default {
            Some(d) if !d.is_empty() => format!("{} ({})", message, d),
            _ => message.to_string(),
        };
        let answer = self.ask(&question).await?;
        if answer.trim().is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }

    async fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        let hint = if default { "(Y/n)" } else { "(y/N)" };
        let question = format!("{} {}", message, hint);
        loop {
            let answer = self.ask(&question).await?;
            if let Some(decision) = parse_confirmation(&answer, default) {
                return Ok(decision);
            }
            self.write_line("Please answer yes or no.").await?;
        }
    }

    async fn say(&self, message: &str) {
        if let Err(e) = self.write_line(message).await {
            tracing::debug!(error = %e, "failed to write status line");
        }
    }

    async fn warn(&self, message: &str) {
        if let Err(e) = self.write_line(message).await {
            tracing::debug!(error = %e, "failed to write warning line");
        }
    }
}

/// Prompter that replays a fixed list of answers and records the exchange.
///
/// Running out of answers behaves like a closed input stream.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    answers: StdMutex<VecDeque<String>>,
    prompts: StdMutex<Vec<String>>,
    messages: StdMutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// Creates a prompter that answers with `answers`, in order.
    pub fn new(answers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            answers: StdMutex::new(answers.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Questions asked so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }

    /// Status and warning lines shown so far, in order.
    pub fn messages(&self) -> Vec<String> {
        lock(&self.messages).clone()
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        lock(&self.answers).len()
    }

    fn next_answer(&self, question: &str) -> Result<String> {
        lock(&self.prompts).push(question.to_string());
        lock(&self.answers).pop_front().ok_or(Error::PromptClosed)
    }
}

fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn input(&self, message: &str, default: Option<&str>) -> Result<String> {
        let answer = self.next_answer(message)?;
        if answer.trim().is_empty() {
            return Ok(default.unwrap_or_default().to_string());
        }
        Ok(answer)
    }

    async fn confirm(&self, message: &str, default: bool) -> Result<bool> {
        loop {
            let answer = self.next_answer(message)?;
            if let Some(decision) = parse_confirmation(&answer, default) {
                return Ok(decision);
            }
        }
    }

    async fn say(&self, message: &str) {
        lock(&self.messages).push(message.to_string());
    }

    async fn warn(&self, message: &str) {
        lock(&self.messages).push(message.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::io::Builder;

    fn line_prompter(input: &[u8]) -> LinePrompter<BufReader<tokio_test::io::Mock>, Vec<u8>> {
        LinePrompter::new(BufReader::new(Builder::new().read(input).build()), Vec::new())
    }

    #[test]
    fn parse_confirmation_accepts_common_answers() {
        assert_eq!(parse_confirmation("y", false), Some(true));
        assert_eq!(parse_confirmation("YES", false), Some(true));
        assert_eq!(parse_confirmation(" no ", true), Some(false));
        assert_eq!(parse_confirmation("N", true), Some(false));
    }

    #[test]
    fn parse_confirmation_blank_uses_default() {
        assert_eq!(parse_confirmation("", true), Some(true));
        assert_eq!(parse_confirmation("  ", false), Some(false));
    }

    #[test]
    fn parse_confirmation_rejects_other_input() {
        assert_eq!(parse_confirmation("maybe", true), None);
    }

    #[tokio::test]
    async fn line_prompter_reads_answer_and_writes_question() {
        let prompter = line_prompter(b"npm start\n");

        let answer = prompter.input("run command:", None).await.unwrap();

        assert_eq!(answer, "npm start");
        let (_, written) = prompter.into_inner();
        assert_eq!(String::from_utf8(written).unwrap(), "? run command: ");
    }

    #[tokio::test]
    async fn line_prompter_blank_input_uses_default() {
        let prompter = line_prompter(b"\r\n");

        let answer = prompter
            .input("repo URL (required):", Some("https://example.com/a.git"))
            .await
            .unwrap();

        assert_eq!(answer, "https://example.com/a.git");
        let (_, written) = prompter.into_inner();
        assert_eq!(
            String::from_utf8(written).unwrap(),
            "? repo URL (required): (https://example.com/a.git) "
        );
    }

    #[tokio::test]
    async fn line_prompter_confirm_reasks_on_garbage() {
        let prompter = line_prompter(b"what\ny\n");

        assert!(prompter.confirm("Clone another repo?", false).await.unwrap());

        let (_, written) = prompter.into_inner();
        let written = String::from_utf8(written).unwrap();
        assert_eq!(written.matches("Clone another repo? (y/N)").count(), 2);
        assert!(written.contains("Please answer yes or no."));
    }

    #[tokio::test]
    async fn line_prompter_eof_is_prompt_closed() {
        let prompter = LinePrompter::new(BufReader::new(Builder::new().build()), Vec::new());

        let err = prompter.confirm("Remove it?", true).await.unwrap_err();

        assert!(matches!(err, Error::PromptClosed));
    }

    #[tokio::test]
    async fn required_input_repeats_until_non_blank() {
        let prompter = ScriptedPrompter::new(["", "  ", "https://example.com/a.git"]);

        let answer = required_input(&prompter, "repo URL (required):", None, "You must enter a repo URL")
            .await
            .unwrap();

        assert_eq!(answer, "https://example.com/a.git");
        assert_eq!(prompter.prompts().len(), 3);
        assert_eq!(
            prompter.messages(),
            vec!["You must enter a repo URL", "You must enter a repo URL"]
        );
    }

    #[tokio::test]
    async fn scripted_prompter_reports_exhaustion() {
        let prompter = ScriptedPrompter::new(["n"]);

        assert!(!prompter.confirm("first?", true).await.unwrap());
        assert!(matches!(
            prompter.confirm("second?", true).await,
            Err(Error::PromptClosed)
        ));
    }
}
