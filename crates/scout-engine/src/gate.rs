//! Human interaction gates.
//!
//! The flow parks here when a secret only a human can supply (an OTP)
//! must be injected, and before the financially irreversible payment
//! submit. The wait is unbounded by design: OTP delivery latency is
//! outside system control. An empty response means "do not continue"
//! and is never treated as an error.

use async_trait::async_trait;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

#[async_trait]
pub trait HumanGate: Send {
    /// Block until the operator answers. The returned string is
    /// trimmed; empty means "skip the remainder".
    async fn prompt(&mut self, question: &str) -> io::Result<String>;

    /// Yes/no confirmation on top of `prompt`.
    async fn confirm(&mut self, question: &str) -> io::Result<bool> {
        let answer = self.prompt(question).await?;
        Ok(matches!(answer.to_lowercase().as_str(), "y" | "yes"))
    }
}

/// Line-based operator channel over stdin.
pub struct StdioGate {
    reader: Lines<BufReader<Stdin>>,
}

impl Default for StdioGate {
    fn default() -> Self {
        Self::new()
    }
}

impl StdioGate {
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

#[async_trait]
impl HumanGate for StdioGate {
    async fn prompt(&mut self, question: &str) -> io::Result<String> {
        print!("{question}");
        io::stdout().flush()?;
        // EOF counts as an empty answer: the operator closed the
        // channel, which is a cancellation, not a failure.
        let line = self.reader.next_line().await?.unwrap_or_default();
        Ok(line.trim().to_string())
    }
}

/// Pre-seeded answers for unattended tests.
pub struct ScriptedGate {
    answers: Vec<String>,
    pub asked: Vec<String>,
}

impl ScriptedGate {
    pub fn new(answers: &[&str]) -> Self {
        Self {
            // Popped from the back; store reversed.
            answers: answers.iter().rev().map(|s| s.to_string()).collect(),
            asked: Vec::new(),
        }
    }
}

#[async_trait]
impl HumanGate for ScriptedGate {
    async fn prompt(&mut self, question: &str) -> io::Result<String> {
        self.asked.push(question.to_string());
        Ok(self.answers.pop().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_gate_answers_in_order_then_blank() {
        let mut gate = ScriptedGate::new(&["123456", "y"]);
        assert_eq!(gate.prompt("otp? ").await.unwrap(), "123456");
        assert!(gate.confirm("go? ").await.unwrap());
        // Exhausted script behaves like an operator declining.
        assert_eq!(gate.prompt("again? ").await.unwrap(), "");
        assert_eq!(gate.asked.len(), 3);
    }

    #[tokio::test]
    async fn confirm_rejects_anything_but_yes() {
        let mut gate = ScriptedGate::new(&["no", "YES"]);
        assert!(!gate.confirm("submit? ").await.unwrap());
        assert!(gate.confirm("submit? ").await.unwrap());
    }
}
