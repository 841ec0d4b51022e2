use crate::traits::Interface;
use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Stdin};
use tokio::sync::Mutex;

/// Stdin/stdout front end. One reader is kept for the whole session so
/// buffered input is never lost between prompts.
pub struct TerminalInterface {
    reader: Mutex<BufReader<Stdin>>,
}

impl TerminalInterface {
    pub fn new() -> Self {
        Self {
            reader: Mutex::new(BufReader::new(tokio::io::stdin())),
        }
    }

    async fn write(&self, text: &str, newline: bool) {
        let mut stdout = tokio::io::stdout();
        let _ = stdout.write_all(text.as_bytes()).await;
        if newline {
            let _ = stdout.write_all(b"\n").await;
        }
        let _ = stdout.flush().await;
    }
}

impl Default for TerminalInterface {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Interface for TerminalInterface {
    async fn receive_input(&self, prompt: &str) -> Option<String> {
        self.write(prompt, false).await;

        let mut reader = self.reader.lock().await;
        let mut line = String::new();
        match reader.read_line(&mut line).await {
            Ok(0) => None, // EOF
            Ok(_) => Some(line.trim().to_string()),
            Err(_) => None,
        }
    }

    async fn send_output(&self, message: &str) {
        self.write(message, true).await;
    }

    async fn request_approval(&self, action: &str) -> bool {
        self.send_output(&format!("⚠️  {}", action)).await;

        match self.receive_input("Confirm? (y/n): ").await {
            Some(response) => response.to_lowercase().starts_with('y'),
            None => false,
        }
    }

    async fn show_status(&self, status: &str) {
        self.send_output(&format!("ℹ️  {}", status)).await;
    }

    async fn show_error(&self, error: &str) {
        let mut stderr = tokio::io::stderr();
        let _ = stderr.write_all(format!("❌ {}\n", error).as_bytes()).await;
        let _ = stderr.flush().await;
    }
}
