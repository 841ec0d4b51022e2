use async_trait::async_trait;

/// Text surface the chat loop talks through.
#[async_trait]
pub trait Interface: Send + Sync {
    /// Next line from the user, trimmed. `None` once input is exhausted.
    async fn receive_input(&self, prompt: &str) -> Option<String>;
    async fn send_output(&self, message: &str);
    async fn request_approval(&self, action: &str) -> bool;
    async fn show_status(&self, status: &str);
    async fn show_error(&self, error: &str);
}
