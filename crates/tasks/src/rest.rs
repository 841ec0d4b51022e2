use crate::error::StoreError;
use crate::store::TaskStore;
use crate::types::{NewTask, Task, TaskFilter, TaskPatch};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use std::time::Duration;

const SELECT_COLUMNS: &str = "id,user_id,title,completed,created_at";

/// Remote task table behind a PostgREST-style HTTP API (as exposed by
/// Supabase). Filters are sent as `column=eq.value` query parameters.
pub struct RestTaskStore {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    table: String,
}

impl RestTaskStore {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            base_url,
            api_key,
            table: "tasks".to_string(),
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = table.into();
        self
    }

    pub fn table_url(&self) -> String {
        format!(
            "{}/rest/v1/{}",
            self.base_url.trim_end_matches('/'),
            self.table
        )
    }

    fn request(&self, method: Method) -> RequestBuilder {
        let mut request = self.client.request(method, self.table_url());

        if let Some(api_key) = &self.api_key {
            request = request.header("apikey", api_key).bearer_auth(api_key);
        }

        request
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response, StoreError> {
        let response = request
            .send()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        Err(StoreError::Rejected(rejection_message(status.as_u16(), &body)))
    }

    async fn rows(&self, request: RequestBuilder) -> Result<Vec<Task>, StoreError> {
        let response = self.send(request).await?;
        let body = response
            .text()
            .await
            .map_err(|e| StoreError::Http(e.to_string()))?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// PostgREST error bodies carry a human-readable `message`; fall back to the
/// raw body, then to the status code.
fn rejection_message(status: u16, body: &str) -> String {
    if let Ok(value) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(message) = value.get("message").and_then(|m| m.as_str()) {
            return message.to_string();
        }
    }

    let body = body.trim();
    if body.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("HTTP {}: {}", status, body)
    }
}

fn eq(value: &str) -> String {
    format!("eq.{}", value)
}

#[async_trait]
impl TaskStore for RestTaskStore {
    async fn select(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let mut query = vec![
            ("select", SELECT_COLUMNS.to_string()),
            ("user_id", eq(&filter.owner)),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }

        tracing::debug!("select tasks url={}", self.table_url());
        self.rows(self.request(Method::GET).query(&query)).await
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let request = self
            .request(Method::POST)
            .query(&[("select", SELECT_COLUMNS)])
            .header("Prefer", "return=representation")
            .json(&task);

        let created = self
            .rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::Rejected("Insert returned no row".to_string()))?;

        tracing::info!("Inserted task: {}", created.id);
        Ok(created)
    }

    async fn update(&self, owner: &str, id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        let request = self
            .request(Method::PATCH)
            .query(&[
                ("id", eq(id)),
                ("user_id", eq(owner)),
                ("select", SELECT_COLUMNS.to_string()),
            ])
            .header("Prefer", "return=representation")
            .json(&patch);

        let updated = self
            .rows(request)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

        tracing::info!("Updated task: {}", id);
        Ok(updated)
    }

    async fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        let request = self
            .request(Method::DELETE)
            .query(&[("id", eq(id)), ("user_id", eq(owner))])
            .header("Prefer", "return=representation");

        if self.rows(request).await?.is_empty() {
            return Err(StoreError::NotFound(id.to_string()));
        }

        tracing::info!("Deleted task: {}", id);
        Ok(())
    }

    fn name(&self) -> &str {
        "rest"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_url() {
        let store = RestTaskStore::new("https://example.supabase.co/".to_string(), None);
        assert_eq!(store.table_url(), "https://example.supabase.co/rest/v1/tasks");

        let store = store.with_table("wellness_tasks");
        assert_eq!(
            store.table_url(),
            "https://example.supabase.co/rest/v1/wellness_tasks"
        );
    }

    #[test]
    fn test_rejection_message_prefers_message_field() {
        let body = r#"{"code":"42501","message":"permission denied for table tasks"}"#;
        assert_eq!(
            rejection_message(401, body),
            "permission denied for table tasks"
        );
    }

    #[test]
    fn test_rejection_message_fallbacks() {
        assert_eq!(rejection_message(503, ""), "HTTP 503");
        assert_eq!(rejection_message(502, "bad gateway"), "HTTP 502: bad gateway");
    }

    #[test]
    fn test_insert_body_shape() {
        let body = serde_json::to_value(NewTask::new("user-1", "Walk").unwrap()).unwrap();
        assert_eq!(
            body,
            serde_json::json!({ "user_id": "user-1", "title": "Walk", "completed": false })
        );
    }
}
