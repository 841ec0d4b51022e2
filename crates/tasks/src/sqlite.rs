use crate::error::StoreError;
use crate::store::TaskStore;
use crate::types::{NewTask, Task, TaskFilter, TaskPatch};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use parking_lot::Mutex;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Arc;

const TASK_COLUMNS: &str = "id, user_id, title, completed, created_at";

/// Task table in a local SQLite database.
pub struct SqliteTaskStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteTaskStore {
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self, StoreError> {
        if let Some(parent) = db_path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(db_path)?;
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
        Self::from_connection(conn)
    }

    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS tasks (
                seq INTEGER PRIMARY KEY AUTOINCREMENT,
                id TEXT NOT NULL UNIQUE,
                user_id TEXT NOT NULL,
                title TEXT NOT NULL,
                completed INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id)",
            [],
        )?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    async fn blocking<T, F>(&self, op: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock();
            op(&conn)
        })
        .await
        .map_err(|e| StoreError::Background(e.to_string()))?
    }
}

fn row_to_task(row: &Row<'_>) -> rusqlite::Result<Task> {
    let created_at: String = row.get(4)?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;

    Ok(Task {
        id: row.get(0)?,
        owner: row.get(1)?,
        title: row.get(2)?,
        completed: row.get(3)?,
        created_at,
    })
}

fn fetch_one(conn: &Connection, owner: &str, id: &str) -> Result<Option<Task>, StoreError> {
    let sql = format!("SELECT {} FROM tasks WHERE id = ?1 AND user_id = ?2", TASK_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id, owner], row_to_task)
        .optional()?)
}

#[async_trait]
impl TaskStore for SqliteTaskStore {
    async fn select(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let owner = filter.owner.clone();
        // SQLite treats a negative LIMIT as unbounded.
        let limit = filter.limit.map(|l| l as i64).unwrap_or(-1);

        self.blocking(move |conn| {
            let sql = format!(
                "SELECT {} FROM tasks WHERE user_id = ?1 ORDER BY created_at DESC, seq DESC LIMIT ?2",
                TASK_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params![owner, limit], row_to_task)?;

            let mut tasks = Vec::new();
            for row in rows {
                tasks.push(row?);
            }
            Ok(tasks)
        })
        .await
    }

    async fn insert(&self, task: NewTask) -> Result<Task, StoreError> {
        let created = Task {
            id: uuid::Uuid::new_v4().to_string(),
            owner: task.owner,
            title: task.title,
            completed: task.completed,
            created_at: Utc::now(),
        };
        let row = created.clone();

        self.blocking(move |conn| {
            conn.execute(
                "INSERT INTO tasks (id, user_id, title, completed, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    row.id,
                    row.owner,
                    row.title,
                    row.completed,
                    row.created_at.to_rfc3339_opts(SecondsFormat::Micros, true)
                ],
            )?;
            Ok(())
        })
        .await?;

        tracing::info!("Inserted task: {}", created.id);
        Ok(created)
    }

    async fn update(&self, owner: &str, id: &str, patch: TaskPatch) -> Result<Task, StoreError> {
        let owner = owner.to_string();
        let id = id.to_string();

        let updated = self
            .blocking(move |conn| {
                let changed = conn.execute(
                    "UPDATE tasks SET completed = COALESCE(?1, completed), title = COALESCE(?2, title)
                     WHERE id = ?3 AND user_id = ?4",
                    params![patch.completed, patch.title, id, owner],
                )?;
                if changed == 0 {
                    return Err(StoreError::NotFound(id));
                }
                fetch_one(conn, &owner, &id)?.ok_or(StoreError::NotFound(id))
            })
            .await?;

        tracing::info!("Updated task: {}", updated.id);
        Ok(updated)
    }

    async fn delete(&self, owner: &str, id: &str) -> Result<(), StoreError> {
        let owner = owner.to_string();
        let id = id.to_string();
        let log_id = id.clone();

        self.blocking(move |conn| {
            let changed = conn.execute(
                "DELETE FROM tasks WHERE id = ?1 AND user_id = ?2",
                params![id, owner],
            )?;
            if changed == 0 {
                return Err(StoreError::NotFound(id));
            }
            Ok(())
        })
        .await?;

        tracing::info!("Deleted task: {}", log_id);
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_crud_cycle() {
        let store = SqliteTaskStore::in_memory().unwrap();

        let task = store.insert(NewTask::new("alice", "Meditate").unwrap()).await.unwrap();
        let updated = store
            .update("alice", &task.id, TaskPatch::completed(true))
            .await
            .unwrap();
        assert!(updated.completed);
        assert_eq!(updated.title, "Meditate");

        store.delete("alice", &task.id).await.unwrap();
        assert!(store.select(&TaskFilter::owner("alice")).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_newest_first_and_limit() {
        let store = SqliteTaskStore::in_memory().unwrap();
        for title in ["One", "Two", "Three"] {
            store.insert(NewTask::new("alice", title).unwrap()).await.unwrap();
        }

        let all = store.select(&TaskFilter::owner("alice")).await.unwrap();
        let titles: Vec<_> = all.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Three", "Two", "One"]);

        let limited = store
            .select(&TaskFilter::owner("alice").with_limit(1))
            .await
            .unwrap();
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].title, "Three");
    }

    #[tokio::test]
    async fn test_other_owner_cannot_mutate() {
        let store = SqliteTaskStore::in_memory().unwrap();
        let task = store.insert(NewTask::new("alice", "Walk").unwrap()).await.unwrap();

        let result = store.delete("mallory", &task.id).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
        assert_eq!(store.select(&TaskFilter::owner("alice")).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_persists_to_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("tasks.db");

        {
            let store = SqliteTaskStore::new(&path).unwrap();
            store.insert(NewTask::new("alice", "Sleep early").unwrap()).await.unwrap();
        }

        let store = SqliteTaskStore::new(&path).unwrap();
        let tasks = store.select(&TaskFilter::owner("alice")).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title, "Sleep early");
    }
}
