//! SurrealDB Store
//!
//! Documents live in the `records` and `users` tables keyed by their local id.
//! Reads project `meta::id(id)` so rows deserialize straight into the domain
//! types. Timestamps are stored as RFC 3339 text and cast for ordering. The unique indexes defined at connect time are the final arbiter of
//! duplicate names and emails.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use surrealdb::engine::any::{self, Any};
use surrealdb::opt::auth::Root;
use surrealdb::Surreal;
use tracing::{debug, info};

use super::{RecordStore, StoreError, UserStore};
use crate::auth::{Plan, User};
use crate::records::{Record, RecordChanges};

const RECORDS: &str = "records";
const USERS: &str = "users";

const SCHEMA: &str = "
    DEFINE INDEX records_fqdn ON TABLE records COLUMNS fqdn UNIQUE;
    DEFINE INDEX records_owner ON TABLE records COLUMNS owner_id;
    DEFINE INDEX users_email ON TABLE users COLUMNS email UNIQUE;
";

/// Connection settings for the document store
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// `ws://`, `wss://`, `http(s)://` or `mem://`
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl DatabaseConfig {
    /// Throwaway in-process database
    pub fn in_memory() -> Self {
        Self {
            url: "mem://".to_string(),
            namespace: "ddns".to_string(),
            database: "engine".to_string(),
            username: None,
            password: None,
        }
    }
}

impl From<surrealdb::Error> for StoreError {
    fn from(err: surrealdb::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Maps a unique-index violation to `Conflict`, anything else to `Backend`
fn write_error(err: surrealdb::Error, field: &'static str, value: &str) -> StoreError {
    let message = err.to_string();
    if message.contains("already contains") {
        StoreError::Conflict {
            field,
            value: value.to_string(),
        }
    } else {
        StoreError::Backend(message)
    }
}

/// Serialize a domain value as a document body, dropping `id` (it is the key)
fn document<T: Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    let mut doc =
        serde_json::to_value(value).map_err(|e| StoreError::Backend(e.to_string()))?;
    if let Some(fields) = doc.as_object_mut() {
        fields.remove("id");
    }
    Ok(doc)
}

/// Any row; only used to learn whether a keyed operation touched something
#[derive(Debug, Deserialize)]
struct Ack {}

#[derive(Debug, Deserialize)]
struct CountRow {
    count: usize,
}

/// SurrealDB-backed record and user store
#[derive(Clone)]
pub struct SurrealStore {
    db: Surreal<Any>,
}

impl SurrealStore {
    /// Connect, select namespace/database and make sure indexes exist
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, StoreError> {
        debug!(url = %config.url, "Connecting to SurrealDB");
        let db = any::connect(config.url.as_str()).await?;

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            db.signin(Root {
                username: username.as_str(),
                password: password.as_str(),
            })
            .await?;
        }

        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;
        db.query(SCHEMA).await?.check()?;

        info!(
            namespace = %config.namespace,
            database = %config.database,
            "Document store ready"
        );
        Ok(Self { db })
    }

    async fn count_rows(
        &self,
        sql: &str,
        binding: Option<(&'static str, String)>,
    ) -> Result<usize, StoreError> {
        let mut query = self.db.query(sql);
        if let Some(binding) = binding {
            query = query.bind(binding);
        }
        let rows: Vec<CountRow> = query.await?.take(0)?;
        Ok(rows.first().map_or(0, |row| row.count))
    }
}

#[async_trait]
impl RecordStore for SurrealStore {
    async fn insert(&self, record: &Record) -> Result<(), StoreError> {
        let _: Option<Ack> = self
            .db
            .create((RECORDS, record.id.as_str()))
            .content(document(record)?)
            .await
            .map_err(|e| write_error(e, "fqdn", &record.fqdn))?;
        Ok(())
    }

    async fn find(&self, id: &str, owner_id: Option<&str>) -> Result<Option<Record>, StoreError> {
        let rows: Vec<Record> = match owner_id {
            Some(owner) => self
                .db
                .query("SELECT *, meta::id(id) AS id FROM type::thing($tb, $id) WHERE owner_id = $owner")
                .bind(("tb", RECORDS))
                .bind(("id", id.to_string()))
                .bind(("owner", owner.to_string()))
                .await?
                .take(0)?,
            None => self
                .db
                .query("SELECT *, meta::id(id) AS id FROM type::thing($tb, $id)")
                .bind(("tb", RECORDS))
                .bind(("id", id.to_string()))
                .await?
                .take(0)?,
        };
        Ok(rows.into_iter().next())
    }

    async fn find_by_fqdn(&self, fqdn: &str) -> Result<Option<Record>, StoreError> {
        let rows: Vec<Record> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM records WHERE fqdn = $fqdn LIMIT 1")
            .bind(("fqdn", fqdn.to_string()))
            .await?
            .take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn count_for_owner(&self, owner_id: &str) -> Result<usize, StoreError> {
        self.count_rows(
            "SELECT count() FROM records WHERE owner_id = $owner GROUP ALL",
            Some(("owner", owner_id.to_string())),
        )
        .await
    }

    async fn count_all(&self) -> Result<usize, StoreError> {
        self.count_rows("SELECT count() FROM records GROUP ALL", None).await
    }

    async fn list_for_owner(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<Record>, StoreError> {
        let rows: Vec<Record> = self
            .db
            .query(
                "SELECT *, meta::id(id) AS id, type::datetime(created_at) AS created_ts \
                 FROM records WHERE owner_id = $owner ORDER BY created_ts ASC LIMIT $limit",
            )
            .bind(("owner", owner_id.to_string()))
            .bind(("limit", limit as u64))
            .await?
            .take(0)?;
        Ok(rows)
    }

    async fn apply_changes(
        &self,
        id: &str,
        changes: &RecordChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<Option<Record>, StoreError> {
        let patch = serde_json::json!({
            "content": changes.content,
            "ttl": changes.ttl,
            "proxied": changes.proxied,
            "updated_at": updated_at,
        });
        // Table target with a WHERE never creates a missing key
        let touched: Vec<Ack> = self
            .db
            .query("UPDATE records MERGE $patch WHERE id = type::thing($tb, $id) RETURN AFTER")
            .bind(("tb", RECORDS))
            .bind(("id", id.to_string()))
            .bind(("patch", patch))
            .await?
            .take(0)?;
        if touched.is_empty() {
            return Ok(None);
        }

        RecordStore::find(self, id, None).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed: Option<Ack> = self.db.delete((RECORDS, id)).await?;
        Ok(removed.is_some())
    }
}

#[async_trait]
impl UserStore for SurrealStore {
    async fn insert(&self, user: &User) -> Result<(), StoreError> {
        let _: Option<Ack> = self
            .db
            .create((USERS, user.id.as_str()))
            .content(document(user)?)
            .await
            .map_err(|e| write_error(e, "email", &user.email))?;
        Ok(())
    }

    async fn find(&self, id: &str) -> Result<Option<User>, StoreError> {
        let rows: Vec<User> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM type::thing($tb, $id)")
            .bind(("tb", USERS))
            .bind(("id", id.to_string()))
            .await?
            .take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let rows: Vec<User> = self
            .db
            .query("SELECT *, meta::id(id) AS id FROM users WHERE email = $email LIMIT 1")
            .bind(("email", email.to_string()))
            .await?
            .take(0)?;
        Ok(rows.into_iter().next())
    }

    async fn list(&self, limit: usize) -> Result<Vec<User>, StoreError> {
        let rows: Vec<User> = self
            .db
            .query(
                "SELECT *, meta::id(id) AS id, type::datetime(created_at) AS created_ts \
                 FROM users ORDER BY created_ts ASC LIMIT $limit",
            )
            .bind(("limit", limit as u64))
            .await?
            .take(0)?;
        Ok(rows)
    }

    async fn count(&self, plan: Option<Plan>) -> Result<usize, StoreError> {
        match plan {
            Some(plan) => {
                self.count_rows(
                    "SELECT count() FROM users WHERE plan = $plan GROUP ALL",
                    Some(("plan", plan.to_string())),
                )
                .await
            }
            None => self.count_rows("SELECT count() FROM users GROUP ALL", None).await,
        }
    }

    async fn set_plan(&self, id: &str, plan: Plan) -> Result<Option<User>, StoreError> {
        let touched: Vec<Ack> = self
            .db
            .query("UPDATE users SET plan = $plan WHERE id = type::thing($tb, $id) RETURN AFTER")
            .bind(("tb", USERS))
            .bind(("id", id.to_string()))
            .bind(("plan", plan.to_string()))
            .await?
            .take(0)?;
        if touched.is_empty() {
            return Ok(None);
        }

        UserStore::find(self, id).await
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let removed: Option<Ack> = self.db.delete((USERS, id)).await?;
        Ok(removed.is_some())
    }
}
