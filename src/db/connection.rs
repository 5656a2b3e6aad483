use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::env;
use surrealdb::Surreal;
use surrealdb::engine::any::Any;
use surrealdb::opt::auth::Root;

pub type Db = Surreal<Any>;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: env::var("SURREALDB_URL").unwrap_or_else(|_| "memory".to_string()),
            namespace: env::var("SURREALDB_NAMESPACE").unwrap_or_else(|_| "quill".to_string()),
            database: env::var("SURREALDB_DATABASE").unwrap_or_else(|_| "blog".to_string()),
            username: env::var("SURREALDB_USERNAME").ok(),
            password: env::var("SURREALDB_PASSWORD").ok(),
        }
    }
}

impl DatabaseConfig {
    /// A fresh, private in-memory database.
    pub fn memory() -> Self {
        Self {
            url: "memory".to_string(),
            ..Default::default()
        }
    }
}

pub async fn create_connection(config: DatabaseConfig) -> Result<Db> {
    let db = surrealdb::engine::any::connect(config.url).await?;

    // Sign in if credentials are provided
    if let (Some(username), Some(password)) = (config.username, config.password) {
        db.signin(Root {
            username: &username,
            password: &password,
        })
        .await?;
    }

    db.use_ns(config.namespace).use_db(config.database).await?;

    Ok(db)
}

/// Define tables, indexes and timestamp fields. Safe to run repeatedly.
pub async fn ensure_schema(db: &Db) -> Result<()> {
    let schema_queries = [
        "DEFINE TABLE IF NOT EXISTS author SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE author TYPE datetime DEFAULT time::now();
         DEFINE FIELD IF NOT EXISTS updated_at ON TABLE author TYPE datetime VALUE time::now();
         DEFINE INDEX IF NOT EXISTS author_email ON TABLE author COLUMNS email UNIQUE;",
        "DEFINE TABLE IF NOT EXISTS post SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE post TYPE datetime DEFAULT time::now();
         DEFINE FIELD IF NOT EXISTS updated_at ON TABLE post TYPE datetime VALUE time::now();
         DEFINE INDEX IF NOT EXISTS post_owner ON TABLE post COLUMNS owner;",
        "DEFINE TABLE IF NOT EXISTS comment SCHEMALESS;
         DEFINE FIELD IF NOT EXISTS created_at ON TABLE comment TYPE datetime DEFAULT time::now();
         DEFINE FIELD IF NOT EXISTS updated_at ON TABLE comment TYPE datetime VALUE time::now();
         DEFINE INDEX IF NOT EXISTS comment_owner ON TABLE comment COLUMNS owner;",
    ];

    for query in schema_queries {
        db.query(query).await?.check()?;
    }

    tracing::debug!("Schema ensured");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_connection_and_schema() {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        // running twice must not fail
        ensure_schema(&db).await.unwrap();
    }

    #[tokio::test]
    async fn test_email_index_is_unique() {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();

        db.query("CREATE author CONTENT { email: 'a@x.com' }")
            .await
            .unwrap()
            .check()
            .unwrap();
        let second = db
            .query("CREATE author CONTENT { email: 'a@x.com' }")
            .await
            .unwrap()
            .check();
        assert!(second.is_err());
    }
}
