use std::marker::PhantomData;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::db::Db;
use crate::error::{Error, Result};
use crate::resources::{ListQuery, OwnedResource};
use crate::types::{AuthorId, DocumentId, generate_key};
use crate::validation::{Mode, ensure_updatable};

/// Document access for resource `R`, always scoped to one owner.
///
/// Every statement carries `owner = $owner`, so a foreign document is
/// reported exactly like a missing one.
pub struct OwnedRepository<R: OwnedResource> {
    db: Db,
    _resource: PhantomData<fn() -> R>,
}

impl<R: OwnedResource> OwnedRepository<R> {
    pub fn new(db: Db) -> Self {
        Self {
            db,
            _resource: PhantomData,
        }
    }

    fn projection() -> String {
        format!("record::id(id) AS id, {}", R::FIELDS)
    }

    /// Create a document owned by `owner`.
    ///
    /// Any `owner` in the payload is discarded; the caller's id always wins.
    pub async fn create(&self, owner: &AuthorId, mut input: Map<String, Value>) -> Result<R::Record> {
        R::SCHEMA.validate(&mut input, Mode::Create)?;

        let mut content = R::SCHEMA.project(input);
        content
            .entry("completed")
            .or_insert(Value::Bool(false));
        content.insert("owner".to_string(), Value::String(owner.to_string()));

        let id = generate_key();
        let query = format!(
            "CREATE type::thing('{}', $id) CONTENT $content RETURN NONE",
            R::TABLE
        );

        self.db
            .query(query)
            .bind(("id", id.clone()))
            .bind(("content", Value::Object(content)))
            .await?
            .check()?;

        info!("Author {} created {} {}", owner, R::TABLE, id);
        self.get(owner, &DocumentId::new(id)).await
    }

    /// List the owner's documents.
    pub async fn list(&self, owner: &AuthorId, query: &ListQuery) -> Result<Vec<R::Record>> {
        let mut sql = format!(
            "SELECT {} FROM {} WHERE owner = $owner",
            Self::projection(),
            R::TABLE
        );
        if query.completed.is_some() {
            sql.push_str(" AND completed = $completed");
        }
        if let Some((column, order)) = query.sort {
            sql.push_str(&format!(" ORDER BY {} {}", column, order.as_sql()));
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }
        if let Some(skip) = query.skip {
            sql.push_str(&format!(" START {}", skip));
        }

        let mut res = self
            .db
            .query(sql)
            .bind(("owner", owner.to_string()))
            .bind(("completed", query.completed))
            .await?;

        let records: Vec<R::Record> = res.take(0)?;
        debug!("Listed {} {} documents for {}", records.len(), R::TABLE, owner);
        Ok(records)
    }

    /// Fetch one document, or `NotFound` if it is missing or not the owner's.
    pub async fn get(&self, owner: &AuthorId, id: &DocumentId) -> Result<R::Record> {
        let sql = format!(
            "SELECT {} FROM type::thing('{}', $id) WHERE owner = $owner",
            Self::projection(),
            R::TABLE
        );

        let mut res = self
            .db
            .query(sql)
            .bind(("id", id.to_string()))
            .bind(("owner", owner.to_string()))
            .await?;

        let records: Vec<R::Record> = res.take(0)?;
        records.into_iter().next().ok_or(Error::NotFound)
    }

    /// Apply a partial update restricted to `R::UPDATABLE`.
    ///
    /// Disallowed fields fail before anything is read or written. An empty
    /// patch succeeds and returns the document unchanged.
    pub async fn update(
        &self,
        owner: &AuthorId,
        id: &DocumentId,
        mut patch: Map<String, Value>,
    ) -> Result<R::Record> {
        ensure_updatable(&patch, R::UPDATABLE)?;
        R::SCHEMA.validate(&mut patch, Mode::Patch)?;

        let existing = self.get(owner, id).await?;
        if patch.is_empty() {
            return Ok(existing);
        }

        let sql = format!(
            "UPDATE type::thing('{}', $id) MERGE $patch WHERE owner = $owner RETURN NONE",
            R::TABLE
        );
        self.db
            .query(sql)
            .bind(("id", id.to_string()))
            .bind(("owner", owner.to_string()))
            .bind(("patch", Value::Object(patch)))
            .await?
            .check()?;

        info!("Author {} updated {} {}", owner, R::TABLE, id);
        self.get(owner, id).await
    }

    /// Delete one document and return it as it was.
    pub async fn delete(&self, owner: &AuthorId, id: &DocumentId) -> Result<R::Record> {
        let existing = self.get(owner, id).await?;

        let sql = format!(
            "DELETE type::thing('{}', $id) WHERE owner = $owner",
            R::TABLE
        );
        self.db
            .query(sql)
            .bind(("id", id.to_string()))
            .bind(("owner", owner.to_string()))
            .await?
            .check()?;

        info!("Author {} deleted {} {}", owner, R::TABLE, id);
        Ok(existing)
    }

    /// Number of documents `owner` holds.
    pub async fn count(&self, owner: &AuthorId) -> Result<usize> {
        let sql = format!(
            "SELECT count() AS total FROM {} WHERE owner = $owner GROUP ALL",
            R::TABLE
        );
        let mut res = self
            .db
            .query(sql)
            .bind(("owner", owner.to_string()))
            .await?;

        let total: Option<usize> = res.take((0, "total"))?;
        Ok(total.unwrap_or(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{DatabaseConfig, create_connection, ensure_schema};
    use crate::resources::{Comment, ListParams, Post, SortOrder};
    use serde_json::json;

    async fn setup() -> Db {
        let db = create_connection(DatabaseConfig::memory()).await.unwrap();
        ensure_schema(&db).await.unwrap();
        db
    }

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().unwrap().clone()
    }

    fn ann() -> AuthorId {
        AuthorId::new("ann")
    }

    fn bob() -> AuthorId {
        AuthorId::new("bob")
    }

    #[tokio::test]
    async fn test_create_forces_owner_and_defaults() {
        let repo = OwnedRepository::<Post>::new(setup().await);
        let post = repo
            .create(&ann(), payload(json!({"title": " t ", "body": "b", "owner": "bob"})))
            .await
            .unwrap();

        assert_eq!(post.owner, ann());
        assert_eq!(post.title, "t");
        assert!(!post.completed);
        assert!(post.created_at.is_some());
    }

    #[tokio::test]
    async fn test_create_requires_fields() {
        let repo = OwnedRepository::<Post>::new(setup().await);
        let err = repo.create(&ann(), payload(json!({"title": "t"}))).await.unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.has("body"));
    }

    #[tokio::test]
    async fn test_foreign_document_is_not_found() {
        let repo = OwnedRepository::<Post>::new(setup().await);
        let post = repo
            .create(&ann(), payload(json!({"title": "t", "body": "b"})))
            .await
            .unwrap();

        assert!(matches!(repo.get(&bob(), &post.id).await, Err(Error::NotFound)));
        assert!(matches!(
            repo.update(&bob(), &post.id, payload(json!({"title": "x"}))).await,
            Err(Error::NotFound)
        ));
        assert!(matches!(repo.delete(&bob(), &post.id).await, Err(Error::NotFound)));
        assert!(matches!(
            repo.get(&bob(), &DocumentId::new("does-not-exist")).await,
            Err(Error::NotFound)
        ));

        // untouched for the real owner
        let still = repo.get(&ann(), &post.id).await.unwrap();
        assert_eq!(still.title, "t");
    }

    #[tokio::test]
    async fn test_update_restricted_fields() {
        let repo = OwnedRepository::<Post>::new(setup().await);
        let post = repo
            .create(&ann(), payload(json!({"title": "t", "body": "b"})))
            .await
            .unwrap();

        for forbidden in [json!({"completed": true}), json!({"owner": "bob"}), json!({"title": "x", "owner": "bob"})] {
            let err = repo.update(&ann(), &post.id, payload(forbidden)).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }

        let unchanged = repo.get(&ann(), &post.id).await.unwrap();
        assert_eq!(unchanged, post);
    }

    #[tokio::test]
    async fn test_update_applies_only_given_fields() {
        let repo = OwnedRepository::<Post>::new(setup().await);
        let post = repo
            .create(&ann(), payload(json!({"title": "t", "body": "b"})))
            .await
            .unwrap();

        let updated = repo
            .update(&ann(), &post.id, payload(json!({"title": "new"})))
            .await
            .unwrap();
        assert_eq!(updated.title, "new");
        assert_eq!(updated.body, "b");
        assert_eq!(updated.owner, ann());
        assert_eq!(updated.created_at, post.created_at);
    }

    #[tokio::test]
    async fn test_empty_update_is_noop() {
        let repo = OwnedRepository::<Comment>::new(setup().await);
        let comment = repo
            .create(&ann(), payload(json!({"body": "hello"})))
            .await
            .unwrap();

        let same = repo.update(&ann(), &comment.id, Map::new()).await.unwrap();
        assert_eq!(same, comment);
    }

    #[tokio::test]
    async fn test_comment_title_is_not_updatable() {
        let repo = OwnedRepository::<Comment>::new(setup().await);
        let comment = repo
            .create(&ann(), payload(json!({"body": "hello"})))
            .await
            .unwrap();

        let err = repo
            .update(&ann(), &comment.id, payload(json!({"title": "x"})))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_is_scoped_filtered_sorted_paginated() {
        let repo = OwnedRepository::<Post>::new(setup().await);
        for (title, completed) in [("c", false), ("a", true), ("b", false)] {
            repo.create(
                &ann(),
                payload(json!({"title": title, "body": "x", "completed": completed})),
            )
            .await
            .unwrap();
        }
        repo.create(&bob(), payload(json!({"title": "z", "body": "x"})))
            .await
            .unwrap();

        let all = repo.list(&ann(), &ListQuery::default()).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.iter().all(|p| p.owner == ann()));

        let open = repo
            .list(&ann(), &ListQuery { completed: Some(false), ..Default::default() })
            .await
            .unwrap();
        assert_eq!(open.len(), 2);
        assert!(open.iter().all(|p| !p.completed));

        let sorted = repo
            .list(&ann(), &ListQuery { sort: Some(("title", SortOrder::Desc)), ..Default::default() })
            .await
            .unwrap();
        let titles: Vec<&str> = sorted.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(titles, vec!["c", "b", "a"]);

        let params = ListParams {
            sort_by: Some("title:asc".to_string()),
            limit: Some("1".to_string()),
            skip: Some("1".to_string()),
            ..Default::default()
        };
        let page = repo
            .list(&ann(), &ListQuery::parse::<Post>(&params).unwrap())
            .await
            .unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].title, "b");
    }

    #[tokio::test]
    async fn test_delete_and_count() {
        let repo = OwnedRepository::<Comment>::new(setup().await);
        let comment = repo
            .create(&ann(), payload(json!({"body": "hello"})))
            .await
            .unwrap();
        assert_eq!(repo.count(&ann()).await.unwrap(), 1);

        let deleted = repo.delete(&ann(), &comment.id).await.unwrap();
        assert_eq!(deleted.id, comment.id);
        assert_eq!(repo.count(&ann()).await.unwrap(), 0);
        assert!(matches!(repo.get(&ann(), &comment.id).await, Err(Error::NotFound)));
    }
}
