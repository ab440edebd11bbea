use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::application::repos::{
    CreateEntryParams, EntriesRepo, EntryListQuery, Neighbors, RepoError, UpdateEntryParams,
};
use crate::domain::entities::EntryRecord;

use super::{PostgresRepositories, map_sqlx_error};

const ENTRY_COLUMNS: &str = "id, author, title, slug, body, published, updated, tags";

#[derive(sqlx::FromRow)]
struct EntryRow {
    id: Uuid,
    author: String,
    title: String,
    slug: String,
    body: String,
    published: OffsetDateTime,
    updated: OffsetDateTime,
    tags: Vec<String>,
}

impl From<EntryRow> for EntryRecord {
    fn from(row: EntryRow) -> Self {
        Self {
            id: row.id,
            author: row.author,
            title: row.title,
            slug: row.slug,
            body: row.body,
            published: row.published,
            updated: row.updated,
            tags: row.tags.into_iter().collect(),
        }
    }
}

impl PostgresRepositories {
    fn push_tag_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, tag: Option<&'q str>) {
        if let Some(tag) = tag {
            qb.push(" AND ");
            qb.push_bind(tag);
            qb.push(" = ANY(tags)");
        }
    }

    async fn fetch_one_where(
        &self,
        condition: &str,
        order: &str,
        published: OffsetDateTime,
    ) -> Result<Option<EntryRecord>, RepoError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE published {condition} $1 \
             ORDER BY published {order} LIMIT 1"
        );
        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(published)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(EntryRecord::from))
    }
}

#[async_trait]
impl EntriesRepo for PostgresRepositories {
    async fn create_entry(&self, params: CreateEntryParams) -> Result<EntryRecord, RepoError> {
        let CreateEntryParams {
            author,
            title,
            slug,
            body,
            tags,
        } = params;
        let tags = tags.into_iter().collect::<Vec<_>>();

        let sql = format!(
            "INSERT INTO entries (id, author, title, slug, body, tags, published, updated) \
             SELECT $1, $2, $3, $4, $5, $6, now.ts, now.ts \
             FROM (SELECT clock_timestamp() AS ts) AS now \
             RETURNING {ENTRY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(Uuid::new_v4())
            .bind(author)
            .bind(title)
            .bind(slug)
            .bind(body)
            .bind(tags)
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.into())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<EntryRecord>, RepoError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = $1");
        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(id)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(EntryRecord::from))
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<EntryRecord>, RepoError> {
        let sql = format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE slug = $1 ORDER BY published ASC LIMIT 1"
        );
        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(slug)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(row.map(EntryRecord::from))
    }

    async fn list_entries(&self, query: &EntryListQuery) -> Result<Vec<EntryRecord>, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT ");
        qb.push(ENTRY_COLUMNS);
        qb.push(" FROM entries WHERE 1=1");
        Self::push_tag_filter(&mut qb, query.tag.as_deref());
        qb.push(" ORDER BY published DESC");

        if let Some(limit) = query.limit {
            qb.push(" LIMIT ");
            qb.push_bind(Self::convert_bound(limit)?);
        }
        if query.offset > 0 {
            qb.push(" OFFSET ");
            qb.push_bind(Self::convert_bound(query.offset)?);
        }

        let rows = qb
            .build_query_as::<EntryRow>()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(EntryRecord::from).collect())
    }

    async fn count_entries(&self, tag: Option<&str>) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM entries WHERE 1=1");
        Self::push_tag_filter(&mut qb, tag);

        let count: i64 = qb
            .build_query_scalar()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_neighbors(&self, published: OffsetDateTime) -> Result<Neighbors, RepoError> {
        let previous = self.fetch_one_where("<", "DESC", published).await?;
        let next = self.fetch_one_where(">", "ASC", published).await?;
        Ok(Neighbors { previous, next })
    }

    async fn update_entry(
        &self,
        params: UpdateEntryParams,
    ) -> Result<Option<EntryRecord>, RepoError> {
        let UpdateEntryParams {
            id,
            title,
            body,
            tags,
        } = params;
        let tags = tags.into_iter().collect::<Vec<_>>();

        let sql = format!(
            "UPDATE entries \
             SET title = $2, body = $3, tags = $4, updated = GREATEST(clock_timestamp(), updated) \
             WHERE id = $1 \
             RETURNING {ENTRY_COLUMNS}"
        );
        let row = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(id)
            .bind(title)
            .bind(body)
            .bind(tags)
            .fetch_optional(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(row.map(EntryRecord::from))
    }

    async fn delete_entry(&self, id: Uuid) -> Result<bool, RepoError> {
        let result = sqlx::query("DELETE FROM entries WHERE id = $1")
            .bind(id)
            .execute(self.pool())
            .await
            .map_err(map_sqlx_error)?;
        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), RepoError> {
        self.ping().await.map_err(map_sqlx_error)
    }
}
