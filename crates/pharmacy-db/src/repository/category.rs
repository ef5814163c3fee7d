//! # Category Repository
//!
//! Read access to the category tree. Top-level categories have
//! `parent_id = 0`.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use crate::repository::like_pattern;
use pharmacy_core::Category;

const COLUMNS: &str = "id, name, parent_id, sort_order, description";

#[derive(Debug, Clone)]
pub struct CategoryRepository {
    pool: SqlitePool,
}

impl CategoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CategoryRepository { pool }
    }

    /// All categories in display order.
    pub async fn list(&self) -> DbResult<Vec<Category>> {
        let sql = format!("SELECT {COLUMNS} FROM categories ORDER BY sort_order, id");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn get(&self, id: i64) -> DbResult<Option<Category>> {
        let sql = format!("SELECT {COLUMNS} FROM categories WHERE id = ?1");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Direct children of a category. `0` lists the top level.
    pub async fn children(&self, parent_id: i64) -> DbResult<Vec<Category>> {
        let sql = format!(
            "SELECT {COLUMNS} FROM categories WHERE parent_id = ?1 ORDER BY sort_order, id"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?)
    }

    pub async fn top_level(&self) -> DbResult<Vec<Category>> {
        self.children(0).await
    }

    /// Exact, case-sensitive name match.
    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<Category>> {
        let sql = format!("SELECT {COLUMNS} FROM categories WHERE name = ?1 ORDER BY id LIMIT 1");
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await?)
    }

    /// Categories whose name contains the keyword.
    pub async fn search(&self, keyword: &str) -> DbResult<Vec<Category>> {
        debug!(keyword = %keyword, "Searching categories");
        let sql = format!(
            "SELECT {COLUMNS} FROM categories WHERE name LIKE ?1 ESCAPE '\\' ORDER BY sort_order, id"
        );
        Ok(sqlx::query_as::<_, Category>(&sql)
            .bind(like_pattern(keyword))
            .fetch_all(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support;

    #[tokio::test]
    async fn test_seeded_tree() {
        let db = test_support::db().await;
        let repo = db.categories();

        let all = repo.list().await.unwrap();
        assert_eq!(all.len(), 4);
        assert_eq!(repo.top_level().await.unwrap().len(), 4);
        assert!(repo.children(1).await.unwrap().is_empty());

        let otc = repo.get(2).await.unwrap().unwrap();
        assert_eq!(otc.name, "OTC");
        assert_eq!(repo.find_by_name("OTC").await.unwrap().map(|c| c.id), Some(2));
        assert!(repo.get(99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_search_by_keyword() {
        let db = test_support::db().await;
        let hits = db.categories().search("Medical").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 4);
    }
}
