use chrono::Utc;

use super::store::{from_json, to_json, Store};
use crate::{
    error::AppResult,
    models::{CatalogFilter, CatalogItem},
};

#[derive(sqlx::FromRow)]
struct CatalogRow {
    item_id: i64,
    title: String,
    synopsis: String,
    tag_ids: String,
    tags: String,
    release_date: Option<String>,
    rating: Option<f64>,
    popularity: Option<f64>,
    poster_path: Option<String>,
    embedding: String,
}

impl CatalogRow {
    fn into_item(self) -> AppResult<CatalogItem> {
        Ok(CatalogItem {
            id: self.item_id,
            title: self.title,
            synopsis: self.synopsis,
            tag_ids: from_json(&self.tag_ids)?,
            tags: from_json(&self.tags)?,
            release_date: self.release_date,
            rating: self.rating,
            popularity: self.popularity,
            poster_path: self.poster_path,
            embedding: from_json(&self.embedding)?,
        })
    }
}

impl Store {
    /// Inserts a catalog item unless one with the same id already exists
    ///
    /// Returns `true` when a row was written. Existing items are never updated.
    pub async fn upsert_catalog_item(&self, item: &CatalogItem) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO catalog_items
                (item_id, title, synopsis, tag_ids, tags, release_date, rating,
                 popularity, poster_path, embedding, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(item_id) DO NOTHING
            "#,
        )
        .bind(item.id)
        .bind(&item.title)
        .bind(&item.synopsis)
        .bind(to_json(&item.tag_ids)?)
        .bind(to_json(&item.tags)?)
        .bind(&item.release_date)
        .bind(item.rating)
        .bind(item.popularity)
        .bind(&item.poster_path)
        .bind(to_json(&item.embedding)?)
        .bind(Utc::now().to_rfc3339())
        .execute(self.pool())
        .await?;

        let inserted = result.rows_affected() == 1;
        tracing::debug!(item_id = item.id, inserted, "Catalog upsert");
        Ok(inserted)
    }

    pub async fn catalog_item_exists(&self, item_id: i64) -> AppResult<bool> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM catalog_items WHERE item_id = ?)")
                .bind(item_id)
                .fetch_one(self.pool())
                .await?;
        Ok(exists)
    }

    /// Returns the catalog items passing `filter`, in insertion order
    ///
    /// Rows whose JSON columns cannot be decoded are logged and left out.
    pub async fn query_catalog(&self, filter: &CatalogFilter) -> AppResult<Vec<CatalogItem>> {
        let rows = sqlx::query_as::<_, CatalogRow>(
            r#"
            SELECT item_id, title, synopsis, tag_ids, tags, release_date, rating,
                   popularity, poster_path, embedding
            FROM catalog_items
            ORDER BY seq
            "#,
        )
        .fetch_all(self.pool())
        .await?;

        let scanned = rows.len();
        let items: Vec<CatalogItem> = rows
            .into_iter()
            .filter_map(|row| {
                let item_id = row.item_id;
                match row.into_item() {
                    Ok(item) => Some(item),
                    Err(e) => {
                        tracing::warn!(item_id, error = %e, "Skipping unreadable catalog row");
                        None
                    }
                }
            })
            .filter(|item| filter.matches(item))
            .collect();

        tracing::debug!(scanned, matched = items.len(), "Catalog queried");
        Ok(items)
    }

    pub async fn catalog_size(&self) -> AppResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM catalog_items")
            .fetch_one(self.pool())
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::create_memory_pool;
    use crate::models::YearRange;

    async fn store() -> Store {
        Store::new(create_memory_pool().await.unwrap())
    }

    fn item(id: i64, title: &str, release_date: &str, tags: &[&str]) -> CatalogItem {
        CatalogItem {
            id,
            title: title.to_string(),
            synopsis: format!("Synopsis of {}", title),
            tag_ids: vec![878],
            tags: tags.iter().map(|t| t.to_string()).collect(),
            release_date: Some(release_date.to_string()),
            rating: Some(7.5),
            popularity: Some(120.25),
            poster_path: Some("/poster.jpg".to_string()),
            embedding: vec![0.5, -0.25, 1.0],
        }
    }

    #[tokio::test]
    async fn test_upsert_then_query_round_trip() {
        let store = store().await;
        let movie = item(27205, "Inception", "2010-07-15", &["Science Fiction"]);

        assert!(store.upsert_catalog_item(&movie).await.unwrap());

        let items = store.query_catalog(&CatalogFilter::default()).await.unwrap();
        assert_eq!(items, vec![movie]);
    }

    #[tokio::test]
    async fn test_duplicate_id_keeps_first_seen_data() {
        let store = store().await;
        let original = item(1, "Original", "2001-01-01", &["Drama"]);
        let mut duplicate = item(1, "Changed", "2002-02-02", &["Comedy"]);
        duplicate.embedding = vec![9.0, 9.0, 9.0];

        assert!(store.upsert_catalog_item(&original).await.unwrap());
        assert!(!store.upsert_catalog_item(&duplicate).await.unwrap());

        let items = store.query_catalog(&CatalogFilter::default()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Original");
        assert_eq!(items[0].embedding, original.embedding);
        assert_eq!(store.catalog_size().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_exists_check() {
        let store = store().await;
        assert!(!store.catalog_item_exists(5).await.unwrap());
        store
            .upsert_catalog_item(&item(5, "Five", "2015-05-05", &[]))
            .await
            .unwrap();
        assert!(store.catalog_item_exists(5).await.unwrap());
    }

    #[tokio::test]
    async fn test_query_preserves_insertion_order() {
        let store = store().await;
        for (id, title) in [(30, "C"), (10, "A"), (20, "B")] {
            store
                .upsert_catalog_item(&item(id, title, "2020-01-01", &[]))
                .await
                .unwrap();
        }

        let ids: Vec<i64> = store
            .query_catalog(&CatalogFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![30, 10, 20]);
    }

    #[tokio::test]
    async fn test_query_applies_filters() {
        let store = store().await;
        store
            .upsert_catalog_item(&item(1, "Old", "1990-06-01", &["Horror"]))
            .await
            .unwrap();
        store
            .upsert_catalog_item(&item(2, "Mid", "2005-06-01", &["Comedy"]))
            .await
            .unwrap();
        store
            .upsert_catalog_item(&item(3, "New", "2020-06-01", &["Horror", "Drama"]))
            .await
            .unwrap();

        let filter = CatalogFilter {
            tags: ["Horror".to_string()].into_iter().collect(),
            year_range: Some(YearRange::new(2000, 2025).unwrap()),
            rating_min: None,
        };
        let ids: Vec<i64> = store
            .query_catalog(&filter)
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec![3]);
    }
}
