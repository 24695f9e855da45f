use super::store::{from_json, parse_timestamp, to_json, Store};
use crate::{
    error::AppResult,
    models::{PreferenceRecord, YearRange},
};

#[derive(sqlx::FromRow)]
struct PreferenceRow {
    user_id: String,
    tags: String,
    favourite_titles: String,
    preference_text: String,
    year_start: i64,
    year_end: i64,
    rating_min: Option<f64>,
    embedding: Option<String>,
    last_updated: String,
}

impl PreferenceRow {
    fn into_record(self, include_embedding: bool) -> AppResult<PreferenceRecord> {
        let embedding = match self.embedding {
            Some(raw) if include_embedding => Some(from_json(&raw)?),
            _ => None,
        };

        Ok(PreferenceRecord {
            user_id: self.user_id,
            tags: from_json(&self.tags)?,
            favourite_titles: from_json(&self.favourite_titles)?,
            year_range: YearRange::new(self.year_start as i32, self.year_end as i32)?,
            rating_min: self.rating_min,
            preference_text: self.preference_text,
            embedding,
            last_updated: parse_timestamp(&self.last_updated)?,
        })
    }
}

impl Store {
    /// Replaces the stored preferences of `record.user_id`
    ///
    /// The user row is created first if it does not exist. The two writes are
    /// separate commits; a user left without preferences is harmless.
    pub async fn set_preferences(&self, record: &PreferenceRecord) -> AppResult<()> {
        self.ensure_user(&record.user_id).await?;

        let embedding = record.embedding.as_ref().map(to_json).transpose()?;

        sqlx::query(
            r#"
            INSERT INTO preferences
                (user_id, tags, favourite_titles, preference_text, year_start, year_end,
                 rating_min, embedding, last_updated)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                tags = excluded.tags,
                favourite_titles = excluded.favourite_titles,
                preference_text = excluded.preference_text,
                year_start = excluded.year_start,
                year_end = excluded.year_end,
                rating_min = excluded.rating_min,
                embedding = excluded.embedding,
                last_updated = excluded.last_updated
            "#,
        )
        .bind(&record.user_id)
        .bind(to_json(&record.tags)?)
        .bind(to_json(&record.favourite_titles)?)
        .bind(&record.preference_text)
        .bind(record.year_range.start())
        .bind(record.year_range.end())
        .bind(record.rating_min)
        .bind(embedding)
        .bind(record.last_updated.to_rfc3339())
        .execute(self.pool())
        .await?;

        tracing::info!(
            user_id = %record.user_id,
            tags = record.tags.len(),
            titles = record.favourite_titles.len(),
            has_embedding = record.embedding.is_some(),
            "Preferences stored"
        );

        Ok(())
    }

    /// Loads the preferences of a user; the embedding is only decoded on request
    pub async fn get_preferences(
        &self,
        user_id: &str,
        include_embedding: bool,
    ) -> AppResult<Option<PreferenceRecord>> {
        let row = sqlx::query_as::<_, PreferenceRow>(
            r#"
            SELECT user_id, tags, favourite_titles, preference_text, year_start, year_end,
                   rating_min, embedding, last_updated
            FROM preferences
            WHERE user_id = ?
            "#,
        )
        .bind(user_id)
        .fetch_optional(self.pool())
        .await?;

        row.map(|r| r.into_record(include_embedding)).transpose()
    }
}
