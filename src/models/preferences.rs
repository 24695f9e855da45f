use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::error::{AppError, AppResult};

/// Earliest year of the default preferred range
pub const DEFAULT_START_YEAR: i32 = 1900;

const MAX_FAVOURITE_TITLES: usize = 20;
const MAX_TITLE_LENGTH: usize = 200;
const MAX_TAGS: usize = 30;

/// Closed interval of release years, always `start <= end`
///
/// Serialized as a two element array (`[1990, 2005]`); reversed bounds are
/// rejected while deserializing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "(i32, i32)", into = "(i32, i32)")]
pub struct YearRange {
    start: i32,
    end: i32,
}

impl YearRange {
    pub fn new(start: i32, end: i32) -> AppResult<Self> {
        if start > end {
            return Err(AppError::InvalidInput(format!(
                "Year range start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> i32 {
        self.start
    }

    pub fn end(&self) -> i32 {
        self.end
    }

    pub fn contains(&self, year: i32) -> bool {
        self.start <= year && year <= self.end
    }
}

impl Default for YearRange {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_YEAR,
            end: Utc::now().year().max(DEFAULT_START_YEAR),
        }
    }
}

impl TryFrom<(i32, i32)> for YearRange {
    type Error = AppError;

    fn try_from((start, end): (i32, i32)) -> AppResult<Self> {
        Self::new(start, end)
    }
}

impl From<YearRange> for (i32, i32) {
    fn from(range: YearRange) -> Self {
        (range.start, range.end)
    }
}

/// Stored movie preferences of a single user; a write replaces the previous record
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PreferenceRecord {
    pub user_id: String,
    pub tags: BTreeSet<String>,
    pub favourite_titles: BTreeSet<String>,
    pub year_range: YearRange,
    pub rating_min: Option<f64>,
    /// Synopses of the resolved favourites, separated by blank lines
    pub preference_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
    pub last_updated: DateTime<Utc>,
}

/// Preferences stated by a user, as received from the conversational front-end
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PreferenceRequest {
    #[serde(default)]
    pub favourite_titles: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub year_range: Option<YearRange>,
    #[serde(default)]
    pub rating_min: Option<f64>,
}

impl PreferenceRequest {
    /// Rejects payloads that cannot produce a meaningful preference record
    pub fn validate(&self) -> AppResult<()> {
        if self.favourite_titles.is_empty() && self.tags.is_empty() {
            return Err(AppError::InvalidInput(
                "At least one favourite title or tag is required".to_string(),
            ));
        }

        if self.favourite_titles.len() > MAX_FAVOURITE_TITLES {
            return Err(AppError::InvalidInput(format!(
                "At most {} favourite titles are accepted",
                MAX_FAVOURITE_TITLES
            )));
        }

        if self.tags.len() > MAX_TAGS {
            return Err(AppError::InvalidInput(format!(
                "At most {} tags are accepted",
                MAX_TAGS
            )));
        }

        for title in &self.favourite_titles {
            let trimmed = title.trim();
            if trimmed.is_empty() {
                return Err(AppError::InvalidInput(
                    "Favourite titles cannot be blank".to_string(),
                ));
            }
            if trimmed.chars().count() > MAX_TITLE_LENGTH {
                return Err(AppError::InvalidInput(format!(
                    "Favourite titles must be at most {} characters",
                    MAX_TITLE_LENGTH
                )));
            }
        }

        if self.tags.iter().any(|tag| tag.trim().is_empty()) {
            return Err(AppError::InvalidInput("Tags cannot be blank".to_string()));
        }

        if let Some(rating) = self.rating_min {
            if !rating.is_finite() {
                return Err(AppError::InvalidInput(
                    "Minimum rating must be a finite number".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Trimmed, deduplicated favourite titles
    pub fn titles(&self) -> BTreeSet<String> {
        self.favourite_titles
            .iter()
            .map(|t| t.trim().to_string())
            .collect()
    }

    /// Trimmed, deduplicated explicit tags
    pub fn explicit_tags(&self) -> BTreeSet<String> {
        self.tags.iter().map(|t| t.trim().to_string()).collect()
    }
}
