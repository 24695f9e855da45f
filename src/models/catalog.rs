use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::YearRange;

/// A movie as returned by a catalog provider, before it is embedded
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MovieSummary {
    pub id: i64,
    pub title: String,
    pub overview: String,
    pub release_date: Option<String>,
    pub rating: Option<f64>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    pub tag_ids: Vec<u32>,
}

/// A catalog entry persisted locally together with its synopsis embedding
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CatalogItem {
    pub id: i64,
    pub title: String,
    pub synopsis: String,
    pub tag_ids: Vec<u32>,
    pub tags: Vec<String>,
    pub release_date: Option<String>,
    pub rating: Option<f64>,
    pub popularity: Option<f64>,
    pub poster_path: Option<String>,
    #[serde(skip_serializing)]
    pub embedding: Vec<f32>,
}

impl CatalogItem {
    /// Builds a catalog entry from a provider movie, its resolved tag names and
    /// the embedding of its overview
    pub fn from_summary(movie: MovieSummary, tags: Vec<String>, embedding: Vec<f32>) -> Self {
        Self {
            id: movie.id,
            title: movie.title,
            synopsis: movie.overview,
            tag_ids: movie.tag_ids,
            tags,
            release_date: movie.release_date,
            rating: movie.rating,
            popularity: movie.popularity,
            poster_path: movie.poster_path,
            embedding,
        }
    }

    /// Release year taken from the first four characters of the release date
    pub fn release_year(&self) -> Option<i32> {
        self.release_date
            .as_deref()
            .and_then(|date| date.get(..4))
            .and_then(|year| year.parse().ok())
    }
}

/// Structured filters applied to the catalog before ranking
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogFilter {
    /// Keep items sharing at least one tag; empty means no tag filter
    pub tags: BTreeSet<String>,
    pub year_range: Option<YearRange>,
    pub rating_min: Option<f64>,
}

impl CatalogFilter {
    pub fn matches(&self, item: &CatalogItem) -> bool {
        if !self.tags.is_empty() && !item.tags.iter().any(|tag| self.tags.contains(tag)) {
            return false;
        }

        if let Some(range) = self.year_range {
            match item.release_year() {
                Some(year) if range.contains(year) => {}
                _ => return false,
            }
        }

        if let Some(floor) = self.rating_min {
            match item.rating {
                Some(rating) if rating >= floor => {}
                _ => return false,
            }
        }

        true
    }
}

// ============================================================================
// TMDB API Types
// ============================================================================

/// Movie entry as returned by TMDB search and trending endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct TmdbMovie {
    pub id: i64,
    pub title: String,
    #[serde(default)]
    pub overview: Option<String>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub vote_average: Option<f64>,
    #[serde(default)]
    pub popularity: Option<f64>,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default)]
    pub genre_ids: Vec<u32>,
}

impl From<TmdbMovie> for MovieSummary {
    fn from(movie: TmdbMovie) -> Self {
        // TMDB reports unknown release dates as an empty string
        let release_date = movie.release_date.filter(|date| !date.trim().is_empty());

        MovieSummary {
            id: movie.id,
            title: movie.title,
            overview: movie.overview.unwrap_or_default().trim().to_string(),
            release_date,
            rating: movie.vote_average,
            popularity: movie.popularity,
            poster_path: movie.poster_path,
            tag_ids: movie.genre_ids,
        }
    }
}

/// Paged result envelope shared by TMDB list endpoints
#[derive(Debug, Deserialize)]
pub struct TmdbPage {
    #[serde(default)]
    pub results: Vec<TmdbMovie>,
}

#[derive(Debug, Deserialize)]
pub struct TmdbGenre {
    pub id: u32,
    pub name: String,
}

/// Response of the TMDB genre list endpoint
#[derive(Debug, Deserialize)]
pub struct TmdbGenreList {
    pub genres: Vec<TmdbGenre>,
}

impl From<TmdbGenreList> for HashMap<u32, String> {
    fn from(list: TmdbGenreList) -> Self {
        list.genres.into_iter().map(|g| (g.id, g.name)).collect()
    }
}
