pub mod catalog;
pub mod preferences;
pub mod user;

pub use catalog::{
    CatalogFilter, CatalogItem, MovieSummary, TmdbGenre, TmdbGenreList, TmdbMovie, TmdbPage,
};
pub use preferences::{PreferenceRecord, PreferenceRequest, YearRange};
pub use user::{validate_user_id, NewUser, User};
