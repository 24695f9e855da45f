pub mod ingest;
pub mod preferences;
pub mod providers;
pub mod recommendations;
pub mod similarity;
pub mod tags;

pub use ingest::{spawn_ingest_schedule, CatalogIngestor, IngestReport, IngestSchedulerHandle};
pub use preferences::PreferenceExtractor;
pub use recommendations::{Recommender, SuggestionRequest, Suggestions};
pub use similarity::{cosine_similarity, rank, ScoredItem};
pub use tags::TagResolver;
