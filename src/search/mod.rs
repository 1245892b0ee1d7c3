mod factory;
mod fts5_levenshtein_index;
mod levenshtein;
mod search_index;

pub use factory::create_search_index;
pub use fts5_levenshtein_index::{Fts5LevenshteinSearchIndex, SearchTuning};
pub use levenshtein::{levenshtein_distance, Vocabulary};
pub use search_index::*;
