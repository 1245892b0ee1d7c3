mod period;
mod ranker;

pub use period::{PopularityPeriod, SECONDS_PER_DAY};
pub use ranker::{PopularityQuery, PopularityRanker, RankedSong};
