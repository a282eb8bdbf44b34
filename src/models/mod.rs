pub mod keyword;

pub use keyword::{KeywordCandidate, KeywordMetrics, Source, Topic};
