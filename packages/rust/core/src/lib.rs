//! Research pipeline orchestration and domain logic for researcher.
//!
//! This crate ties query analysis, search/crawl/scrape gathering, the
//! in-memory vector index, document selection and report synthesis into
//! end-to-end workflows (`Researcher::run`, `run_brief`). Every network
//! concern is reached through the collaborator traits in `researcher-shared`.

pub mod brief;
pub mod gather;
pub mod index;
pub mod pipeline;
pub mod query;
pub mod report;
pub mod selection;

#[cfg(test)]
mod testing;

pub use brief::{ArticleSummary, Brief, run_brief};
pub use gather::{Gathered, HomepagePredicate, SearchAndScrape, is_homepage_path};
pub use index::VectorIndex;
pub use pipeline::{ResearchProgress, Researcher, SilentProgress};
pub use query::{QueryPlan, analyze_query};
pub use report::{Citation, Rating, RelevanceRow, ResearchReport, synthesize_report};
pub use selection::{ScoredCandidate, Selection, select};
