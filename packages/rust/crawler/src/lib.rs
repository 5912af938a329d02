//! Sequential, scope-aware documentation crawler.
//!
//! The crawler starts from a given URL and performs a breadth-first
//! traversal bounded by depth and hostname. Every stage for a page — fetch,
//! extract, chunk, persist — completes before the next frontier entry is
//! dequeued; a flat inter-request delay is the only concurrency control.
//! Fetch failures are contained as recorded errors, and a crawl counts as
//! successful when at least one page was downloaded.

pub mod assets;
pub mod engine;
pub mod fetch;
pub mod frontier;
pub mod output;
pub mod specdetect;

pub use engine::{CrawlOutcome, CrawlStatus, Crawler};
pub use fetch::{FetchedBody, Fetcher};
pub use frontier::{CrawlState, FrontierEntry, StopHandle, normalize_page_url};
pub use output::{DownloadedFile, OutputLayout};
pub use specdetect::{OperationsDoc, SpecFormat, SpecOperation, SpecRegistry};
