//! # forum-harvest
//!
//! A rate-limited, resumable crawler for SMF forums such as bitcointalk.org.
//!
//! ## Architecture
//!
//! Every board, member profile and topic is resolved at most once per run:
//!
//! ```text
//! MemoCache? ──hit──→ Store
//!     │miss
//!     ▼
//! Fetcher (RateLimiter) → EntityParser → Store → MemoCache
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! # Resolve one board and print it
//! forum-harvest board 74
//!
//! # Crawl topics 1 to 50 with their boards, messages and authors
//! forum-harvest crawl-topics --start 1 --end 50
//!
//! # Inspect what is stored
//! forum-harvest show topic 14
//! forum-harvest stats
//! ```

/// Application context and error handling.
///
/// The [`AppContext`](app::AppContext) struct wires together all components:
/// store, fetcher, parser, and hands out primed coordinators.
pub mod app;

/// Raw copies of fetched pages.
pub mod archive;

/// Which ids are already stored, primed once per session.
pub mod cache;

/// Command-line interface using clap.
///
/// - `board|member|topic <id> [--refresh]` - Resolve one entity
/// - `messages <topic> <page>` - Scrape one page of messages
/// - `crawl-topics --start <id> --end <id>` - Crawl a topic range
/// - `show <kind> <id>` - Print a stored record
/// - `stats` - Stored row counts
pub mod cli;

/// Configuration loaded from `~/.config/forum-harvest/config.toml`.
pub mod config;

/// The resolution state machine.
///
/// - [`ScrapeCoordinator`](coordinator::ScrapeCoordinator): check, fetch, parse, persist, commit
/// - [`Entity`](coordinator::Entity): per-kind request, parse, persist and load
pub mod coordinator;

/// Topic range crawl driver with skip-and-continue error policy.
pub mod crawl;

/// Core domain models.
///
/// - [`Board`](domain::Board), [`Member`](domain::Member), [`Topic`](domain::Topic)
/// - [`Message`](domain::Message): always stored as part of a topic page
/// - [`EntityKind`](domain::EntityKind) and [`Record`](domain::Record)
pub mod domain;

/// Rate-limited HTTP fetching.
///
/// - [`Fetcher`](fetcher::Fetcher): Async trait for page retrieval
/// - [`HttpFetcher`](fetcher::HttpFetcher): reqwest-based implementation
/// - [`RateLimiter`](fetcher::RateLimiter): jittered minimum spacing
pub mod fetcher;

/// HTML page parsing.
pub mod parser;

/// SQLite persistence layer.
///
/// - [`Store`](store::Store): Trait defining storage operations
/// - [`SqliteStore`](store::SqliteStore): SQLite implementation
pub mod store;
