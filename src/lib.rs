//! Stratus Rust Client SDK
//!
//! A client for the Stratus backend-as-a-service: record and query models,
//! a REST transport container, a local query-result cache, and pub/sub
//! channel bookkeeping.
//!
//! # Example
//!
//! ```no_run
//! use stratus::{Container, Database, Query, PUBLIC_DB};
//!
//! #[tokio::main]
//! async fn main() -> stratus::Result<()> {
//!     let container = Container::new("https://api.example.com").with_api_key("api-key");
//!     let db = Database::new(PUBLIC_DB)?;
//!
//!     // Build a query against the `note` record type
//!     let query = Query::new("note")?
//!         .equal_to("category", "food")
//!         .greater_than("rating", 3)
//!         .add_descending("rating");
//!
//!     // A previous run may already be cached locally
//!     if let Some(cached) = db.cached_query(&query) {
//!         println!("cached: {} records", cached.len());
//!     }
//!
//!     // Fetch from the server (and refresh the cache)
//!     let result = db.query(&container, &query).await?;
//!     for record in result.iter() {
//!         println!("{}: {:?}", record.id(), record.get("category"));
//!     }
//!
//!     Ok(())
//! }
//! ```

mod asset;
mod cache;
mod container;
mod database;
mod error;
pub mod expr;
mod geo;
pub mod pubsub;
mod query;
mod record;
mod reference;
mod relation;
pub mod value;

pub use asset::Asset;
pub use cache::{CacheOptions, QueryCache};
pub use container::Container;
pub use database::{Database, QueryResult, PRIVATE_DB, PUBLIC_DB, UNION_DB};
pub use error::{Error, Result};
pub use expr::{CompareOp, Expr};
pub use geo::Geolocation;
pub use query::{Query, SortOrder};
pub use record::Record;
pub use reference::Reference;
pub use relation::{Direction, Relation};
