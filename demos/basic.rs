//! Basic example demonstrating Stratus Rust SDK usage.

use serde_json::json;
use stratus::{Container, Database, Geolocation, Query, Record, PUBLIC_DB};

#[tokio::main]
async fn main() -> stratus::Result<()> {
  let container = Container::new("https://api.example.com").with_api_key("my-api-key");
  let db = Database::new(PUBLIC_DB)?;

  // Build a query against the `note` record type
  let mut query = Query::new("note")?
    .equal_to("category", "food")
    .greater_than("rating", 3)
    .distance_less_than("location", Geolocation::new(22.28, 114.15)?, 5000)
    .add_descending("rating");
  query.limit = 20;

  println!("Wire payload: {}", query.to_wire());
  println!("Cache key: {}", query.hash());

  // A previous run of the same query may be cached locally
  if let Some(cached) = db.cached_query(&query) {
    println!("Cached result: {} records", cached.len());
  }

  // Fetch from the server (refreshes the cache on success)
  match db.query(&container, &query).await {
    Ok(result) => {
      println!("Fetched {} records", result.len());
      for record in result.iter() {
        println!("  {} -> {:?}", record.id(), record.get("category"));
      }
    }
    Err(err) => println!("Query failed (is a server running?): {}", err),
  }

  // Save a record
  let mut note = Record::new("note")?;
  note.set("category", "food")?;
  note.set("rating", json!(5))?;
  match db.save(&container, &note).await {
    Ok(saved) => println!("Saved record: {}", saved.id()),
    Err(err) => println!("Save failed: {}", err),
  }

  Ok(())
}
