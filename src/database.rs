//! Record databases scoped to a visibility domain.
//!
//! A database pairs a database id with a local query-result cache. Fetches
//! go through the container; the raw response body of every query is stored
//! under the query's content hash so `cached_query` can serve it before the
//! next network round trip.

use std::sync::Mutex;

use serde_json::{json, Map, Value};

use crate::cache::{CacheOptions, QueryCache};
use crate::container::Container;
use crate::error::{Error, Result};
use crate::query::Query;
use crate::record::Record;

pub const PUBLIC_DB: &str = "_public";
pub const PRIVATE_DB: &str = "_private";
pub const UNION_DB: &str = "_union";

/// Records returned by a query, plus the overall count when the query
/// requested one.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResult {
    records: Vec<Record>,
    overall_count: Option<u64>,
}

impl QueryResult {
    fn from_body(body: &Value) -> Result<Self> {
        let rows = body.get("result").and_then(Value::as_array).ok_or_else(|| {
            Error::MalformedWireValue("query response requires a result array".to_string())
        })?;
        let records = rows
            .iter()
            .map(Record::from_wire)
            .collect::<Result<Vec<_>>>()?;
        let overall_count = body
            .get("info")
            .and_then(|info| info.get("count"))
            .and_then(Value::as_u64);
        Ok(Self {
            records,
            overall_count,
        })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn overall_count(&self) -> Option<u64> {
        self.overall_count
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }
}

pub struct Database {
    db_id: String,
    cache: Mutex<QueryCache>,
    /// Whether query responses are stored into the local cache.
    pub cache_response: bool,
}

impl Database {
    /// Open a database. Only `_public`, `_private`, and `_union` exist.
    pub fn new(db_id: &str) -> Result<Self> {
        if db_id != PUBLIC_DB && db_id != PRIVATE_DB && db_id != UNION_DB {
            return Err(Error::InvalidDatabaseId(db_id.to_string()));
        }
        Ok(Self {
            db_id: db_id.to_string(),
            cache: Mutex::new(QueryCache::new(Some(CacheOptions {
                prefix: db_id.to_string(),
                ..CacheOptions::default()
            }))),
            cache_response: true,
        })
    }

    pub fn db_id(&self) -> &str {
        &self.db_id
    }

    fn query_payload(&self, query: &Query) -> Value {
        let mut payload = match query.to_wire() {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        // a page with no explicit offset implies one
        let offset = payload.get("offset").and_then(Value::as_u64).unwrap_or(0);
        if offset == 0 && query.page > 0 {
            payload.insert("offset".to_string(), json!(query.limit * (query.page - 1)));
        }
        payload.insert("database_id".to_string(), json!(self.db_id));
        Value::Object(payload)
    }

    /// The locally cached result of a previous run of `query`, if any.
    pub fn cached_query(&self, query: &Query) -> Option<QueryResult> {
        let body = self.cache.lock().ok()?.get(&query.hash())?;
        QueryResult::from_body(&body).ok()
    }

    /// Fetch records matching the query, caching the raw response body
    /// under the query hash.
    pub async fn query(&self, container: &Container, query: &Query) -> Result<QueryResult> {
        let payload = self.query_payload(query);
        let body = container.make_request("record:query", payload).await?;
        let result = QueryResult::from_body(&body)?;
        if self.cache_response {
            if let Ok(mut cache) = self.cache.lock() {
                cache.set(&query.hash(), body);
            }
        }
        Ok(result)
    }

    /// Fetch a single record by its full `type/id` identifier.
    pub async fn get_record_by_id(&self, container: &Container, id: &str) -> Result<Record> {
        let (record_type, name) = Record::parse_id(id)?;
        let query = Query::new(record_type)?.equal_to("_id", name);
        let result = self.query(container, &query).await?;
        if result.len() == 1 {
            Ok(result.records()[0].clone())
        } else {
            Err(Error::Server(format!("{} does not exist", id)))
        }
    }

    /// Save a record, returning the server's view of it.
    pub async fn save(&self, container: &Container, record: &Record) -> Result<Record> {
        let payload = json!({
            "database_id": self.db_id,
            "records": [record.to_wire()],
        });
        let body = container.make_request("record:save", payload).await?;
        let saved = body
            .get("result")
            .and_then(Value::as_array)
            .and_then(|rows| rows.first())
            .ok_or_else(|| {
                Error::MalformedWireValue("save response requires a result array".to_string())
            })?;
        Record::from_wire(saved)
    }

    /// Delete a record by id.
    pub async fn delete(&self, container: &Container, record: &Record) -> Result<()> {
        let payload = json!({
            "database_id": self.db_id,
            "ids": [record.id()],
        });
        container.make_request("record:delete", payload).await?;
        Ok(())
    }

    pub fn reset_cache(&self) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_unknown_database_id() {
        assert!(matches!(
            Database::new("_other"),
            Err(Error::InvalidDatabaseId(_))
        ));
        assert!(Database::new(PUBLIC_DB).is_ok());
        assert!(Database::new(PRIVATE_DB).is_ok());
        assert!(Database::new(UNION_DB).is_ok());
    }

    #[test]
    fn test_page_implies_offset() {
        let db = Database::new(PUBLIC_DB).unwrap();
        let mut query = Query::new("note").unwrap();
        query.page = 3;
        let payload = db.query_payload(&query);
        assert_eq!(payload["offset"], json!(100));
        assert_eq!(payload["page"], json!(3));
        assert_eq!(payload["database_id"], json!("_public"));
    }

    #[test]
    fn test_explicit_offset_wins_over_page() {
        let db = Database::new(PUBLIC_DB).unwrap();
        let mut query = Query::new("note").unwrap();
        query.page = 3;
        query.offset = 7;
        let payload = db.query_payload(&query);
        assert_eq!(payload["offset"], json!(7));
    }

    #[test]
    fn test_query_result_from_body() {
        let body = json!({
            "result": [
                {"_id": "note/n1", "title": "hello"},
                {"_id": "note/n2", "title": "world"}
            ],
            "info": {"count": 9}
        });
        let result = QueryResult::from_body(&body).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.overall_count(), Some(9));
        assert_eq!(result.records()[0].id(), "note/n1");
        assert_eq!(result.records()[1].get("title"), Some(&json!("world")));
    }

    #[test]
    fn test_cached_query_round_trip() {
        let db = Database::new(PUBLIC_DB).unwrap();
        let query = Query::new("note").unwrap().equal_to("title", "hello");
        assert!(db.cached_query(&query).is_none());

        let body = json!({"result": [{"_id": "note/n1", "title": "hello"}]});
        db.cache.lock().unwrap().set(&query.hash(), body);

        let cached = db.cached_query(&query).expect("cache hit");
        assert_eq!(cached.len(), 1);
        assert_eq!(cached.records()[0].id(), "note/n1");

        db.reset_cache();
        assert!(db.cached_query(&query).is_none());
    }
}
