//! Query model and fluent builder for the Stratus record store.
//!
//! A query accumulates comparison, containment, geo, and relation predicates
//! against a single record type, plus sort, transient-include, and pagination
//! state. `to_wire` produces the JSON payload the query engine consumes and
//! `hash` derives the cache key for the local query-result cache.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{json, Map, Value};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};
use crate::expr::{self, CompareOp, Expr};
use crate::geo::Geolocation;
use crate::record::Record;
use crate::relation::Relation;

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    fn parse(value: &str) -> Option<Self> {
        match value {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

const DEFAULT_LIMIT: u64 = 50;

/// A query against one record type.
///
/// Builder methods take and return the query by value for chaining; methods
/// that validate their argument return `Result`.
///
/// # Example
/// ```
/// use stratus::Query;
///
/// let query = Query::new("note")?
///     .equal_to("title", "First note")
///     .greater_than("rating", 3)
///     .add_descending("rating");
/// assert_eq!(query.to_wire()["record_type"], "note");
/// # Ok::<(), stratus::Error>(())
/// ```
pub struct Query {
    record_type: String,
    predicates: Vec<Expr>,
    or_group: Vec<Expr>,
    negated: bool,
    sort: Vec<(Expr, SortOrder)>,
    include: BTreeMap<String, Expr>,
    pub limit: u64,
    pub offset: u64,
    pub page: u64,
    pub overall_count: bool,
}

impl Query {
    /// Create an empty query for a record type.
    ///
    /// The record type must be non-empty and must not start with the
    /// reserved underscore prefix.
    pub fn new(record_type: impl Into<String>) -> Result<Self> {
        let record_type = record_type.into();
        if !Record::valid_type(&record_type) {
            return Err(Error::InvalidRecordType(record_type));
        }
        Ok(Self {
            record_type,
            predicates: Vec::new(),
            or_group: Vec::new(),
            negated: false,
            sort: Vec::new(),
            include: BTreeMap::new(),
            limit: DEFAULT_LIMIT,
            offset: 0,
            page: 0,
            overall_count: false,
        })
    }

    pub fn record_type(&self) -> &str {
        &self.record_type
    }

    pub fn negated(&self) -> bool {
        self.negated
    }

    pub fn sort(&self) -> &[(Expr, SortOrder)] {
        &self.sort
    }

    fn push_comparison(mut self, op: CompareOp, key: &str, value: impl Into<Value>) -> Self {
        self.predicates.push(Expr::compare(
            op,
            Expr::keypath(key),
            Expr::Literal(value.into()),
        ));
        self
    }

    fn push_negated_comparison(
        mut self,
        op: CompareOp,
        key: &str,
        value: impl Into<Value>,
    ) -> Self {
        self.predicates.push(Expr::Not(Box::new(Expr::compare(
            op,
            Expr::keypath(key),
            Expr::Literal(value.into()),
        ))));
        self
    }

    pub fn equal_to(self, key: &str, value: impl Into<Value>) -> Self {
        self.push_comparison(CompareOp::Eq, key, value)
    }

    pub fn not_equal_to(self, key: &str, value: impl Into<Value>) -> Self {
        self.push_comparison(CompareOp::Neq, key, value)
    }

    pub fn greater_than(self, key: &str, value: impl Into<Value>) -> Self {
        self.push_comparison(CompareOp::Gt, key, value)
    }

    pub fn greater_than_or_equal_to(self, key: &str, value: impl Into<Value>) -> Self {
        self.push_comparison(CompareOp::Gte, key, value)
    }

    pub fn less_than(self, key: &str, value: impl Into<Value>) -> Self {
        self.push_comparison(CompareOp::Lt, key, value)
    }

    pub fn less_than_or_equal_to(self, key: &str, value: impl Into<Value>) -> Self {
        self.push_comparison(CompareOp::Lte, key, value)
    }

    pub fn like(self, key: &str, value: impl Into<Value>) -> Self {
        self.push_comparison(CompareOp::Like, key, value)
    }

    pub fn not_like(self, key: &str, value: impl Into<Value>) -> Self {
        self.push_negated_comparison(CompareOp::Like, key, value)
    }

    pub fn case_insensitive_like(self, key: &str, value: impl Into<Value>) -> Self {
        self.push_comparison(CompareOp::Ilike, key, value)
    }

    pub fn case_insensitive_not_like(self, key: &str, value: impl Into<Value>) -> Self {
        self.push_negated_comparison(CompareOp::Ilike, key, value)
    }

    /// Match records whose `key` field is one of the values in `lookup`.
    pub fn contains(self, key: &str, lookup: impl Into<Value>) -> Result<Self> {
        let lookup = lookup.into();
        if !lookup.is_array() {
            return Err(Error::InvalidArgumentType(
                "the second argument of contains must be an array".to_string(),
            ));
        }
        Ok(self.push_comparison(CompareOp::In, key, lookup))
    }

    pub fn not_contains(self, key: &str, lookup: impl Into<Value>) -> Result<Self> {
        let lookup = lookup.into();
        if !lookup.is_array() {
            return Err(Error::InvalidArgumentType(
                "the second argument of contains must be an array".to_string(),
            ));
        }
        Ok(self.push_negated_comparison(CompareOp::In, key, lookup))
    }

    /// Match records whose array field `key` contains `needle`. The needle
    /// is the left operand on the wire.
    pub fn contains_value(mut self, key: &str, needle: impl Into<Value>) -> Result<Self> {
        let needle = needle.into();
        if !needle.is_string() {
            return Err(Error::InvalidArgumentType(
                "the second argument of contains_value must be a string".to_string(),
            ));
        }
        self.predicates.push(Expr::compare(
            CompareOp::In,
            Expr::Literal(needle),
            Expr::keypath(key),
        ));
        Ok(self)
    }

    pub fn not_contains_value(mut self, key: &str, needle: impl Into<Value>) -> Result<Self> {
        let needle = needle.into();
        if !needle.is_string() {
            return Err(Error::InvalidArgumentType(
                "the second argument of contains_value must be a string".to_string(),
            ));
        }
        self.predicates.push(Expr::Not(Box::new(Expr::compare(
            CompareOp::In,
            Expr::Literal(needle),
            Expr::keypath(key),
        ))));
        Ok(self)
    }

    fn distance_expr(key: &str, loc: Geolocation) -> Expr {
        Expr::func("distance", vec![Expr::keypath(key), Expr::Geo(loc)])
    }

    pub fn distance_less_than(
        mut self,
        key: &str,
        loc: Geolocation,
        distance: impl Into<Value>,
    ) -> Self {
        self.predicates.push(Expr::compare(
            CompareOp::Lt,
            Self::distance_expr(key, loc),
            Expr::Literal(distance.into()),
        ));
        self
    }

    pub fn distance_greater_than(
        mut self,
        key: &str,
        loc: Geolocation,
        distance: impl Into<Value>,
    ) -> Self {
        self.predicates.push(Expr::compare(
            CompareOp::Gt,
            Self::distance_expr(key, loc),
            Expr::Literal(distance.into()),
        ));
        self
    }

    fn relation_expr(key: &str, relation: &Relation) -> Expr {
        Expr::func(
            "userRelation",
            vec![
                Expr::keypath(key),
                Expr::Relation {
                    name: relation.wire_name(),
                    direction: relation.direction(),
                },
            ],
        )
    }

    pub fn having_relation(mut self, key: &str, relation: &Relation) -> Self {
        self.predicates.push(Self::relation_expr(key, relation));
        self
    }

    pub fn not_having_relation(mut self, key: &str, relation: &Relation) -> Self {
        self.predicates
            .push(Expr::Not(Box::new(Self::relation_expr(key, relation))));
        self
    }

    fn push_discovery(mut self, field: &str, values: Vec<String>) -> Result<Self> {
        if self.record_type != "user" {
            return Err(Error::InvalidArgumentType(format!(
                "discovery by {} only works on the user record type",
                field
            )));
        }
        let mut arg = Map::new();
        arg.insert(field.to_string(), json!(values));
        self.predicates
            .push(Expr::func("userDiscover", vec![Expr::Literal(Value::Object(arg))]));
        Ok(self)
    }

    /// Discover user records by email address. Only valid on `user` queries.
    pub fn having_emails(self, emails: Vec<String>) -> Result<Self> {
        self.push_discovery("emails", emails)
    }

    /// Discover user records by username. Only valid on `user` queries.
    pub fn having_usernames(self, usernames: Vec<String>) -> Result<Self> {
        self.push_discovery("usernames", usernames)
    }

    pub fn add_ascending(mut self, key: &str) -> Self {
        self.sort.push((Expr::keypath(key), SortOrder::Asc));
        self
    }

    pub fn add_descending(mut self, key: &str) -> Self {
        self.sort.push((Expr::keypath(key), SortOrder::Desc));
        self
    }

    pub fn add_ascending_by_distance(mut self, key: &str, loc: Geolocation) -> Self {
        self.sort.push((Self::distance_expr(key, loc), SortOrder::Asc));
        self
    }

    pub fn add_descending_by_distance(mut self, key: &str, loc: Geolocation) -> Self {
        self.sort.push((Self::distance_expr(key, loc), SortOrder::Desc));
        self
    }

    /// Project `key` into the transient payload of each result, optionally
    /// under a different alias.
    pub fn transient_include(mut self, key: &str, alias: Option<&str>) -> Self {
        self.include
            .insert(alias.unwrap_or(key).to_string(), Expr::keypath(key));
        self
    }

    pub fn transient_include_distance(
        mut self,
        key: &str,
        alias: Option<&str>,
        loc: Geolocation,
    ) -> Self {
        self.include
            .insert(alias.unwrap_or(key).to_string(), Self::distance_expr(key, loc));
        self
    }

    /// Combine queries so that a record matching any of them matches the
    /// result. Every operand must target the same record type. Each
    /// operand's fully-combined predicate tree joins the group as one
    /// opaque member.
    pub fn or(queries: Vec<Query>) -> Result<Query> {
        let mut iter = queries.into_iter();
        let first = iter.next().ok_or_else(|| {
            Error::InvalidArgumentType("Query::or requires at least one query".to_string())
        })?;

        let mut combined = Query::new(first.record_type.clone())?;
        combined.or_group.push(first.combined_predicate());
        for query in iter {
            if query.record_type != combined.record_type {
                return Err(Error::RecordTypeMismatch {
                    expected: combined.record_type.clone(),
                    found: query.record_type,
                });
            }
            combined.or_group.push(query.combined_predicate());
        }
        Ok(combined)
    }

    /// Negate a query. The input is deep-cloned through an encode/decode
    /// round trip, so the result shares no state with it.
    pub fn not(query: &Query) -> Result<Query> {
        let mut negated = Query::from_wire(&query.to_wire())?;
        negated.negated = !negated.negated;
        Ok(negated)
    }

    fn combined_predicate(&self) -> Expr {
        expr::combine(&self.predicates, &self.or_group, self.negated)
    }

    /// The encoded predicate tree on its own, `[]` when the query has none.
    pub fn predicate(&self) -> Value {
        expr::encode_predicate(&self.predicates, &self.or_group, self.negated)
    }

    fn encode_sort(&self) -> Value {
        Value::Array(
            self.sort
                .iter()
                .map(|(target, order)| json!([target.to_wire(), order.to_string()]))
                .collect(),
        )
    }

    fn encode_include(&self) -> Value {
        let mut out = Map::new();
        for (alias, target) in &self.include {
            out.insert(alias.clone(), target.to_wire());
        }
        Value::Object(out)
    }

    /// Build the wire payload consumed by the query engine.
    ///
    /// The `predicate` key is present only when the query actually filters;
    /// the transport treats its absence as "match all". `offset` and `page`
    /// appear only when non-zero.
    pub fn to_wire(&self) -> Value {
        let mut payload = Map::new();
        payload.insert("record_type".to_string(), json!(self.record_type));
        payload.insert("limit".to_string(), json!(self.limit));
        payload.insert("sort".to_string(), self.encode_sort());
        payload.insert("include".to_string(), self.encode_include());
        payload.insert("count".to_string(), json!(self.overall_count));
        let predicate = self.predicate();
        let logically_empty = matches!(&predicate, Value::Array(items) if items.is_empty());
        if !logically_empty {
            payload.insert("predicate".to_string(), predicate);
        }
        if self.offset != 0 {
            payload.insert("offset".to_string(), json!(self.offset));
        }
        if self.page != 0 {
            payload.insert("page".to_string(), json!(self.page));
        }
        Value::Object(payload)
    }

    /// Rebuild a query from a payload produced by [`Query::to_wire`].
    pub fn from_wire(payload: &Value) -> Result<Self> {
        let record_type = payload
            .get("record_type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::MalformedWireValue("query payload requires record_type".to_string())
            })?;
        let mut query = Query::new(record_type)?;

        query.limit = payload
            .get("limit")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_LIMIT);
        query.offset = payload.get("offset").and_then(Value::as_u64).unwrap_or(0);
        query.page = payload.get("page").and_then(Value::as_u64).unwrap_or(0);
        query.overall_count = payload
            .get("count")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        if let Some(entries) = payload.get("sort").and_then(Value::as_array) {
            for entry in entries {
                let pair = entry.as_array().filter(|pair| pair.len() == 2).ok_or_else(|| {
                    Error::MalformedWireValue("sort entry must be a [target, order] pair".to_string())
                })?;
                let order = pair[1]
                    .as_str()
                    .and_then(SortOrder::parse)
                    .ok_or_else(|| {
                        Error::MalformedWireValue(
                            "sort order must be \"asc\" or \"desc\"".to_string(),
                        )
                    })?;
                query.sort.push((Expr::from_wire(&pair[0])?, order));
            }
        }

        if let Some(includes) = payload.get("include").and_then(Value::as_object) {
            for (alias, target) in includes {
                query
                    .include
                    .insert(alias.clone(), Expr::from_wire(target)?);
            }
        }

        if let Some(predicate) = payload.get("predicate") {
            let (predicates, or_group, negated) = expr::decode_predicate(predicate)?;
            query.predicates = predicates;
            query.or_group = or_group;
            query.negated = negated;
        }

        Ok(query)
    }

    /// Stable content hash of the wire payload, used as the cache key.
    /// Queries with byte-equal wire encodings hash identically.
    pub fn hash(&self) -> String {
        let canonical = self.to_wire().to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }
}
