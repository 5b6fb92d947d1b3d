//! Predicate expression tree and its wire codec.
//!
//! The remote query engine consumes predicates as heterogeneously-typed
//! nested arrays: `["and", ["eq", {"$type": "keypath", "$val": "a"}, 1], ...]`.
//! This module owns both directions of that translation. The builder keeps a
//! flat list of predicates plus an optional OR group; `encode_predicate` and
//! `decode_predicate` fold that flat state to and from a single wire tree.
//! Both directions share `combine`, which holds the engine's wrapping rules
//! (implicit AND, single-element unwrapping, outer NOT).

use serde_json::{json, Value};

use crate::error::{Error, Result};
use crate::geo::Geolocation;
use crate::relation::Direction;
use crate::value;

/// Comparison operators understood by the remote query engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Gt,
    Gte,
    Lt,
    Lte,
    Like,
    Ilike,
    In,
}

impl CompareOp {
    pub fn tag(self) -> &'static str {
        match self {
            CompareOp::Eq => "eq",
            CompareOp::Neq => "neq",
            CompareOp::Gt => "gt",
            CompareOp::Gte => "gte",
            CompareOp::Lt => "lt",
            CompareOp::Lte => "lte",
            CompareOp::Like => "like",
            CompareOp::Ilike => "ilike",
            CompareOp::In => "in",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "eq" => Some(CompareOp::Eq),
            "neq" => Some(CompareOp::Neq),
            "gt" => Some(CompareOp::Gt),
            "gte" => Some(CompareOp::Gte),
            "lt" => Some(CompareOp::Lt),
            "lte" => Some(CompareOp::Lte),
            "like" => Some(CompareOp::Like),
            "ilike" => Some(CompareOp::Ilike),
            "in" => Some(CompareOp::In),
            _ => None,
        }
    }
}

/// A node in the predicate expression tree.
///
/// `And`/`Or`/`Not` only appear at codec boundaries; the query builder keeps
/// flat lists and folds them through [`encode_predicate`].
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    And(Vec<Expr>),
    Or(Vec<Expr>),
    Not(Box<Expr>),
    Compare {
        op: CompareOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Func {
        name: String,
        args: Vec<Expr>,
    },
    KeyPath(String),
    Geo(Geolocation),
    Relation {
        name: String,
        direction: Direction,
    },
    /// Scalars, arrays, and `$type`-tagged record values, already wire-shaped.
    Literal(Value),
}

impl Expr {
    pub fn keypath(name: impl Into<String>) -> Self {
        Expr::KeyPath(name.into())
    }

    pub fn compare(op: CompareOp, left: Expr, right: Expr) -> Self {
        Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Func {
            name: name.into(),
            args,
        }
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn to_wire(&self) -> Value {
        match self {
            Expr::And(items) => tagged_array("and", items),
            Expr::Or(items) => tagged_array("or", items),
            Expr::Not(inner) => json!(["not", inner.to_wire()]),
            Expr::Compare { op, left, right } => {
                json!([op.tag(), left.to_wire(), right.to_wire()])
            }
            Expr::Func { name, args } => {
                let mut out = vec![json!("func"), json!(name)];
                out.extend(args.iter().map(Expr::to_wire));
                Value::Array(out)
            }
            Expr::KeyPath(name) => json!({"$type": "keypath", "$val": name}),
            Expr::Geo(loc) => loc.to_wire(),
            Expr::Relation { name, direction } => json!({
                "$type": "relation",
                "$name": name,
                "$direction": direction.to_string(),
            }),
            Expr::Literal(raw) => raw.clone(),
        }
    }

    /// Parse a wire value back into an expression tree.
    ///
    /// Arrays headed by a known tag must match that production exactly;
    /// anything else headed by a string is treated as a literal array. A
    /// literal whose first element collides with a tag is therefore not
    /// representable, matching what the encoder can produce.
    pub fn from_wire(wire: &Value) -> Result<Self> {
        match wire {
            Value::Array(items) => Self::from_wire_array(items, wire),
            Value::Object(map) => match map.get("$type").and_then(Value::as_str) {
                Some("keypath") => match map.get("$val").and_then(Value::as_str) {
                    Some(name) => Ok(Expr::KeyPath(name.to_string())),
                    None => Err(Error::MalformedWireValue(
                        "keypath requires a string $val".to_string(),
                    )),
                },
                Some("geo") => Ok(Expr::Geo(Geolocation::from_wire(wire)?)),
                Some("relation") => {
                    let name = map.get("$name").and_then(Value::as_str);
                    let direction = map
                        .get("$direction")
                        .and_then(Value::as_str)
                        .and_then(Direction::parse);
                    match (name, direction) {
                        (Some(name), Some(direction)) => Ok(Expr::Relation {
                            name: name.to_string(),
                            direction,
                        }),
                        _ => Err(Error::MalformedWireValue(
                            "relation requires $name and a valid $direction".to_string(),
                        )),
                    }
                }
                _ => {
                    value::check_wire_value(wire)?;
                    Ok(Expr::Literal(wire.clone()))
                }
            },
            other => Ok(Expr::Literal(other.clone())),
        }
    }

    fn from_wire_array(items: &[Value], raw: &Value) -> Result<Self> {
        let head = match items.first().and_then(Value::as_str) {
            Some(head) => head,
            None => {
                // plain literal array, e.g. an `in` lookup list
                value::check_wire_value(raw)?;
                return Ok(Expr::Literal(raw.clone()));
            }
        };

        match head {
            "and" | "or" => {
                if items.len() < 2 {
                    return Err(Error::MalformedWireValue(format!(
                        "{:?} combinator without members",
                        head
                    )));
                }
                let members = items[1..]
                    .iter()
                    .map(Expr::from_wire)
                    .collect::<Result<Vec<_>>>()?;
                if head == "and" {
                    Ok(Expr::And(members))
                } else {
                    Ok(Expr::Or(members))
                }
            }
            "not" => {
                if items.len() != 2 {
                    return Err(Error::MalformedWireValue(
                        "\"not\" takes exactly one operand".to_string(),
                    ));
                }
                Ok(Expr::Not(Box::new(Expr::from_wire(&items[1])?)))
            }
            "func" => {
                let name = items.get(1).and_then(Value::as_str).ok_or_else(|| {
                    Error::MalformedWireValue(
                        "\"func\" requires a string function name".to_string(),
                    )
                })?;
                let args = items[2..]
                    .iter()
                    .map(Expr::from_wire)
                    .collect::<Result<Vec<_>>>()?;
                Ok(Expr::func(name, args))
            }
            tag => match CompareOp::from_tag(tag) {
                Some(op) => {
                    if items.len() != 3 {
                        return Err(Error::MalformedWireValue(format!(
                            "comparison {:?} takes exactly two operands",
                            tag
                        )));
                    }
                    Ok(Expr::compare(
                        op,
                        Expr::from_wire(&items[1])?,
                        Expr::from_wire(&items[2])?,
                    ))
                }
                None => {
                    value::check_wire_value(raw)?;
                    Ok(Expr::Literal(raw.clone()))
                }
            },
        }
    }
}

fn tagged_array(tag: &str, items: &[Expr]) -> Value {
    let mut out = vec![json!(tag)];
    out.extend(items.iter().map(Expr::to_wire));
    Value::Array(out)
}

/// Fold the builder's flat predicate state into a single expression.
///
/// The OR group, when present, joins the top-level predicates as one member;
/// a single-element group contributes its element bare. One top-level member
/// stays unwrapped, two or more are joined under `and`, and the outer `not`
/// wraps whatever remains, including the empty predicate.
pub(crate) fn combine(predicates: &[Expr], or_group: &[Expr], negated: bool) -> Expr {
    let mut leaves: Vec<Expr> = predicates.to_vec();
    if !or_group.is_empty() {
        let or_member = if or_group.len() == 1 {
            or_group[0].clone()
        } else {
            Expr::Or(or_group.to_vec())
        };
        leaves.push(or_member);
    }

    let inner = if leaves.is_empty() {
        Expr::Literal(Value::Array(Vec::new()))
    } else if leaves.len() == 1 {
        leaves.remove(0)
    } else {
        Expr::And(leaves)
    };

    if negated {
        Expr::Not(Box::new(inner))
    } else {
        inner
    }
}

/// Encode the builder's flat predicate state to its wire form.
pub fn encode_predicate(predicates: &[Expr], or_group: &[Expr], negated: bool) -> Value {
    combine(predicates, or_group, negated).to_wire()
}

/// Exact inverse of [`encode_predicate`] for encoder-produced values.
///
/// A single-element OR group encodes bare, so on the way back it lands among
/// the plain predicates; re-encoding still yields identical wire output.
pub fn decode_predicate(wire: &Value) -> Result<(Vec<Expr>, Vec<Expr>, bool)> {
    let (negated, expr) = match Expr::from_wire(wire)? {
        Expr::Not(inner) => (true, *inner),
        other => (false, other),
    };

    let members = match expr {
        Expr::And(items) => items,
        Expr::Literal(Value::Array(ref items)) if items.is_empty() => Vec::new(),
        other => vec![other],
    };

    let mut predicates = Vec::new();
    let mut or_group = Vec::new();
    for member in members {
        match member {
            Expr::Or(items) => or_group = items,
            other => predicates.push(other),
        }
    }

    Ok((predicates, or_group, negated))
}
