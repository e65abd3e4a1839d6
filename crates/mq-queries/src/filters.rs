//! Query Filters
//!
//! Typed building blocks for member predicates. A `Predicate` is an ordered
//! AND-list of `Clause`s; an empty predicate matches every row.
//!
//! Comparisons follow SQL semantics: a clause over a NULL attribute (or a
//! NULL operand) never matches.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregate;

/// Attributes of the member/team schema that can be filtered and sorted on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    MemberId,
    Username,
    Age,
    TeamId,
    TeamName,
}

impl Field {
    /// Parse from the attribute names accepted in sort/filter parameters
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "id" | "memberId" | "member.id" => Some(Self::MemberId),
            "username" | "member.username" => Some(Self::Username),
            "age" | "member.age" => Some(Self::Age),
            "teamId" | "member.teamId" | "team.id" => Some(Self::TeamId),
            "teamName" | "team.name" => Some(Self::TeamName),
            _ => None,
        }
    }

    /// Qualified attribute name (`member.username`, `team.name`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MemberId => "member.id",
            Self::Username => "member.username",
            Self::Age => "member.age",
            Self::TeamId => "member.teamId",
            Self::TeamName => "team.name",
        }
    }

    /// Whether reading this attribute requires the team row
    pub fn requires_team(&self) -> bool {
        matches!(self, Self::TeamName)
    }

    pub fn eq(self, value: impl Into<Value>) -> Clause {
        Clause::Eq(self, Operand::Value(value.into()))
    }

    pub fn goe(self, value: impl Into<Value>) -> Clause {
        Clause::Goe(self, Operand::Value(value.into()))
    }

    pub fn loe(self, value: impl Into<Value>) -> Clause {
        Clause::Loe(self, Operand::Value(value.into()))
    }

    pub fn between(self, low: impl Into<Value>, high: impl Into<Value>) -> Clause {
        Clause::Between(self, low.into(), high.into())
    }

    pub fn contains(self, needle: impl Into<String>) -> Clause {
        Clause::Contains(self, needle.into())
    }

    /// `field = (select <aggregate> from member)`
    pub fn eq_subquery(self, aggregate: Aggregate) -> Clause {
        Clause::Eq(self, Operand::Subquery(aggregate))
    }

    /// `field >= (select <aggregate> from member)`
    pub fn goe_subquery(self, aggregate: Aggregate) -> Clause {
        Clause::Goe(self, Operand::Subquery(aggregate))
    }

    /// `field <= (select <aggregate> from member)`
    pub fn loe_subquery(self, aggregate: Aggregate) -> Clause {
        Clause::Loe(self, Operand::Subquery(aggregate))
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalar values compared against attributes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    /// Compare two values; `None` when the types are not comparable
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b),
            (Value::Str(a), Value::Str(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(v) => Some(*v as f64),
            Value::Float(v) => Some(*v),
            Value::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(s) => write!(f, "'{}'", s),
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

/// Right-hand side of a comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Operand {
    Value(Value),
    /// Uncorrelated scalar subquery over all members
    Subquery(Aggregate),
    /// Result of a subquery that produced no value
    Null,
}

impl Operand {
    fn value(&self) -> Option<&Value> {
        match self {
            Operand::Value(v) => Some(v),
            Operand::Subquery(_) | Operand::Null => None,
        }
    }
}

/// A single leaf comparison
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    Eq(Field, Operand),
    Goe(Field, Operand),
    Loe(Field, Operand),
    /// Inclusive range
    Between(Field, Value, Value),
    /// Substring match on a text attribute
    Contains(Field, String),
}

impl Clause {
    pub fn field(&self) -> Field {
        match self {
            Clause::Eq(f, _)
            | Clause::Goe(f, _)
            | Clause::Loe(f, _)
            | Clause::Between(f, _, _)
            | Clause::Contains(f, _) => *f,
        }
    }

    pub fn subquery(&self) -> Option<&Aggregate> {
        match self {
            Clause::Eq(_, Operand::Subquery(a))
            | Clause::Goe(_, Operand::Subquery(a))
            | Clause::Loe(_, Operand::Subquery(a)) => Some(a),
            _ => None,
        }
    }

    /// Evaluate the clause against a row
    pub fn matches<R: FieldSource + ?Sized>(&self, row: &R) -> bool {
        let Some(actual) = row.field_value(self.field()) else {
            return false;
        };

        match self {
            Clause::Eq(_, rhs) => compare_operand(&actual, rhs) == Some(Ordering::Equal),
            Clause::Goe(_, rhs) => matches!(
                compare_operand(&actual, rhs),
                Some(Ordering::Greater | Ordering::Equal)
            ),
            Clause::Loe(_, rhs) => matches!(
                compare_operand(&actual, rhs),
                Some(Ordering::Less | Ordering::Equal)
            ),
            Clause::Between(_, low, high) => {
                matches!(
                    actual.compare(low),
                    Some(Ordering::Greater | Ordering::Equal)
                ) && matches!(
                    actual.compare(high),
                    Some(Ordering::Less | Ordering::Equal)
                )
            }
            Clause::Contains(_, needle) => actual
                .as_str()
                .map(|s| s.contains(needle.as_str()))
                .unwrap_or(false),
        }
    }

    fn resolve<F>(&self, resolve: &mut F) -> Clause
    where
        F: FnMut(&Aggregate) -> Option<Value>,
    {
        let swap = |operand: &Operand, resolve: &mut F| match operand {
            Operand::Subquery(aggregate) => match resolve(aggregate) {
                Some(value) => Operand::Value(value),
                None => Operand::Null,
            },
            other => other.clone(),
        };

        match self {
            Clause::Eq(f, rhs) => Clause::Eq(*f, swap(rhs, resolve)),
            Clause::Goe(f, rhs) => Clause::Goe(*f, swap(rhs, resolve)),
            Clause::Loe(f, rhs) => Clause::Loe(*f, swap(rhs, resolve)),
            other => other.clone(),
        }
    }
}

fn compare_operand(actual: &Value, rhs: &Operand) -> Option<Ordering> {
    rhs.value().and_then(|expected| actual.compare(expected))
}

/// Anything that can report attribute values for predicate evaluation.
///
/// `None` stands for NULL (including team attributes of a member without a
/// joined team).
pub trait FieldSource {
    fn field_value(&self, field: Field) -> Option<Value>;
}

/// AND-combined list of clauses
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    clauses: Vec<Clause>,
}

impl Predicate {
    /// The identity predicate; matches every row
    pub fn always_true() -> Self {
        Self { clauses: vec![] }
    }

    pub fn from_clauses(clauses: Vec<Clause>) -> Self {
        Self { clauses }
    }

    /// Append a clause (builder pattern)
    pub fn and(mut self, clause: Clause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Append a clause only when it is present
    pub fn and_opt(self, clause: Option<Clause>) -> Self {
        match clause {
            Some(clause) => self.and(clause),
            None => self,
        }
    }

    /// Conjunction of two predicates, keeping clause order
    pub fn and_all(mut self, other: Predicate) -> Self {
        self.clauses.extend(other.clauses);
        self
    }

    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    pub fn is_match_all(&self) -> bool {
        self.clauses.is_empty()
    }

    pub fn len(&self) -> usize {
        self.clauses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clauses.is_empty()
    }

    /// Whether any clause reads a team attribute
    pub fn references_team(&self) -> bool {
        self.clauses.iter().any(|c| c.field().requires_team())
    }

    pub fn has_subqueries(&self) -> bool {
        self.clauses.iter().any(|c| c.subquery().is_some())
    }

    /// Subqueries in clause order
    pub fn subqueries(&self) -> Vec<&Aggregate> {
        self.clauses.iter().filter_map(Clause::subquery).collect()
    }

    /// Replace subquery operands with the values an engine computed for them
    pub fn resolve_subqueries<F>(&self, mut resolve: F) -> Predicate
    where
        F: FnMut(&Aggregate) -> Option<Value>,
    {
        Predicate {
            clauses: self.clauses.iter().map(|c| c.resolve(&mut resolve)).collect(),
        }
    }

    /// Evaluate the predicate against a row. Unresolved subqueries never match.
    pub fn matches<R: FieldSource + ?Sized>(&self, row: &R) -> bool {
        self.clauses.iter().all(|c| c.matches(row))
    }
}

impl From<Vec<Clause>> for Predicate {
    fn from(clauses: Vec<Clause>) -> Self {
        Self::from_clauses(clauses)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.clauses.is_empty() {
            return f.write_str("true");
        }
        let parts: Vec<String> = self.clauses.iter().map(describe_clause).collect();
        f.write_str(&parts.join(" and "))
    }
}

fn describe_clause(clause: &Clause) -> String {
    let operand = |rhs: &Operand| match rhs {
        Operand::Value(v) => v.to_string(),
        Operand::Subquery(a) => format!("({})", a),
        Operand::Null => "null".to_string(),
    };
    match clause {
        Clause::Eq(f, rhs) => format!("{} = {}", f, operand(rhs)),
        Clause::Goe(f, rhs) => format!("{} >= {}", f, operand(rhs)),
        Clause::Loe(f, rhs) => format!("{} <= {}", f, operand(rhs)),
        Clause::Between(f, lo, hi) => format!("{} between {} and {}", f, lo, hi),
        Clause::Contains(f, s) => format!("{} like '%{}%'", f, s),
    }
}
