//! Scalar aggregates
//!
//! Used both as standalone aggregate queries and as the body of
//! uncorrelated subqueries (`age = (select max(age) from member)`).

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::filters::{Field, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AggregateFn {
    Count,
    Sum,
    Avg,
    Max,
    Min,
}

impl AggregateFn {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
            Self::Max => "max",
            Self::Min => "min",
        }
    }
}

/// An aggregate function applied to one field across all member rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Aggregate {
    pub func: AggregateFn,
    pub field: Field,
}

impl Aggregate {
    pub fn new(func: AggregateFn, field: Field) -> Self {
        Self { func, field }
    }

    pub fn count(field: Field) -> Self {
        Self::new(AggregateFn::Count, field)
    }

    pub fn sum(field: Field) -> Self {
        Self::new(AggregateFn::Sum, field)
    }

    pub fn avg(field: Field) -> Self {
        Self::new(AggregateFn::Avg, field)
    }

    pub fn max(field: Field) -> Self {
        Self::new(AggregateFn::Max, field)
    }

    pub fn min(field: Field) -> Self {
        Self::new(AggregateFn::Min, field)
    }

    /// Fold the field values of a row set into the aggregate result.
    ///
    /// NULLs are ignored. `Count` of nothing is 0; every other function
    /// yields `None` over an empty (or all-NULL) input.
    pub fn compute<I>(&self, values: I) -> Option<Value>
    where
        I: IntoIterator<Item = Option<Value>>,
    {
        let present: Vec<Value> = values.into_iter().flatten().collect();

        match self.func {
            AggregateFn::Count => Some(Value::Int(present.len() as i64)),
            _ if present.is_empty() => None,
            AggregateFn::Sum => sum(&present),
            AggregateFn::Avg => {
                let total: f64 = present.iter().filter_map(Value::as_f64).sum();
                Some(Value::Float(total / present.len() as f64))
            }
            AggregateFn::Max => present
                .into_iter()
                .reduce(|a, b| match b.compare(&a) {
                    Some(std::cmp::Ordering::Greater) => b,
                    _ => a,
                }),
            AggregateFn::Min => present
                .into_iter()
                .reduce(|a, b| match b.compare(&a) {
                    Some(std::cmp::Ordering::Less) => b,
                    _ => a,
                }),
        }
    }
}

fn sum(values: &[Value]) -> Option<Value> {
    if values.iter().all(|v| matches!(v, Value::Int(_))) {
        Some(Value::Int(values.iter().filter_map(Value::as_i64).sum()))
    } else {
        Some(Value::Float(values.iter().filter_map(Value::as_f64).sum()))
    }
}

impl fmt::Display for Aggregate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "select {}({}) from member", self.func.as_str(), self.field)
    }
}
