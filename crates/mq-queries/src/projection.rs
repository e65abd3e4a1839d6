//! Select-list projections
//!
//! A projection is one column of a tuple query: a plain attribute, a simple
//! `CASE` over an attribute, or an uncorrelated scalar subquery that yields
//! the same value on every row.

use serde::{Deserialize, Serialize};

use crate::aggregate::{Aggregate, AggregateFn};
use crate::filters::{Field, FieldSource, Value};

/// One projected row; `None` is SQL NULL
pub type Tuple = Vec<Option<Value>>;

/// Storage type of a projected column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueKind {
    Int,
    Float,
    Text,
}

impl ValueKind {
    pub fn of_field(field: Field) -> Self {
        match field {
            Field::Username | Field::TeamName => Self::Text,
            Field::MemberId | Field::Age | Field::TeamId => Self::Int,
        }
    }

    pub fn of_value(value: &Value) -> Self {
        match value {
            Value::Int(_) => Self::Int,
            Value::Float(_) => Self::Float,
            Value::Str(_) => Self::Text,
        }
    }

    pub fn of_aggregate(aggregate: &Aggregate) -> Self {
        match aggregate.func {
            AggregateFn::Avg => Self::Float,
            AggregateFn::Max | AggregateFn::Min => Self::of_field(aggregate.field),
            AggregateFn::Count | AggregateFn::Sum => Self::Int,
        }
    }

    /// Convert a value into this kind; `None` when it has no such reading
    pub fn coerce(&self, value: &Value) -> Option<Value> {
        match (self, value) {
            (Self::Text, Value::Str(s)) => Some(Value::Str(s.clone())),
            (Self::Text, Value::Int(v)) => Some(Value::Str(v.to_string())),
            (Self::Text, Value::Float(v)) => Some(Value::Str(v.to_string())),
            (Self::Float, v) => v.as_f64().map(Value::Float),
            (Self::Int, Value::Int(v)) => Some(Value::Int(*v)),
            (Self::Int, Value::Float(v)) => Some(Value::Int(*v as i64)),
            (Self::Int, Value::Str(_)) => None,
        }
    }
}

/// `CASE <field> WHEN <value> THEN <result> ... ELSE <otherwise> END`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseExpr {
    pub field: Field,
    pub arms: Vec<(Value, Value)>,
    /// Result when no arm matches; NULL when absent
    pub otherwise: Option<Value>,
}

impl CaseExpr {
    pub fn on(field: Field) -> Self {
        Self {
            field,
            arms: Vec::new(),
            otherwise: None,
        }
    }

    pub fn when(mut self, value: impl Into<Value>, then: impl Into<Value>) -> Self {
        self.arms.push((value.into(), then.into()));
        self
    }

    /// Close the expression with a fallback result
    pub fn otherwise(mut self, value: impl Into<Value>) -> Projection {
        self.otherwise = Some(value.into());
        Projection::Case(self)
    }

    /// Closes the expression without a fallback
    pub fn end(self) -> Projection {
        Projection::Case(self)
    }

    /// Result type, taken from the first result value
    pub fn kind(&self) -> ValueKind {
        self.arms
            .first()
            .map(|(_, then)| then)
            .or(self.otherwise.as_ref())
            .map(ValueKind::of_value)
            .unwrap_or(ValueKind::Text)
    }

    /// First arm equal to `actual`, else the fallback. NULL matches no arm.
    pub fn evaluate(&self, actual: Option<&Value>) -> Option<Value> {
        let kind = self.kind();
        let result = actual
            .and_then(|actual| {
                self.arms
                    .iter()
                    .find(|(when, _)| actual.compare(when) == Some(std::cmp::Ordering::Equal))
                    .map(|(_, then)| then)
            })
            .or(self.otherwise.as_ref())?;
        kind.coerce(result)
    }
}

/// A column of a tuple query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Projection {
    Field(Field),
    Case(CaseExpr),
    /// Uncorrelated scalar subquery over all members
    Subquery(Aggregate),
}

impl Projection {
    pub fn kind(&self) -> ValueKind {
        match self {
            Projection::Field(field) => ValueKind::of_field(*field),
            Projection::Case(case) => case.kind(),
            Projection::Subquery(aggregate) => ValueKind::of_aggregate(aggregate),
        }
    }

    /// Whether the outer row must carry its team. Subqueries join on their own.
    pub fn references_team(&self) -> bool {
        match self {
            Projection::Field(field) => field.requires_team(),
            Projection::Case(case) => case.field.requires_team(),
            Projection::Subquery(_) => false,
        }
    }

    /// Evaluate against a row; `subquery` supplies the value of a subquery column
    pub fn evaluate<R, F>(&self, row: &R, subquery: F) -> Option<Value>
    where
        R: FieldSource + ?Sized,
        F: FnOnce(&Aggregate) -> Option<Value>,
    {
        match self {
            Projection::Field(field) => row.field_value(*field),
            Projection::Case(case) => case.evaluate(row.field_value(case.field).as_ref()),
            Projection::Subquery(aggregate) => subquery(aggregate),
        }
    }
}

impl From<Field> for Projection {
    fn from(field: Field) -> Self {
        Projection::Field(field)
    }
}

impl From<Aggregate> for Projection {
    fn from(aggregate: Aggregate) -> Self {
        Projection::Subquery(aggregate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Row {
        age: Option<i64>,
    }

    impl FieldSource for Row {
        fn field_value(&self, field: Field) -> Option<Value> {
            match field {
                Field::Age => self.age.map(Value::Int),
                _ => None,
            }
        }
    }

    fn age_label() -> Projection {
        CaseExpr::on(Field::Age)
            .when(10, "ten")
            .when(20, "twenty")
            .otherwise("other")
    }

    #[test]
    fn test_case_arms() {
        let label = age_label();
        let no_subquery = |_: &Aggregate| None;
        assert_eq!(
            label.evaluate(&Row { age: Some(10) }, no_subquery),
            Some(Value::from("ten"))
        );
        assert_eq!(
            label.evaluate(&Row { age: Some(20) }, no_subquery),
            Some(Value::from("twenty"))
        );
        assert_eq!(
            label.evaluate(&Row { age: Some(30) }, no_subquery),
            Some(Value::from("other"))
        );
        // NULL skips every arm
        assert_eq!(
            label.evaluate(&Row { age: None }, no_subquery),
            Some(Value::from("other"))
        );
        assert_eq!(label.kind(), ValueKind::Text);
    }

    #[test]
    fn test_case_without_fallback_is_null() {
        let adult = CaseExpr::on(Field::Age).when(40, 1).end();
        assert_eq!(adult.evaluate(&Row { age: Some(10) }, |_| None), None);
        assert_eq!(
            adult.evaluate(&Row { age: Some(40) }, |_| None),
            Some(Value::Int(1))
        );
    }

    #[test]
    fn test_subquery_column() {
        let avg = Projection::from(Aggregate::avg(Field::Age));
        assert_eq!(avg.kind(), ValueKind::Float);
        assert!(!avg.references_team());
        assert_eq!(
            avg.evaluate(&Row { age: Some(10) }, |_| Some(Value::Float(25.0))),
            Some(Value::Float(25.0))
        );
        assert!(Projection::from(Field::TeamName).references_team());
    }

    #[test]
    fn test_coerce() {
        assert_eq!(ValueKind::Text.coerce(&Value::Int(3)), Some(Value::from("3")));
        assert_eq!(ValueKind::Float.coerce(&Value::Int(3)), Some(Value::Float(3.0)));
        assert_eq!(ValueKind::Int.coerce(&Value::from("x")), None);
    }
}
