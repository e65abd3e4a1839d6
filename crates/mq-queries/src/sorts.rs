//! Query Sort Orders
//!
//! Sort orders define how query results should be ordered, including where
//! NULL attribute values land.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::filters::{Field, FieldSource, Value};

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    /// Ascending order (A-Z, 1-9)
    #[default]
    Asc,
    /// Descending order (Z-A, 9-1)
    Desc,
}

impl SortDirection {
    /// Parse from string
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "asc" | "ascending" => Some(Self::Asc),
            "desc" | "descending" => Some(Self::Desc),
            _ => None,
        }
    }

    /// Convert to string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// Get the opposite direction
    pub fn reverse(&self) -> Self {
        match self {
            Self::Asc => Self::Desc,
            Self::Desc => Self::Asc,
        }
    }
}

/// Placement of NULL values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrdering {
    /// NULL sorts as larger than every value: last when ascending,
    /// first when descending
    #[default]
    Default,
    First,
    Last,
}

impl NullsOrdering {
    fn nulls_first(&self, direction: SortDirection) -> bool {
        match self {
            Self::First => true,
            Self::Last => false,
            Self::Default => direction == SortDirection::Desc,
        }
    }
}

/// A single sort criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortCriterion {
    /// The attribute to sort by
    pub field: Field,
    /// The sort direction
    pub direction: SortDirection,
    pub nulls: NullsOrdering,
}

impl SortCriterion {
    /// Create a new sort criterion
    pub fn new(field: Field, direction: SortDirection) -> Self {
        Self {
            field,
            direction,
            nulls: NullsOrdering::Default,
        }
    }

    /// Create ascending sort
    pub fn asc(field: Field) -> Self {
        Self::new(field, SortDirection::Asc)
    }

    /// Create descending sort
    pub fn desc(field: Field) -> Self {
        Self::new(field, SortDirection::Desc)
    }

    pub fn nulls_first(mut self) -> Self {
        self.nulls = NullsOrdering::First;
        self
    }

    pub fn nulls_last(mut self) -> Self {
        self.nulls = NullsOrdering::Last;
        self
    }

    /// Reverse the sort direction
    pub fn reversed(mut self) -> Self {
        self.direction = self.direction.reverse();
        self
    }

    /// Whether NULLs of this criterion are placed before values
    pub fn places_nulls_first(&self) -> bool {
        self.nulls.nulls_first(self.direction)
    }

    /// Parse `field`, `field:desc` or `field:asc:nullslast`
    pub fn parse(input: &str) -> Option<Self> {
        let mut parts = input.trim().split(':');
        let field = Field::from_str(parts.next()?.trim())?;
        let mut criterion = Self::asc(field);
        for part in parts {
            match part.trim().to_lowercase().as_str() {
                "nullsfirst" | "nulls_first" => criterion = criterion.nulls_first(),
                "nullslast" | "nulls_last" => criterion = criterion.nulls_last(),
                other => criterion.direction = SortDirection::from_str(other)?,
            }
        }
        Some(criterion)
    }

    /// Compare two rows on this criterion alone
    pub fn compare<R: FieldSource + ?Sized>(&self, a: &R, b: &R) -> Ordering {
        compare_values(
            a.field_value(self.field).as_ref(),
            b.field_value(self.field).as_ref(),
            self.direction,
            self.places_nulls_first(),
        )
    }
}

fn compare_values(
    a: Option<&Value>,
    b: Option<&Value>,
    direction: SortDirection,
    nulls_first: bool,
) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) if nulls_first => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) if nulls_first => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(x), Some(y)) => {
            let ord = x.compare(y).unwrap_or(Ordering::Equal);
            match direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        }
    }
}

/// Collection of sort criteria
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    criteria: Vec<SortCriterion>,
}

impl SortOrder {
    /// Create a new empty sort order
    pub fn new() -> Self {
        Self { criteria: vec![] }
    }

    /// Create with a single criterion
    pub fn by(criterion: SortCriterion) -> Self {
        Self {
            criteria: vec![criterion],
        }
    }

    /// Create with ascending sort on single attribute
    pub fn by_asc(field: Field) -> Self {
        Self::by(SortCriterion::asc(field))
    }

    /// Create with descending sort on single attribute
    pub fn by_desc(field: Field) -> Self {
        Self::by(SortCriterion::desc(field))
    }

    /// Add a sort criterion
    pub fn add(&mut self, criterion: SortCriterion) -> &mut Self {
        self.criteria.push(criterion);
        self
    }

    /// Add a sort criterion (builder pattern)
    pub fn then(mut self, criterion: SortCriterion) -> Self {
        self.criteria.push(criterion);
        self
    }

    /// Add ascending sort
    pub fn then_asc(self, field: Field) -> Self {
        self.then(SortCriterion::asc(field))
    }

    /// Add descending sort
    pub fn then_desc(self, field: Field) -> Self {
        self.then(SortCriterion::desc(field))
    }

    /// Parse a comma separated list such as `age:desc,username:asc:nullslast`.
    /// Unknown fields are skipped.
    pub fn parse(input: &str) -> Self {
        Self {
            criteria: input
                .split(',')
                .filter(|part| !part.trim().is_empty())
                .filter_map(SortCriterion::parse)
                .collect(),
        }
    }

    /// Get all sort criteria
    pub fn criteria(&self) -> &[SortCriterion] {
        &self.criteria
    }

    /// Check if any sort is defined
    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }

    /// Get number of sort criteria
    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    /// Get the primary (first) sort criterion
    pub fn primary(&self) -> Option<&SortCriterion> {
        self.criteria.first()
    }

    /// Check if sorting by a specific attribute
    pub fn sorts_by(&self, field: Field) -> bool {
        self.criteria.iter().any(|c| c.field == field)
    }

    /// Whether any criterion reads a team attribute
    pub fn references_team(&self) -> bool {
        self.criteria.iter().any(|c| c.field.requires_team())
    }

    /// Compare two rows on every criterion in order
    pub fn compare<R: FieldSource + ?Sized>(&self, a: &R, b: &R) -> Ordering {
        self.criteria
            .iter()
            .map(|c| c.compare(a, b))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }

    /// Stable in-place sort of a row slice
    pub fn sort_rows<R: FieldSource>(&self, rows: &mut [R]) {
        if !self.is_empty() {
            rows.sort_by(|a, b| self.compare(a, b));
        }
    }
}

/// Default order for member listings
pub fn default_member_sort() -> SortOrder {
    SortOrder::by_asc(Field::MemberId)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Row(Option<&'static str>, i64);

    impl FieldSource for Row {
        fn field_value(&self, field: Field) -> Option<Value> {
            match field {
                Field::Username => self.0.map(Value::from),
                Field::Age => Some(Value::Int(self.1)),
                _ => None,
            }
        }
    }

    #[test]
    fn test_sort_direction() {
        assert_eq!(SortDirection::from_str("asc"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::from_str("DESC"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::Asc.reverse(), SortDirection::Desc);
        assert_eq!(SortDirection::Desc.reverse(), SortDirection::Asc);
    }

    #[test]
    fn test_sort_criterion() {
        let criterion = SortCriterion::asc(Field::Username).nulls_last();
        assert_eq!(criterion.field, Field::Username);
        assert_eq!(criterion.direction, SortDirection::Asc);
        assert_eq!(criterion.nulls, NullsOrdering::Last);

        let reversed = criterion.reversed();
        assert_eq!(reversed.direction, SortDirection::Desc);
        assert!(!reversed.places_nulls_first());
    }

    #[test]
    fn test_default_nulls_placement() {
        assert!(!SortCriterion::asc(Field::Username).places_nulls_first());
        assert!(SortCriterion::desc(Field::Username).places_nulls_first());
    }

    #[test]
    fn test_age_desc_then_username_asc_nulls_last() {
        let mut rows = vec![Row(None, 100), Row(Some("member6"), 100), Row(Some("member5"), 100)];
        let order = SortOrder::by_desc(Field::Age)
            .then(SortCriterion::asc(Field::Username).nulls_last());

        order.sort_rows(&mut rows);
        assert_eq!(
            rows,
            vec![Row(Some("member5"), 100), Row(Some("member6"), 100), Row(None, 100)]
        );
    }

    #[test]
    fn test_nulls_first() {
        let mut rows = vec![Row(Some("a"), 1), Row(None, 2)];
        SortOrder::by(SortCriterion::asc(Field::Username).nulls_first()).sort_rows(&mut rows);
        assert_eq!(rows[0], Row(None, 2));
    }

    #[test]
    fn test_username_desc() {
        let mut rows = vec![
            Row(Some("member1"), 10),
            Row(Some("member3"), 30),
            Row(Some("member2"), 20),
            Row(Some("member4"), 40),
        ];
        SortOrder::by_desc(Field::Username).sort_rows(&mut rows);
        let names: Vec<_> = rows.iter().map(|r| r.0.unwrap()).collect();
        assert_eq!(names, vec!["member4", "member3", "member2", "member1"]);
    }

    #[test]
    fn test_sort_order() {
        let order = SortOrder::by_desc(Field::Age).then_asc(Field::MemberId);

        assert_eq!(order.len(), 2);
        assert!(order.sorts_by(Field::Age));
        assert!(order.sorts_by(Field::MemberId));
        assert!(!order.sorts_by(Field::Username));

        let primary = order.primary().unwrap();
        assert_eq!(primary.field, Field::Age);
        assert_eq!(primary.direction, SortDirection::Desc);
    }

    #[test]
    fn test_empty_sort_order() {
        let order = SortOrder::new();
        assert!(order.is_empty());
        assert_eq!(order.len(), 0);
        assert!(order.primary().is_none());
    }

    #[test]
    fn test_parse_sort_order() {
        let order = SortOrder::parse("age:desc, username:asc:nullslast, bogus");
        assert_eq!(
            order.criteria(),
            &[
                SortCriterion::desc(Field::Age),
                SortCriterion::asc(Field::Username).nulls_last(),
            ]
        );
        assert!(SortCriterion::parse("age:sideways").is_none());
        assert!(SortOrder::parse("").is_empty());
    }
}
