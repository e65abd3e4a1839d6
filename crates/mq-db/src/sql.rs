//! SQL rendering
//!
//! Translates predicates, sort orders, joins and aggregates into PostgreSQL.
//! Every value travels as a bind parameter; only column names and keywords
//! are spliced into the statement text.
//!
//! Schema: `member(member_id, username, age, team_id)` and
//! `team(team_id, name)`, aliased `m` and `t`.

use mq_queries::{
    Aggregate, AggregateFn, CaseExpr, Clause, Field, JoinKind, JoinOn, JoinSpec, Operand,
    PageRequest, Predicate, Projection, SortCriterion, SortDirection, SortOrder, Value, ValueKind,
};

/// Parameter for prepared statements
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<&Value> for SqlParam {
    fn from(value: &Value) -> Self {
        match value {
            Value::Int(n) => SqlParam::Int(*n),
            Value::Float(f) => SqlParam::Float(*f),
            Value::Str(s) => SqlParam::Text(s.clone()),
        }
    }
}

/// Statement text plus its positional parameters
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SqlStatement {
    pub sql: String,
    pub params: Vec<SqlParam>,
}

impl SqlStatement {
    /// Register a parameter and return its `$n` placeholder
    fn bind(&mut self, param: SqlParam) -> String {
        self.params.push(param);
        format!("${}", self.params.len())
    }
}

const MEMBER_COLUMNS: &str = "m.member_id, m.username, m.age, m.team_id";
const JOINED_COLUMNS: &str =
    "m.member_id, m.username, m.age, m.team_id, t.team_id AS joined_team_id, t.name AS team_name";

/// Map a field to its qualified column
pub fn column(field: Field) -> &'static str {
    match field {
        Field::MemberId => "m.member_id",
        Field::Username => "m.username",
        Field::Age => "m.age",
        Field::TeamId => "m.team_id",
        Field::TeamName => "t.name",
    }
}

/// Column of the same field inside an uncorrelated subquery
fn subquery_column(field: Field) -> &'static str {
    match field {
        Field::MemberId => "ms.member_id",
        Field::Username => "ms.username",
        Field::Age => "ms.age",
        Field::TeamId => "ms.team_id",
        Field::TeamName => "ts.name",
    }
}

fn is_text(field: Field) -> bool {
    matches!(field, Field::Username | Field::TeamName)
}

/// Select expression for an aggregate, cast so that every result decodes as
/// `bigint`, `float8` or `text`
pub fn aggregate_expr(aggregate: &Aggregate, column: &str) -> String {
    let func = aggregate.func.as_str().to_uppercase();
    match aggregate.func {
        AggregateFn::Count => format!("COUNT({})::bigint", column),
        AggregateFn::Avg => format!("AVG({})::float8", column),
        AggregateFn::Sum => format!("SUM({})::bigint", column),
        AggregateFn::Max | AggregateFn::Min if is_text(aggregate.field) => {
            format!("{}({})", func, column)
        }
        AggregateFn::Max | AggregateFn::Min => format!("{}({})::bigint", func, column),
    }
}

/// `(SELECT MAX(ms.age) FROM member ms)`
pub fn render_subquery(aggregate: &Aggregate) -> String {
    let from = if aggregate.field.requires_team() {
        "member ms JOIN team ts ON ms.team_id = ts.team_id"
    } else {
        "member ms"
    };
    format!(
        "(SELECT {} FROM {})",
        aggregate_expr(aggregate, subquery_column(aggregate.field)),
        from
    )
}

fn render_operand(operand: &Operand, stmt: &mut SqlStatement) -> String {
    match operand {
        Operand::Value(value) => stmt.bind(value.into()),
        Operand::Subquery(aggregate) => render_subquery(aggregate),
        Operand::Null => "NULL".to_string(),
    }
}

/// Convert a single clause to a SQL condition
pub fn render_clause(clause: &Clause, stmt: &mut SqlStatement) -> String {
    match clause {
        Clause::Eq(field, operand) => {
            format!("{} = {}", column(*field), render_operand(operand, stmt))
        }
        Clause::Goe(field, operand) => {
            format!("{} >= {}", column(*field), render_operand(operand, stmt))
        }
        Clause::Loe(field, operand) => {
            format!("{} <= {}", column(*field), render_operand(operand, stmt))
        }
        Clause::Between(field, low, high) => {
            let low = stmt.bind(low.into());
            let high = stmt.bind(high.into());
            format!("{} BETWEEN {} AND {}", column(*field), low, high)
        }
        Clause::Contains(field, needle) => {
            let pattern = stmt.bind(SqlParam::Text(format!("%{}%", escape_like(needle))));
            format!("{} LIKE {} ESCAPE '\\'", column(*field), pattern)
        }
    }
}

/// Clauses joined with AND, without the WHERE keyword
pub fn render_conditions(predicate: &Predicate, stmt: &mut SqlStatement) -> String {
    predicate
        .clauses()
        .iter()
        .map(|clause| render_clause(clause, stmt))
        .collect::<Vec<_>>()
        .join(" AND ")
}

/// Build WHERE clause from a predicate; empty for match-all
pub fn render_where(predicate: &Predicate, stmt: &mut SqlStatement) -> String {
    if predicate.is_match_all() {
        String::new()
    } else {
        format!("WHERE {}", render_conditions(predicate, stmt))
    }
}

/// Render the team join, ON filters included
pub fn render_join(join: &JoinSpec, stmt: &mut SqlStatement) -> String {
    let keyword = match join.kind {
        JoinKind::Inner => "JOIN",
        JoinKind::Left => "LEFT JOIN",
    };
    let on = match join.on {
        JoinOn::Relation => "m.team_id = t.team_id",
        JoinOn::UsernameEqTeamName => "m.username = t.name",
    };
    if join.filter.is_match_all() {
        format!("{} team t ON {}", keyword, on)
    } else {
        format!(
            "{} team t ON {} AND {}",
            keyword,
            on,
            render_conditions(&join.filter, stmt)
        )
    }
}

/// Convert a sort criterion to SQL. NULL placement is always spelled out.
pub fn sort_to_sql(criterion: &SortCriterion) -> String {
    let direction = match criterion.direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    };
    let nulls = if criterion.places_nulls_first() {
        "NULLS FIRST"
    } else {
        "NULLS LAST"
    };
    format!("{} {} {}", column(criterion.field), direction, nulls)
}

/// Build ORDER BY clause; falls back to the member id for a stable window
pub fn build_order_clause(sorts: &SortOrder) -> String {
    if sorts.is_empty() {
        return "ORDER BY m.member_id ASC".to_string();
    }
    let parts: Vec<String> = sorts.criteria().iter().map(sort_to_sql).collect();
    format!("ORDER BY {}", parts.join(", "))
}

/// FROM clause plus the join a query needs. Team filters, sort keys or
/// columns without an explicit join get an inner relation join.
fn render_from(reads_team: bool, join: Option<&JoinSpec>, stmt: &mut SqlStatement) -> String {
    match join {
        Some(join) => format!("FROM member m {}", render_join(join, stmt)),
        None if reads_team => format!("FROM member m {}", render_join(&JoinSpec::inner(), stmt)),
        None => "FROM member m".to_string(),
    }
}

fn cast(kind: ValueKind) -> &'static str {
    match kind {
        ValueKind::Int => "::bigint",
        ValueKind::Float => "::float8",
        ValueKind::Text => "::text",
    }
}

/// A CASE result value, bound and cast to the column type
fn render_result(value: Option<&Value>, kind: ValueKind, stmt: &mut SqlStatement) -> String {
    match value.and_then(|v| kind.coerce(v)) {
        Some(v) => format!("{}{}", stmt.bind(SqlParam::from(&v)), cast(kind)),
        None => format!("NULL{}", cast(kind)),
    }
}

fn render_case(case: &CaseExpr, stmt: &mut SqlStatement) -> String {
    let kind = case.kind();
    if case.arms.is_empty() {
        return render_result(case.otherwise.as_ref(), kind, stmt);
    }

    let mut sql = format!("CASE {}", column(case.field));
    for (when, then) in &case.arms {
        let when = stmt.bind(SqlParam::from(when));
        let then = render_result(Some(then), kind, stmt);
        sql.push_str(&format!(" WHEN {} THEN {}", when, then));
    }
    if let Some(otherwise) = &case.otherwise {
        let otherwise = render_result(Some(otherwise), kind, stmt);
        sql.push_str(&format!(" ELSE {}", otherwise));
    }
    sql.push_str(" END");
    sql
}

/// Select-list expression of one projection
pub fn render_projection(projection: &Projection, stmt: &mut SqlStatement) -> String {
    match projection {
        Projection::Field(field) => match ValueKind::of_field(*field) {
            ValueKind::Int => format!("{}::bigint", column(*field)),
            _ => column(*field).to_string(),
        },
        Projection::Case(case) => render_case(case, stmt),
        Projection::Subquery(aggregate) => render_subquery(aggregate),
    }
}

fn append(sql: &mut String, part: &str) {
    if !part.is_empty() {
        sql.push(' ');
        sql.push_str(part);
    }
}

/// Windowed select of member rows, or member+team rows when `join` is given
pub fn build_select(
    predicate: &Predicate,
    page: &PageRequest,
    join: Option<&JoinSpec>,
) -> SqlStatement {
    let mut stmt = SqlStatement::default();
    let columns = if join.is_some() {
        JOINED_COLUMNS
    } else {
        MEMBER_COLUMNS
    };
    let reads_team = predicate.references_team() || page.sort.references_team();
    let from = render_from(reads_team, join, &mut stmt);
    let where_clause = render_where(predicate, &mut stmt);

    let mut sql = format!("SELECT {} {}", columns, from);
    append(&mut sql, &where_clause);
    append(&mut sql, &build_order_clause(&page.sort));

    let limit = stmt.bind(SqlParam::Int(page.limit_i64()));
    let offset = stmt.bind(SqlParam::Int(page.offset_i64()));
    sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

    stmt.sql = sql;
    stmt
}

/// Unwindowed row count matching the same FROM/WHERE as `build_select`.
/// `sorts` must be the sort of the select, since team sort keys add a join.
pub fn build_count(
    predicate: &Predicate,
    sorts: &SortOrder,
    join: Option<&JoinSpec>,
) -> SqlStatement {
    let mut stmt = SqlStatement::default();
    let reads_team = predicate.references_team() || sorts.references_team();
    let from = render_from(reads_team, join, &mut stmt);
    let where_clause = render_where(predicate, &mut stmt);

    let mut sql = format!("SELECT COUNT(*) {}", from);
    append(&mut sql, &where_clause);
    stmt.sql = sql;
    stmt
}

/// Windowed tuple query; columns are bound before the FROM and WHERE clauses
pub fn build_projection(
    predicate: &Predicate,
    page: &PageRequest,
    projections: &[Projection],
) -> SqlStatement {
    let mut stmt = SqlStatement::default();
    let columns: Vec<String> = projections
        .iter()
        .map(|p| render_projection(p, &mut stmt))
        .collect();
    let reads_team = predicate.references_team()
        || page.sort.references_team()
        || projections.iter().any(Projection::references_team);
    let from = render_from(reads_team, None, &mut stmt);
    let where_clause = render_where(predicate, &mut stmt);

    let mut sql = format!("SELECT {} {}", columns.join(", "), from);
    append(&mut sql, &where_clause);
    append(&mut sql, &build_order_clause(&page.sort));

    let limit = stmt.bind(SqlParam::Int(page.limit_i64()));
    let offset = stmt.bind(SqlParam::Int(page.offset_i64()));
    sql.push_str(&format!(" LIMIT {} OFFSET {}", limit, offset));

    stmt.sql = sql;
    stmt
}

/// Scalar aggregate over the members matching `predicate`
pub fn build_aggregate(predicate: &Predicate, aggregate: &Aggregate) -> SqlStatement {
    let mut stmt = SqlStatement::default();
    let needs_team = predicate.references_team() || aggregate.field.requires_team();
    let from = if needs_team {
        format!("FROM member m {}", render_join(&JoinSpec::inner(), &mut stmt))
    } else {
        "FROM member m".to_string()
    };
    let where_clause = render_where(predicate, &mut stmt);

    let mut sql = format!(
        "SELECT {} {}",
        aggregate_expr(aggregate, column(aggregate.field)),
        from
    );
    append(&mut sql, &where_clause);
    stmt.sql = sql;
    stmt
}

/// Escape string for LIKE patterns
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use mq_queries::{compose, MemberSearchCondition};

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("test"), "test");
        assert_eq!(escape_like("100%"), "100\\%");
        assert_eq!(escape_like("a_b"), "a\\_b");
        // quotes are safe inside a bound parameter
        assert_eq!(escape_like("it's"), "it's");
    }

    #[test]
    fn test_column() {
        assert_eq!(column(Field::MemberId), "m.member_id");
        assert_eq!(column(Field::Age), "m.age");
        assert_eq!(column(Field::TeamName), "t.name");
    }

    #[test]
    fn test_render_where_binds_values() {
        let condition = MemberSearchCondition::new()
            .with_team_name("teamB")
            .with_age_goe(35)
            .with_age_loe(40);
        let mut stmt = SqlStatement::default();
        let sql = render_where(&compose(&condition), &mut stmt);

        assert_eq!(sql, "WHERE t.name = $1 AND m.age >= $2 AND m.age <= $3");
        assert_eq!(
            stmt.params,
            vec![
                SqlParam::Text("teamB".to_string()),
                SqlParam::Int(35),
                SqlParam::Int(40)
            ]
        );
    }

    #[test]
    fn test_render_where_match_all() {
        let mut stmt = SqlStatement::default();
        assert_eq!(render_where(&Predicate::always_true(), &mut stmt), "");
        assert!(stmt.params.is_empty());
    }

    #[test]
    fn test_render_clause_variants() {
        let mut stmt = SqlStatement::default();
        assert_eq!(
            render_clause(&Field::Age.between(20, 30), &mut stmt),
            "m.age BETWEEN $1 AND $2"
        );
        assert_eq!(
            render_clause(&Field::Username.contains("mem_"), &mut stmt),
            "m.username LIKE $3 ESCAPE '\\'"
        );
        assert_eq!(stmt.params[2], SqlParam::Text("%mem\\_%".to_string()));
        assert_eq!(
            render_clause(&Clause::Eq(Field::Username, Operand::Null), &mut stmt),
            "m.username = NULL"
        );
    }

    #[test]
    fn test_render_subquery() {
        let mut stmt = SqlStatement::default();
        let clause = Field::Age.eq_subquery(Aggregate::max(Field::Age));
        assert_eq!(
            render_clause(&clause, &mut stmt),
            "m.age = (SELECT MAX(ms.age)::bigint FROM member ms)"
        );
        assert!(stmt.params.is_empty());

        assert_eq!(
            render_subquery(&Aggregate::avg(Field::Age)),
            "(SELECT AVG(ms.age)::float8 FROM member ms)"
        );
    }

    #[test]
    fn test_render_join() {
        let mut stmt = SqlStatement::default();
        assert_eq!(
            render_join(&JoinSpec::inner(), &mut stmt),
            "JOIN team t ON m.team_id = t.team_id"
        );
        assert_eq!(
            render_join(&JoinSpec::left_unrelated(), &mut stmt),
            "LEFT JOIN team t ON m.username = t.name"
        );
        let filtered = JoinSpec::left().on_filter(Field::TeamName.eq("teamA"));
        assert_eq!(
            render_join(&filtered, &mut stmt),
            "LEFT JOIN team t ON m.team_id = t.team_id AND t.name = $1"
        );
    }

    #[test]
    fn test_build_order_clause() {
        // Empty sorts
        assert_eq!(build_order_clause(&SortOrder::new()), "ORDER BY m.member_id ASC");

        // Single sort
        let single = SortOrder::by_desc(Field::Age);
        assert_eq!(
            build_order_clause(&single),
            "ORDER BY m.age DESC NULLS FIRST"
        );

        // Multiple sorts, explicit null placement
        let multiple = SortOrder::by_desc(Field::Age)
            .then(SortCriterion::asc(Field::Username).nulls_last());
        assert_eq!(
            build_order_clause(&multiple),
            "ORDER BY m.age DESC NULLS FIRST, m.username ASC NULLS LAST"
        );
    }

    #[test]
    fn test_build_select() {
        let predicate = Predicate::always_true().and(Field::Age.goe(20));
        let stmt = build_select(&predicate, &PageRequest::new(1, 2), None);
        assert_eq!(
            stmt.sql,
            "SELECT m.member_id, m.username, m.age, m.team_id FROM member m \
             WHERE m.age >= $1 ORDER BY m.member_id ASC LIMIT $2 OFFSET $3"
        );
        assert_eq!(
            stmt.params,
            vec![SqlParam::Int(20), SqlParam::Int(2), SqlParam::Int(1)]
        );
    }

    #[test]
    fn test_build_select_implicit_join() {
        let predicate = Predicate::always_true().and(Field::TeamName.eq("teamA"));
        let stmt = build_select(&predicate, &PageRequest::unpaged(), None);
        assert!(stmt.sql.contains("FROM member m JOIN team t ON m.team_id = t.team_id"));
        assert!(stmt.sql.starts_with("SELECT m.member_id, m.username, m.age, m.team_id FROM"));
    }

    #[test]
    fn test_build_select_joined() {
        let join = JoinSpec::left().on_filter(Field::TeamName.eq("teamA"));
        let stmt = build_select(&Predicate::always_true(), &PageRequest::unpaged(), Some(&join));
        assert!(stmt.sql.contains("t.name AS team_name"));
        // ON parameters are numbered before the window
        assert_eq!(stmt.params[0], SqlParam::Text("teamA".to_string()));
        assert!(stmt.sql.ends_with("LIMIT $2 OFFSET $3"));
    }

    #[test]
    fn test_build_count() {
        let predicate = Predicate::always_true().and(Field::TeamName.eq("teamB"));
        let stmt = build_count(&predicate, &SortOrder::new(), Some(&JoinSpec::left()));
        assert_eq!(
            stmt.sql,
            "SELECT COUNT(*) FROM member m LEFT JOIN team t ON m.team_id = t.team_id \
             WHERE t.name = $1"
        );
    }

    #[test]
    fn test_count_joins_like_team_sorted_select() {
        let predicate = Predicate::always_true();
        let page = PageRequest::new(0, 2).with_sort(SortOrder::by_asc(Field::TeamName));
        let select = build_select(&predicate, &page, None);
        let count = build_count(&predicate, &page.sort, None);

        let from = "FROM member m JOIN team t ON m.team_id = t.team_id";
        assert!(select.sql.contains(from));
        assert_eq!(count.sql, format!("SELECT COUNT(*) {}", from));

        let unsorted = build_count(&predicate, &SortOrder::new(), None);
        assert_eq!(unsorted.sql, "SELECT COUNT(*) FROM member m");
    }

    #[test]
    fn test_build_projection_case() {
        let label = CaseExpr::on(Field::Age)
            .when(10, "ten")
            .when(20, "twenty")
            .otherwise("other");
        let page = PageRequest::unpaged().with_sort(SortOrder::by_asc(Field::MemberId));
        let stmt = build_projection(
            &Predicate::always_true(),
            &page,
            &[Projection::Field(Field::Username), label],
        );
        assert_eq!(
            stmt.sql,
            "SELECT m.username, CASE m.age WHEN $1 THEN $2::text WHEN $3 THEN $4::text \
             ELSE $5::text END FROM member m ORDER BY m.member_id ASC NULLS LAST \
             LIMIT $6 OFFSET $7"
        );
        assert_eq!(stmt.params[0], SqlParam::Int(10));
        assert_eq!(stmt.params[1], SqlParam::Text("ten".to_string()));
        assert_eq!(stmt.params[4], SqlParam::Text("other".to_string()));
    }

    #[test]
    fn test_build_projection_subquery_and_team() {
        let predicate = Predicate::always_true().and(Field::Age.goe(20));
        let stmt = build_projection(
            &predicate,
            &PageRequest::new(0, 10),
            &[
                Projection::Field(Field::TeamName),
                Projection::Subquery(Aggregate::avg(Field::Age)),
            ],
        );
        assert!(stmt.sql.starts_with(
            "SELECT t.name, (SELECT AVG(ms.age)::float8 FROM member ms) \
             FROM member m JOIN team t ON m.team_id = t.team_id WHERE m.age >= $1"
        ));
        assert_eq!(stmt.params[0], SqlParam::Int(20));
    }

    #[test]
    fn test_build_aggregate() {
        let stmt = build_aggregate(&Predicate::always_true(), &Aggregate::sum(Field::Age));
        assert_eq!(stmt.sql, "SELECT SUM(m.age)::bigint FROM member m");

        let stmt = build_aggregate(&Predicate::always_true(), &Aggregate::max(Field::Username));
        assert_eq!(stmt.sql, "SELECT MAX(m.username) FROM member m");
    }
}
