//! Member search
//!
//! Entry points that validate a condition, compose it into a predicate, run
//! it on an engine and package the rows. The engine is always passed in.

use mq_core::{CountStrategy, SearchConfig, SearchResult};
use mq_models::{Member, MemberTeamDto, MemberWithTeam};
use mq_queries::{
    compose, default_member_sort, Aggregate, JoinSpec, MemberQuery, MemberSearchCondition,
    PageRequest, Predicate, Projection, Tuple, Value,
};

use crate::pager::{build_optimized, build_simple, PageResult, TotalCount};
use crate::query_executor::{CountPolicy, QueryExecutor};

/// Sort by member id when the caller gave no sort keys
fn ordered(page: &PageRequest) -> PageRequest {
    if page.sort.is_empty() {
        page.clone().with_sort(default_member_sort())
    } else {
        page.clone()
    }
}

fn prepare(condition: &MemberSearchCondition) -> SearchResult<Predicate> {
    condition.check()?;
    Ok(compose(condition))
}

/// Every member matching `condition`, with its team, ordered by member id
pub async fn search<E>(engine: &E, condition: &MemberSearchCondition) -> SearchResult<Vec<MemberTeamDto>>
where
    E: QueryExecutor + ?Sized,
{
    let predicate = prepare(condition)?;
    let page = PageRequest::unpaged().with_sort(default_member_sort());

    let output = engine
        .execute_join(&predicate, &page, &JoinSpec::left(), CountPolicy::Skip)
        .await?;
    tracing::debug!(%predicate, rows = output.rows.len(), "search");
    Ok(output.rows.into_iter().map(MemberTeamDto::from).collect())
}

/// One page of matches; the total always comes from a count query
pub async fn search_page_simple<E>(
    engine: &E,
    condition: &MemberSearchCondition,
    page: &PageRequest,
) -> SearchResult<PageResult<MemberTeamDto>>
where
    E: QueryExecutor + ?Sized,
{
    let predicate = prepare(condition)?;
    let page = ordered(page);
    let join = JoinSpec::left();

    let output = engine
        .execute_join(&predicate, &page, &join, CountPolicy::Exact)
        .await?;
    let total = match output.total {
        TotalCount::Exact(total) => total,
        TotalCount::Unknown => engine.count_join(&predicate, &join).await?,
    };

    tracing::debug!(%predicate, offset = page.offset, total, "search_page_simple");
    let rows = output.rows.into_iter().map(MemberTeamDto::from).collect();
    Ok(build_simple(rows, &page, total))
}

/// One page of matches; the count query runs only when the page cannot
/// prove the total
pub async fn search_page_complex<E>(
    engine: &E,
    condition: &MemberSearchCondition,
    page: &PageRequest,
) -> SearchResult<PageResult<MemberTeamDto>>
where
    E: QueryExecutor + ?Sized,
{
    let predicate = prepare(condition)?;
    let page = ordered(page);
    let join = JoinSpec::left();

    let output = engine
        .execute_join(&predicate, &page, &join, CountPolicy::Skip)
        .await?;
    let rows: Vec<MemberTeamDto> = output.rows.into_iter().map(MemberTeamDto::from).collect();

    let result = build_optimized(rows, &page, || engine.count_join(&predicate, &join)).await?;
    tracing::debug!(%predicate, offset = page.offset, total = ?result.total, "search_page_complex");
    Ok(result)
}

/// Paged search with the configured maximum page size and count strategy
pub async fn search_page<E>(
    engine: &E,
    condition: &MemberSearchCondition,
    page: &PageRequest,
    config: &SearchConfig,
) -> SearchResult<PageResult<MemberTeamDto>>
where
    E: QueryExecutor + ?Sized,
{
    let page = page.capped(config);
    match config.count_strategy {
        CountStrategy::Always => search_page_simple(engine, condition, &page).await,
        CountStrategy::Optimized => search_page_complex(engine, condition, &page).await,
    }
}

/// Members matching `predicate` with the exact total
pub async fn search_members<E>(
    engine: &E,
    predicate: &Predicate,
    page: &PageRequest,
) -> SearchResult<PageResult<Member>>
where
    E: QueryExecutor + ?Sized,
{
    let page = ordered(page);
    let output = engine.execute(predicate, &page, CountPolicy::Exact).await?;
    let total = match output.total {
        TotalCount::Exact(total) => total,
        TotalCount::Unknown => engine.count(predicate).await?,
    };
    Ok(build_simple(output.rows, &page, total))
}

/// Members fetched together with their team in one round-trip
pub async fn find_members_with_team<E>(
    engine: &E,
    predicate: &Predicate,
    join: &JoinSpec,
) -> SearchResult<Vec<MemberWithTeam>>
where
    E: QueryExecutor + ?Sized,
{
    let page = PageRequest::unpaged().with_sort(default_member_sort());
    let output = engine
        .execute_join(predicate, &page, join, CountPolicy::Skip)
        .await?;
    Ok(output.rows)
}

/// Run a built query and return its member rows
pub async fn fetch<E>(engine: &E, query: &MemberQuery) -> SearchResult<Vec<Member>>
where
    E: QueryExecutor + ?Sized,
{
    let rows = match &query.join {
        Some(join) => engine
            .execute_join(&query.predicate, &query.page, join, CountPolicy::Skip)
            .await?
            .rows
            .into_iter()
            .map(|r| r.member)
            .collect(),
        None => {
            engine
                .execute(&query.predicate, &query.page, CountPolicy::Skip)
                .await?
                .rows
        }
    };
    Ok(rows)
}

/// Run a built query with its join (a left relation join when none was
/// given), keeping the team of each row
pub async fn fetch_joined<E>(engine: &E, query: &MemberQuery) -> SearchResult<Vec<MemberWithTeam>>
where
    E: QueryExecutor + ?Sized,
{
    let join = query.join.clone().unwrap_or_default();
    let output = engine
        .execute_join(&query.predicate, &query.page, &join, CountPolicy::Skip)
        .await?;
    Ok(output.rows)
}

/// First row of a built query, if any
pub async fn fetch_first<E>(engine: &E, query: &MemberQuery) -> SearchResult<Option<Member>>
where
    E: QueryExecutor + ?Sized,
{
    let mut first = query.clone();
    first.page = PageRequest::new(query.page.offset, 1).with_sort(query.page.sort.clone());
    Ok(fetch(engine, &first).await?.into_iter().next())
}

/// Run a built query as a page with the exact total
pub async fn fetch_page<E>(engine: &E, query: &MemberQuery) -> SearchResult<PageResult<Member>>
where
    E: QueryExecutor + ?Sized,
{
    match &query.join {
        Some(join) => {
            let output = engine
                .execute_join(&query.predicate, &query.page, join, CountPolicy::Exact)
                .await?;
            let total = match output.total {
                TotalCount::Exact(total) => total,
                TotalCount::Unknown => engine.count_join(&query.predicate, join).await?,
            };
            let rows = output.rows.into_iter().map(|r| r.member).collect();
            Ok(build_simple(rows, &query.page, total))
        }
        None => search_members(engine, &query.predicate, &query.page).await,
    }
}

/// Evaluate several aggregates over the members matching `predicate`
pub async fn aggregate<E>(
    engine: &E,
    predicate: &Predicate,
    aggregates: &[Aggregate],
) -> SearchResult<Vec<Option<Value>>>
where
    E: QueryExecutor + ?Sized,
{
    let mut values = Vec::with_capacity(aggregates.len());
    for aggregate in aggregates {
        values.push(engine.aggregate(predicate, *aggregate).await?);
    }
    Ok(values)
}

/// Projected columns of the members matching `predicate`, one tuple per row
pub async fn select_tuples<E>(
    engine: &E,
    predicate: &Predicate,
    page: &PageRequest,
    projections: &[Projection],
) -> SearchResult<Vec<Tuple>>
where
    E: QueryExecutor + ?Sized,
{
    let page = ordered(page);
    let tuples = engine.project(predicate, &page, projections).await?;
    tracing::debug!(%predicate, rows = tuples.len(), "select_tuples");
    Ok(tuples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::query_executor::{MockQueryExecutor, QueryOutput};
    use crate::testing::seeded_store;
    use mq_core::SearchError;
    use mq_models::{Entity, NewMember, Team};
    use mq_queries::{presets, CaseExpr, Field, QueryBuilder, SortOrder};

    fn usernames(rows: &[MemberTeamDto]) -> Vec<&str> {
        rows.iter().filter_map(|r| r.username.as_deref()).collect()
    }

    fn joined(username: &str, age: i32, team: &str) -> MemberWithTeam {
        MemberWithTeam {
            member: Member::new(username, age),
            team: Some(Team::new(team).with_id(1)),
        }
    }

    #[tokio::test]
    async fn test_search_team_and_age_range() {
        let store = seeded_store();
        let condition = MemberSearchCondition::new()
            .with_team_name("teamB")
            .with_age_goe(35)
            .with_age_loe(40);

        let rows = search(&store, &condition).await.unwrap();
        assert_eq!(usernames(&rows), vec!["member4"]);
        assert_eq!(rows[0].age, 40);
        assert_eq!(rows[0].team_name.as_deref(), Some("teamB"));
    }

    #[tokio::test]
    async fn test_search_empty_condition_returns_everything() {
        let store = seeded_store();
        let rows = search(&store, &MemberSearchCondition::new()).await.unwrap();
        assert_eq!(usernames(&rows), vec!["member1", "member2", "member3", "member4"]);
    }

    #[tokio::test]
    async fn test_search_empty_store() {
        let store = MemoryStore::new();
        let rows = search(&store, &MemberSearchCondition::new()).await.unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_search_username_and_age() {
        let store = seeded_store();
        let condition = MemberSearchCondition::new()
            .with_username("member1")
            .with_age_goe(10)
            .with_age_loe(10);

        let rows = search(&store, &condition).await.unwrap();
        assert_eq!(usernames(&rows), vec!["member1"]);
    }

    #[tokio::test]
    async fn test_search_inverted_range_is_empty() {
        let store = seeded_store();
        let condition = MemberSearchCondition::new().with_age_goe(40).with_age_loe(10);
        assert!(search(&store, &condition).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_search_keeps_members_without_team() {
        let store = seeded_store();
        store.insert_member(NewMember::new("member5", 50, None));

        let rows = search(&store, &MemberSearchCondition::new().with_age_goe(40))
            .await
            .unwrap();
        assert_eq!(usernames(&rows), vec!["member4", "member5"]);
        assert_eq!(rows[1].team_name, None);

        // a team filter never matches a member without a team
        let rows = search(&store, &MemberSearchCondition::new().with_team_name("teamB"))
            .await
            .unwrap();
        assert_eq!(usernames(&rows), vec!["member3", "member4"]);
    }

    #[tokio::test]
    async fn test_search_rejects_negative_age() {
        let store = seeded_store();
        let err = search(&store, &MemberSearchCondition::new().with_age_loe(-1))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::InvalidCondition(ref e) if e.has_error("age_loe")));
        assert_eq!(store.stats().selects, 0);
    }

    #[tokio::test]
    async fn test_search_propagates_engine_failure() {
        let store = seeded_store();
        store.fail_next(SearchError::unavailable("connection refused"));

        let err = search(&store, &MemberSearchCondition::new()).await.unwrap_err();
        assert_eq!(err.error_code(), "store_unavailable");
    }

    #[tokio::test]
    async fn test_search_page_simple_first_page() {
        let store = seeded_store();
        let page = search_page_simple(&store, &MemberSearchCondition::new(), &PageRequest::of(0, 3))
            .await
            .unwrap();

        assert_eq!(usernames(&page.content), vec!["member1", "member2", "member3"]);
        assert_eq!(page.total, TotalCount::Exact(4));
        assert_eq!(page.total_pages(), Some(2));
        assert!(page.has_next());
    }

    #[tokio::test]
    async fn test_search_page_simple_counts_even_when_short() {
        let store = seeded_store();
        let page = search_page_simple(&store, &MemberSearchCondition::new(), &PageRequest::of(0, 10))
            .await
            .unwrap();
        assert_eq!(page.content.len(), 4);
        assert_eq!(page.total, TotalCount::Exact(4));
        assert_eq!(store.stats().selects, 1);
    }

    #[tokio::test]
    async fn test_search_page_complex_last_page_skips_count() {
        let store = seeded_store();
        let page = search_page_complex(&store, &MemberSearchCondition::new(), &PageRequest::new(3, 2))
            .await
            .unwrap();

        assert_eq!(usernames(&page.content), vec!["member4"]);
        assert_eq!(page.total, TotalCount::Exact(4));
        assert_eq!(store.stats().counts, 0);
    }

    #[tokio::test]
    async fn test_search_page_complex_past_the_end_counts() {
        let store = seeded_store();
        let page = search_page_complex(&store, &MemberSearchCondition::new(), &PageRequest::new(10, 2))
            .await
            .unwrap();

        assert!(page.is_empty());
        assert_eq!(page.total, TotalCount::Exact(4));
        assert_eq!(store.stats().counts, 1);
    }

    #[tokio::test]
    async fn test_search_page_respects_sort() {
        let store = seeded_store();
        let request = PageRequest::of(0, 2).with_sort(SortOrder::by_desc(Field::Age));
        let page = search_page(
            &store,
            &MemberSearchCondition::new(),
            &request,
            &SearchConfig::default(),
        )
        .await
        .unwrap();
        assert_eq!(usernames(&page.content), vec!["member4", "member3"]);
        assert_eq!(page.total, TotalCount::Exact(4));
    }

    #[tokio::test]
    async fn test_search_page_caps_page_size() {
        let store = seeded_store();
        let config = SearchConfig {
            max_page_size: 3,
            count_strategy: CountStrategy::Always,
            ..SearchConfig::default()
        };
        let page = search_page(
            &store,
            &MemberSearchCondition::new(),
            &PageRequest::unpaged(),
            &config,
        )
        .await
        .unwrap();
        assert_eq!(page.limit, 3);
        assert_eq!(usernames(&page.content), vec!["member1", "member2", "member3"]);
        assert_eq!(page.total, TotalCount::Exact(4));
        assert!(page.has_next());
    }

    #[tokio::test]
    async fn test_search_page_middle_window_descending() {
        let store = seeded_store();
        let request = PageRequest::new(1, 2).with_sort(SortOrder::by_desc(Field::Age));

        for count_strategy in [CountStrategy::Always, CountStrategy::Optimized] {
            let config = SearchConfig {
                count_strategy,
                ..SearchConfig::default()
            };
            let page = search_page(&store, &MemberSearchCondition::new(), &request, &config)
                .await
                .unwrap();
            assert_eq!(usernames(&page.content), vec!["member3", "member2"]);
            assert_eq!(page.total, TotalCount::Exact(4));
            assert_eq!(page.offset, 1);
            assert_eq!(page.limit, 2);
        }
    }

    #[tokio::test]
    async fn test_complex_page_does_not_count_a_short_first_page() {
        let mut engine = MockQueryExecutor::new();
        engine
            .expect_execute_join()
            .withf(|_, page, _, count| page.offset == 0 && *count == CountPolicy::Skip)
            .times(1)
            .returning(|_, _, _, _| {
                Ok(QueryOutput::new(
                    vec![joined("member1", 10, "teamA"), joined("member2", 20, "teamA")],
                    TotalCount::Unknown,
                ))
            });
        engine.expect_count_join().never();

        let page = search_page_complex(&engine, &MemberSearchCondition::new(), &PageRequest::new(0, 5))
            .await
            .unwrap();
        assert_eq!(page.total, TotalCount::Exact(2));
    }

    #[tokio::test]
    async fn test_complex_page_counts_a_full_page() {
        let mut engine = MockQueryExecutor::new();
        engine.expect_execute_join().times(1).returning(|_, _, _, _| {
            Ok(QueryOutput::new(
                vec![joined("member1", 10, "teamA"), joined("member2", 20, "teamA")],
                TotalCount::Unknown,
            ))
        });
        engine.expect_count_join().times(1).returning(|_, _| Ok(4));

        let page = search_page_complex(&engine, &MemberSearchCondition::new(), &PageRequest::new(0, 2))
            .await
            .unwrap();
        assert_eq!(page.total, TotalCount::Exact(4));
    }

    #[tokio::test]
    async fn test_count_failure_propagates() {
        let mut engine = MockQueryExecutor::new();
        engine.expect_execute_join().returning(|_, _, _, _| {
            Ok(QueryOutput::new(
                vec![joined("member1", 10, "teamA")],
                TotalCount::Unknown,
            ))
        });
        engine
            .expect_count_join()
            .returning(|_, _| Err(SearchError::QueryTimeout { elapsed_ms: 30_000 }));

        let err = search_page_complex(&engine, &MemberSearchCondition::new(), &PageRequest::new(0, 1))
            .await
            .unwrap_err();
        assert_eq!(err, SearchError::QueryTimeout { elapsed_ms: 30_000 });
    }

    #[tokio::test]
    async fn test_simple_page_falls_back_to_count() {
        let mut engine = MockQueryExecutor::new();
        engine
            .expect_execute_join()
            .withf(|_, _, _, count| *count == CountPolicy::Exact)
            .returning(|_, _, _, _| {
                Ok(QueryOutput::new(
                    vec![joined("member1", 10, "teamA")],
                    TotalCount::Unknown,
                ))
            });
        engine.expect_count_join().times(1).returning(|_, _| Ok(1));

        let page = search_page_simple(&engine, &MemberSearchCondition::new(), &PageRequest::of(0, 5))
            .await
            .unwrap();
        assert_eq!(page.total, TotalCount::Exact(1));
    }

    #[tokio::test]
    async fn test_search_members_exact_total() {
        let store = seeded_store();
        let predicate = Predicate::always_true().and(Field::Age.goe(20));
        let page = search_members(&store, &predicate, &PageRequest::new(0, 2))
            .await
            .unwrap();

        let ages: Vec<i32> = page.content.iter().map(|m| m.age).collect();
        assert_eq!(ages, vec![20, 30]);
        assert_eq!(page.total_elements(), Some(3));
    }

    #[tokio::test]
    async fn test_find_members_with_team() {
        let store = seeded_store();
        let rows = find_members_with_team(&store, &Predicate::always_true(), &JoinSpec::inner())
            .await
            .unwrap();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].team_name(), Some("teamA"));
        assert_eq!(rows[3].team_name(), Some("teamB"));
    }

    #[tokio::test]
    async fn test_fetch_preset_queries() {
        let store = seeded_store();

        let team_a = fetch(&store, &presets::team_members("teamA")).await.unwrap();
        assert_eq!(team_a.len(), 2);

        let oldest = fetch(&store, &presets::oldest_members()).await.unwrap();
        assert_eq!(oldest.iter().map(|m| m.age).collect::<Vec<_>>(), vec![40]);

        let senior = fetch(&store, &presets::at_least_average_age()).await.unwrap();
        assert_eq!(senior.iter().map(|m| m.age).collect::<Vec<_>>(), vec![30, 40]);

        let attached = fetch_joined(&store, &presets::members_with_team_named("teamA"))
            .await
            .unwrap();
        assert_eq!(attached.len(), 4);
        assert_eq!(attached.iter().filter(|r| r.team.is_some()).count(), 2);
    }

    #[tokio::test]
    async fn test_fetch_first_and_page() {
        let store = seeded_store();
        let query = QueryBuilder::new()
            .order_by_desc(Field::Age)
            .offset(1)
            .limit(2)
            .build();

        let first = fetch_first(&store, &query).await.unwrap();
        assert_eq!(first.map(|m| m.age), Some(30));

        let page = fetch_page(&store, &query).await.unwrap();
        assert_eq!(page.content.iter().map(|m| m.age).collect::<Vec<_>>(), vec![30, 20]);
        assert_eq!(page.total, TotalCount::Exact(4));

        let joined_page = fetch_page(&store, &QueryBuilder::new().inner_join_team().limit(3).build())
            .await
            .unwrap();
        assert_eq!(joined_page.content.len(), 3);
        assert_eq!(joined_page.total, TotalCount::Exact(4));
    }

    #[tokio::test]
    async fn test_aggregates() {
        let store = seeded_store();
        let values = aggregate(
            &store,
            &Predicate::always_true(),
            &[
                Aggregate::count(Field::MemberId),
                Aggregate::sum(Field::Age),
                Aggregate::avg(Field::Age),
                Aggregate::max(Field::Age),
                Aggregate::min(Field::Age),
            ],
        )
        .await
        .unwrap();

        assert_eq!(
            values,
            vec![
                Some(Value::Int(4)),
                Some(Value::Int(100)),
                Some(Value::Float(25.0)),
                Some(Value::Int(40)),
                Some(Value::Int(10)),
            ]
        );
    }

    #[tokio::test]
    async fn test_engine_as_trait_object() {
        let store = seeded_store();
        let engine: &dyn QueryExecutor = &store;
        let rows = search(engine, &MemberSearchCondition::new().with_username("member2"))
            .await
            .unwrap();
        assert_eq!(usernames(&rows), vec!["member2"]);
    }

    #[tokio::test]
    async fn test_select_tuples_default_order() {
        let store = seeded_store();
        let predicate = Predicate::always_true().and(Field::Age.goe(20));
        let tuples = select_tuples(
            &store,
            &predicate,
            &PageRequest::new(0, 2),
            &[
                Projection::Field(Field::Username),
                CaseExpr::on(Field::Age).when(20, "twenty").otherwise("other"),
                Projection::Subquery(Aggregate::max(Field::Age)),
            ],
        )
        .await
        .unwrap();

        assert_eq!(
            tuples,
            vec![
                vec![
                    Some(Value::from("member2")),
                    Some(Value::from("twenty")),
                    Some(Value::Int(40)),
                ],
                vec![
                    Some(Value::from("member3")),
                    Some(Value::from("other")),
                    Some(Value::Int(40)),
                ],
            ]
        );
    }
}
