//! Predicate composer
//!
//! Maps a `MemberSearchCondition` onto a `Predicate`. Clauses are emitted in
//! a fixed order (username, team name, minimum age, maximum age) so the same
//! condition always composes to the same predicate. Unset fields add nothing;
//! an all-unset condition composes to the match-all predicate.

use crate::condition::MemberSearchCondition;
use crate::filters::{Clause, Field, Predicate};

/// Compose the predicate for a search condition
pub fn compose(condition: &MemberSearchCondition) -> Predicate {
    let predicate = Predicate::always_true()
        .and_opt(username_eq(condition))
        .and_opt(team_name_eq(condition))
        .and_opt(age_goe(condition))
        .and_opt(age_loe(condition));

    tracing::debug!(predicate = %predicate, clauses = predicate.len(), "composed member predicate");
    predicate
}

fn username_eq(condition: &MemberSearchCondition) -> Option<Clause> {
    condition.username_text().map(|name| Field::Username.eq(name))
}

fn team_name_eq(condition: &MemberSearchCondition) -> Option<Clause> {
    condition.team_name_text().map(|name| Field::TeamName.eq(name))
}

fn age_goe(condition: &MemberSearchCondition) -> Option<Clause> {
    condition.age_goe.map(|age| Field::Age.goe(age))
}

fn age_loe(condition: &MemberSearchCondition) -> Option<Clause> {
    condition.age_loe.map(|age| Field::Age.loe(age))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_condition_matches_all() {
        let predicate = compose(&MemberSearchCondition::new());
        assert!(predicate.is_match_all());
        assert_eq!(predicate, Predicate::always_true());
    }

    #[test]
    fn test_single_field_conditions() {
        let cases = [
            (MemberSearchCondition::new().with_username("member1"), Field::Username.eq("member1")),
            (MemberSearchCondition::new().with_team_name("teamA"), Field::TeamName.eq("teamA")),
            (MemberSearchCondition::new().with_age_goe(35), Field::Age.goe(35)),
            (MemberSearchCondition::new().with_age_loe(40), Field::Age.loe(40)),
        ];

        for (condition, expected) in cases {
            let predicate = compose(&condition);
            assert_eq!(predicate.clauses(), &[expected]);
        }
    }

    #[test]
    fn test_clause_order_is_fixed() {
        let condition = MemberSearchCondition::new()
            .with_age_loe(40)
            .with_age_goe(35)
            .with_team_name("teamB")
            .with_username("member4");

        let predicate = compose(&condition);
        assert_eq!(
            predicate.clauses(),
            &[
                Field::Username.eq("member4"),
                Field::TeamName.eq("teamB"),
                Field::Age.goe(35),
                Field::Age.loe(40),
            ]
        );
    }

    #[test]
    fn test_compose_is_idempotent() {
        let condition = MemberSearchCondition::new().with_team_name("teamB").with_age_goe(35);
        assert_eq!(compose(&condition), compose(&condition));
    }

    #[test]
    fn test_blank_strings_are_skipped() {
        let condition = MemberSearchCondition::new().with_username("").with_age_loe(20);
        assert_eq!(compose(&condition).clauses(), &[Field::Age.loe(20)]);
    }

    #[test]
    fn test_inverted_range_still_composes() {
        let condition = MemberSearchCondition::new().with_age_goe(40).with_age_loe(10);
        assert_eq!(compose(&condition).len(), 2);
    }
}
