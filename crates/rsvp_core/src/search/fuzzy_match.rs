//! Best-match lookup of a response by a possibly misspelled name.
//!
//! # Invariants
//! - A candidate's score is the maximum of its measurements, not an average.
//! - Candidates scoring below [`MINIMUM_SCORE`] are never returned.
//! - Equal top scores resolve to the candidate that came first in the input.
//! - Blank queries and empty candidate sets yield no match without scoring.
//! - Lookup never fails; "no match" is `None`.

use super::similarity::{partial_ratio, ratio, token_set_ratio, token_sort_ratio, Score};
use crate::model::response::Response;
use log::debug;

/// Lowest composite score accepted as a match.
pub const MINIMUM_SCORE: Score = 90;

/// Most survivors kept after ranking.
pub const SEARCH_LIMIT: usize = 10;

/// A scored candidate, alive only for the duration of one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchCandidate<'a> {
    pub response: &'a Response,
    pub score: Score,
}

/// Name lookup over a caller-supplied set of responses.
#[derive(Debug, Clone, Copy, Default)]
pub struct FuzzyMatchService;

impl FuzzyMatchService {
    pub fn new() -> Self {
        Self
    }

    /// Single best response for the given name parts, or `None`.
    pub fn find_best_match<'a>(
        &self,
        responses: &'a [Response],
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Option<&'a Response> {
        self.rank(responses, first_name, last_name)
            .first()
            .map(|candidate| candidate.response)
    }

    /// Candidates at or above [`MINIMUM_SCORE`], best first, at most
    /// [`SEARCH_LIMIT`] of them. Equal scores keep input order.
    pub fn rank<'a>(
        &self,
        responses: &'a [Response],
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Vec<MatchCandidate<'a>> {
        let query = NameQuery::new(first_name, last_name);
        if responses.is_empty() || query.is_blank() {
            return Vec::new();
        }

        let mut survivors = responses
            .iter()
            .map(|response| MatchCandidate {
                response,
                score: query.score(response),
            })
            .filter(|candidate| candidate.score >= MINIMUM_SCORE)
            .collect::<Vec<_>>();
        // Stable sort keeps input order among equal scores.
        survivors.sort_by(|left, right| right.score.cmp(&left.score));
        survivors.truncate(SEARCH_LIMIT);

        debug!(
            "event=fuzzy_match module=search status=ok candidates={} survivors={} top_score={}",
            responses.len(),
            survivors.len(),
            survivors.first().map_or(0, |candidate| candidate.score)
        );
        survivors
    }

    /// Composite score of one response against the name parts.
    ///
    /// Returns 0 for a blank query.
    pub fn score(
        &self,
        response: &Response,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> Score {
        NameQuery::new(first_name, last_name).score(response)
    }
}

struct NameQuery<'q> {
    first: &'q str,
    last: &'q str,
}

impl<'q> NameQuery<'q> {
    fn new(first: Option<&'q str>, last: Option<&'q str>) -> Self {
        Self {
            first: first.map_or("", str::trim),
            last: last.map_or("", str::trim),
        }
    }

    fn is_blank(&self) -> bool {
        self.first.is_empty() && self.last.is_empty()
    }

    fn score(&self, response: &Response) -> Score {
        let candidate_first = response.first_name.trim();
        let candidate_last = response.last_name.trim();
        let has_first = !self.first.is_empty();
        let has_last = !self.last.is_empty();

        let mut best = 0;
        let mut measure = |score: Score| best = best.max(score);

        if has_first && has_last {
            let query_full = format!("{} {}", self.first, self.last);
            let candidate_full = format!("{candidate_first} {candidate_last}");
            measure(ratio(&query_full, &candidate_full));
            measure(partial_ratio(&query_full, &candidate_full));
            measure(token_sort_ratio(&query_full, &candidate_full));
            measure(token_set_ratio(&query_full, &candidate_full));
        }
        if has_first {
            measure(ratio(self.first, candidate_first));
            measure(partial_ratio(self.first, candidate_first));
        }
        if has_last {
            measure(ratio(self.last, candidate_last));
            measure(partial_ratio(self.last, candidate_last));
        }
        if has_first && has_last {
            // swapped name order
            measure(ratio(self.first, candidate_last));
            measure(ratio(self.last, candidate_first));
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::{FuzzyMatchService, MINIMUM_SCORE, SEARCH_LIMIT};
    use crate::model::response::Response;

    fn guests() -> Vec<Response> {
        vec![
            Response::new("John", "Smith", "john@example.com", true),
            Response::new("Jane", "Doe", "jane@example.com", false),
        ]
    }

    #[test]
    fn exact_name_matches_with_full_score() {
        let service = FuzzyMatchService::new();
        let guests = guests();
        let found = service
            .find_best_match(&guests, Some("John"), Some("Smith"))
            .expect("exact name should match");
        assert_eq!(found.id, guests[0].id);
        assert!(service.score(found, Some("John"), Some("Smith")) >= MINIMUM_SCORE);
    }

    #[test]
    fn single_character_edit_still_matches() {
        let service = FuzzyMatchService::new();
        let guests = guests();
        let found = service
            .find_best_match(&guests, Some("Jon"), Some("Smith"))
            .expect("near miss should match");
        assert_eq!(found.id, guests[0].id);
    }

    #[test]
    fn unrelated_name_has_no_match() {
        let service = FuzzyMatchService::new();
        let guests = guests();
        assert!(service
            .find_best_match(&guests, Some("Xavier"), Some("Unknown"))
            .is_none());
        for guest in &guests {
            assert!(service.score(guest, Some("Xavier"), Some("Unknown")) < MINIMUM_SCORE);
        }
    }

    #[test]
    fn blank_query_or_empty_set_has_no_match() {
        let service = FuzzyMatchService::new();
        let guests = guests();
        assert!(service.find_best_match(&[], Some("John"), Some("Smith")).is_none());
        assert!(service.find_best_match(&guests, None, None).is_none());
        assert!(service.find_best_match(&guests, Some("  "), Some("\t")).is_none());
        assert_eq!(service.score(&guests[0], Some(" "), None), 0);
    }

    #[test]
    fn single_part_queries_compare_matching_field() {
        let service = FuzzyMatchService::new();
        let guests = guests();
        let by_last = service
            .find_best_match(&guests, None, Some("Doe"))
            .expect("last name should match");
        assert_eq!(by_last.id, guests[1].id);

        let by_first = service
            .find_best_match(&guests, Some("  John  "), None)
            .expect("first name should match");
        assert_eq!(by_first.id, guests[0].id);
    }

    #[test]
    fn swapped_name_order_matches() {
        let service = FuzzyMatchService::new();
        let guests = guests();
        let found = service
            .find_best_match(&guests, Some("Smith"), Some("John"))
            .expect("swapped order should match");
        assert_eq!(found.id, guests[0].id);
    }

    #[test]
    fn tie_resolves_to_first_in_input_order() {
        let service = FuzzyMatchService::new();
        let guests = vec![
            Response::new("Jane", "Doe", "", true),
            Response::new("John", "Smith", "first@example.com", true),
            Response::new("John", "Smith", "second@example.com", true),
        ];
        let found = service
            .find_best_match(&guests, Some("John"), Some("Smith"))
            .expect("duplicate names should match");
        assert_eq!(found.email, "first@example.com");
    }

    #[test]
    fn rank_is_capped_and_keeps_input_order_among_equals() {
        let service = FuzzyMatchService::new();
        // Each filler's first name equals the queried last name, scoring 100.
        let mut guests = (0..SEARCH_LIMIT + 5)
            .map(|index| Response::new("Smith", format!("Guest{index}"), "", true))
            .collect::<Vec<_>>();
        guests.push(Response::new("John", "Smith", "", true));

        let ranked = service.rank(&guests, Some("John"), Some("Smith"));
        assert_eq!(ranked.len(), SEARCH_LIMIT);
        assert!(ranked.iter().all(|candidate| candidate.score == 100));
        let ranked_ids = ranked
            .iter()
            .map(|candidate| candidate.response.id)
            .collect::<Vec<_>>();
        let leading_ids = guests[..SEARCH_LIMIT]
            .iter()
            .map(|guest| guest.id)
            .collect::<Vec<_>>();
        assert_eq!(ranked_ids, leading_ids);
    }
}
