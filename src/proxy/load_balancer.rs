use tracing::{debug, warn};

use crate::common::types::LbType;
use crate::proxy::candidate::Candidate;
use crate::proxy::group::CandidateGroup;

/// Per call attempt picker over one group's candidates.
///
/// Built from a snapshot of the group, it hands out each candidate at most
/// once and is meant to be owned by a single call attempt. Drop it to
/// abandon the attempt.
#[derive(Debug)]
pub struct Selector {
    group: String,
    lb_type: LbType,
    remaining: Vec<Candidate>,
    current: Option<Candidate>,
    key: Option<String>,
}

impl Selector {
    pub fn of(group: &CandidateGroup) -> Self {
        Self {
            group: group.name().to_string(),
            lb_type: group.lb_type(),
            remaining: group.candidates().to_vec(),
            current: None,
            key: None,
        }
    }

    /// Correlation key for the `ms-id` discipline; ignored by the others.
    pub fn set_key(&mut self, key: impl Into<String>) {
        self.key = Some(key.into());
    }

    /// Last candidate handed out, if any.
    pub fn current(&self) -> Option<&Candidate> {
        self.current.as_ref()
    }

    pub fn remaining(&self) -> &[Candidate] {
        &self.remaining
    }

    pub fn lb_type(&self) -> LbType {
        self.lb_type
    }

    pub fn group(&self) -> &str {
        &self.group
    }
}

impl Iterator for Selector {
    type Item = Candidate;

    fn next(&mut self) -> Option<Candidate> {
        let Some(selection) = self.lb_type.select(&self.remaining, self.key.as_deref()) else {
            warn!(group = %self.group, "no more candidates to try");
            return None;
        };

        let picked = self.remaining.remove(selection.index);
        if selection.exclusive {
            self.remaining.clear();
        }

        debug!(
            group = %self.group,
            lb_type = %self.lb_type,
            candidate = %picked,
            left = self.remaining.len(),
            "selected next hop"
        );

        self.current = Some(picked.clone());
        Some(picked)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.remaining.len()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::Transport;
    use std::collections::{HashMap, HashSet};

    fn group(lb_type: LbType, elements: &[(&str, u32, u32)]) -> CandidateGroup {
        CandidateGroup::builder("trunk")
            .lb_type(lb_type)
            .candidates(elements.iter().map(|(address, rank, weight)| {
                Candidate::new(*address, 5060, Transport::Udp)
                    .unwrap()
                    .with_rank(*rank)
                    .with_weight(*weight)
            }))
            .build()
            .unwrap()
    }

    #[test]
    fn current_is_empty_before_first_pick() {
        let selector = Selector::of(&group(LbType::HighestPreference, &[("1.1.1.1", 1, 10)]));
        assert!(selector.current().is_none());
    }

    #[test]
    fn hands_out_every_candidate_once() {
        for lb_type in [LbType::HighestPreference, LbType::Weight, LbType::Hunt, LbType::MsId] {
            let mut selector = Selector::of(&group(
                lb_type,
                &[
                    ("1.1.1.1", 1, 10),
                    ("2.2.2.2", 1, 20),
                    ("3.3.3.3", 2, 30),
                    ("4.4.4.4", 3, 40),
                ],
            ));

            let mut seen = HashSet::new();
            for _ in 0..4 {
                let candidate = selector.next().unwrap();
                assert_eq!(selector.current(), Some(&candidate));
                assert!(seen.insert(candidate), "{lb_type} repeated a candidate");
            }

            assert!(selector.next().is_none());
            assert!(selector.remaining().is_empty());
        }
    }

    #[test]
    fn drains_best_tier_before_the_next() {
        let mut selector = Selector::of(&group(
            LbType::Weight,
            &[("1.1.1.1", 1, 10), ("2.2.2.2", 1, 90), ("3.3.3.3", 2, 100)],
        ));

        let first_two: HashSet<_> = selector
            .by_ref()
            .take(2)
            .map(|candidate| candidate.address().to_string())
            .collect();
        assert_eq!(first_two, HashSet::from(["1.1.1.1".into(), "2.2.2.2".into()]));
        assert_eq!(selector.next().unwrap().address(), "3.3.3.3");
    }

    #[test]
    fn once_allows_a_single_attempt() {
        let mut selector = Selector::of(&group(
            LbType::Once,
            &[("1.1.1.1", 1, 10), ("2.2.2.2", 2, 10), ("3.3.3.3", 3, 10)],
        ));

        assert!(selector.next().is_some());
        assert!(selector.remaining().is_empty());
        assert!(selector.next().is_none());
    }

    #[test]
    fn ms_id_without_key_picks_first_tier_member() {
        let group = group(
            LbType::MsId,
            &[("1.1.1.1", 1, 10), ("2.2.2.2", 1, 90), ("3.3.3.3", 2, 100)],
        );

        for _ in 0..20 {
            let mut selector = Selector::of(&group);
            assert_eq!(selector.next().unwrap().address(), "2.2.2.2");
        }
    }

    #[test]
    fn ms_id_with_key_is_sticky() {
        let group = group(
            LbType::MsId,
            &[("1.1.1.1", 1, 10), ("2.2.2.2", 1, 10), ("3.3.3.3", 1, 10)],
        );

        let pick = |key: &str| {
            let mut selector = Selector::of(&group);
            selector.set_key(key);
            selector.next().unwrap()
        };

        let first = pick("call-42");
        for _ in 0..20 {
            assert_eq!(pick("call-42"), first);
        }
    }

    #[test]
    fn key_is_ignored_by_random_disciplines() {
        let mut selector = Selector::of(&group(LbType::HighestPreference, &[("1.1.1.1", 1, 10)]));
        selector.set_key("call-1");
        assert_eq!(selector.next().unwrap().address(), "1.1.1.1");
    }

    #[test]
    fn weighted_first_pick_follows_weights() {
        let group = group(
            LbType::Weight,
            &[("1.1.1.1", 1, 50), ("2.2.2.2", 1, 30), ("3.3.3.3", 1, 20)],
        );

        let trials = 2000;
        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..trials {
            let picked = Selector::of(&group).next().unwrap();
            *counts.entry(picked.address().to_string()).or_default() += 1;
        }

        for (address, share) in [("1.1.1.1", 50.0), ("2.2.2.2", 30.0), ("3.3.3.3", 20.0)] {
            let observed = counts.get(address).copied().unwrap_or(0) as f64 * 100.0 / trials as f64;
            assert!(
                (observed - share).abs() <= 10.0,
                "{address}: observed {observed:.1}% for a {share}% share"
            );
        }
    }

    #[test]
    fn empty_group_yields_nothing() {
        let group = CandidateGroup::builder("empty").build().unwrap();
        assert!(Selector::of(&group).next().is_none());
    }
}
