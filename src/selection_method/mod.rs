//! Pure selection functions, one per load-balancing discipline.
//!
//! Every function takes the ordered working set of a selector (never empty)
//! and returns the index of one member without touching the set.

use crate::common::types::LbType;
use crate::proxy::candidate::Candidate;

pub mod hash;
pub mod highest_preference;
pub mod once;
pub mod tier;
pub mod weighted;

/// Outcome of one pick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    /// Index into the working set.
    pub index: usize,
    /// The caller must drop every other candidate after this pick.
    pub exclusive: bool,
}

impl Selection {
    fn at(index: usize) -> Self {
        Self {
            index,
            exclusive: false,
        }
    }
}

impl LbType {
    /// Picks one member of `candidates`, or `None` when the set is empty.
    pub fn select(&self, candidates: &[Candidate], key: Option<&str>) -> Option<Selection> {
        if candidates.is_empty() {
            return None;
        }

        let selection = match self {
            LbType::HighestPreference => {
                Selection::at(highest_preference::select(tier::top_tier(candidates)))
            }
            LbType::Weight | LbType::Hunt => {
                Selection::at(weighted::select(tier::top_tier(candidates)))
            }
            LbType::MsId => Selection::at(hash::select(tier::top_tier(candidates), key)),
            LbType::Once => Selection {
                index: once::select(candidates),
                exclusive: true,
            },
        };

        Some(selection)
    }
}
