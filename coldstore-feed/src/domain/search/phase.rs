//! Search phase, derived on every read from the current inputs.

use serde::Serialize;
use strum::{AsRefStr, Display};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display, AsRefStr)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SearchPhase {
    Idle,
    Typing,
    Loading,
    Results,
    Empty,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PhaseInputs<'a> {
    /// Text typed but not yet submitted
    pub draft: &'a str,
    pub submitted: &'a str,
    pub filters_active: bool,
    pub is_loading: bool,
    pub result_count: usize,
}

/// Nothing submitted and no filter: `Typing` if a draft exists, else `Idle`. Otherwise
/// `Loading` while any source loads, then `Empty` or `Results` by result count.
pub fn derive_phase(inputs: PhaseInputs<'_>) -> SearchPhase {
    if inputs.submitted.trim().is_empty() && !inputs.filters_active {
        return if inputs.draft.trim().is_empty() {
            SearchPhase::Idle
        } else {
            SearchPhase::Typing
        };
    }
    if inputs.is_loading {
        SearchPhase::Loading
    } else if inputs.result_count == 0 {
        SearchPhase::Empty
    } else {
        SearchPhase::Results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_entered_is_idle() {
        assert_eq!(derive_phase(PhaseInputs::default()), SearchPhase::Idle);
        assert_eq!(
            derive_phase(PhaseInputs {
                is_loading: true,
                result_count: 4,
                ..Default::default()
            }),
            SearchPhase::Idle
        );
    }

    #[test]
    fn unsubmitted_draft_is_typing() {
        let phase = derive_phase(PhaseInputs {
            draft: "acme",
            ..Default::default()
        });
        assert_eq!(phase, SearchPhase::Typing);
    }

    #[test]
    fn filter_chip_without_query_is_not_idle() {
        let with_match = PhaseInputs {
            filters_active: true,
            result_count: 1,
            ..Default::default()
        };
        assert_eq!(derive_phase(with_match), SearchPhase::Results);
        assert_eq!(
            derive_phase(PhaseInputs {
                result_count: 0,
                ..with_match
            }),
            SearchPhase::Empty
        );
    }

    #[test]
    fn loading_wins_over_results() {
        let phase = derive_phase(PhaseInputs {
            submitted: "acme",
            is_loading: true,
            result_count: 3,
            ..Default::default()
        });
        assert_eq!(phase, SearchPhase::Loading);
    }

    #[test]
    fn submitted_query_with_draft_edits_keeps_its_phase() {
        let phase = derive_phase(PhaseInputs {
            draft: "acme mat",
            submitted: "acme",
            result_count: 2,
            ..Default::default()
        });
        assert_eq!(phase, SearchPhase::Results);
    }
}
