//! Label set → workflow state classification.
//!
//! Board columns are keyed by the state tag this produces, so the
//! "last configured state wins" rule must hold exactly.

use std::collections::HashSet;

use serde::Serialize;

use crate::domain::models::WorkflowState;

/// Outcome of classifying one issue.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Classification {
    pub is_project: bool,
    /// `None` leaves the card unfiled.
    pub state: Option<String>,
}

/// Classify an issue from its label names.
///
/// `state` is the last entry of `states` (in table order) whose label is
/// present. Label order on the issue and alphabetical order play no part.
pub fn classify<'a, I>(labels: I, states: &[WorkflowState], project_label: Option<&str>) -> Classification
where
    I: IntoIterator<Item = &'a str>,
{
    let present: HashSet<&str> = labels.into_iter().collect();

    let is_project = project_label.is_some_and(|p| present.contains(p));
    let state = states
        .iter()
        .rev()
        .find(|s| present.contains(s.label.as_str()))
        .map(|s| s.label.clone());

    Classification { is_project, state }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn table() -> Vec<WorkflowState> {
        vec![
            WorkflowState::new("backlog", "cccccc"),
            WorkflowState::new("in progress", "fbca04"),
            WorkflowState::new("review", "0e8a16"),
        ]
    }

    #[test]
    fn test_single_match() {
        let c = classify(["bug", "in progress"], &table(), None);
        assert_eq!(c.state.as_deref(), Some("in progress"));
        assert!(!c.is_project);
    }

    #[test]
    fn test_last_table_entry_wins() {
        // Label order on the issue is the reverse of table order.
        let c = classify(["review", "backlog"], &table(), None);
        assert_eq!(c.state.as_deref(), Some("review"));
    }

    #[test]
    fn test_table_order_not_alphabetical() {
        let states = vec![WorkflowState::new("zeta", "000000"), WorkflowState::new("alpha", "000000")];
        let c = classify(["zeta", "alpha"], &states, None);
        assert_eq!(c.state.as_deref(), Some("alpha"));
    }

    #[test]
    fn test_no_match_is_unfiled() {
        let c = classify(["bug", "wontfix"], &table(), None);
        assert_eq!(c.state, None);
    }

    #[test]
    fn test_project_label() {
        let c = classify(["epic", "backlog"], &table(), Some("epic"));
        assert!(c.is_project);
        assert_eq!(c.state.as_deref(), Some("backlog"));

        let c = classify(["backlog"], &table(), Some("epic"));
        assert!(!c.is_project);
    }

    #[test]
    fn test_no_project_label_configured() {
        let c = classify(["epic"], &table(), None);
        assert!(!c.is_project);
    }

    #[test]
    fn test_empty_inputs() {
        assert_eq!(classify(Vec::<&str>::new(), &[], None), Classification::default());
    }

    proptest! {
        #[test]
        fn prop_state_is_highest_present_index(mask in proptest::collection::vec(any::<bool>(), 3)) {
            let states = table();
            let labels: Vec<&str> = states
                .iter()
                .zip(&mask)
                .filter(|(_, on)| **on)
                .map(|(s, _)| s.label.as_str())
                .collect();
            let expected = mask.iter().rposition(|on| *on).map(|i| states[i].label.clone());
            prop_assert_eq!(classify(labels, &states, None).state, expected);
        }
    }
}
