//! Follow-up suggestion derivation for the `final` payload.

const MAX_SUGGESTIONS: usize = 3;

/// Derive follow-up actions from the closing turn.
///
/// Looks at which tools ran and at the shape of the final content;
/// deduplicated and capped at three.
pub fn derive_next_actions(content: &str, tools_used: &[String]) -> Vec<String> {
    let mut actions: Vec<String> = Vec::new();

    let searched = tools_used.iter().any(|t| t.contains("search"));
    let wrote = tools_used
        .iter()
        .any(|t| t.contains("create") || t.contains("ingest") || t.contains("score"));

    if searched {
        actions.push("Refine the search with more specific keywords".into());
        actions.push("Save a summary of these findings".into());
    }
    if wrote {
        actions.push("Review what was just saved".into());
    }
    if content.trim_end().ends_with('?') {
        actions.push("Answer the assistant's question".into());
    }
    actions.push("Ask a follow-up question".into());

    actions.dedup();
    actions.truncate(MAX_SUGGESTIONS);
    actions
}

/// The fixed retry set used on error finals.
pub fn error_next_actions() -> Vec<String> {
    vec![
        "Try again".into(),
        "Rephrase your question".into(),
        "Break the request into smaller steps".into(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_suggestions() {
        let actions = derive_next_actions("Found 3 items.", &["brain.search_items".into()]);
        assert!(actions.iter().any(|a| a.contains("Refine")));
        assert!(actions.len() <= MAX_SUGGESTIONS);
    }

    #[test]
    fn write_suggestions() {
        let actions = derive_next_actions("Saved.", &["brain.create_item".into()]);
        assert!(actions.iter().any(|a| a.contains("Review")));
    }

    #[test]
    fn question_suggestion_without_tools() {
        let actions = derive_next_actions("Which project did you mean?", &[]);
        assert!(actions.iter().any(|a| a.contains("Answer")));
    }

    #[test]
    fn always_has_at_least_one_action() {
        let actions = derive_next_actions("", &[]);
        assert!(!actions.is_empty());
    }

    #[test]
    fn error_set_is_fixed() {
        let actions = error_next_actions();
        assert_eq!(actions.len(), 3);
        assert_eq!(actions[0], "Try again");
    }
}
