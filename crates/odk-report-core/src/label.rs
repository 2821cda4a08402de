//! `${field}` reference substitution in question labels.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::{Captures, Regex};

use crate::submission::SubmissionTree;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| Regex::new(r"\$\{(.*?)\}").expect("placeholder pattern compiles"))
}

/// Replace every `${name}` in `label` with the text of the first `name`
/// element in `tree`.
///
/// A reference whose element is missing, or has no text, stays in the label
/// verbatim. Substituted text is not scanned again.
pub fn resolve_label<'a>(label: &'a str, tree: &SubmissionTree) -> Cow<'a, str> {
    resolve_label_with(label, tree, |_| {})
}

/// [`resolve_label`], reporting each unresolved reference name to
/// `on_unresolved`.
pub fn resolve_label_with<'a>(
    label: &'a str,
    tree: &SubmissionTree,
    mut on_unresolved: impl FnMut(&str),
) -> Cow<'a, str> {
    placeholder().replace_all(label, |caps: &Captures<'_>| {
        let reference = &caps[1];
        match tree.text_of(reference).filter(|text| !text.is_empty()) {
            Some(text) => text.to_string(),
            None => {
                on_unresolved(reference);
                caps[0].to_string()
            }
        }
    })
}

/// Reference names in `label`, in order of appearance (duplicates kept).
pub fn references(label: &str) -> Vec<&str> {
    placeholder()
        .captures_iter(label)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn tree(xml: &str) -> SubmissionTree {
        SubmissionTree::parse(xml).unwrap()
    }

    #[test]
    fn substitutes_answered_reference() {
        let t = tree("<data><age>34</age></data>");
        assert_eq!(resolve_label("Please confirm ${age}", &t), "Please confirm 34");
    }

    #[test]
    fn missing_or_empty_reference_is_left_verbatim() {
        let absent = tree("<data><name>x</name></data>");
        assert_eq!(resolve_label("Please confirm ${age}", &absent), "Please confirm ${age}");

        let empty = tree("<data><age/></data>");
        assert_eq!(resolve_label("Please confirm ${age}", &empty), "Please confirm ${age}");
    }

    #[test]
    fn repeated_and_mixed_references() {
        let t = tree("<data><a>1</a><b>2</b></data>");
        assert_eq!(
            resolve_label("${a}+${a}=${c} (${b})", &t),
            "1+1=${c} (2)"
        );
    }

    #[test]
    fn single_pass_only() {
        let t = tree("<data><outer>${inner}</outer><inner>deep</inner></data>");
        assert_eq!(resolve_label("see ${outer}", &t), "see ${inner}");
    }

    #[test]
    fn label_without_references_is_borrowed() {
        let t = tree("<data/>");
        assert!(matches!(resolve_label("Plain label", &t), Cow::Borrowed("Plain label")));
    }

    #[test]
    fn unresolved_references_are_reported_in_order() {
        let t = tree("<data><b>2</b></data>");
        let mut missed = Vec::new();
        let out = resolve_label_with("${a} ${b} ${c}", &t, |r| missed.push(r.to_string()));
        assert_eq!(out, "${a} 2 ${c}");
        assert_eq!(missed, vec!["a", "c"]);
    }

    #[test]
    fn references_lists_names() {
        assert_eq!(references("${a} and ${b} and ${a}"), vec!["a", "b", "a"]);
        assert!(references("no refs, $ {x}, ${").is_empty());
    }

    proptest! {
        #[test]
        fn text_without_placeholders_is_unchanged(label in "[^$]{0,40}") {
            let t = tree("<data><x>1</x></data>");
            let out = resolve_label(&label, &t);
            prop_assert_eq!(out.as_ref(), label.as_str());
        }

        #[test]
        fn answered_reference_is_substituted(name in "[a-z][a-z0-9_]{0,8}", value in "[A-Za-z0-9 ]{1,12}") {
            prop_assume!(!value.trim().is_empty());
            let xml = format!("<data><{name}>{value}</{name}></data>");
            let t = tree(&xml);
            let label = format!("Q: ${{{name}}}?");
            let expected = format!("Q: {value}?");
            prop_assert_eq!(resolve_label(&label, &t).into_owned(), expected);
        }
    }
}
