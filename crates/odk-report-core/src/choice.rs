//! Choice code → label translation for `select_one` / `select_multiple`.

use crate::form::{ChoiceTable, QuestionType};

/// Label of `(list_name, code)`, or `None` when no row matches or the
/// matching row has no label.
pub fn single_choice_label<'a>(list_name: &str, code: &str, choices: &'a ChoiceTable) -> Option<&'a str> {
    choices.get(list_name, code).and_then(|row| row.label.as_deref())
}

/// Labels of the whitespace-separated `codes`, joined with `", "` in input
/// order. Untranslatable codes are dropped; if none translate the result is
/// empty and the caller keeps the raw answer.
pub fn multiple_choice_labels(list_name: &str, codes: Option<&str>, choices: &ChoiceTable) -> String {
    codes
        .unwrap_or_default()
        .split_whitespace()
        .filter_map(|code| single_choice_label(list_name, code, choices))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Translated answer text for a choice question, or `None` to keep `raw`.
///
/// `on_miss` receives `(list_name, code)` for every code that did not
/// translate.
pub fn translate_answer(
    kind: QuestionType<'_>,
    raw: Option<&str>,
    choices: &ChoiceTable,
    mut on_miss: impl FnMut(&str, &str),
) -> Option<String> {
    match kind {
        QuestionType::SelectOne {
            list_name: Some(list_name),
        } => {
            let code = raw?;
            match single_choice_label(list_name, code, choices) {
                Some(label) => Some(label.to_string()),
                None => {
                    on_miss(list_name, code);
                    None
                }
            }
        }
        QuestionType::SelectMultiple {
            list_name: Some(list_name),
        } => {
            for code in raw.unwrap_or_default().split_whitespace() {
                if single_choice_label(list_name, code, choices).is_none() {
                    on_miss(list_name, code);
                }
            }
            Some(multiple_choice_labels(list_name, raw, choices)).filter(|labels| !labels.is_empty())
        }
        _ => None,
    }
}
