//! Form definition tables (XLSForm `survey` and `choices` sheets).
//!
//! Both tables keep their rows in sheet order and build a lookup index once.
//! Duplicate keys follow a first-match-wins policy: the index records the
//! first row for a key and later duplicates are never reachable through it.

use std::collections::HashMap;

/// One row of the `survey` sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SurveyRow {
    pub name: Option<String>,
    pub label: Option<String>,
    pub question_type: Option<String>,
    pub appearance: Option<String>,
}

impl SurveyRow {
    pub fn kind(&self) -> QuestionType<'_> {
        QuestionType::parse(self.question_type.as_deref().unwrap_or(""))
    }

    /// Display-only rows: notes, and anything with `appearance == "label"`.
    pub fn is_display_only(&self) -> bool {
        self.question_type.as_deref() == Some("note") || self.appearance.as_deref() == Some("label")
    }
}

/// One row of the `choices` sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChoiceRow {
    pub list_name: Option<String>,
    pub name: Option<String>,
    pub label: Option<String>,
}

/// How a `type` cell affects answer rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionType<'a> {
    /// `select_one <list>`: the answer is one choice code.
    SelectOne { list_name: Option<&'a str> },
    /// `select_multiple <list>`: the answer is space-separated choice codes.
    SelectMultiple { list_name: Option<&'a str> },
    /// `note`: display text, no answer.
    Note,
    /// Everything else, including `select_*_from_file`, whose choices live
    /// outside the workbook.
    Other(&'a str),
}

impl<'a> QuestionType<'a> {
    pub fn parse(raw: &'a str) -> Self {
        let raw = raw.trim();
        if raw == "note" {
            return QuestionType::Note;
        }
        // The list is the token after the keyword; a trailing `or_other`
        // modifier is not a list name.
        let list_name = raw.split_whitespace().nth(1);
        if raw.starts_with("select_one") && !raw.starts_with("select_one_from_file") {
            QuestionType::SelectOne { list_name }
        } else if raw.starts_with("select_multiple") && !raw.starts_with("select_multiple_from_file") {
            QuestionType::SelectMultiple { list_name }
        } else {
            QuestionType::Other(raw)
        }
    }

    pub fn is_choice(&self) -> bool {
        matches!(
            self,
            QuestionType::SelectOne { .. } | QuestionType::SelectMultiple { .. }
        )
    }
}

// ============================================================================
// Survey
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct FormDefinition {
    rows: Vec<SurveyRow>,
    by_name: HashMap<String, usize>,
}

impl FormDefinition {
    pub fn from_rows(rows: Vec<SurveyRow>) -> Self {
        let mut by_name = HashMap::new();
        for (index, row) in rows.iter().enumerate() {
            let Some(name) = row.name.as_deref() else {
                continue;
            };
            if by_name.contains_key(name) {
                tracing::warn!(field = name, row = index, "duplicate survey row ignored");
                continue;
            }
            by_name.insert(name.to_string(), index);
        }
        Self { rows, by_name }
    }

    /// The authoritative (first) row for `name`.
    pub fn get(&self, name: &str) -> Option<&SurveyRow> {
        self.by_name.get(name).map(|&index| &self.rows[index])
    }

    pub fn rows(&self) -> &[SurveyRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ============================================================================
// Choices
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct ChoiceTable {
    rows: Vec<ChoiceRow>,
    by_list: HashMap<String, HashMap<String, usize>>,
}

impl ChoiceTable {
    pub fn from_rows(rows: Vec<ChoiceRow>) -> Self {
        let mut by_list: HashMap<String, HashMap<String, usize>> = HashMap::new();
        for (index, row) in rows.iter().enumerate() {
            let (Some(list_name), Some(name)) = (row.list_name.as_deref(), row.name.as_deref())
            else {
                continue;
            };
            let codes = by_list.entry(list_name.to_string()).or_default();
            if codes.contains_key(name) {
                tracing::warn!(list_name, code = name, row = index, "duplicate choice row ignored");
                continue;
            }
            codes.insert(name.to_string(), index);
        }
        Self { rows, by_list }
    }

    /// The authoritative (first) row for `(list_name, code)`.
    pub fn get(&self, list_name: &str, code: &str) -> Option<&ChoiceRow> {
        self.by_list
            .get(list_name)
            .and_then(|codes| codes.get(code))
            .map(|&index| &self.rows[index])
    }

    pub fn rows(&self) -> &[ChoiceRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn survey(name: &str, label: &str) -> SurveyRow {
        SurveyRow {
            name: Some(name.to_string()),
            label: Some(label.to_string()),
            question_type: Some("text".to_string()),
            appearance: None,
        }
    }

    fn choice(list: &str, name: &str, label: &str) -> ChoiceRow {
        ChoiceRow {
            list_name: Some(list.to_string()),
            name: Some(name.to_string()),
            label: Some(label.to_string()),
        }
    }

    #[test]
    fn question_type_classification() {
        assert_eq!(
            QuestionType::parse("select_one fruit"),
            QuestionType::SelectOne { list_name: Some("fruit") }
        );
        assert_eq!(
            QuestionType::parse("select_multiple  fruit or_other"),
            QuestionType::SelectMultiple { list_name: Some("fruit") }
        );
        assert_eq!(
            QuestionType::parse("select_one"),
            QuestionType::SelectOne { list_name: None }
        );
        assert_eq!(
            QuestionType::parse("select_one_from_file towns.csv"),
            QuestionType::Other("select_one_from_file towns.csv")
        );
        assert_eq!(
            QuestionType::parse("select_multiple_from_file x.csv"),
            QuestionType::Other("select_multiple_from_file x.csv")
        );
        assert_eq!(QuestionType::parse("note"), QuestionType::Note);
        assert_eq!(QuestionType::parse("integer"), QuestionType::Other("integer"));
        assert!(!QuestionType::parse("").is_choice());
    }

    #[test]
    fn survey_first_row_wins() {
        let form = FormDefinition::from_rows(vec![
            survey("age", "Age"),
            survey("age", "Age again"),
            SurveyRow::default(),
        ]);
        assert_eq!(form.len(), 3);
        assert_eq!(form.get("age").and_then(|r| r.label.as_deref()), Some("Age"));
        assert!(form.get("missing").is_none());
    }

    #[test]
    fn choices_first_row_wins_per_list() {
        let choices = ChoiceTable::from_rows(vec![
            choice("fruit", "a", "Apple"),
            choice("fruit", "a", "Avocado"),
            choice("color", "a", "Amber"),
        ]);
        assert_eq!(
            choices.get("fruit", "a").and_then(|r| r.label.as_deref()),
            Some("Apple")
        );
        assert_eq!(
            choices.get("color", "a").and_then(|r| r.label.as_deref()),
            Some("Amber")
        );
        assert!(choices.get("fruit", "z").is_none());
        assert!(choices.get("veg", "a").is_none());
    }

    #[test]
    fn display_only_rows() {
        let mut row = survey("intro", "Welcome");
        assert!(!row.is_display_only());
        row.appearance = Some("label".to_string());
        assert!(row.is_display_only());
        row.appearance = None;
        row.question_type = Some("note".to_string());
        assert!(row.is_display_only());
    }
}
