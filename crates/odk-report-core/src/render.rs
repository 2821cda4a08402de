//! Submission → HTML.
//!
//! Leaves are visited in document order. Choice translation rewrites the
//! leaf's text in the tree, so a later label that references a translated
//! field sees the choice label rather than the code.

use crate::choice::translate_answer;
use crate::error::LookupMiss;
use crate::form::{ChoiceTable, FormDefinition};
use crate::label::resolve_label_with;
use crate::submission::SubmissionTree;

pub const DOCUMENT_TITLE: &str = "Submission Data";

/// One rendered paragraph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEntry {
    /// Notes and `appearance == "label"` rows: the label alone, bold.
    Heading { field: String, label: String },
    /// `label: answer`.
    Answer {
        field: String,
        label: String,
        answer: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderSummary {
    pub fields_rendered: usize,
    pub misses: Vec<LookupMiss>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub entries: Vec<ReportEntry>,
    pub misses: Vec<LookupMiss>,
}

impl Report {
    pub fn to_html(&self) -> String {
        render_html(&self.entries)
    }

    pub fn summary(&self) -> RenderSummary {
        RenderSummary {
            fields_rendered: self.entries.len(),
            misses: self.misses.clone(),
        }
    }
}

/// Build the report entries for `tree`, rewriting translated choice answers
/// in place.
pub fn build_report(tree: &mut SubmissionTree, form: &FormDefinition, choices: &ChoiceTable) -> Report {
    let mut entries = Vec::new();
    let mut misses = Vec::new();

    for id in tree.leaves() {
        let field = tree.node(id).name.clone();
        let Some(row) = form.get(&field) else {
            tracing::debug!(field = %field, "no survey row; skipped");
            misses.push(LookupMiss::FormRow { field });
            continue;
        };

        let label = row.label.as_deref().map(|label| {
            resolve_label_with(label, tree, |reference| {
                misses.push(LookupMiss::Reference {
                    field: field.clone(),
                    reference: reference.to_string(),
                });
            })
            .into_owned()
        });

        let raw = tree.node(id).text.clone();
        let translated = translate_answer(row.kind(), raw.as_deref(), choices, |list_name, code| {
            misses.push(LookupMiss::ChoiceCode {
                field: field.clone(),
                list_name: list_name.to_string(),
                code: code.to_string(),
            });
        });
        if let Some(text) = translated {
            tree.set_text(id, text);
        }

        if row.is_display_only() {
            entries.push(ReportEntry::Heading {
                field,
                label: label.unwrap_or_default(),
            });
        } else if let Some(label) = label {
            let answer = tree.node(id).text.clone().unwrap_or_default();
            entries.push(ReportEntry::Answer { field, label, answer });
        } else {
            tracing::debug!(field = %field, "survey row has no label; skipped");
            misses.push(LookupMiss::Label { field });
        }
    }

    Report { entries, misses }
}

/// Wrap entries in the fixed document shell. No whitespace is added between
/// elements.
///
/// Labels come from the form and may carry inline markup, so they are
/// emitted as written. Answers are submission data and are escaped.
pub fn render_html(entries: &[ReportEntry]) -> String {
    let mut html = format!("<html><head><title>{DOCUMENT_TITLE}</title></head><body>");
    for entry in entries {
        match entry {
            ReportEntry::Heading { label, .. } => {
                html.push_str("<p><strong>");
                html.push_str(label);
                html.push_str("</strong></p>");
            }
            ReportEntry::Answer { label, answer, .. } => {
                html.push_str("<p><strong>");
                html.push_str(label);
                if !label.ends_with(':') {
                    html.push(':');
                }
                html.push_str("</strong> ");
                html.push_str(&escape_html(answer));
                html.push_str("</p>");
            }
        }
    }
    html.push_str("</body></html>");
    html
}

fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
