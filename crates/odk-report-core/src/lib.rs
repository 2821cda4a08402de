//! ODK submission → HTML report
//!
//! The pipeline is four stages, each consuming the previous one's output:
//! - [`load`]: parse the submission XML and the XLSForm workbook
//! - [`label`]: resolve `${field}` references inside question labels
//! - [`choice`]: translate `select_one` / `select_multiple` codes to labels
//! - [`render`]: walk the submission in document order and emit HTML
//!
//! Lookups are permissive. A missing survey row, choice code or reference
//! never fails a conversion; it falls back (field skipped, raw answer kept,
//! placeholder kept) and is recorded as a [`LookupMiss`].
//!
//! There is no global state: every table is an argument, so converting the
//! same inputs twice yields byte-identical output.

use std::path::Path;

pub mod choice;
pub mod error;
pub mod form;
pub mod label;
pub mod load;
pub mod render;
pub mod submission;
pub mod write;

pub use error::{ConvertError, LoadError, LookupMiss, WriteError};
pub use form::{ChoiceRow, ChoiceTable, FormDefinition, QuestionType, SurveyRow};
pub use load::FormTables;
pub use render::{build_report, render_html, RenderSummary, Report, ReportEntry};
pub use submission::{SubmissionParseError, SubmissionTree};

/// Render a submission against its form, returning the complete document.
pub fn render_submission(mut tree: SubmissionTree, form: &FormTables) -> Report {
    build_report(&mut tree, &form.survey, &form.choices)
}

/// Load both inputs, render, and write the report to `output`.
///
/// The report is fully built before anything is written; on a load error
/// `output` is left untouched.
pub fn convert(submission: &Path, form: &Path, output: &Path) -> Result<RenderSummary, ConvertError> {
    tracing::info!(
        submission = %submission.display(),
        form = %form.display(),
        output = %output.display(),
        "converting submission"
    );

    let tree = load::load_submission(submission)?;
    let tables = load::load_form(form)?;
    let report = render_submission(tree, &tables);
    let summary = report.summary();

    for miss in &summary.misses {
        tracing::debug!(%miss, "lookup miss");
    }
    tracing::info!(
        fields = summary.fields_rendered,
        misses = summary.misses.len(),
        "rendered report"
    );

    write::write_report(output, &report.to_html())?;
    Ok(summary)
}
