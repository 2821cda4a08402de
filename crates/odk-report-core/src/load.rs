//! Input loading: the submission XML and the XLSForm workbook.
//!
//! Everything is read into memory before rendering starts. Any failure here
//! aborts the conversion.

use std::fs;
use std::path::Path;

use odk_report_xlsx::{SheetTable, Workbook, XlsxError};

use crate::error::LoadError;
use crate::form::{ChoiceRow, ChoiceTable, FormDefinition, SurveyRow};
use crate::submission::SubmissionTree;

pub const SURVEY_SHEET: &str = "survey";
pub const CHOICES_SHEET: &str = "choices";

/// The two lookup tables of an XLSForm.
#[derive(Debug, Clone, Default)]
pub struct FormTables {
    pub survey: FormDefinition,
    pub choices: ChoiceTable,
}

pub fn load_submission(path: &Path) -> Result<SubmissionTree, LoadError> {
    let xml = fs::read_to_string(path).map_err(|source| LoadError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    SubmissionTree::parse(&xml).map_err(|source| LoadError::Submission {
        path: path.to_path_buf(),
        source,
    })
}

pub fn load_form(path: &Path) -> Result<FormTables, LoadError> {
    let workbook_error = |source: XlsxError| match source {
        XlsxError::Io(source) => LoadError::Read {
            path: path.to_path_buf(),
            source,
        },
        source => LoadError::Workbook {
            path: path.to_path_buf(),
            source,
        },
    };

    let mut workbook = Workbook::open(path).map_err(workbook_error)?;
    for sheet in [SURVEY_SHEET, CHOICES_SHEET] {
        if !workbook.has_sheet(sheet) {
            return Err(LoadError::MissingSheet {
                path: path.to_path_buf(),
                sheet,
            });
        }
    }

    let survey = workbook.read_sheet(SURVEY_SHEET).map_err(workbook_error)?;
    let choices = workbook.read_sheet(CHOICES_SHEET).map_err(workbook_error)?;
    let tables = form_from_tables(&survey.into_table(), &choices.into_table())?;
    tracing::debug!(
        survey_rows = tables.survey.len(),
        choice_rows = tables.choices.len(),
        "loaded form definition"
    );
    Ok(tables)
}

struct Columns<'t> {
    table: &'t SheetTable,
    sheet: &'static str,
}

impl<'t> Columns<'t> {
    fn required(&self, column: &'static str) -> Result<usize, LoadError> {
        self.table.column(column).ok_or(LoadError::MissingColumn {
            sheet: self.sheet,
            column,
        })
    }

    /// Identifier cells are trimmed; display text is kept as written.
    fn ident(&self, record: usize, column: Option<usize>) -> Option<String> {
        column
            .and_then(|column| self.table.cell(record, column))
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    }

    fn text(&self, record: usize, column: usize) -> Option<String> {
        self.table.cell(record, column).map(str::to_string)
    }
}

/// Map header-addressed sheet tables onto the survey and choices rows.
///
/// `survey` needs `name`, `label`, `type`; `appearance` is optional.
/// `choices` needs `list_name`, `name`, `label` once it has a header row.
/// Extra columns are ignored.
pub fn form_from_tables(survey: &SheetTable, choices: &SheetTable) -> Result<FormTables, LoadError> {
    let cols = Columns {
        table: survey,
        sheet: SURVEY_SHEET,
    };
    let name = cols.required("name")?;
    let label = cols.required("label")?;
    let kind = cols.required("type")?;
    let appearance = survey.column("appearance");
    let survey_rows = (0..survey.records.len())
        .map(|record| SurveyRow {
            name: cols.ident(record, Some(name)),
            label: cols.text(record, label),
            question_type: cols.ident(record, Some(kind)),
            appearance: cols.ident(record, appearance),
        })
        .collect();

    Ok(FormTables {
        survey: FormDefinition::from_rows(survey_rows),
        choices: ChoiceTable::from_rows(choice_rows(choices)?),
    })
}

/// A `choices` sheet with no header row belongs to a form without select
/// questions and yields no rows.
fn choice_rows(choices: &SheetTable) -> Result<Vec<ChoiceRow>, LoadError> {
    if choices.headers.is_empty() {
        return Ok(Vec::new());
    }
    let cols = Columns {
        table: choices,
        sheet: CHOICES_SHEET,
    };
    let list_name = cols.required("list_name")?;
    let name = cols.required("name")?;
    let label = cols.required("label")?;
    Ok((0..choices.records.len())
        .map(|record| ChoiceRow {
            list_name: cols.ident(record, Some(list_name)),
            name: cols.ident(record, Some(name)),
            label: cols.text(record, label),
        })
        .collect())
}
