use std::path::PathBuf;

use odk_report_xlsx::XlsxError;
use thiserror::Error;

use crate::submission::SubmissionParseError;

/// Fatal: an input could not be loaded. Nothing is written.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot read `{}`", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed submission `{}`", .path.display())]
    Submission {
        path: PathBuf,
        #[source]
        source: SubmissionParseError,
    },

    #[error("unreadable workbook `{}`", .path.display())]
    Workbook {
        path: PathBuf,
        #[source]
        source: XlsxError,
    },

    #[error("workbook `{}` has no `{sheet}` sheet", .path.display())]
    MissingSheet { path: PathBuf, sheet: &'static str },

    #[error("sheet `{sheet}` has no `{column}` column")]
    MissingColumn {
        sheet: &'static str,
        column: &'static str,
    },
}

/// Fatal: the finished report could not be written.
#[derive(Debug, Error)]
#[error("cannot write `{}`", .path.display())]
pub struct WriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Never fatal. Each miss is resolved by a fallback (placeholder kept, raw
/// answer kept, field skipped) and reported in the render summary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupMiss {
    #[error("`{field}`: no survey row")]
    FormRow { field: String },

    #[error("`{field}`: survey row has no label")]
    Label { field: String },

    #[error("`{field}`: reference `${{{reference}}}` left unresolved")]
    Reference { field: String, reference: String },

    #[error("`{field}`: no choice `{code}` in list `{list_name}`")]
    ChoiceCode {
        field: String,
        list_name: String,
        code: String,
    },
}

/// Either fatal error of a whole conversion.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Write(#[from] WriteError),
}
