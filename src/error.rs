//! Errors raised while loading a results table and plotting its metrics.

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, PlotError>;

#[derive(Error, Debug)]
pub enum PlotError {
    #[error("io error on {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed csv in {path:?} at line {line}: {reason}")]
    Parse {
        path: PathBuf,
        line: u64,
        reason: String,
    },

    #[error("cannot parse {raw:?} as a number (row {row}, column {column}, metric {metric:?})")]
    ValueParse {
        row: usize,
        column: usize,
        metric: String,
        raw: String,
    },

    #[error("failed rendering chart for metric {metric:?}: {reason}")]
    Render { metric: String, reason: String },

    #[error("table has no data rows ({rows} row(s) including the header)")]
    EmptyTable { rows: usize },

    #[error("column {column} is out of range, the table has {columns} column(s)")]
    ColumnOutOfRange { column: usize, columns: usize },

    #[error("row {row} has {found} field(s), header has {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },
}

impl PlotError {
    /// csv wraps io failures in its own error kind, report those as `Io`
    pub(crate) fn from_csv(path: PathBuf, err: csv::Error) -> PlotError {
        let io_kind = match err.kind() {
            csv::ErrorKind::Io(e) => Some(e.kind()),
            _ => None,
        };
        match io_kind {
            Some(kind) => PlotError::Io {
                path,
                source: std::io::Error::new(kind, err.to_string()),
            },
            None => PlotError::Parse {
                path,
                line: err.position().map_or(0, |p| p.line()),
                reason: err.to_string(),
            },
        }
    }
}
