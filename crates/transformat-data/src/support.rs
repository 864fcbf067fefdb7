//! Shared helpers for mapping `sqlx` failures onto the workspace error catalogue.

use transformat_errors::Error;

pub(crate) fn db_error(operation: &'static str, source: sqlx::Error) -> Error {
    let details = Some(source.to_string());
    Error::DbConnectionFailed {
        operation,
        details,
        source: Some(source.into()),
    }
}
