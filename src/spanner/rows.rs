// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Row iteration helpers.
//!
//! A result set is any iterator of `Result<R, E>`, where `R` is the client's
//! row type. Rows are turned into domain types through `TryFrom<R>`.

/// Failure while reading or converting a row.
#[derive(Debug, thiserror::Error)]
pub enum RowError<E, C> {
    #[error("failed to read row: {0}")]
    Read(E),
    #[error("failed to convert row: {0}")]
    Convert(C),
}

/// Convert every row. The first error aborts.
pub fn collect_rows<T, R, E, I>(rows: I) -> Result<Vec<T>, RowError<E, T::Error>>
where
    I: IntoIterator<Item = Result<R, E>>,
    T: TryFrom<R>,
{
    rows.into_iter()
        .map(|row| match row {
            Ok(row) => T::try_from(row).map_err(RowError::Convert),
            Err(e) => Err(RowError::Read(e)),
        })
        .collect()
}

/// Convert the first row, if any. Later rows are not read.
pub fn first_row<T, R, E, I>(rows: I) -> Result<Option<T>, RowError<E, T::Error>>
where
    I: IntoIterator<Item = Result<R, E>>,
    T: TryFrom<R>,
{
    match first_raw(rows) {
        Ok(Some(row)) => T::try_from(row).map(Some).map_err(RowError::Convert),
        Ok(None) => Ok(None),
        Err(e) => Err(RowError::Read(e)),
    }
}

/// The first row as returned by the client, if any.
pub fn first_raw<R, E, I>(rows: I) -> Result<Option<R>, E>
where
    I: IntoIterator<Item = Result<R, E>>,
{
    rows.into_iter().next().transpose()
}
