use std::path::Path;

use csv::StringRecord;
use log::{debug, info};
use snafu::prelude::*;

use crate::csv_data::{
    column_index, read_records, write_records, PENALTY_COLUMN, POS_COLUMN, TOTAL_TIME_COLUMN,
};
use crate::errors::*;
use crate::io_common::parse_number;

/// The total time in milliseconds once `penalty` seconds are added to it.
pub(crate) fn penalized_total(total: u64, penalty: u64) -> Result<u64> {
    penalty
        .checked_mul(1000)
        .and_then(|ms| total.checked_add(ms))
        .context(PenaltyOverflowSnafu { total, penalty })
}

/// Adds `penalty` seconds to the driver finishing at `position` in the result
/// file at `path`, and returns the penalty now stored for that driver.
///
/// Penalties accumulate. The position is matched against the `pos` column as
/// written in the file. The file is left untouched unless exactly one row
/// matches and that row has a total time the penalty can be added to.
pub fn apply_penalty(path: &Path, position: &str, penalty: &str) -> Result<String> {
    let addend = parse_number("penalty", penalty)?;

    let mut records = read_records(path)?;
    let (header, rows) = records
        .split_first_mut()
        .context(MissingColumnSnafu {
            path,
            column: POS_COLUMN,
        })?;
    let pos_idx = column_index(path, header, POS_COLUMN)?;
    let penalty_idx = column_index(path, header, PENALTY_COLUMN)?;
    let total_idx = column_index(path, header, TOTAL_TIME_COLUMN)?;

    let matches: Vec<usize> = rows
        .iter()
        .enumerate()
        .filter(|(_, row)| row.get(pos_idx) == Some(position))
        .map(|(idx, _)| idx)
        .collect();
    let row_idx = match matches.as_slice() {
        [] => return PositionNotFoundSnafu { path, pos: position }.fail(),
        [idx] => *idx,
        _ => {
            return AmbiguousPositionSnafu {
                path,
                pos: position,
                count: matches.len(),
            }
            .fail()
        }
    };

    let row = rows[row_idx].clone();
    // Drivers without a total time (did not start) cannot carry a penalty.
    let total = parse_number(TOTAL_TIME_COLUMN, row.get(total_idx).unwrap_or_default())?;
    let stored = row.get(penalty_idx).unwrap_or_default();
    let updated = if stored == "0" {
        addend
    } else {
        let previous = parse_number("stored penalty", stored)?;
        let sum = previous
            .checked_add(addend)
            .context(PenaltyOverflowSnafu {
                total,
                penalty: addend,
            })?;
        debug!("pos {}, penalty {} + {} = {}", position, previous, addend, sum);
        sum
    };
    penalized_total(total, updated)?;
    let updated = updated.to_string();

    rows[row_idx] = row
        .iter()
        .enumerate()
        .map(|(idx, field)| {
            if idx == penalty_idx {
                updated.as_str()
            } else {
                field
            }
        })
        .collect::<StringRecord>();

    write_records(path, &records)?;
    info!(
        "penalty for pos {} in {} is now {}s",
        position,
        path.display(),
        updated
    );
    Ok(updated)
}
