use std::io::Write;

use log::debug;
use snafu::prelude::*;

use crate::errors::*;
use crate::race_result::RaceResult;

pub const EXPORT_HEADER: &str =
    "split pos, race pos,laps,race number,team,driver,penalty,ziel zeit";

/// Writes the penalty adjusted standings of one split as CSV.
///
/// Drivers without a completed lap are left out, and the split position only
/// counts the rows that are written.
pub fn write_csv_export<W: Write>(result: &RaceResult, split: &str, mut w: W) -> Result<()> {
    let lines = result
        .race_result_with_penalty
        .get(split)
        .context(ClassNotFoundSnafu { class: split })?;

    writeln!(w, "{}", EXPORT_HEADER).context(ExportWriteSnafu {})?;
    let mut wtr = csv::Writer::from_writer(w);
    let mut split_pos = 0;
    for line in lines {
        if line.laps_count() == 0 {
            debug!("export: skipping {} with no laps", line.team);
            continue;
        }
        split_pos += 1;
        wtr.write_record([
            split_pos.to_string().as_str(),
            line.pos.as_str(),
            line.laps.as_str(),
            line.race_number.as_str(),
            line.team.as_str(),
            line.driver.as_str(),
            line.penalty.as_str(),
            line.total_time.as_str(),
        ])
        .context(CsvWriteSnafu {})?;
    }
    wtr.flush().context(ExportWriteSnafu {})?;
    debug!("export: {} rows for split {}", split_pos, split);
    Ok(())
}
