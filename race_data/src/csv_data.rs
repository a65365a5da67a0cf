// Primitives for reading and rewriting the uploaded CSV files.

use std::collections::HashSet;
use std::fs::File;
use std::path::Path;

use csv::StringRecord;
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::errors::*;
use crate::io_common::write_atomic;

pub const PENALTY_COLUMN: &str = "penalty";
pub const POS_COLUMN: &str = "pos";
pub const TOTAL_TIME_COLUMN: &str = "totalTime";

pub const ENTRY_LIST_COLUMNS: [&str; 5] = ["driver", "team", "car", "race_number", "class"];

pub const RESULT_COLUMNS: [&str; 10] = [
    "pos",
    "startPos",
    "participant",
    "car",
    "class",
    TOTAL_TIME_COLUMN,
    "bestLapTime",
    "bestCleanLapTime",
    "laps",
    PENALTY_COLUMN,
];

/// One row of a season entry list.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct EntryListLine {
    pub driver: String,
    pub team: String,
    pub car: String,
    pub race_number: String,
    pub class: String,
}

/// One row of a qualifying or race result file, as stored on disk.
///
/// Times are milliseconds and the penalty is in seconds, all kept as the
/// strings found in the file.
#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct CsvResultLine {
    pub pos: String,
    #[serde(rename = "startPos")]
    pub start_pos: String,
    pub participant: String,
    pub car: String,
    pub class: String,
    #[serde(rename = "totalTime")]
    pub total_time: String,
    #[serde(rename = "bestLapTime")]
    pub best_lap_time: String,
    #[serde(rename = "bestCleanLapTime")]
    pub best_clean_lap_time: String,
    pub laps: String,
    pub penalty: String,
}

pub fn read_entry_list(path: &Path) -> Result<Vec<EntryListLine>> {
    info!("read entry list: {}", path.display());
    read_rows(path, &ENTRY_LIST_COLUMNS)
}

pub fn read_result(path: &Path) -> Result<Vec<CsvResultLine>> {
    info!("read result: {}", path.display());
    read_rows(path, &RESULT_COLUMNS)
}

fn read_rows<T: DeserializeOwned + std::fmt::Debug>(
    path: &Path,
    columns: &[&str],
) -> Result<Vec<T>> {
    let file = File::open(path).context(IoSnafu { path })?;
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Headers)
        .from_reader(file);
    let header = rdr.headers().context(CsvReadSnafu { path })?.clone();
    check_header(path, &header, columns)?;

    let mut res: Vec<T> = Vec::new();
    for (idx, row) in rdr.deserialize().enumerate() {
        let line: T = row.context(CsvReadSnafu { path })?;
        // Line 1 is the header.
        debug!("read_rows: lineno: {} row: {:?}", idx + 2, line);
        res.push(line);
    }
    Ok(res)
}

/// Every expected column must be present exactly once, and nothing else.
pub(crate) fn check_header(path: &Path, header: &StringRecord, columns: &[&str]) -> Result<()> {
    let mut found: Vec<&str> = header.iter().map(str::trim).collect();
    let mut expected: Vec<&str> = columns.to_vec();
    found.sort_unstable();
    expected.sort_unstable();
    ensure!(
        found == expected,
        HeaderMismatchSnafu {
            path,
            expected: columns.join(","),
            found: header.iter().collect::<Vec<_>>().join(","),
        }
    );
    Ok(())
}

pub(crate) fn column_index(path: &Path, header: &StringRecord, column: &str) -> Result<usize> {
    header
        .iter()
        .position(|h| h.trim() == column)
        .context(MissingColumnSnafu { path, column })
}

/// Reads every record of a file, header included, without interpreting them.
pub(crate) fn read_records(path: &Path) -> Result<Vec<StringRecord>> {
    let file = File::open(path).context(IoSnafu { path })?;
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_reader(file);
    let mut records: Vec<StringRecord> = Vec::new();
    for record in rdr.records() {
        records.push(record.context(CsvReadSnafu { path })?);
    }
    Ok(records)
}

pub(crate) fn write_records(path: &Path, records: &[StringRecord]) -> Result<()> {
    let mut bytes: Vec<u8> = Vec::new();
    {
        let mut wtr = csv::Writer::from_writer(&mut bytes);
        for record in records {
            wtr.write_record(record).context(CsvWriteSnafu {})?;
        }
        wtr.flush()
            .map_err(csv::Error::from)
            .context(CsvWriteSnafu {})?;
    }
    write_atomic(path, &bytes)
}

/// Adds the `penalty` column, set to `0` for every driver, to a freshly uploaded
/// result file. The upload must carry every result column except `penalty`.
pub fn add_penalty_column(path: &Path) -> Result<()> {
    let mut records = read_records(path)?;
    let header = records.first().cloned().unwrap_or_default();
    check_header(path, &header, &RESULT_COLUMNS[..RESULT_COLUMNS.len() - 1])?;

    for (idx, record) in records.iter_mut().enumerate() {
        record.push_field(if idx == 0 { PENALTY_COLUMN } else { "0" });
    }
    debug!(
        "add_penalty_column: {} rows in {}",
        records.len() - 1,
        path.display()
    );
    write_records(path, &records)
}

pub fn check_entry_list_unique(path: &Path) -> Result<()> {
    let entry_list = read_entry_list(path)?;
    ensure_unique(path, entry_list.iter().map(|l| l.team.as_str()))?;
    info!("entry list {} is ok", path.display());
    Ok(())
}

pub fn check_participants_unique(path: &Path) -> Result<()> {
    let result = read_result(path)?;
    ensure_unique(path, result.iter().map(|l| l.participant.as_str()))?;
    info!("result {} is ok ({} participants)", path.display(), result.len());
    Ok(())
}

fn ensure_unique<'a>(path: &Path, teams: impl Iterator<Item = &'a str>) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for team in teams {
        if !seen.insert(team) {
            warn!("team {} already exists in {}", team, path.display());
            return DuplicateTeamSnafu { path, team }.fail();
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let p = dir.path().join(name);
        fs::write(&p, content).unwrap();
        p
    }

    #[test]
    fn entry_list_is_header_driven() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "entry_list.csv",
            "team,driver,class,car,race_number\nRed,Alice,GT3,Ferrari,7\nBlue,Bob,GT4,Audi,12\n",
        );
        let lines = read_entry_list(&p).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            EntryListLine {
                driver: "Alice".to_string(),
                team: "Red".to_string(),
                car: "Ferrari".to_string(),
                race_number: "7".to_string(),
                class: "GT3".to_string(),
            }
        );
    }

    #[test]
    fn unknown_or_missing_columns_are_rejected() {
        let dir = TempDir::new().unwrap();
        let extra = write(
            &dir,
            "extra.csv",
            "driver,team,car,race_number,class,nation\nAlice,Red,Ferrari,7,GT3,DE\n",
        );
        let e = read_entry_list(&extra).unwrap_err();
        assert!(matches!(e, RaceDataError::HeaderMismatch { .. }));
        assert_eq!(e.kind(), ErrorKind::Malformed);

        let missing = write(&dir, "missing.csv", "driver,team,car,class\nAlice,Red,Ferrari,GT3\n");
        assert!(matches!(
            read_entry_list(&missing),
            Err(RaceDataError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn duplicate_teams_conflict() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "entry_list.csv",
            "driver,team,car,race_number,class\nAlice,Red,Ferrari,7,GT3\nCarl,Red,Audi,9,GT3\n",
        );
        let e = check_entry_list_unique(&p).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Conflict);
        match e {
            RaceDataError::DuplicateTeam { team, .. } => assert_eq!(team, "Red"),
            other => panic!("unexpected error {:?}", other),
        }

        let ok = write(
            &dir,
            "ok.csv",
            "driver,team,car,race_number,class\nAlice,Red,Ferrari,7,GT3\nCarl,Blue,Audi,9,GT3\n",
        );
        assert!(check_entry_list_unique(&ok).is_ok());
    }

    #[test]
    fn penalty_column_is_appended() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "race_result.csv",
            "pos,startPos,participant,car,class,totalTime,bestLapTime,bestCleanLapTime,laps\n\
             1,2,Red,Ferrari,GT3,60000,1500,1500,12\n\
             2,1,Blue,Audi,GT3,61000,,1600,12\n",
        );
        add_penalty_column(&p).unwrap();
        let rows = read_result(&p).unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.penalty == "0"));
        assert_eq!(rows[1].best_lap_time, "");
        assert_eq!(rows[1].participant, "Blue");
        check_participants_unique(&p).unwrap();
    }

    #[test]
    fn penalty_column_is_only_added_once() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "race_result.csv",
            "pos,startPos,participant,car,class,totalTime,bestLapTime,bestCleanLapTime,laps,penalty\n\
             1,2,Red,Ferrari,GT3,60000,1500,1500,12,0\n",
        );
        assert!(matches!(
            add_penalty_column(&p),
            Err(RaceDataError::HeaderMismatch { .. })
        ));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let dir = TempDir::new().unwrap();
        let p = write(
            &dir,
            "entry_list.csv",
            "driver,team,car,race_number,class\nAlice,Red,Ferrari\n",
        );
        let e = read_entry_list(&p).unwrap_err();
        assert!(matches!(e, RaceDataError::CsvRead { .. }));
        assert_eq!(e.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn missing_file_is_io() {
        let dir = TempDir::new().unwrap();
        let e = read_result(&dir.path().join("nope.csv")).unwrap_err();
        assert_eq!(e.kind(), ErrorKind::Io);
    }
}
