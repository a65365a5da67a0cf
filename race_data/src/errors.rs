use std::num::ParseIntError;
use std::path::PathBuf;

use snafu::Snafu;

/// The broad families of failures, as seen by a caller that only wants to
/// decide how to report an error.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash)]
pub enum ErrorKind {
    /// A season, race, file or split that was addressed does not exist.
    NotFound,
    /// The request clashes with existing data (duplicate names, ambiguous rows).
    Conflict,
    /// The data itself is not usable: bad headers, bad numbers, bad names.
    Malformed,
    /// Reading or writing the disk failed.
    Io,
}

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RaceDataError {
    #[snafu(display("season {season} not found"))]
    SeasonNotFound { season: String },

    #[snafu(display("race {race} in season {season} not found"))]
    RaceNotFound { season: String, race: String },

    #[snafu(display("no entry list uploaded for season {season}"))]
    EntryListMissing { season: String },

    #[snafu(display("no results uploaded for race {race} in season {season}"))]
    ResultsMissing { season: String, race: String },

    #[snafu(display("split {class} not found in race result"))]
    ClassNotFound { class: String },

    #[snafu(display("no row with pos {pos} in {}", path.display()))]
    PositionNotFound { path: PathBuf, pos: String },

    #[snafu(display("season name {season} is not unique"))]
    SeasonExists { season: String },

    #[snafu(display("race name {race} is not unique in season {season}"))]
    RaceExists { season: String, race: String },

    #[snafu(display("{name} would share directory {dir} with {existing}"))]
    DirectoryCollision {
        name: String,
        existing: String,
        dir: String,
    },

    #[snafu(display("team name {team} is not unique in {}", path.display()))]
    DuplicateTeam { path: PathBuf, team: String },

    #[snafu(display("{count} rows with pos {pos} in {}", path.display()))]
    AmbiguousPosition {
        path: PathBuf,
        pos: String,
        count: usize,
    },

    #[snafu(display("invalid {kind} name {name:?}"))]
    InvalidName { kind: String, name: String },

    #[snafu(display("unexpected header in {}: expected [{expected}], found [{found}]", path.display()))]
    HeaderMismatch {
        path: PathBuf,
        expected: String,
        found: String,
    },

    #[snafu(display("missing column {column} in {}", path.display()))]
    MissingColumn { path: PathBuf, column: String },

    #[snafu(display("invalid {field} value {value:?}"))]
    InvalidNumber {
        field: String,
        value: String,
        source: ParseIntError,
    },

    #[snafu(display("penalty of {penalty}s on a total time of {total}ms is out of range"))]
    PenaltyOverflow { total: u64, penalty: u64 },

    #[snafu(display("could not parse csv file {}", path.display()))]
    CsvRead { path: PathBuf, source: csv::Error },

    #[snafu(display("could not encode csv rows"))]
    CsvWrite { source: csv::Error },

    #[snafu(display("could not write csv export"))]
    ExportWrite { source: std::io::Error },

    #[snafu(display("i/o error on {}", path.display()))]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[snafu(display("could not parse season index {}", path.display()))]
    IndexParse {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[snafu(display("could not encode season index"))]
    IndexWrite { source: serde_json::Error },

    #[snafu(display("season store lock poisoned"))]
    LockPoisoned {},
}

impl RaceDataError {
    pub fn kind(&self) -> ErrorKind {
        use RaceDataError::*;
        match self {
            SeasonNotFound { .. }
            | RaceNotFound { .. }
            | EntryListMissing { .. }
            | ResultsMissing { .. }
            | ClassNotFound { .. }
            | PositionNotFound { .. } => ErrorKind::NotFound,
            SeasonExists { .. }
            | RaceExists { .. }
            | DirectoryCollision { .. }
            | DuplicateTeam { .. }
            | AmbiguousPosition { .. } => ErrorKind::Conflict,
            CsvRead { source, .. } if source.is_io_error() => ErrorKind::Io,
            InvalidName { .. }
            | HeaderMismatch { .. }
            | MissingColumn { .. }
            | InvalidNumber { .. }
            | PenaltyOverflow { .. }
            | CsvRead { .. }
            | IndexParse { .. } => ErrorKind::Malformed,
            CsvWrite { .. }
            | ExportWrite { .. }
            | Io { .. }
            | IndexWrite { .. }
            | LockPoisoned { .. } => ErrorKind::Io,
        }
    }
}

pub type Result<T, E = RaceDataError> = std::result::Result<T, E>;
