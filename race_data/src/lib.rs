//! Bookkeeping for a racing league: seasons, races, entry lists and the
//! qualifying/race result files exported by the simulator, with time
//! penalties and per class standings.
//!
//! ```no_run
//! use race_data::{write_csv_export, SeasonStore};
//!
//! let store = SeasonStore::open("data", "race_data.json")?;
//! store.add_season("2024")?;
//! store.add_race("2024", "Round1")?;
//! store.add_entry_list("2024", &std::fs::read("entry_list.csv")?)?;
//! store.add_results(
//!     "2024",
//!     "Round1",
//!     &std::fs::read("qualy.csv")?,
//!     &std::fs::read("race.csv")?,
//! )?;
//! store.add_penalty("2024", "Round1", "5", "3")?;
//!
//! let result = store.get_race_result("2024", "Round1")?;
//! write_csv_export(&result, "GT3", std::io::stdout())?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod clock;
mod csv_data;
mod errors;
mod export;
mod io_common;
mod penalty;
mod race_result;
mod store;

pub use crate::clock::format_milliseconds;
pub use crate::csv_data::{
    add_penalty_column, check_entry_list_unique, check_participants_unique, read_entry_list,
    read_result, CsvResultLine, EntryListLine, ENTRY_LIST_COLUMNS, PENALTY_COLUMN,
    RESULT_COLUMNS,
};
pub use crate::errors::{ErrorKind, RaceDataError, Result};
pub use crate::export::{write_csv_export, EXPORT_HEADER};
pub use crate::io_common::name_to_dir;
pub use crate::penalty::apply_penalty;
pub use crate::race_result::{
    build_race_result, entry_list_drivers, ClassResults, Driver, RaceResult, ResultLine,
    UNKNOWN_DRIVER,
};
pub use crate::store::{ResultPaths, Race, Season, SeasonMap, SeasonStore};
