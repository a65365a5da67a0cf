use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use snafu::prelude::*;

use crate::csv_data::*;
use crate::errors::*;
use crate::io_common::*;
use crate::penalty::apply_penalty;
use crate::race_result::*;

pub const ENTRY_LIST_FILE: &str = "entry_list.csv";
pub const QUALY_RESULT_FILE: &str = "qualy_result.csv";
pub const RACE_RESULT_FILE: &str = "race_result.csv";

const UPLOAD_SUFFIX: &str = ".upload";

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Race {
    pub name: String,
    #[serde(rename = "qualyResultFile", default)]
    pub qualy_result_file: String,
    #[serde(rename = "raceResultFile", default)]
    pub race_result_file: String,
}

impl Race {
    fn new(name: &str) -> Race {
        Race {
            name: name.to_string(),
            ..Race::default()
        }
    }

    pub fn qualy_path(&self) -> Option<PathBuf> {
        stored_path(&self.qualy_result_file)
    }

    pub fn race_path(&self) -> Option<PathBuf> {
        stored_path(&self.race_result_file)
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
pub struct Season {
    #[serde(rename = "entryListFile", default)]
    pub entry_list_file: String,
    #[serde(default)]
    pub races: Vec<Race>,
}

impl Season {
    pub fn entry_list_path(&self) -> Option<PathBuf> {
        stored_path(&self.entry_list_file)
    }

    fn race(&self, name: &str) -> Option<&Race> {
        self.races.iter().find(|r| r.name == name)
    }
}

/// The season index, keyed by season name.
pub type SeasonMap = BTreeMap<String, Season>;

/// Where the results of a race live, when they have been uploaded.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ResultPaths {
    pub qualy: Option<PathBuf>,
    pub race: Option<PathBuf>,
}

fn stored_path(s: &str) -> Option<PathBuf> {
    if s.is_empty() {
        None
    } else {
        Some(PathBuf::from(s))
    }
}

fn path_string(p: &Path) -> String {
    p.to_string_lossy().into_owned()
}

/// Seasons, their races and the CSV files that belong to them.
///
/// The index is kept in memory and written through to a JSON file after
/// every change; the file is only read when the store is opened. All
/// operations go through a single lock, so the index and the CSV files are
/// never observed half-updated through the store.
pub struct SeasonStore {
    data_dir: PathBuf,
    index_path: PathBuf,
    seasons: Mutex<SeasonMap>,
}

impl SeasonStore {
    /// Loads the index at `index_path`, creating an empty one if it does not exist.
    pub fn open(
        data_dir: impl Into<PathBuf>,
        index_path: impl Into<PathBuf>,
    ) -> Result<SeasonStore> {
        let data_dir = data_dir.into();
        let index_path = index_path.into();
        fs::create_dir_all(&data_dir).context(IoSnafu { path: &data_dir })?;

        let seasons = if index_path.exists() {
            read_index(&index_path)?
        } else {
            info!("creating season index {}", index_path.display());
            let empty = SeasonMap::new();
            write_index(&index_path, &empty)?;
            empty
        };
        info!(
            "loaded {} seasons from {}",
            seasons.len(),
            index_path.display()
        );

        Ok(SeasonStore {
            data_dir,
            index_path,
            seasons: Mutex::new(seasons),
        })
    }

    /// A copy of the current index.
    pub fn seasons(&self) -> Result<SeasonMap> {
        Ok(self.lock()?.clone())
    }

    pub fn add_season(&self, name: &str) -> Result<()> {
        check_name("season", name)?;
        let mut seasons = self.lock()?;
        ensure!(
            !seasons.contains_key(name),
            SeasonExistsSnafu { season: name }
        );
        let dir = name_to_dir(name);
        if let Some(existing) = seasons.keys().find(|s| name_to_dir(s) == dir) {
            return DirectoryCollisionSnafu {
                name,
                existing: existing.as_str(),
                dir,
            }
            .fail();
        }

        let season_dir = self.data_dir.join(&dir);
        fs::create_dir_all(&season_dir).context(IoSnafu { path: &season_dir })?;

        let mut next = seasons.clone();
        next.insert(name.to_string(), Season::default());
        self.commit(&mut seasons, next)?;
        info!("added season {} ({})", name, season_dir.display());
        Ok(())
    }

    pub fn add_race(&self, season: &str, name: &str) -> Result<()> {
        check_name("race", name)?;
        let mut seasons = self.lock()?;
        let mut next = seasons.clone();
        let entry = next
            .get_mut(season)
            .context(SeasonNotFoundSnafu { season })?;
        ensure!(
            entry.race(name).is_none(),
            RaceExistsSnafu { season, race: name }
        );
        let dir = name_to_dir(name);
        if let Some(existing) = entry.races.iter().find(|r| name_to_dir(&r.name) == dir) {
            return DirectoryCollisionSnafu {
                name,
                existing: existing.name.as_str(),
                dir,
            }
            .fail();
        }

        let race_dir = self.race_dir(season, name);
        fs::create_dir_all(&race_dir).context(IoSnafu { path: &race_dir })?;

        entry.races.push(Race::new(name));
        self.commit(&mut seasons, next)?;
        info!("season {} add race {}", season, name);
        Ok(())
    }

    /// Drops a race from its season. The uploaded files stay on disk.
    pub fn remove_race(&self, season: &str, name: &str) -> Result<()> {
        let mut seasons = self.lock()?;
        let mut next = seasons.clone();
        let entry = next
            .get_mut(season)
            .context(SeasonNotFoundSnafu { season })?;
        let idx = entry
            .races
            .iter()
            .position(|r| r.name == name)
            .context(RaceNotFoundSnafu { season, race: name })?;
        entry.races.remove(idx);
        self.commit(&mut seasons, next)?;
        info!("season {} removed race {}", season, name);
        Ok(())
    }

    /// Stores the entry list of a season. Nothing is recorded unless the team
    /// names of the list are unique.
    pub fn add_entry_list(&self, season: &str, entry_list: &[u8]) -> Result<()> {
        let mut seasons = self.lock()?;
        let mut next = seasons.clone();
        let entry = next
            .get_mut(season)
            .context(SeasonNotFoundSnafu { season })?;

        let path = self.season_dir(season).join(ENTRY_LIST_FILE);
        info!("add entry list {} to season {}", path.display(), season);
        let scratch = scratch_path(&path, UPLOAD_SUFFIX);
        let staged =
            write_file(&scratch, entry_list).and_then(|_| check_entry_list_unique(&scratch));
        if let Err(e) = staged {
            warn!("rejected entry list for season {}: {}", season, e);
            discard(&scratch);
            return Err(e);
        }
        move_into_place(&scratch, &path)?;

        entry.entry_list_file = path_string(&path);
        self.commit(&mut seasons, next)
    }

    /// Stores the qualifying and race results of a race.
    ///
    /// Both uploads get a zero penalty column and must have unique
    /// participants; if either one is rejected, nothing is recorded.
    pub fn add_results(
        &self,
        season: &str,
        race: &str,
        qualy_result: &[u8],
        race_result: &[u8],
    ) -> Result<()> {
        info!("add result to season {} race {}", season, race);
        let mut seasons = self.lock()?;
        let mut next = seasons.clone();
        let entry = next
            .get_mut(season)
            .context(SeasonNotFoundSnafu { season })?;
        let race_entry = entry
            .races
            .iter_mut()
            .find(|r| r.name == race)
            .context(RaceNotFoundSnafu { season, race })?;

        let race_dir = self.race_dir(season, race);
        let qualy_path = race_dir.join(QUALY_RESULT_FILE);
        let race_path = race_dir.join(RACE_RESULT_FILE);
        let qualy_scratch = scratch_path(&qualy_path, UPLOAD_SUFFIX);
        let race_scratch = scratch_path(&race_path, UPLOAD_SUFFIX);

        let staged = stage_result(&qualy_scratch, qualy_result)
            .and_then(|_| stage_result(&race_scratch, race_result));
        if let Err(e) = staged {
            warn!("rejected results for season {} race {}: {}", season, race, e);
            discard(&qualy_scratch);
            discard(&race_scratch);
            return Err(e);
        }
        move_into_place(&qualy_scratch, &qualy_path)?;
        move_into_place(&race_scratch, &race_path)?;

        race_entry.qualy_result_file = path_string(&qualy_path);
        race_entry.race_result_file = path_string(&race_path);
        self.commit(&mut seasons, next)
    }

    /// Adds a time penalty, in seconds, to the driver at `position` of the race
    /// result, and returns the driver's new penalty total.
    pub fn add_penalty(
        &self,
        season: &str,
        race: &str,
        penalty: &str,
        position: &str,
    ) -> Result<String> {
        let seasons = self.lock()?;
        let race_entry = find_race(&seasons, season, race)?;
        let path = race_entry
            .race_path()
            .context(ResultsMissingSnafu { season, race })?;
        let total = apply_penalty(&path, position, penalty)?;
        info!(
            "season {} race {}: pos {} penalty +{}s (total {}s)",
            season, race, position, penalty, total
        );
        write_index(&self.index_path, &seasons)?;
        Ok(total)
    }

    pub fn get_entry_list_path(&self, season: &str) -> Result<Option<PathBuf>> {
        let seasons = self.lock()?;
        let entry = seasons
            .get(season)
            .context(SeasonNotFoundSnafu { season })?;
        Ok(entry.entry_list_path())
    }

    pub fn get_result_paths(&self, season: &str, race: &str) -> Result<ResultPaths> {
        let seasons = self.lock()?;
        let race_entry = find_race(&seasons, season, race)?;
        Ok(ResultPaths {
            qualy: race_entry.qualy_path(),
            race: race_entry.race_path(),
        })
    }

    pub fn get_entry_list(&self, season: &str) -> Result<Vec<Driver>> {
        let seasons = self.lock()?;
        let path = entry_list_path(&seasons, season)?;
        Ok(entry_list_drivers(&read_entry_list(&path)?))
    }

    /// Reads the result files of a race and computes its standings.
    pub fn get_race_result(&self, season: &str, race: &str) -> Result<RaceResult> {
        let seasons = self.lock()?;
        let race_entry = find_race(&seasons, season, race)?;
        let (qualy_path, race_path) = match (race_entry.qualy_path(), race_entry.race_path()) {
            (Some(q), Some(r)) => (q, r),
            _ => return ResultsMissingSnafu { season, race }.fail(),
        };
        let entry_list_path = entry_list_path(&seasons, season)?;

        let qualy = read_result(&qualy_path)?;
        let race_rows = read_result(&race_path)?;
        let entry_list = read_entry_list(&entry_list_path)?;
        debug!(
            "get_race_result: {} qualy rows, {} race rows, {} entries",
            qualy.len(),
            race_rows.len(),
            entry_list.len()
        );

        let mut rr = build_race_result(&qualy, &race_rows, &entry_list)?;
        rr.season_name = season.to_string();
        rr.race_name = race.to_string();
        Ok(rr)
    }

    fn lock(&self) -> Result<MutexGuard<'_, SeasonMap>> {
        self.seasons.lock().map_err(|_| LockPoisonedSnafu {}.build())
    }

    // The index on disk is written before the in-memory copy changes, so a
    // failed write leaves both on the previous state.
    fn commit(&self, current: &mut SeasonMap, next: SeasonMap) -> Result<()> {
        write_index(&self.index_path, &next)?;
        *current = next;
        Ok(())
    }

    fn season_dir(&self, season: &str) -> PathBuf {
        self.data_dir.join(name_to_dir(season))
    }

    fn race_dir(&self, season: &str, race: &str) -> PathBuf {
        self.season_dir(season).join(name_to_dir(race))
    }
}

fn find_race<'a>(seasons: &'a SeasonMap, season: &str, race: &str) -> Result<&'a Race> {
    seasons
        .get(season)
        .context(SeasonNotFoundSnafu { season })?
        .race(race)
        .context(RaceNotFoundSnafu { season, race })
}

fn entry_list_path(seasons: &SeasonMap, season: &str) -> Result<PathBuf> {
    seasons
        .get(season)
        .context(SeasonNotFoundSnafu { season })?
        .entry_list_path()
        .context(EntryListMissingSnafu { season })
}

fn stage_result(scratch: &Path, content: &[u8]) -> Result<()> {
    write_file(scratch, content)?;
    add_penalty_column(scratch)?;
    check_participants_unique(scratch)
}

fn read_index(path: &Path) -> Result<SeasonMap> {
    let contents = fs::read_to_string(path).context(IoSnafu { path })?;
    if contents.trim().is_empty() {
        return Ok(SeasonMap::new());
    }
    serde_json::from_str(&contents).context(IndexParseSnafu { path })
}

fn write_index(path: &Path, seasons: &SeasonMap) -> Result<()> {
    let js = serde_json::to_string_pretty(seasons).context(IndexWriteSnafu {})?;
    write_atomic(path, js.as_bytes())
}
