use std::cmp::Reverse;
use std::collections::BTreeMap;

use log::debug;
use serde::Serialize;

use crate::clock::format_milliseconds;
use crate::csv_data::{CsvResultLine, EntryListLine};
use crate::errors::Result;
use crate::io_common::parse_number;
use crate::penalty::penalized_total;

/// Driver name used when a result row has no matching team in the entry list.
pub const UNKNOWN_DRIVER: &str = "N/A";

/// An entry list row, as shown to the organizer.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct Driver {
    pub driver: String,
    pub team: String,
    pub car: String,
    pub race_number: String,
    pub class: String,
}

/// A result row joined with the entry list.
#[derive(Eq, PartialEq, Debug, Clone, Serialize)]
pub struct ResultLine {
    pub pos: String,
    pub start_pos: String,
    pub driver: String,
    pub team: String,
    pub race_number: String,
    pub car: String,
    pub class: String,
    pub total_time: String,
    pub best_lap_time: String,
    pub best_clean_lap_time: String,
    pub laps: String,
    pub penalty: String,
}

impl ResultLine {
    fn from_csv(line: &CsvResultLine, entry_list: &[EntryListLine]) -> ResultLine {
        let entry = entry_list.iter().find(|e| e.team == line.participant);
        if entry.is_none() {
            debug!("no entry for team {:?}", line.participant);
        }
        ResultLine {
            pos: line.pos.clone(),
            start_pos: line.start_pos.clone(),
            driver: entry.map_or_else(|| UNKNOWN_DRIVER.to_string(), |e| e.driver.clone()),
            team: line.participant.clone(),
            race_number: entry.map(|e| e.race_number.clone()).unwrap_or_default(),
            car: line.car.clone(),
            class: line.class.clone(),
            total_time: line.total_time.clone(),
            best_lap_time: line.best_lap_time.clone(),
            best_clean_lap_time: line.best_clean_lap_time.clone(),
            laps: line.laps.clone(),
            penalty: line.penalty.clone(),
        }
    }

    /// Laps completed, zero when the field cannot be read.
    pub fn laps_count(&self) -> u64 {
        self.laps.parse().unwrap_or(0)
    }

    // Only meaningful before the times are formatted.
    fn ranking_key(&self) -> (Reverse<u64>, u64) {
        (
            Reverse(self.laps_count()),
            self.total_time.parse().unwrap_or(0),
        )
    }

    fn with_penalty(&self) -> Result<ResultLine> {
        let mut line = self.clone();
        // A driver without a total time keeps it empty, penalty or not.
        if self.penalty != "0" && !self.total_time.is_empty() {
            let penalty = parse_number("penalty", &self.penalty)?;
            let total = parse_number("totalTime", &self.total_time)?;
            let adjusted = penalized_total(total, penalty)?;
            debug!("total time {}: {} + {}s = {}", self.team, total, penalty, adjusted);
            line.total_time = adjusted.to_string();
        }
        Ok(line)
    }

    fn format_times(&mut self) -> Result<()> {
        self.total_time = format_milliseconds(&self.total_time)?;
        self.best_lap_time = format_milliseconds(&self.best_lap_time)?;
        Ok(())
    }
}

/// Result rows per class (split).
pub type ClassResults = BTreeMap<String, Vec<ResultLine>>;

/// Everything needed to show the standings of one race.
#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize)]
pub struct RaceResult {
    pub season_name: String,
    pub race_name: String,
    /// Qualifying, ordered by qualifying position.
    pub qualy_result: ClassResults,
    /// Race result as uploaded, in file order.
    pub race_result: ClassResults,
    /// Race result with the penalties added to the total time, ranked.
    pub race_result_with_penalty: ClassResults,
}

/// Joins the qualifying and race rows with the entry list, and computes the
/// penalty adjusted standings of each class.
///
/// Within a class, more laps rank first and, for the same number of laps, the
/// shorter total time ranks first. The ordering is stable, so equal rows keep
/// their order from the file.
pub fn build_race_result(
    qualy: &[CsvResultLine],
    race: &[CsvResultLine],
    entry_list: &[EntryListLine],
) -> Result<RaceResult> {
    let race_result = group_by_class(race, entry_list);

    let mut race_result_with_penalty = ClassResults::new();
    for (class, lines) in race_result.iter() {
        let mut adjusted = lines
            .iter()
            .map(ResultLine::with_penalty)
            .collect::<Result<Vec<_>>>()?;
        adjusted.sort_by_key(ResultLine::ranking_key);
        race_result_with_penalty.insert(class.clone(), adjusted);
    }

    let mut qualy_result = group_by_class(qualy, entry_list);
    for lines in qualy_result.values_mut() {
        lines.sort_by_key(|l| l.pos.parse::<u64>().unwrap_or(0));
    }

    let mut result = RaceResult {
        qualy_result,
        race_result,
        race_result_with_penalty,
        ..RaceResult::default()
    };
    for view in [
        &mut result.qualy_result,
        &mut result.race_result,
        &mut result.race_result_with_penalty,
    ] {
        for line in view.values_mut().flatten() {
            line.format_times()?;
        }
    }
    Ok(result)
}

// Classes keep the order in which their rows appear in the file.
fn group_by_class(rows: &[CsvResultLine], entry_list: &[EntryListLine]) -> ClassResults {
    let mut res = ClassResults::new();
    for row in rows {
        res.entry(row.class.clone())
            .or_default()
            .push(ResultLine::from_csv(row, entry_list));
    }
    res
}

pub fn entry_list_drivers(entry_list: &[EntryListLine]) -> Vec<Driver> {
    entry_list
        .iter()
        .map(|l| Driver {
            driver: l.driver.clone(),
            team: l.team.clone(),
            car: l.car.clone(),
            race_number: l.race_number.clone(),
            class: l.class.clone(),
        })
        .collect()
}
