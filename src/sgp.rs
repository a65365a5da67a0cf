use log::{debug, info, warn};

use race_data::*;
use snafu::{prelude::*, Snafu};

use std::fs;
use std::io::Write;
use std::path::Path;
use std::time::Instant;

use text_diff::print_diff;

use crate::args::{Args, Command};
use crate::sgp::config_reader::*;

pub mod config_reader;

#[derive(Debug, Snafu)]
pub enum SgpError {
    #[snafu(display("Error opening config file {path}"))]
    OpeningConfig {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error parsing config file {path}"))]
    ParsingConfig {
        source: serde_yaml::Error,
        path: String,
    },
    #[snafu(display("Error reading upload {path}"))]
    ReadingUpload {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("The uploaded file {path} is too big ({size} bytes). Please choose a file that's less than {limit} bytes in size"))]
    UploadTooLarge { path: String, size: u64, limit: u64 },
    #[snafu(display("Error writing output {path}"))]
    WritingOutput {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error encoding json"))]
    EncodingJson { source: serde_json::Error },
    #[snafu(display("Could not {action}"))]
    RaceData {
        action: String,
        source: RaceDataError,
    },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type SgpResult<T> = Result<T, SgpError>;

pub fn run(args: &Args) -> SgpResult<()> {
    let start = Instant::now();
    let config = read_config(args.config.as_deref())?.with_overrides(args);
    let store = SeasonStore::open(&config.server.data_dir, &config.server.race_data).context(
        RaceDataSnafu {
            action: "open the season index",
        },
    )?;
    let limit = config.server.max_upload_size;

    match &args.command {
        Command::Seasons => print_seasons(&store)?,
        Command::AddSeason { name } => {
            store
                .add_season(name)
                .context(RaceDataSnafu { action: "add season" })?;
        }
        Command::AddRace {
            season,
            name,
            qualy,
            race,
        } => {
            store
                .add_race(season, name)
                .context(RaceDataSnafu { action: "add race" })?;
            if let (Some(qualy), Some(race)) = (qualy, race) {
                upload_results(&store, season, name, qualy, race, limit)?;
            }
        }
        Command::UploadResults {
            season,
            race,
            qualy,
            race_result,
        } => upload_results(&store, season, race, qualy, race_result, limit)?,
        Command::RemoveRace { season, name } => {
            store
                .remove_race(season, name)
                .context(RaceDataSnafu {
                    action: "remove race",
                })?;
        }
        Command::UploadEntryList { season, file } => {
            let entry_list = read_upload(file, limit)?;
            store
                .add_entry_list(season, &entry_list)
                .context(RaceDataSnafu {
                    action: "add entry list",
                })?;
        }
        Command::ShowEntryList { season } => {
            let drivers = store.get_entry_list(season).context(RaceDataSnafu {
                action: "read entry list",
            })?;
            for d in drivers.iter() {
                println!(
                    "{:>4}  {:<24} {:<24} {:<24} {}",
                    d.race_number, d.driver, d.team, d.car, d.class
                );
            }
        }
        Command::AddPenalty {
            season,
            race,
            pos,
            penalty,
        } => {
            info!(
                "season: {} race: {}, add penalty {} to pos {}",
                season, race, penalty, pos
            );
            let total = store
                .add_penalty(season, race, penalty, pos)
                .context(RaceDataSnafu {
                    action: "add penalty",
                })?;
            println!("pos {}: total penalty {}s", pos, total);
        }
        Command::ShowRace { season, race, out } => {
            let rr = store.get_race_result(season, race).context(RaceDataSnafu {
                action: "compute race result",
            })?;
            let js = serde_json::to_string_pretty(&rr).context(EncodingJsonSnafu {})?;
            write_output(out.as_deref(), format!("{}\n", js).as_bytes())?;
        }
        Command::Export {
            season,
            race,
            split,
            out,
            reference,
        } => {
            let rr = store.get_race_result(season, race).context(RaceDataSnafu {
                action: "compute race result",
            })?;
            let mut csv: Vec<u8> = Vec::new();
            write_csv_export(&rr, split, &mut csv).context(RaceDataSnafu {
                action: "export split",
            })?;
            write_output(out.as_deref(), &csv)?;
            if let Some(reference) = reference {
                check_reference(reference, &csv)?;
            }
        }
    }

    info!("<- {} time: {:?}", args.command.name(), start.elapsed());
    Ok(())
}

fn print_seasons(store: &SeasonStore) -> SgpResult<()> {
    let seasons = store.seasons().context(RaceDataSnafu {
        action: "list seasons",
    })?;
    for (name, season) in seasons.iter() {
        match season.entry_list_path() {
            Some(p) => println!("{} (entry list: {})", name, p.display()),
            None => println!("{} (no entry list)", name),
        }
        for race in season.races.iter() {
            let status = if race.race_path().is_some() {
                "results uploaded"
            } else {
                "no results"
            };
            println!("  {} ({})", race.name, status);
        }
    }
    Ok(())
}

fn upload_results(
    store: &SeasonStore,
    season: &str,
    race: &str,
    qualy_path: &str,
    race_path: &str,
    limit: u64,
) -> SgpResult<()> {
    let qualy = read_upload(qualy_path, limit)?;
    let race_result = read_upload(race_path, limit)?;
    store
        .add_results(season, race, &qualy, &race_result)
        .context(RaceDataSnafu {
            action: "add results",
        })
}

fn read_upload(path: &str, limit: u64) -> SgpResult<Vec<u8>> {
    let size = fs::metadata(path)
        .context(ReadingUploadSnafu { path })?
        .len();
    ensure!(size <= limit, UploadTooLargeSnafu { path, size, limit });
    debug!("read_upload: {} ({} bytes)", path, size);
    fs::read(path).context(ReadingUploadSnafu { path })
}

fn write_output(out: Option<&str>, content: &[u8]) -> SgpResult<()> {
    match out {
        None | Some("stdout") => std::io::stdout()
            .write_all(content)
            .context(WritingOutputSnafu { path: "stdout" }),
        Some(path) => {
            info!("writing output to {}", path);
            fs::write(path, content).context(WritingOutputSnafu { path })
        }
    }
}

fn check_reference(reference: &str, csv: &[u8]) -> SgpResult<()> {
    let expected = fs::read_to_string(reference).context(ReadingUploadSnafu { path: reference })?;
    let produced = String::from_utf8_lossy(csv);
    if expected != produced {
        warn!("Found differences with the reference export {}", reference);
        print_diff(expected.as_str(), &produced, "\n");
        whatever!("Difference detected between the export and the reference {}", reference)
    }
    info!("export matches reference {}", reference);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    fn args(dir: &TempDir, rest: &[&str]) -> Args {
        let data_dir = dir.path().join("data");
        let index = dir.path().join("race_data.json");
        let config = dir.path().join("config.yml");
        if !config.exists() {
            fs::write(&config, "server:\n  maxUploadSize: 4096\n").unwrap();
        }
        let mut argv: Vec<String> = vec![
            "sgphelper".to_string(),
            "--config".to_string(),
            config.display().to_string(),
            "--data-dir".to_string(),
            data_dir.display().to_string(),
            "--race-data".to_string(),
            index.display().to_string(),
        ];
        argv.extend(rest.iter().map(|s| s.to_string()));
        Args::parse_from(argv)
    }

    fn write(dir: &TempDir, name: &str, content: &str) -> String {
        let p = dir.path().join(name);
        fs::write(&p, content).unwrap();
        p.display().to_string()
    }

    #[test]
    fn export_matches_reference() {
        let dir = TempDir::new().unwrap();
        let entry_list = write(
            &dir,
            "entry_list.csv",
            "driver,team,car,race_number,class\nAlice,Red,Ferrari,7,GT3\nBob,Blue,Audi,12,GT3\n",
        );
        let qualy = write(
            &dir,
            "qualy.csv",
            "pos,startPos,participant,car,class,totalTime,bestLapTime,bestCleanLapTime,laps\n\
             1,1,Blue,Audi,GT3,,100000,100000,3\n\
             2,2,Red,Ferrari,GT3,,100100,100100,3\n",
        );
        let race = write(
            &dir,
            "race.csv",
            "pos,startPos,participant,car,class,totalTime,bestLapTime,bestCleanLapTime,laps\n\
             1,2,Red,Ferrari,GT3,1200000,99000,99000,12\n\
             2,1,Blue,Audi,GT3,1203000,99500,99500,12\n",
        );
        let reference = write(
            &dir,
            "reference.csv",
            "split pos, race pos,laps,race number,team,driver,penalty,ziel zeit\n\
             1,2,12,12,Blue,Bob,0,00:20:03.000\n\
             2,1,12,7,Red,Alice,5,00:20:05.000\n",
        );
        let out = dir.path().join("export.csv").display().to_string();

        run(&args(&dir, &["add-season", "Season 1"])).unwrap();
        run(&args(&dir, &["upload-entry-list", "Season 1", &entry_list])).unwrap();
        run(&args(
            &dir,
            &["add-race", "Season 1", "Round 1", "--qualy", &qualy, "--race", &race],
        ))
        .unwrap();
        run(&args(
            &dir,
            &["add-penalty", "Season 1", "Round 1", "--pos", "1", "--penalty", "5"],
        ))
        .unwrap();
        run(&args(
            &dir,
            &["export", "Season 1", "Round 1", "GT3", "--out", &out, "--reference", &reference],
        ))
        .unwrap();
        assert_eq!(
            fs::read_to_string(&out).unwrap(),
            fs::read_to_string(&reference).unwrap()
        );
        assert!(dir.path().join("data/season_1/round_1/race_result.csv").exists());
    }

    #[test]
    fn oversized_upload_is_rejected() {
        let dir = TempDir::new().unwrap();
        let big = write(&dir, "big.csv", &"x".repeat(5000));
        run(&args(&dir, &["add-season", "2024"])).unwrap();
        let res = run(&args(&dir, &["upload-entry-list", "2024", &big]));
        assert!(matches!(res, Err(SgpError::UploadTooLarge { .. })));
    }

    #[test]
    fn store_errors_keep_their_kind() {
        let dir = TempDir::new().unwrap();
        let res = run(&args(&dir, &["remove-race", "2024", "Round 1"]));
        match res {
            Err(SgpError::RaceData { source, .. }) => {
                assert_eq!(source.kind(), ErrorKind::NotFound)
            }
            other => panic!("unexpected result {:?}", other),
        }
    }
}
