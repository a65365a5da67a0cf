use clap::{Parser, Subcommand};

/// Keeps track of the seasons and races of a racing league, applies time
/// penalties and computes the standings of each class.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, default config.yml) The YAML configuration file. A missing default file
    /// is not an error: the built-in defaults are used instead.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (directory) Where the uploaded CSV files are stored. Overrides the configuration file.
    #[clap(long, value_parser)]
    pub data_dir: Option<String>,

    /// (file path) The JSON season index. Overrides the configuration file.
    #[clap(long, value_parser)]
    pub race_data: Option<String>,

    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Lists the seasons and their races.
    Seasons,
    /// Creates a new season.
    AddSeason {
        #[clap(value_parser)]
        name: String,
    },
    /// Adds a race to a season, optionally uploading its results right away.
    AddRace {
        #[clap(value_parser)]
        season: String,
        #[clap(value_parser)]
        name: String,
        /// (file path) Qualifying result CSV.
        #[clap(long, value_parser, requires = "race")]
        qualy: Option<String>,
        /// (file path) Race result CSV.
        #[clap(long, value_parser, requires = "qualy")]
        race: Option<String>,
    },
    /// Uploads (or replaces) the qualifying and race results of a race.
    UploadResults {
        #[clap(value_parser)]
        season: String,
        #[clap(value_parser)]
        race: String,
        /// (file path) Qualifying result CSV.
        #[clap(value_parser)]
        qualy: String,
        /// (file path) Race result CSV.
        #[clap(value_parser)]
        race_result: String,
    },
    /// Removes a race from its season. Uploaded files are kept.
    RemoveRace {
        #[clap(value_parser)]
        season: String,
        #[clap(value_parser)]
        name: String,
    },
    /// Uploads the entry list of a season.
    UploadEntryList {
        #[clap(value_parser)]
        season: String,
        /// (file path) Entry list CSV.
        #[clap(value_parser)]
        file: String,
    },
    /// Prints the entry list of a season.
    ShowEntryList {
        #[clap(value_parser)]
        season: String,
    },
    /// Adds a time penalty to a finishing position of a race.
    AddPenalty {
        #[clap(value_parser)]
        season: String,
        #[clap(value_parser)]
        race: String,
        /// The finishing position, as written in the result file.
        #[clap(long, value_parser)]
        pos: String,
        /// Penalty in seconds. Added to any penalty already given.
        #[clap(long, value_parser)]
        penalty: String,
    },
    /// Prints the qualifying, race and penalty adjusted results of a race as JSON.
    ShowRace {
        #[clap(value_parser)]
        season: String,
        #[clap(value_parser)]
        race: String,
        /// (file path, 'stdout' or empty) Where to write the JSON.
        #[clap(short, long, value_parser)]
        out: Option<String>,
    },
    /// Exports the penalty adjusted result of one split as CSV.
    Export {
        #[clap(value_parser)]
        season: String,
        #[clap(value_parser)]
        race: String,
        #[clap(value_parser)]
        split: String,
        /// (file path, 'stdout' or empty) Where to write the CSV.
        #[clap(short, long, value_parser)]
        out: Option<String>,
        /// (file path) A reference export. If provided, the output is checked
        /// against it and any difference is printed.
        #[clap(short, long, value_parser)]
        reference: Option<String>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Seasons => "seasons",
            Command::AddSeason { .. } => "add-season",
            Command::AddRace { .. } => "add-race",
            Command::UploadResults { .. } => "upload-results",
            Command::RemoveRace { .. } => "remove-race",
            Command::UploadEntryList { .. } => "upload-entry-list",
            Command::ShowEntryList { .. } => "show-entry-list",
            Command::AddPenalty { .. } => "add-penalty",
            Command::ShowRace { .. } => "show-race",
            Command::Export { .. } => "export",
        }
    }
}
