use crate::sgp::*;

use serde::{Deserialize, Serialize};

pub const DEFAULT_CONFIG_PATH: &str = "config.yml";

// 1MB
const DEFAULT_MAX_UPLOAD_SIZE: u64 = 1024 * 1024;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    #[serde(rename = "dataDir")]
    pub data_dir: String,
    #[serde(rename = "raceData")]
    pub race_data: String,
    #[serde(rename = "maxUploadSize")]
    pub max_upload_size: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            data_dir: "data".to_string(),
            race_data: "race_data.json".to_string(),
            max_upload_size: DEFAULT_MAX_UPLOAD_SIZE,
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SgpConfig {
    pub server: ServerSettings,
}

impl SgpConfig {
    /// Command line values take precedence over the configuration file.
    pub fn with_overrides(mut self, args: &Args) -> SgpConfig {
        if let Some(data_dir) = &args.data_dir {
            self.server.data_dir = data_dir.clone();
        }
        if let Some(race_data) = &args.race_data {
            self.server.race_data = race_data.clone();
        }
        self
    }
}

/// Reads the configuration file.
///
/// Without an explicit path, `config.yml` is used if present, and the
/// defaults otherwise.
pub fn read_config(path: Option<&str>) -> SgpResult<SgpConfig> {
    let (path, required) = match path {
        Some(p) => (p, true),
        None => (DEFAULT_CONFIG_PATH, false),
    };
    if !required && !Path::new(path).exists() {
        info!("no config file {}, using defaults", path);
        return Ok(SgpConfig::default());
    }
    let contents = fs::read_to_string(path).context(OpeningConfigSnafu { path })?;
    let config: SgpConfig = if contents.trim().is_empty() {
        SgpConfig::default()
    } else {
        serde_yaml::from_str(&contents).context(ParsingConfigSnafu { path })?
    };
    info!(
        "config data dir: {} race data file: {} max upload size: {}",
        config.server.data_dir, config.server.race_data, config.server.max_upload_size
    );
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::TempDir;

    #[test]
    fn partial_config_keeps_defaults() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("config.yml");
        fs::write(&p, "server:\n  port: \"8080\"\n  dataDir: /srv/sgp\n").unwrap();
        let config = read_config(Some(p.to_str().unwrap())).unwrap();
        assert_eq!(config.server.data_dir, "/srv/sgp");
        assert_eq!(config.server.race_data, "race_data.json");
        assert_eq!(config.server.max_upload_size, 1024 * 1024);
    }

    #[test]
    fn explicit_config_must_exist() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("missing.yml");
        assert!(matches!(
            read_config(Some(p.to_str().unwrap())),
            Err(SgpError::OpeningConfig { .. })
        ));
    }

    #[test]
    fn broken_yaml_is_reported() {
        let dir = TempDir::new().unwrap();
        let p = dir.path().join("config.yml");
        fs::write(&p, "server: [dataDir").unwrap();
        assert!(matches!(
            read_config(Some(p.to_str().unwrap())),
            Err(SgpError::ParsingConfig { .. })
        ));
    }

    #[test]
    fn command_line_overrides() {
        let args = Args::parse_from(["sgphelper", "--race-data", "other.json", "seasons"]);
        let config = SgpConfig::default().with_overrides(&args);
        assert_eq!(config.server.race_data, "other.json");
        assert_eq!(config.server.data_dir, "data");
    }
}
