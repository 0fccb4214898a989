//! Configuration loaded from the environment (and `.env`, if present).

use std::env;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("OUTPUT_PATH is not set and the home directory is unknown")]
    NoOutputPath,

    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("output directory {path:?} is unusable")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Clone, Debug)]
pub struct EncoderConfig {
    /// HTTP server bind address
    pub addr: String,
    /// HTTP server port
    pub port: u16,
    /// Root under which every task gets its own folder
    pub output_path: PathBuf,
    /// Transcoder executable
    pub ffmpeg_path: PathBuf,
    /// Media inspection executable
    pub ffprobe_path: PathBuf,
    /// Retired tasks kept for `/stats`
    pub finished_history: usize,
}

impl EncoderConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let output_path = match lookup("OUTPUT_PATH").filter(|p| !p.trim().is_empty()) {
            Some(path) => PathBuf::from(path),
            None => lookup("HOME")
                .filter(|h| !h.is_empty())
                .map(|home| PathBuf::from(home).join("encoded_videos"))
                .ok_or(ConfigError::NoOutputPath)?,
        };

        Ok(Self {
            addr: lookup("ADDR").unwrap_or_else(|| String::from("0.0.0.0")),
            port: parse_var(&lookup, "PORT", 6000)?,
            output_path,
            ffmpeg_path: lookup("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ffmpeg")),
            ffprobe_path: lookup("FFPROBE_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("ffprobe")),
            finished_history: parse_var(&lookup, "FINISHED_HISTORY", 0)?,
        })
    }

    /// Create the output root if it does not exist yet.
    pub fn prepare_output_dir(&self) -> Result<(), ConfigError> {
        std::fs::create_dir_all(&self.output_path).map_err(|source| ConfigError::OutputDir {
            path: self.output_path.clone(),
            source,
        })
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { var, value }),
        None => Ok(default),
    }
}
