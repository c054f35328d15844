use crate::error::Error;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    num::NonZeroU32,
    ops::RangeBounds,
    path::{Path, PathBuf},
};

/// Largest accepted window size: one year of minutes.
pub const MAX_WINDOW_SIZE: i64 = 525_600;

/// Output file written when none is given.
pub const DEFAULT_OUTPUT_FILE: &str = "moving_averages_result.json";

/// Optional settings read from a TOML file.
///
/// Every field may be omitted; command-line values take precedence.
/// See [`FileConfig::from_file`] for loading.
#[derive(Debug, Default, PartialEq, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    /// Window size in minutes.
    pub window_size: Option<i64>,
    /// Path of the output file.
    pub output_file: Option<PathBuf>,
}

impl FileConfig {
    /// Load a [`FileConfig`] from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or deserialized.
    pub fn from_file<P: AsRef<Path>>(file: P) -> Result<Self> {
        let file = file.as_ref();
        let contents =
            fs::read_to_string(file).with_context(|| format!("failed to read {file:?}"))?;

        toml::from_str(&contents).context("failed to deserialize config")
    }
}

/// Settings of a single run, validated before the computation starts.
#[derive(Debug, PartialEq, Clone)]
pub struct Config {
    pub input_file: PathBuf,
    pub window_size: NonZeroU32,
    pub output_file: PathBuf,
}

impl Config {
    /// Merge command-line values over file values and validate the result.
    ///
    /// # Errors
    /// Returns [`Error::InvalidArgument`] if the input file does not exist
    /// or the window size is missing or not a positive integer.
    pub fn resolve(
        input_file: PathBuf,
        window_size: Option<i64>,
        output_file: Option<PathBuf>,
        file_cfg: FileConfig,
    ) -> Result<Self> {
        if !input_file.is_file() {
            return Err(invalid(format!("input file {input_file:?} does not exist")));
        }

        let window_size = window_size
            .or(file_cfg.window_size)
            .ok_or_else(|| invalid("window size is required".to_string()))?;
        check_num(window_size, 1..=MAX_WINDOW_SIZE)
            .map_err(|err| invalid(format!("window size must be a positive integer: {err}")))?;
        let window_size = u32::try_from(window_size)
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| invalid(format!("window size {window_size} is out of range")))?;

        let output_file = output_file
            .or(file_cfg.output_file)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_FILE));

        Ok(Self {
            input_file,
            window_size,
            output_file,
        })
    }
}

fn invalid(msg: String) -> anyhow::Error {
    Error::InvalidArgument(msg).into()
}

fn check_num<T, R>(num: T, range: R) -> Result<(), String>
where
    T: PartialOrd + Debug,
    R: RangeBounds<T> + Debug,
{
    if !range.contains(&num) {
        return Err(format!("number must be in the range {range:?}, but is {num:?}"));
    }
    Ok(())
}
