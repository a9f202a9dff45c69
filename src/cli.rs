use std::path::PathBuf;

use clap::Parser;

use crate::domain::{CVConfig, CVError, DEFAULT_DATA_DIR};
use crate::loader::resolve_data_dir;

/// Explore the unique values of the columns of csv files.
#[derive(Parser, Debug)]
#[command(version, about)]
pub struct Args {
    /// Directory holding the csv files. Defaults to "../Output CSVs" next to the executable.
    pub dir: Option<String>,

    /// File to open first, instead of the first file in the directory.
    #[arg(short, long)]
    pub file: Option<String>,

    /// Initial header search, comma separated.
    #[arg(short, long)]
    pub search: Option<String>,

    /// Write logs to this file. The log level is read from CV_LOG.
    #[arg(long)]
    pub log_file: Option<PathBuf>,
}

impl Args {
    pub fn to_config(&self) -> Result<CVConfig, CVError> {
        let mut cfg = CVConfig::default()
            .with_data_dir(resolve_data_dir(self.dir.as_deref(), DEFAULT_DATA_DIR)?)
            .with_initial_search(self.search.clone().unwrap_or_default());
        if let Some(file) = &self.file {
            cfg = cfg.with_initial_file(file.clone());
        }
        Ok(cfg)
    }
}
