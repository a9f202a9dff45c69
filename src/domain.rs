use std::fmt;
use std::io::Error;
use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use tracing_error::SpanTrace;

/// Columns with fewer unique values than this are listed in full.
pub const SMALL_COLUMN_LIMIT: usize = 300;

/// The only file extension the explorer picks up.
pub const TABLE_FILE_EXTENSION: &str = "csv";

/// Default data directory, relative to the directory holding the executable.
pub const DEFAULT_DATA_DIR: &str = "../Output CSVs";

pub const HELP_TEXT: &str = "\
Navigation
  ↑ / k, ↓ / j     Move to previous / next column
  PgUp / PgDn      Scroll the section
  Home / End       First / last column
  Tab, ← / →       Switch between small and large columns
  Enter / Space    Expand or collapse the column

Actions
  /                Edit the header search (comma or newline separated)
  f                Select another csv file
  c / y            Copy all values of the column to the clipboard
  r                Rescan the data directory
  ?                Show this help
  Esc              Close popup
  q                Quit

Search box
  Alt-Enter/Ctrl-J Insert a new line
  Enter            Done
  Esc              Restore the previous search";

#[derive(Debug)]
pub enum CVError {
    IoError(Error),
    ParseFault(PolarsError, SpanTrace),
    LoadingFailed(String),
    NoFilesFound(PathBuf),
    DirectoryNotFound(PathBuf),
    PermissionDenied(PathBuf),
    FileNotFound(PathBuf),
    UnknownFileType(PathBuf),
    LoggingFailed(String),
}

impl fmt::Display for CVError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CVError::IoError(err) => write!(f, "IO error: {err}"),
            CVError::ParseFault(err, span_trace) => {
                write!(f, "Failed to parse table: {err}\n{span_trace}")
            }
            CVError::LoadingFailed(msg) => write!(f, "Loading failed: {msg}"),
            CVError::NoFilesFound(dir) => {
                write!(f, "No CSV files found in the {} directory!", dir.display())
            }
            CVError::DirectoryNotFound(dir) => {
                write!(f, "Directory {} does not exist!", dir.display())
            }
            CVError::PermissionDenied(path) => {
                write!(f, "Permission denied for {}!", path.display())
            }
            CVError::FileNotFound(path) => write!(f, "File {} not found!", path.display()),
            CVError::UnknownFileType(path) => {
                write!(f, "{} is not a csv file!", path.display())
            }
            CVError::LoggingFailed(msg) => write!(f, "Could not set up logging: {msg}"),
        }
    }
}

impl std::error::Error for CVError {}

impl From<Error> for CVError {
    fn from(err: Error) -> Self {
        CVError::IoError(err)
    }
}

impl From<PolarsError> for CVError {
    fn from(err: PolarsError) -> Self {
        CVError::ParseFault(err, SpanTrace::capture())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Quit,
    MoveUp,
    MoveDown,
    MovePageUp,
    MovePageDown,
    MoveBeginning,
    MoveEnd,
    NextSection,
    PrevSection,
    TogglePanel,
    CopyValues,
    EditSearch,
    OpenFilePicker,
    Rescan,
    Help,
    Enter,
    Exit,
    Resize(usize, usize),
    RawKey(KeyEvent),
    Paste(String),
}

#[derive(Debug, Clone, Setters)]
#[setters(prefix = "with_")]
pub struct CVConfig {
    pub event_poll_time: u64,
    pub data_dir: PathBuf,
    #[setters(strip_option)]
    pub initial_file: Option<String>,
    #[setters(into)]
    pub initial_search: String,
}

impl Default for CVConfig {
    fn default() -> Self {
        Self {
            event_poll_time: 100,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            initial_file: None,
            initial_search: String::new(),
        }
    }
}
