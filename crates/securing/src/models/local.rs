use crate::error::{ErrorKind, Result};
use exn::OptionExt;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use time::macros::format_description;
use time::{Date, OffsetDateTime};

/// Where a [`LocalFile`]'s calendar date comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DateSource {
    /// First eight characters of the file name, as `yyyyMMdd`.
    #[default]
    FileName,
    /// The file's creation time, as a UTC date.
    Created,
}

/// A file in the monitored directory, waiting to be secured.
///
/// Name, date and size are captured when the value is constructed and never
/// change afterwards, even if the file on disk does.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalFile {
    path: PathBuf,
    name: String,
    date: Date,
    size: u64,
}

impl LocalFile {
    /// Assemble a local file from already-known parts.
    pub fn new(path: impl Into<PathBuf>, date: Date, size: u64) -> Result<Self> {
        let path = path.into();
        let name = Self::file_name_of(&path)?;
        Ok(Self { path, name, date, size })
    }

    /// Inspect the file at `path`, deriving its date from `source`.
    ///
    /// # Errors
    ///
    /// - [`ErrorKind::Io`] if the file's metadata cannot be read (or the
    ///   platform does not record creation times).
    /// - [`ErrorKind::InvalidFileName`] if the file name is not UTF-8 or does
    ///   not start with a valid `yyyyMMdd` date.
    pub fn from_path(path: impl Into<PathBuf>, source: DateSource) -> Result<Self> {
        let path = path.into();
        let metadata = std::fs::metadata(&path).map_err(ErrorKind::Io)?;
        let name = Self::file_name_of(&path)?;
        let date = match source {
            DateSource::FileName => Self::date_from_name(&name)?,
            DateSource::Created => OffsetDateTime::from(metadata.created().map_err(ErrorKind::Io)?).date(),
        };
        Ok(Self { path, name, date, size: metadata.len() })
    }

    fn file_name_of(path: &Path) -> Result<String> {
        let name = path
            .file_name()
            .and_then(|name| name.to_str())
            .ok_or_raise(|| ErrorKind::InvalidFileName(path.display().to_string()))?;
        Ok(name.to_string())
    }

    fn date_from_name(name: &str) -> Result<Date> {
        let invalid = || ErrorKind::InvalidFileName(name.to_string());
        let prefix = name.get(..8).ok_or_raise(invalid)?;
        match Date::parse(prefix, format_description!("[year][month][day]")) {
            Ok(date) => Ok(date),
            Err(_) => exn::bail!(invalid()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn date(&self) -> Date {
        self.date
    }

    pub fn size_in_bytes(&self) -> u64 {
        self.size
    }
}

impl fmt::Display for LocalFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "LocalFile({})", self.path.display())
    }
}
