use crate::error::{Error, ErrorKind};
use derive_more::Display;
use std::str::FromStr;
use time::Date;
use time::macros::format_description;

/// Name of a daily folder: a date formatted as `yyyy-MM-dd`.
///
/// Ordering is plain string ordering, which for this format is also
/// chronological ordering.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
pub struct RemoteFolderName(String);

impl RemoteFolderName {
    pub fn from_date(date: Date) -> Self {
        Self(format!("{:04}-{:02}-{:02}", date.year(), u8::from(date.month()), date.day()))
    }

    /// Wrap the name of a folder the remote store already holds. Folders are
    /// selected by the configured daily-folder pattern, not by date parsing.
    pub(crate) fn from_listed(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<Date> for RemoteFolderName {
    fn from(date: Date) -> Self {
        Self::from_date(date)
    }
}

impl FromStr for RemoteFolderName {
    type Err = Error;

    /// Parse a `yyyy-MM-dd` string, rejecting dates that do not exist.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match Date::parse(s, format_description!("[year]-[month]-[day]")) {
            Ok(date) => Ok(Self::from_date(date)),
            Err(_) => exn::bail!(ErrorKind::InvalidFolderName(s.to_string())),
        }
    }
}

/// A daily folder in the remote store, identified purely by its name.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
#[display("{name}")]
pub struct RemoteDailyFolder {
    name: RemoteFolderName,
}

impl RemoteDailyFolder {
    pub fn new(name: RemoteFolderName) -> Self {
        Self { name }
    }

    pub fn from_date(date: Date) -> Self {
        Self::new(RemoteFolderName::from_date(date))
    }

    pub fn name(&self) -> &RemoteFolderName {
        &self.name
    }
}
