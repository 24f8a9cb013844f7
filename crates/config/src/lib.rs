//! Layered configuration for hoard.
//!
//! Sources, from lowest to highest precedence:
//!
//! 1. Built-in defaults.
//! 2. `hoard.toml` then `hoard.yaml` in the platform configuration directory.
//! 3. A file passed explicitly (TOML, YAML or JSON, chosen by extension).
//! 4. Environment variables prefixed `HOARD_`, with `__` separating nested
//!    keys: `HOARD_UPLOAD__MAX_CONCURRENT_UPLOADS=4`.

pub mod error;

use crate::error::{ErrorKind, Result};
use directories::ProjectDirs;
use figment::Figment;
use figment::providers::{Env, Format, Json, Serialized, Toml, Yaml};
pub use hoard_securing::DateSource;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_DAILY_FOLDER_PATTERN: &str = r"^\d{4}-(0[1-9]|1[012])-(0[1-9]|[12][0-9]|3[01])$";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub monitoring: MonitoringConfig,
    pub upload: UploadConfig,
    pub rotation: RotationConfig,
    pub stats: StatsConfig,
    pub remote: RemoteConfig,
}

/// The local directory new files arrive in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub path: PathBuf,
    /// Only files whose names match are secured.
    pub file_name_pattern: String,
    pub date_source: DateSource,
    pub polling_interval_ms: u64,
    pub max_files_per_poll: usize,
}
impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::new(),
            file_name_pattern: r"^\d{8}.*\.jpg$".to_string(),
            date_source: DateSource::default(),
            polling_interval_ms: 1000,
            max_files_per_poll: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// Remote folder the daily folders live in. Must already exist.
    pub root_folder_name: String,
    pub max_concurrent_uploads: usize,
    /// Time budget for each remote call, retries included.
    pub retry_timeout_secs: u64,
}
impl Default for UploadConfig {
    fn default() -> Self {
        Self { root_folder_name: String::new(), max_concurrent_uploads: 2, retry_timeout_secs: 300 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotationConfig {
    pub max_daily_folders: usize,
    /// Folders under the root whose names match are daily folders, and
    /// subject to rotation. Anything else is left alone.
    pub daily_folder_pattern: String,
}
impl Default for RotationConfig {
    fn default() -> Self {
        Self { max_daily_folders: 5, daily_folder_pattern: DEFAULT_DAILY_FOLDER_PATTERN.to_string() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatsConfig {
    pub batch_size: usize,
    pub group_timeout_secs: u64,
}
impl Default for StatsConfig {
    fn default() -> Self {
        Self { batch_size: 10, group_timeout_secs: 10 }
    }
}

/// Which remote store to secure files into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum RemoteConfig {
    /// A directory tree, typically a mounted share.
    Local { path: PathBuf },
}
impl Default for RemoteConfig {
    fn default() -> Self {
        Self::Local { path: PathBuf::new() }
    }
}

impl Config {
    /// Load configuration from every source, then validate it.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let dirs = ProjectDirs::from("", "", "hoard");
        Self::load_layered(dirs.as_ref().map(ProjectDirs::config_dir), explicit)
    }

    /// Load configuration using `config_dir` in place of the platform
    /// configuration directory.
    pub fn load_layered(config_dir: Option<&Path>, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit
            && !path.is_file()
        {
            exn::bail!(ErrorKind::NotFound(path.display().to_string()));
        }
        let config: Self = Self::figment(config_dir, explicit)
            .extract()
            .map_err(|e| ErrorKind::Parse(e.to_string()))?;
        config.validate()?;
        tracing::debug!(?config, "Configuration loaded");
        Ok(config)
    }

    fn figment(config_dir: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(dir) = config_dir {
            figment = figment.merge(Toml::file(dir.join("hoard.toml"))).merge(Yaml::file(dir.join("hoard.yaml")));
        }
        if let Some(path) = explicit {
            figment = match path.extension().and_then(|ext| ext.to_str()) {
                Some("yaml" | "yml") => figment.merge(Yaml::file(path)),
                Some("json") => figment.merge(Json::file(path)),
                _ => figment.merge(Toml::file(path)),
            };
        }
        figment.merge(Env::prefixed("HOARD_").split("__"))
    }

    pub fn validate(&self) -> Result<()> {
        let checks: [(bool, &'static str); 10] = [
            (self.monitoring.path.as_os_str().is_empty(), "monitoring.path"),
            (self.monitoring.polling_interval_ms == 0, "monitoring.polling_interval_ms"),
            (self.monitoring.max_files_per_poll == 0, "monitoring.max_files_per_poll"),
            (self.upload.root_folder_name.trim().is_empty(), "upload.root_folder_name"),
            (self.upload.max_concurrent_uploads == 0, "upload.max_concurrent_uploads"),
            (self.upload.retry_timeout_secs == 0, "upload.retry_timeout_secs"),
            (self.rotation.max_daily_folders == 0, "rotation.max_daily_folders"),
            (self.stats.batch_size == 0, "stats.batch_size"),
            (self.stats.group_timeout_secs == 0, "stats.group_timeout_secs"),
            (self.remote_path().as_os_str().is_empty(), "remote.path"),
        ];
        if let Some((_, field)) = checks.into_iter().find(|(invalid, _)| *invalid) {
            exn::bail!(ErrorKind::Invalid(field));
        }
        self.file_name_regex()?;
        self.daily_folder_regex()?;
        Ok(())
    }

    pub fn file_name_regex(&self) -> Result<Regex> {
        match Regex::new(&self.monitoring.file_name_pattern) {
            Ok(regex) => Ok(regex),
            Err(_) => exn::bail!(ErrorKind::Invalid("monitoring.file_name_pattern")),
        }
    }

    pub fn daily_folder_regex(&self) -> Result<Regex> {
        match Regex::new(&self.rotation.daily_folder_pattern) {
            Ok(regex) => Ok(regex),
            Err(_) => exn::bail!(ErrorKind::Invalid("rotation.daily_folder_pattern")),
        }
    }

    pub fn polling_interval(&self) -> Duration {
        Duration::from_millis(self.monitoring.polling_interval_ms)
    }

    pub fn retry_timeout(&self) -> Duration {
        Duration::from_secs(self.upload.retry_timeout_secs)
    }

    pub fn group_timeout(&self) -> Duration {
        Duration::from_secs(self.stats.group_timeout_secs)
    }

    fn remote_path(&self) -> &Path {
        match &self.remote {
            RemoteConfig::Local { path } => path,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;
    use rstest::rstest;

    const MINIMAL: &str = r#"
        [monitoring]
        path = "/var/spool/camera"

        [upload]
        root_folder_name = "camera"

        [remote]
        kind = "local"
        path = "/mnt/backup"
    "#;

    fn valid() -> Config {
        let mut config = Config::default();
        config.monitoring.path = PathBuf::from("/var/spool/camera");
        config.upload.root_folder_name = "camera".to_string();
        config.remote = RemoteConfig::Local { path: PathBuf::from("/mnt/backup") };
        config
    }

    #[test]
    fn test_defaults_need_paths() {
        let err = Config::default().validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid("monitoring.path")));
        valid().validate().unwrap();
    }

    #[rstest]
    #[case::polling(|c: &mut Config| c.monitoring.polling_interval_ms = 0, "monitoring.polling_interval_ms")]
    #[case::per_poll(|c: &mut Config| c.monitoring.max_files_per_poll = 0, "monitoring.max_files_per_poll")]
    #[case::root(|c: &mut Config| c.upload.root_folder_name = "  ".to_string(), "upload.root_folder_name")]
    #[case::uploads(|c: &mut Config| c.upload.max_concurrent_uploads = 0, "upload.max_concurrent_uploads")]
    #[case::retry(|c: &mut Config| c.upload.retry_timeout_secs = 0, "upload.retry_timeout_secs")]
    #[case::rotation(|c: &mut Config| c.rotation.max_daily_folders = 0, "rotation.max_daily_folders")]
    #[case::batch(|c: &mut Config| c.stats.batch_size = 0, "stats.batch_size")]
    #[case::group(|c: &mut Config| c.stats.group_timeout_secs = 0, "stats.group_timeout_secs")]
    #[case::remote(|c: &mut Config| c.remote = RemoteConfig::default(), "remote.path")]
    #[case::file_regex(|c: &mut Config| c.monitoring.file_name_pattern = "(".to_string(), "monitoring.file_name_pattern")]
    #[case::folder_regex(|c: &mut Config| c.rotation.daily_folder_pattern = "[".to_string(), "rotation.daily_folder_pattern")]
    fn test_invalid(#[case] break_it: fn(&mut Config), #[case] field: &str) {
        let mut config = valid();
        break_it(&mut config);
        let err = config.validate().unwrap_err();
        assert!(matches!(&*err, ErrorKind::Invalid(f) if *f == field));
    }

    #[test]
    fn test_load_toml_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoard.toml");
        std::fs::write(&path, MINIMAL).unwrap();

        let config = Config::load_layered(None, Some(&path)).unwrap();
        assert_eq!(config, valid());
        assert_eq!(config.retry_timeout(), Duration::from_secs(300));
        assert_eq!(config.group_timeout(), Duration::from_secs(10));
        assert_eq!(config.polling_interval(), Duration::from_secs(1));
        assert!(config.daily_folder_regex().unwrap().is_match("2019-08-18"));
        assert!(!config.daily_folder_regex().unwrap().is_match("2019-13-18"));
    }

    #[test]
    fn test_load_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoard.yaml");
        std::fs::write(
            &path,
            "monitoring:\n  path: /spool\n  date_source: created\nupload:\n  root_folder_name: camera\nremote:\n  kind: local\n  path: /mnt\n",
        )
        .unwrap();

        let config = Config::load_layered(None, Some(&path)).unwrap();
        assert_eq!(config.monitoring.date_source, DateSource::Created);
        assert_eq!(config.monitoring.path, PathBuf::from("/spool"));
    }

    #[test]
    fn test_config_dir_overridden_by_explicit_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hoard.toml"), format!("{MINIMAL}\n[rotation]\nmax_daily_folders = 7\n")).unwrap();
        let explicit = dir.path().join("override.json");
        std::fs::write(&explicit, r#"{"rotation": {"max_daily_folders": 9}}"#).unwrap();

        let layered = Config::load_layered(Some(dir.path()), None).unwrap();
        assert_eq!(layered.rotation.max_daily_folders, 7);
        let overridden = Config::load_layered(Some(dir.path()), Some(&explicit)).unwrap();
        assert_eq!(overridden.rotation.max_daily_folders, 9);
    }

    #[test]
    fn test_missing_explicit_file() {
        let err = Config::load_layered(None, Some(Path::new("/definitely/not/here.toml"))).unwrap_err();
        assert!(matches!(&*err, ErrorKind::NotFound(_)));
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hoard.toml");
        std::fs::write(&path, "[upload]\nmax_concurrent_uploads = \"many\"\n").unwrap();
        let err = Config::load_layered(None, Some(&path)).unwrap_err();
        assert!(matches!(&*err, ErrorKind::Parse(_)));
    }

    #[test]
    fn test_environment_overrides() {
        Jail::expect_with(|jail| {
            jail.create_file("hoard.toml", MINIMAL)?;
            jail.set_env("HOARD_UPLOAD__MAX_CONCURRENT_UPLOADS", "4");
            jail.set_env("HOARD_MONITORING__DATE_SOURCE", "created");

            let config = Config::load_layered(None, Some(Path::new("hoard.toml"))).unwrap();
            assert_eq!(config.upload.max_concurrent_uploads, 4);
            assert_eq!(config.monitoring.date_source, DateSource::Created);
            assert_eq!(config.upload.root_folder_name, "camera");
            Ok(())
        });
    }
}
