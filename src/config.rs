//! Settings loaded once at startup from a properties file
//!
//! The file uses Java properties syntax (`KEY=VALUE`, `KEY: VALUE` or `KEY VALUE`,
//! `#` and `!` comments). Values are taken literally, `$` included. A process
//! environment variable with the same key overrides the file value.

use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use blob_fetch::FetchOptions;
use thiserror::Error;

pub const BLOB_STORE: &str = "BLOB_STORE";
pub const MONGO_URI: &str = "MONGO_URI";
pub const MONGO_USER: &str = "MONGO_USER";
pub const MONGO_PASS: &str = "MONGO_PASS";
pub const MONGO_DB: &str = "MONGO_DB";
pub const MONGO_GRIDFS_PREFIX: &str = "MONGO_GRIDFS_PREFIX";
pub const S3_BUCKET: &str = "S3_BUCKET";
pub const S3_REGION: &str = "S3_REGION";
pub const S3_ENDPOINT: &str = "S3_ENDPOINT";
pub const S3_ACCESS_KEY_ID: &str = "S3_ACCESS_KEY_ID";
pub const S3_SECRET_ACCESS_KEY: &str = "S3_SECRET_ACCESS_KEY";
pub const S3_FORCE_PATH_STYLE: &str = "S3_FORCE_PATH_STYLE";
pub const NUM_WORKERS: &str = "NUM_WORKERS";
pub const LARGE_FILE_THRESHOLD_MB: &str = "LARGE_FILE_THRESHOLD_MB";
pub const CONNECT_TIMEOUT_SECS: &str = "CONNECT_TIMEOUT_SECS";
pub const TRANSFER_TIMEOUT_SECS: &str = "TRANSFER_TIMEOUT_SECS";

const KNOWN_KEYS: &[&str] = &[
    BLOB_STORE,
    MONGO_URI,
    MONGO_USER,
    MONGO_PASS,
    MONGO_DB,
    MONGO_GRIDFS_PREFIX,
    S3_BUCKET,
    S3_REGION,
    S3_ENDPOINT,
    S3_ACCESS_KEY_ID,
    S3_SECRET_ACCESS_KEY,
    S3_FORCE_PATH_STYLE,
    NUM_WORKERS,
    LARGE_FILE_THRESHOLD_MB,
    CONNECT_TIMEOUT_SECS,
    TRANSFER_TIMEOUT_SECS,
];

pub const DEFAULT_WORKERS: usize = blob_fetch::DEFAULT_WORKERS;
pub const DEFAULT_THRESHOLD_MB: u64 = blob_fetch::DEFAULT_SIZE_THRESHOLD / BYTES_PER_MB;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_GRIDFS_BUCKET: &str = "fs";
pub const DEFAULT_S3_REGION: &str = "auto";

const BYTES_PER_MB: u64 = 1024 * 1024;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read configuration {}: {source}", path.display())]
    Read { path: PathBuf, source: io::Error },

    #[error("failed to parse configuration {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: java_properties::PropertiesError,
    },

    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value {value:?} for {key}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// A credential that never shows up in debug output
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Secret(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridFsSettings {
    pub uri: String,
    pub username: Option<String>,
    pub password: Option<Secret>,
    pub database: String,
    pub bucket: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    pub endpoint_url: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: Secret,
    pub force_path_style: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreSettings {
    GridFs(GridFsSettings),
    S3(S3Settings),
}

impl StoreSettings {
    /// Short description for logs and reports, free of credentials
    pub fn describe(&self) -> String {
        match self {
            StoreSettings::GridFs(cfg) => format!("gridfs:{}/{}", cfg.database, cfg.bucket),
            StoreSettings::S3(cfg) => format!("s3:{}", cfg.bucket),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub store: StoreSettings,
    pub workers: usize,
    pub size_threshold_mb: u64,
    pub connect_timeout: Duration,
    pub transfer_timeout: Option<Duration>,
}

impl Settings {
    /// Read the properties file at `path`, apply environment overrides and validate
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut properties =
            java_properties::read(BufReader::new(file)).map_err(|source| ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        for key in KNOWN_KEYS {
            if let Ok(value) = std::env::var(key) {
                properties.insert(key.to_string(), value);
            }
        }

        Self::from_properties(&properties)
    }

    /// Build settings from already-parsed key/value pairs
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let store_kind = optional(properties, BLOB_STORE).unwrap_or("gridfs");
        let store = match store_kind.to_ascii_lowercase().as_str() {
            "gridfs" | "mongo" | "mongodb" => StoreSettings::GridFs(GridFsSettings {
                uri: required(properties, MONGO_URI)?.to_string(),
                username: optional(properties, MONGO_USER).map(str::to_string),
                password: optional(properties, MONGO_PASS).map(Secret::new),
                database: required(properties, MONGO_DB)?.to_string(),
                bucket: optional(properties, MONGO_GRIDFS_PREFIX)
                    .unwrap_or(DEFAULT_GRIDFS_BUCKET)
                    .to_string(),
            }),
            "s3" => StoreSettings::S3(S3Settings {
                bucket: required(properties, S3_BUCKET)?.to_string(),
                region: optional(properties, S3_REGION)
                    .unwrap_or(DEFAULT_S3_REGION)
                    .to_string(),
                endpoint_url: optional(properties, S3_ENDPOINT).map(str::to_string),
                access_key_id: required(properties, S3_ACCESS_KEY_ID)?.to_string(),
                secret_access_key: Secret::new(required(properties, S3_SECRET_ACCESS_KEY)?),
                force_path_style: parse_bool(properties, S3_FORCE_PATH_STYLE, false)?,
            }),
            _ => {
                return Err(ConfigError::Invalid {
                    key: BLOB_STORE,
                    value: store_kind.to_string(),
                    reason: "expected gridfs or s3".to_string(),
                })
            }
        };

        let workers: usize = parse_number(properties, NUM_WORKERS, DEFAULT_WORKERS)?;
        if workers == 0 {
            return Err(ConfigError::Invalid {
                key: NUM_WORKERS,
                value: "0".to_string(),
                reason: "at least one worker is required".to_string(),
            });
        }

        let size_threshold_mb =
            parse_number(properties, LARGE_FILE_THRESHOLD_MB, DEFAULT_THRESHOLD_MB)?;
        let connect_timeout_secs =
            parse_number(properties, CONNECT_TIMEOUT_SECS, DEFAULT_CONNECT_TIMEOUT_SECS)?;
        let transfer_timeout_secs: u64 = parse_number(properties, TRANSFER_TIMEOUT_SECS, 0)?;

        Ok(Settings {
            store,
            workers,
            size_threshold_mb,
            connect_timeout: Duration::from_secs(connect_timeout_secs),
            transfer_timeout: (transfer_timeout_secs > 0)
                .then(|| Duration::from_secs(transfer_timeout_secs)),
        })
    }

    pub fn size_threshold_bytes(&self) -> u64 {
        self.size_threshold_mb.saturating_mul(BYTES_PER_MB)
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            workers: self.workers,
            size_threshold: self.size_threshold_bytes(),
            transfer_timeout: self.transfer_timeout,
        }
    }
}

fn optional<'a>(properties: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    properties
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn required<'a>(
    properties: &'a HashMap<String, String>,
    key: &'static str,
) -> Result<&'a str, ConfigError> {
    optional(properties, key).ok_or(ConfigError::Missing(key))
}

fn parse_number<T>(
    properties: &HashMap<String, String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    match optional(properties, key) {
        Some(value) => value.parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: value.to_string(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_bool(
    properties: &HashMap<String, String>,
    key: &'static str,
    default: bool,
) -> Result<bool, ConfigError> {
    match optional(properties, key).map(str::to_ascii_lowercase).as_deref() {
        None => Ok(default),
        Some("true" | "1" | "yes") => Ok(true),
        Some("false" | "0" | "no") => Ok(false),
        Some(other) => Err(ConfigError::Invalid {
            key,
            value: other.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn props(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn gridfs_settings_use_documented_defaults() {
        let settings = Settings::from_properties(&props(&[
            (MONGO_URI, "mongodb://db.internal:27017"),
            (MONGO_DB, "archive"),
        ]))
        .unwrap();

        assert_eq!(settings.workers, 10);
        assert_eq!(settings.size_threshold_mb, 20);
        assert_eq!(settings.size_threshold_bytes(), 20 * 1024 * 1024);
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.transfer_timeout, None);
        match settings.store {
            StoreSettings::GridFs(cfg) => {
                assert_eq!(cfg.bucket, "fs");
                assert_eq!(cfg.username, None);
                assert_eq!(cfg.password, None);
            }
            other => panic!("unexpected store {other:?}"),
        }
    }

    #[test]
    fn explicit_values_override_defaults() {
        let settings = Settings::from_properties(&props(&[
            (MONGO_URI, "mongodb://db"),
            (MONGO_USER, "reader"),
            (MONGO_PASS, "hunter2"),
            (MONGO_DB, "archive"),
            (MONGO_GRIDFS_PREFIX, "attachments"),
            (NUM_WORKERS, "4"),
            (LARGE_FILE_THRESHOLD_MB, "64"),
            (TRANSFER_TIMEOUT_SECS, "300"),
        ]))
        .unwrap();

        let options = settings.fetch_options();
        assert_eq!(options.workers, 4);
        assert_eq!(options.size_threshold, 64 * 1024 * 1024);
        assert_eq!(options.transfer_timeout, Some(Duration::from_secs(300)));
        assert_eq!(settings.store.describe(), "gridfs:archive/attachments");
    }

    #[test]
    fn s3_settings_are_parsed() {
        let settings = Settings::from_properties(&props(&[
            (BLOB_STORE, "s3"),
            (S3_BUCKET, "exports"),
            (S3_ENDPOINT, "http://localhost:9000"),
            (S3_ACCESS_KEY_ID, "key"),
            (S3_SECRET_ACCESS_KEY, "secret"),
            (S3_FORCE_PATH_STYLE, "true"),
        ]))
        .unwrap();

        match settings.store {
            StoreSettings::S3(cfg) => {
                assert_eq!(cfg.region, "auto");
                assert_eq!(cfg.endpoint_url.as_deref(), Some("http://localhost:9000"));
                assert!(cfg.force_path_style);
                assert_eq!(cfg.secret_access_key.expose(), "secret");
            }
            other => panic!("unexpected store {other:?}"),
        }
    }

    #[test]
    fn missing_required_key_is_reported() {
        let err = Settings::from_properties(&props(&[(MONGO_URI, "mongodb://db")])).unwrap_err();
        assert!(matches!(err, ConfigError::Missing(MONGO_DB)));
    }

    #[test]
    fn zero_workers_is_rejected() {
        let err = Settings::from_properties(&props(&[
            (MONGO_URI, "mongodb://db"),
            (MONGO_DB, "archive"),
            (NUM_WORKERS, "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: NUM_WORKERS, .. }));
    }

    #[test]
    fn non_numeric_threshold_is_rejected() {
        let err = Settings::from_properties(&props(&[
            (MONGO_URI, "mongodb://db"),
            (MONGO_DB, "archive"),
            (LARGE_FILE_THRESHOLD_MB, "lots"),
        ]))
        .unwrap_err();
        assert!(err.to_string().contains(LARGE_FILE_THRESHOLD_MB));
    }

    #[test]
    fn unknown_store_is_rejected() {
        let err = Settings::from_properties(&props(&[(BLOB_STORE, "ftp")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: BLOB_STORE, .. }));
    }

    #[test]
    fn secrets_are_redacted_in_debug_output() {
        let settings = Settings::from_properties(&props(&[
            (MONGO_URI, "mongodb://db"),
            (MONGO_DB, "archive"),
            (MONGO_PASS, "hunter2"),
        ]))
        .unwrap();
        assert!(!format!("{settings:?}").contains("hunter2"));
    }

    #[test]
    fn properties_file_is_loaded() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "# export settings").unwrap();
        writeln!(file, "MONGO_URI=mongodb://db.internal:27017/?replicaSet=rs0").unwrap();
        writeln!(file, "MONGO_DB=archive").unwrap();
        writeln!(file, "NUM_WORKERS=3").unwrap();

        let settings = Settings::load(file.path()).unwrap();

        assert_eq!(settings.store.describe(), "gridfs:archive/fs");
        if std::env::var(NUM_WORKERS).is_err() {
            assert_eq!(settings.workers, 3);
        }
    }

    #[test]
    fn credentials_keep_dollar_signs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "MONGO_URI=mongodb://db.internal:27017").unwrap();
        writeln!(file, "MONGO_DB=archive").unwrap();
        writeln!(file, "MONGO_USER=reader").unwrap();
        writeln!(file, "MONGO_PASS=s3cr$tPass").unwrap();

        let settings = Settings::load(file.path()).unwrap();

        if std::env::var(MONGO_PASS).is_err() {
            match settings.store {
                StoreSettings::GridFs(cfg) => assert_eq!(
                    cfg.password.as_ref().map(Secret::expose),
                    Some("s3cr$tPass")
                ),
                other => panic!("unexpected store {other:?}"),
            }
        }
    }

    #[test]
    fn colon_and_space_separators_are_accepted() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "! s3 export").unwrap();
        writeln!(file, "BLOB_STORE: s3").unwrap();
        writeln!(file, "S3_BUCKET exports").unwrap();
        writeln!(file, "S3_ACCESS_KEY_ID=AKIDEXAMPLE").unwrap();
        writeln!(file, "S3_SECRET_ACCESS_KEY=${{HOME}}/x$y").unwrap();

        let settings = Settings::load(file.path()).unwrap();

        if std::env::var(BLOB_STORE).is_err() && std::env::var(S3_SECRET_ACCESS_KEY).is_err() {
            assert_eq!(settings.store.describe(), "s3:exports");
            match settings.store {
                StoreSettings::S3(cfg) => {
                    assert_eq!(cfg.secret_access_key.expose(), "${HOME}/x$y")
                }
                other => panic!("unexpected store {other:?}"),
            }
        }
    }

    #[test]
    fn defaults_follow_engine_defaults() {
        assert_eq!(DEFAULT_WORKERS, 10);
        assert_eq!(DEFAULT_THRESHOLD_MB * BYTES_PER_MB, blob_fetch::DEFAULT_SIZE_THRESHOLD);
    }

    #[test]
    fn unreadable_file_is_a_read_error() {
        let err = Settings::load(Path::new("/nonexistent/blob-extract.properties")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
