//! C11: configuration. `file_config` is the raw serde shape of the config
//! file; this module adds the CLI layer (`clap`) and folds both into one
//! validated `AppConfig`, the same `FileConfig`/`CliConfig`/`resolve` split
//! the teacher uses for its own settings loader.

pub mod file_config;

use crate::errors::{H2hDbError, Result};
use clap::Parser;
use file_config::FileConfig;
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(about = "Hentai@Home gallery ingestion and archival engine")]
pub struct CliConfig {
    /// Path to a TOML or JSON config file.
    #[arg(long)]
    pub config: PathBuf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbzGrouping {
    Flat,
    DateYear,
    DateYearMonth,
    DateYearMonthDay,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CbzSort {
    UploadTime,
    DownloadTime,
    Gid,
    Title,
    No,
    /// Sort by proximity to `zero_level` pages (ascending `|pages - zero_level|`).
    /// Bare `"pages"` defaults `zero_level` to 20; `"pages+N"` sets it to `max(1, N)`.
    Pages { zero_level: i64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    NotSet,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaServerType {
    Komga {
        base_url: String,
        api_username: String,
        api_password: String,
        library_id: String,
    },
    None,
}

#[derive(Debug, Clone)]
pub struct H2hConfig {
    pub download_path: PathBuf,
    pub cbz_path: Option<PathBuf>,
    pub cbz_tmp_directory: PathBuf,
    pub cbz_max_size: i64,
    pub cbz_grouping: CbzGrouping,
    pub cbz_sort: CbzSort,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub sql_type: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

#[derive(Debug, Clone)]
pub struct LoggerConfig {
    pub level: LogLevel,
    pub display_on_screen: bool,
    pub write_to_file: Option<PathBuf>,
    pub max_log_entry_length: Option<usize>,
    pub synochat_webhook: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub h2h: H2hConfig,
    pub database: DatabaseConfig,
    pub logger: LoggerConfig,
    pub media_server: MediaServerType,
}

impl AppConfig {
    pub fn resolve(cli: &CliConfig) -> Result<Self> {
        let raw = std::fs::read_to_string(&cli.config)?;
        let file_config: FileConfig = if cli.config.extension().and_then(|e| e.to_str()) == Some("json") {
            serde_json::from_str(&raw)
                .map_err(|err| H2hDbError::Config(format!("invalid JSON config: {err}")))?
        } else {
            toml::from_str(&raw).map_err(|err| H2hDbError::Config(format!("invalid TOML config: {err}")))?
        };
        Self::from_file_config(file_config)
    }

    fn from_file_config(file_config: FileConfig) -> Result<Self> {
        let cbz_path = if file_config.h2h.cbz_path.is_empty() {
            None
        } else {
            Some(PathBuf::from(file_config.h2h.cbz_path))
        };

        let cbz_grouping = match file_config.h2h.cbz_grouping.as_str() {
            "flat" => CbzGrouping::Flat,
            "date-yyyy" => CbzGrouping::DateYear,
            "date-yyyy-mm" => CbzGrouping::DateYearMonth,
            "date-yyyy-mm-dd" => CbzGrouping::DateYearMonthDay,
            other => return Err(H2hDbError::Config(format!("unknown h2h.cbz_grouping: {other}"))),
        };

        let cbz_sort = parse_cbz_sort(&file_config.h2h.cbz_sort)?;

        let level = match file_config.logger.level.as_str() {
            "notset" => LogLevel::NotSet,
            "debug" => LogLevel::Debug,
            "info" => LogLevel::Info,
            "warning" => LogLevel::Warning,
            "error" => LogLevel::Error,
            "critical" => LogLevel::Critical,
            other => return Err(H2hDbError::Config(format!("unknown logger.level: {other}"))),
        };

        let media_server = match file_config.media_server.server_type.as_str() {
            "komga" => MediaServerType::Komga {
                base_url: file_config.media_server.base_url,
                api_username: file_config.media_server.api_username,
                api_password: file_config.media_server.api_password,
                library_id: file_config.media_server.library_id,
            },
            "" => MediaServerType::None,
            other => return Err(H2hDbError::Config(format!("unknown media_server.server_type: {other}"))),
        };

        Ok(AppConfig {
            h2h: H2hConfig {
                download_path: PathBuf::from(file_config.h2h.download_path),
                cbz_path,
                cbz_tmp_directory: PathBuf::from(file_config.h2h.cbz_tmp_directory),
                cbz_max_size: file_config.h2h.cbz_max_size,
                cbz_grouping,
                cbz_sort,
            },
            database: DatabaseConfig {
                sql_type: file_config.database.sql_type,
                host: file_config.database.host,
                port: file_config.database.port,
                user: file_config.database.user,
                password: file_config.database.password,
                database: file_config.database.database,
            },
            logger: LoggerConfig {
                level,
                display_on_screen: file_config.logger.display_on_screen,
                write_to_file: (!file_config.logger.write_to_file.is_empty())
                    .then(|| PathBuf::from(file_config.logger.write_to_file)),
                max_log_entry_length: (file_config.logger.max_log_entry_length >= 0)
                    .then_some(file_config.logger.max_log_entry_length as usize),
                synochat_webhook: (!file_config.logger.synochat_webhook.is_empty())
                    .then_some(file_config.logger.synochat_webhook),
            },
            media_server,
        })
    }
}

fn parse_cbz_sort(value: &str) -> Result<CbzSort> {
    match value {
        "upload_time" => Ok(CbzSort::UploadTime),
        "download_time" => Ok(CbzSort::DownloadTime),
        "gid" => Ok(CbzSort::Gid),
        "title" => Ok(CbzSort::Title),
        "no" => Ok(CbzSort::No),
        "pages" => Ok(CbzSort::Pages { zero_level: 20 }),
        other => {
            if let Some(suffix) = other.strip_prefix("pages+") {
                let n: i64 = suffix
                    .parse()
                    .map_err(|_| H2hDbError::Config(format!("unknown h2h.cbz_sort: {other}")))?;
                Ok(CbzSort::Pages { zero_level: n.max(1) })
            } else {
                Err(H2hDbError::Config(format!("unknown h2h.cbz_sort: {other}")))
            }
        }
    }
}

impl From<CbzGrouping> for crate::archive::CbzGrouping {
    fn from(grouping: CbzGrouping) -> Self {
        match grouping {
            CbzGrouping::Flat => crate::archive::CbzGrouping::Flat,
            CbzGrouping::DateYear => crate::archive::CbzGrouping::DateYear,
            CbzGrouping::DateYearMonth => crate::archive::CbzGrouping::DateYearMonth,
            CbzGrouping::DateYearMonthDay => crate::archive::CbzGrouping::DateYearMonthDay,
        }
    }
}
