//! The raw, serde-deserialized shape of the config file (§6). Nothing here
//! validates anything — that happens in `AppConfig::resolve`. Field names
//! mirror the TOML/JSON keys verbatim so the file can be hand-edited
//! without surprises.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct FileConfig {
    pub h2h: H2hSection,
    pub database: DatabaseSection,
    pub logger: LoggerSection,
    pub media_server: MediaServerSection,
}

#[derive(Debug, Clone, Deserialize)]
pub struct H2hSection {
    pub download_path: String,
    #[serde(default)]
    pub cbz_path: String,
    #[serde(default)]
    pub cbz_tmp_directory: String,
    #[serde(default = "default_cbz_max_size")]
    pub cbz_max_size: i64,
    #[serde(default = "default_cbz_grouping")]
    pub cbz_grouping: String,
    #[serde(default = "default_cbz_sort")]
    pub cbz_sort: String,
}

fn default_cbz_max_size() -> i64 {
    0
}

fn default_cbz_grouping() -> String {
    "flat".to_string()
}

fn default_cbz_sort() -> String {
    "upload_time".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseSection {
    #[serde(default = "default_sql_type")]
    pub sql_type: String,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

fn default_sql_type() -> String {
    "sqlite".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggerSection {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_true")]
    pub display_on_screen: bool,
    #[serde(default)]
    pub write_to_file: String,
    #[serde(default = "default_max_log_entry_length")]
    pub max_log_entry_length: i64,
    #[serde(default)]
    pub synochat_webhook: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_max_log_entry_length() -> i64 {
    -1
}

#[derive(Debug, Clone, Deserialize)]
pub struct MediaServerSection {
    #[serde(default)]
    pub server_type: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub api_username: String,
    #[serde(default)]
    pub api_password: String,
    #[serde(default)]
    pub library_id: String,
}
