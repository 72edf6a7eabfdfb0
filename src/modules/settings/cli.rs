// Copyright © 2025 rustmailer.com
// Licensed under RustMailer License Agreement v1.0
// Unauthorized copying, modification, or distribution is prohibited.

use clap::{builder::ValueParser, Parser};
use std::{env, path::PathBuf, sync::LazyLock};

#[cfg(not(test))]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::parse);

#[cfg(test)]
pub static SETTINGS: LazyLock<Settings> = LazyLock::new(Settings::new_for_test);

#[derive(Debug, Parser)]
#[clap(
    name = "mailbot",
    about = "A scheduled mailbox ingestion pipeline that classifies incoming mail with an AI backend
    and archives attachments to durable object storage.",
    version = env!("CARGO_PKG_VERSION")
)]
pub struct Settings {
    /// mailbot log level (default: "info")
    #[clap(
        long,
        default_value = "info",
        env,
        help = "Set the log level for mailbot"
    )]
    pub mailbot_log_level: String,

    /// Enable ANSI logs (default: true)
    #[clap(long, default_value = "true", env, help = "Enable ANSI formatted logs")]
    pub mailbot_ansi_logs: bool,

    /// Enable log file output (default: false)
    /// If false, logs will be printed to stdout
    #[clap(
        long,
        default_value = "false",
        env,
        help = "Enable log file output (otherwise logs go to stdout)"
    )]
    pub mailbot_log_to_file: bool,

    /// Maximum number of log files (default: 5)
    #[clap(
        long,
        default_value = "5",
        env,
        help = "Set the maximum number of server log files"
    )]
    pub mailbot_max_server_log_files: usize,

    #[clap(
        long,
        env,
        help = "Set the data directory for the mailbot database and logs",
        value_parser = ValueParser::new(|s: &str| {
            let path = PathBuf::from(s);
            if !path.is_absolute() {
                return Err("Path must be an absolute directory path".to_string());
            }
            if !path.exists() {
                return Err(format!("Path {:?} does not exist", path));
            }
            if !path.is_dir() {
                return Err(format!("Path {:?} is not a directory", path));
            }
            Ok(s.to_string())
        })
    )]
    pub mailbot_root_dir: String,

    #[clap(
        long,
        env,
        default_value = "134217728",
        help = "Set the cache size for the mailbot metadata database in bytes"
    )]
    pub mailbot_metadata_cache_size: Option<usize>,

    #[clap(
        long,
        env,
        default_value = "false",
        help = "Keep the metadata database in memory instead of on disk (data is lost on restart)"
    )]
    pub mailbot_metadata_memory_mode_enabled: bool,

    /// Rolling retention window for ingested messages (default: 30 days)
    #[clap(
        long,
        default_value = "30",
        env,
        help = "Messages received more than this many days ago are deleted at the start of each run",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub mailbot_retention_days: u32,

    /// Mailbox listing window (default: last 2 days)
    #[clap(
        long,
        default_value = "2",
        env,
        help = "How far back each run queries the mail source for new messages, in days",
        value_parser = clap::value_parser!(u32).range(1..)
    )]
    pub mailbot_lookback_days: u32,

    #[clap(
        long,
        default_value = "10",
        env,
        help = "Number of messages processed concurrently per batch",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub mailbot_ingest_batch_size: u16,

    #[clap(
        long,
        default_value = "20",
        env,
        help = "Maximum number of attachments backfilled to object storage per run",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub mailbot_archive_batch_limit: u16,

    #[clap(
        long,
        default_value = "10485760",
        env,
        help = "Attachments larger than this many bytes are never archived (default: 10 MiB)"
    )]
    pub mailbot_max_attachment_size: u64,

    #[clap(
        long,
        default_value = "500",
        env,
        help = "Maximum number of expired messages deleted per retention pass",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub mailbot_reap_batch_size: u16,

    #[clap(
        long,
        default_value = "300",
        env,
        help = "Interval in seconds between scheduled ingestion runs (minimum: 30)",
        value_parser = clap::value_parser!(u64).range(30..)
    )]
    pub mailbot_ingest_interval_secs: u64,

    #[clap(
        long,
        default_value = "10000",
        env,
        help = "Maximum length (in characters) of the stored plain-text message body",
        value_parser = clap::value_parser!(u32).range(100..)
    )]
    pub mailbot_max_body_length: u32,

    /// Organization mail domain used to tell outbound from inbound mail
    #[clap(
        long,
        default_value = "example.com",
        env,
        help = "The organization's own mail domain. ⚠️ Change this default in production!"
    )]
    pub mailbot_org_domain: String,

    #[clap(
        long,
        default_value = "INBOX",
        env,
        help = "Mailbox label whose messages are ingested"
    )]
    pub mailbot_mail_label: String,

    #[clap(
        long,
        env,
        help = "Extra mail source search filter appended to the listing query"
    )]
    pub mailbot_mail_query: Option<String>,

    #[clap(long, env, help = "OAuth2 client id for the mail source gateway")]
    pub mailbot_oauth_client_id: Option<String>,

    #[clap(long, env, help = "OAuth2 client secret for the mail source gateway")]
    pub mailbot_oauth_client_secret: Option<String>,

    #[clap(
        long,
        default_value = "https://oauth2.googleapis.com/token",
        env,
        help = "OAuth2 token endpoint used to refresh the mail source access token"
    )]
    pub mailbot_oauth_token_endpoint: String,

    #[clap(
        long,
        default_value = "https://api.openai.com/v1/chat/completions",
        env,
        help = "Chat-completions endpoint of the content classification backend"
    )]
    pub mailbot_classifier_endpoint: String,

    #[clap(
        long,
        default_value = "gpt-4o-mini",
        env,
        help = "Model name sent to the content classification backend"
    )]
    pub mailbot_classifier_model: String,

    #[clap(long, env, help = "API key for the content classification backend")]
    pub mailbot_classifier_api_key: Option<String>,

    #[clap(long, env, help = "Base URL of the object store used for attachment archival")]
    pub mailbot_object_store_endpoint: Option<String>,

    #[clap(
        long,
        default_value = "mail-attachments",
        env,
        help = "Object store bucket that receives archived attachments"
    )]
    pub mailbot_object_store_bucket: String,

    #[clap(long, env, help = "Bearer token for the object store")]
    pub mailbot_object_store_token: Option<String>,

    #[clap(
        long,
        default_value = "30",
        env,
        help = "Timeout in seconds for outbound HTTP calls",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub mailbot_http_timeout_secs: u64,
}

impl Settings {
    #[cfg(test)]
    fn new_for_test() -> Self {
        Self {
            mailbot_log_level: "info".to_string(),
            mailbot_ansi_logs: false,
            mailbot_log_to_file: false,
            mailbot_max_server_log_files: 5,
            mailbot_root_dir: std::env::temp_dir().to_string_lossy().into_owned(),
            mailbot_metadata_cache_size: None,
            mailbot_metadata_memory_mode_enabled: true,
            mailbot_retention_days: 30,
            mailbot_lookback_days: 2,
            mailbot_ingest_batch_size: 10,
            mailbot_archive_batch_limit: 20,
            mailbot_max_attachment_size: 10 * 1024 * 1024,
            mailbot_reap_batch_size: 500,
            mailbot_ingest_interval_secs: 300,
            mailbot_max_body_length: 10000,
            mailbot_org_domain: "kexim-trade.co.kr".into(),
            mailbot_mail_label: "INBOX".into(),
            mailbot_mail_query: None,
            mailbot_oauth_client_id: None,
            mailbot_oauth_client_secret: None,
            mailbot_oauth_token_endpoint: "https://oauth2.googleapis.com/token".into(),
            mailbot_classifier_endpoint: "https://api.openai.com/v1/chat/completions".into(),
            mailbot_classifier_model: "gpt-4o-mini".into(),
            mailbot_classifier_api_key: None,
            mailbot_object_store_endpoint: None,
            mailbot_object_store_bucket: "mail-attachments".into(),
            mailbot_object_store_token: None,
            mailbot_http_timeout_secs: 30,
        }
    }
}
