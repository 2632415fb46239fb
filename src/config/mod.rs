//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

use crate::application::blog::{
    BlogConfig, DEFAULT_DISPLAY_NAME_METHOD, DEFAULT_LAYOUT, DEFAULT_POSTS_PER_PAGE,
    DEFAULT_PUBLIC_URL, DEFAULT_SHORT_BODY_LENGTH_LIMIT, DEFAULT_TITLE, PingPolicy,
};
use crate::domain::types::{CommentsMode, SearchEngine, StateCatalog};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "scriba";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const ENV_LIST_KEYS: [&str; 3] = [
    "blog.active_states",
    "blog.hidden_states",
    "blog.ping_search_engines",
];

/// Command-line arguments for the scriba binary.
#[derive(Debug, Parser)]
#[command(name = "scriba", version, about = "Scriba blog posting service")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SCRIBA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP service.
    Serve(Box<ServeArgs>),
    /// Mint a bearer token for a blogger, creating the blogger if needed.
    #[command(name = "issue-token")]
    IssueToken(IssueTokenArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct IssueTokenArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,

    /// Username of the blogger the token authenticates.
    #[arg(long, value_name = "USERNAME")]
    pub username: String,

    /// Display name stored when the blogger is created.
    #[arg(long, value_name = "NAME")]
    pub name: Option<String>,

    /// Email stored when the blogger is created.
    #[arg(long, value_name = "EMAIL")]
    pub email: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Toggle the write routes (new, create, edit, update, destroy).
    #[arg(
        long = "blog-include-admin-actions",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub include_admin_actions: Option<bool>,

    /// Override the public base URL used for feed links and pings.
    #[arg(long = "blog-public-url", value_name = "URL")]
    pub public_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub blog: BlogConfig,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Resolve settings for `cli` from the config files, `SCRIBA__*` env and CLI overrides.
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    let mut environment = Environment::with_prefix("SCRIBA")
        .separator("__")
        .try_parsing(true)
        .list_separator(",");
    for key in ENV_LIST_KEYS {
        environment = environment.with_list_parse_key(key);
    }
    builder = builder.add_source(environment);

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::IssueToken(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    blog: RawBlogSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(enabled) = overrides.include_admin_actions {
            self.blog.include_admin_actions = Some(enabled);
        }
        if let Some(url) = overrides.public_url.as_ref() {
            self.blog.public_url = Some(url.clone());
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            blog,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            blog: build_blog_config(blog)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        u64::from(
            database
                .max_connections
                .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS),
        ),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_blog_config(blog: RawBlogSettings) -> Result<BlogConfig, LoadError> {
    let posts_per_page = non_zero_u32(
        u64::from(blog.posts_per_page.unwrap_or(DEFAULT_POSTS_PER_PAGE)),
        "blog.posts_per_page",
    )?
    .get();

    let short_body_length_limit = blog
        .short_body_length_limit
        .unwrap_or(DEFAULT_SHORT_BODY_LENGTH_LIMIT);
    if short_body_length_limit == 0 {
        return Err(LoadError::invalid(
            "blog.short_body_length_limit",
            "must be greater than zero",
        ));
    }

    let active = normalize_states(blog.active_states, "published");
    let hidden = normalize_states(blog.hidden_states, "draft");
    if let Some(overlap) = active.iter().find(|state| hidden.contains(state)) {
        return Err(LoadError::invalid(
            "blog.hidden_states",
            format!("state `{overlap}` is listed as both active and hidden"),
        ));
    }

    let include_comments = match blog.include_comments {
        Some(value) => CommentsMode::from_str(&value)
            .map_err(|reason| LoadError::invalid("blog.include_comments", reason))?,
        None => CommentsMode::default(),
    };

    let ping_search_engines = match blog.ping_search_engines {
        Some(raw) => raw.into_policy()?,
        None => PingPolicy::Disabled,
    };

    let public_url = blog
        .public_url
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .unwrap_or(DEFAULT_PUBLIC_URL);
    let public_url = parse_base_url(public_url)
        .map_err(|reason| LoadError::invalid("blog.public_url", reason))?;

    let display_method = blog
        .blogger_display_name_method
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .unwrap_or_else(|| DEFAULT_DISPLAY_NAME_METHOD.to_string());

    Ok(BlogConfig {
        layout: blog.layout.unwrap_or_else(|| DEFAULT_LAYOUT.to_string()),
        title: blog.title.unwrap_or_else(|| DEFAULT_TITLE.to_string()),
        description: blog.description.unwrap_or_default(),
        include_admin_actions: blog.include_admin_actions.unwrap_or(true),
        ping_search_engines,
        posts_per_page,
        states: StateCatalog::new(active, hidden),
        short_body_length_limit,
        blogger_display_name_method: display_method,
        author_edits_only: blog.author_edits_only.unwrap_or(false),
        include_comments,
        public_url,
    })
}

fn normalize_states(states: Option<Vec<String>>, fallback: &str) -> Vec<String> {
    match states {
        Some(states) => states
            .into_iter()
            .map(|state| state.trim().to_string())
            .filter(|state| !state.is_empty())
            .collect(),
        None => vec![fallback.to_string()],
    }
}

/// Relative joins need a trailing slash on the base path.
fn parse_base_url(value: &str) -> Result<Url, String> {
    let mut url = Url::parse(value).map_err(|err| format!("invalid url `{value}`: {err}"))?;
    if url.cannot_be_a_base() {
        return Err(format!("`{value}` cannot be used as a base url"));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBlogSettings {
    layout: Option<String>,
    title: Option<String>,
    description: Option<String>,
    include_admin_actions: Option<bool>,
    ping_search_engines: Option<RawPingSetting>,
    posts_per_page: Option<u32>,
    active_states: Option<Vec<String>>,
    hidden_states: Option<Vec<String>>,
    short_body_length_limit: Option<usize>,
    blogger_display_name_method: Option<String>,
    author_edits_only: Option<bool>,
    include_comments: Option<String>,
    public_url: Option<String>,
}

/// `false`, `true` or an explicit list of engine names.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum RawPingSetting {
    Flag(bool),
    Engines(Vec<String>),
}

impl RawPingSetting {
    fn into_policy(self) -> Result<PingPolicy, LoadError> {
        let names = match self {
            Self::Flag(true) => return Ok(PingPolicy::enabled_with_defaults()),
            Self::Flag(false) => return Ok(PingPolicy::Disabled),
            Self::Engines(names) => names,
        };

        // Env lists arrive as strings even for the boolean form.
        if let [single] = names.as_slice() {
            match single.trim().to_ascii_lowercase().as_str() {
                "true" => return Ok(PingPolicy::enabled_with_defaults()),
                "false" | "" => return Ok(PingPolicy::Disabled),
                _ => {}
            }
        }

        let mut engines = Vec::with_capacity(names.len());
        for name in names {
            let engine = SearchEngine::from_str(&name)
                .map_err(|reason| LoadError::invalid("blog.ping_search_engines", reason))?;
            if !engines.contains(&engine) {
                engines.push(engine);
            }
        }

        if engines.is_empty() {
            Ok(PingPolicy::Disabled)
        } else {
            Ok(PingPolicy::Engines(engines))
        }
    }
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
    }

    #[test]
    fn blog_defaults_match_documented_values() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");
        let blog = settings.blog;

        assert_eq!(blog.layout, "application");
        assert!(blog.include_admin_actions);
        assert_eq!(blog.ping_search_engines, PingPolicy::Disabled);
        assert_eq!(blog.posts_per_page, 5);
        assert_eq!(blog.states.active(), ["published".to_string()]);
        assert_eq!(blog.states.hidden(), ["draft".to_string()]);
        assert_eq!(blog.short_body_length_limit, 400);
        assert_eq!(blog.blogger_display_name_method, "username");
        assert!(!blog.author_edits_only);
        assert_eq!(blog.include_comments, CommentsMode::None);
        assert_eq!(blog.public_url.as_str(), "http://127.0.0.1:3000/");
    }

    #[test]
    fn ping_true_selects_default_engines() {
        let mut raw = RawSettings::default();
        raw.blog.ping_search_engines = Some(RawPingSetting::Flag(true));
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(
            settings.blog.ping_search_engines.engines(),
            [SearchEngine::Google, SearchEngine::Bing]
        );
    }

    #[test]
    fn ping_list_from_environment_string() {
        let policy = RawPingSetting::Engines(vec!["true".to_string()])
            .into_policy()
            .expect("policy");
        assert_eq!(policy, PingPolicy::enabled_with_defaults());

        let policy = RawPingSetting::Engines(vec!["bing".to_string(), "Bing".to_string()])
            .into_policy()
            .expect("policy");
        assert_eq!(policy, PingPolicy::Engines(vec![SearchEngine::Bing]));
    }

    #[test]
    fn unknown_ping_engine_is_rejected() {
        let err = RawPingSetting::Engines(vec!["altavista".to_string()])
            .into_policy()
            .expect_err("unknown engine");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "blog.ping_search_engines",
                ..
            }
        ));
    }

    #[test]
    fn overlapping_states_are_rejected() {
        let mut raw = RawSettings::default();
        raw.blog.active_states = Some(vec!["published".into()]);
        raw.blog.hidden_states = Some(vec!["published".into()]);
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn public_url_gains_trailing_slash() {
        let mut raw = RawSettings::default();
        raw.blog.public_url = Some("https://example.com/blog".to_string());
        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(
            settings.blog.feed_url().as_str(),
            "https://example.com/blog/posts.xml"
        );
    }

    #[test]
    fn zero_posts_per_page_is_invalid() {
        let mut raw = RawSettings::default();
        raw.blog.posts_per_page = Some(0);
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn unknown_comments_mode_is_invalid() {
        let mut raw = RawSettings::default();
        raw.blog.include_comments = Some("facebook".to_string());
        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ServeOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_from(["scriba"]);
        let command = args
            .command
            .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
        assert!(matches!(command, Command::Serve(_)));
    }

    #[test]
    fn parse_issue_token_arguments() {
        let args = CliArgs::parse_from([
            "scriba",
            "issue-token",
            "--database-url",
            "postgres://example",
            "--username",
            "ada",
            "--name",
            "Ada Lovelace",
        ]);

        match args.command.expect("issue-token command") {
            Command::IssueToken(issue) => {
                assert_eq!(
                    issue.database.database_url.as_deref(),
                    Some("postgres://example")
                );
                assert_eq!(issue.username, "ada");
                assert_eq!(issue.name.as_deref(), Some("Ada Lovelace"));
                assert!(issue.email.is_none());
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "scriba",
            "serve",
            "--server-host",
            "0.0.0.0",
            "--blog-include-admin-actions",
            "false",
        ]);

        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
                assert_eq!(serve.overrides.include_admin_actions, Some(false));
            }
            _ => panic!("wrong command parsed"),
        }
    }
}
