use std::{env, path::PathBuf, time::Duration};

use scriptex_core::{DEFAULT_CLEANUP_INTERVAL, DEFAULT_CONFIG_FILE};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone)]
pub struct Config {
    pub scripts_dir: PathBuf,
    pub config_file: Option<PathBuf>,
    pub log_level: String,
    pub log_format: LogFormat,
    pub cleanup_interval: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scripts_dir: PathBuf::from("scripts"),
            config_file: None,
            log_level: "warn,scriptex::script=info".to_string(),
            log_format: LogFormat::Text,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(dir) = lookup("SCRIPTEX_DIR") {
            config.scripts_dir = PathBuf::from(dir);
        }

        if let Some(file) = lookup("SCRIPTEX_CONFIG") {
            config.config_file = Some(PathBuf::from(file));
        }

        if let Some(log_level) = lookup("RUST_LOG") {
            config.log_level = log_level;
        } else if let Some(log_level) = lookup("SCRIPTEX_LOG_LEVEL") {
            config.log_level = log_level;
        }

        if let Some(log_format) = lookup("SCRIPTEX_LOG_FORMAT") {
            config.log_format = match log_format.to_lowercase().as_str() {
                "text" | "plain" => LogFormat::Text,
                "json" => LogFormat::Json,
                _ => {
                    eprintln!(
                        "Warning: Invalid SCRIPTEX_LOG_FORMAT value '{}', using default text",
                        log_format
                    );
                    LogFormat::Text
                }
            };
        }

        if let Some(interval) = lookup("SCRIPTEX_CLEANUP_INTERVAL") {
            match interval.parse::<u64>() {
                Ok(seconds) if seconds > 0 => config.cleanup_interval = Duration::from_secs(seconds),
                _ => eprintln!(
                    "Warning: Invalid SCRIPTEX_CLEANUP_INTERVAL value '{}', using default {}s",
                    interval,
                    DEFAULT_CLEANUP_INTERVAL.as_secs()
                ),
            }
        }

        config
    }

    /// The script configuration file, `scripts.yml` in the scripts directory
    /// unless set explicitly.
    pub fn config_path(&self) -> PathBuf {
        self.config_file
            .clone()
            .unwrap_or_else(|| self.scripts_dir.join(DEFAULT_CONFIG_FILE))
    }
}

/// Logs go to stderr so evaluation results alone reach stdout.
pub fn init_tracing(config: &Config) {
    let env_filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("warn"));

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rstest::rstest;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<HashMap<_, _>>();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[]));
        assert_eq!(config.scripts_dir, PathBuf::from("scripts"));
        assert_eq!(config.config_path(), PathBuf::from("scripts").join("scripts.yml"));
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.cleanup_interval, DEFAULT_CLEANUP_INTERVAL);
    }

    #[test]
    fn test_from_lookup() {
        let config = Config::from_lookup(lookup(&[
            ("SCRIPTEX_DIR", "/srv/scripts"),
            ("SCRIPTEX_CONFIG", "/etc/scriptex.yml"),
            ("SCRIPTEX_LOG_LEVEL", "debug"),
        ]));

        assert_eq!(config.scripts_dir, PathBuf::from("/srv/scripts"));
        assert_eq!(config.config_path(), PathBuf::from("/etc/scriptex.yml"));
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_rust_log_wins() {
        let config = Config::from_lookup(lookup(&[("RUST_LOG", "trace"), ("SCRIPTEX_LOG_LEVEL", "debug")]));
        assert_eq!(config.log_level, "trace");
    }

    #[rstest]
    #[case::seconds("5", Duration::from_secs(5))]
    #[case::zero("0", DEFAULT_CLEANUP_INTERVAL)]
    #[case::invalid("soon", DEFAULT_CLEANUP_INTERVAL)]
    fn test_cleanup_interval(#[case] value: &str, #[case] expected: Duration) {
        let config = Config::from_lookup(lookup(&[("SCRIPTEX_CLEANUP_INTERVAL", value)]));
        assert_eq!(config.cleanup_interval, expected);
    }

    #[rstest]
    #[case::text("text", LogFormat::Text)]
    #[case::plain("PLAIN", LogFormat::Text)]
    #[case::json("json", LogFormat::Json)]
    #[case::invalid("xml", LogFormat::Text)]
    fn test_log_format(#[case] value: &str, #[case] expected: LogFormat) {
        let config = Config::from_lookup(lookup(&[("SCRIPTEX_LOG_FORMAT", value)]));
        assert_eq!(config.log_format, expected);
    }
}
