use std::path::PathBuf;
use std::time::Duration;

use crate::connection::{Keepalive, PONG_WAIT};

pub const DEFAULT_PORT: u16 = 4000;
pub const DEFAULT_STATIC_DIR: &str = "./web/dist";

/// 服务器配置，全部来自环境变量
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    // LOGLEVEL=debug 时输出调试日志
    pub debug: bool,
    pub static_dir: PathBuf,
    pub keepalive: Keepalive,
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("PORT").and_then(|p| p.parse().ok()).unwrap_or(DEFAULT_PORT);
        let debug = lookup("LOGLEVEL").is_some_and(|level| level.eq_ignore_ascii_case("debug"));
        let static_dir = lookup("STATIC_DIR")
            .filter(|dir| !dir.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
        let pong_wait = lookup("PONG_WAIT_SECS")
            .and_then(|secs| secs.parse::<u64>().ok())
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(PONG_WAIT);

        Config {
            port,
            debug,
            static_dir,
            keepalive: Keepalive::new(pong_wait),
        }
    }

    /// 默认的日志过滤规则，RUST_LOG 存在时以它为准
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Config {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config.port, 4000);
        assert!(!config.debug);
        assert_eq!(config.log_filter(), "info");
        assert_eq!(config.static_dir, PathBuf::from("./web/dist"));
        assert_eq!(config.keepalive, Keepalive::default());
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("PORT", "8081"),
            ("LOGLEVEL", "debug"),
            ("STATIC_DIR", "/srv/www"),
            ("PONG_WAIT_SECS", "20"),
        ]);
        assert_eq!(config.port, 8081);
        assert_eq!(config.log_filter(), "debug");
        assert_eq!(config.static_dir, PathBuf::from("/srv/www"));
        assert_eq!(config.keepalive.ping_period, Duration::from_secs(18));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[("PORT", "http"), ("PONG_WAIT_SECS", "0")]);
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.keepalive.pong_wait, PONG_WAIT);
    }
}
