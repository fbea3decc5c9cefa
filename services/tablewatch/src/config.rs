use crate::watch::WatchPolicy;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_BIND: &str = "0.0.0.0:8080";
pub const DEFAULT_METRICS_BIND: &str = "0.0.0.0:9090";
pub const DEFAULT_SETTINGS_PATH: &str = "./config.json";
pub const DEFAULT_HTTP_TIMEOUT_MS: u64 = 30_000;

// Service configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub settings_path: PathBuf,
    pub lark_base_url: Option<String>,
    pub ai_base_url: Option<String>,
    pub http_timeout: Duration,
    pub watch: WatchPolicy,
}

#[derive(Debug, Deserialize)]
struct ServiceConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    settings_path: Option<String>,
    lark_base_url: Option<String>,
    ai_base_url: Option<String>,
    http_timeout_ms: Option<u64>,
    watch: Option<WatchPolicyOverride>,
}

#[derive(Debug, Deserialize)]
struct WatchPolicyOverride {
    initial_delay_ms: Option<u64>,
    base_interval_ms: Option<u64>,
    max_interval_ms: Option<u64>,
    cap_exponent: Option<u32>,
    max_attempts: Option<u32>,
}

impl ServiceConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("TABLEWATCH_BIND")
            .unwrap_or_else(|_| DEFAULT_BIND.to_string())
            .parse()
            .with_context(|| "parse TABLEWATCH_BIND")?;
        let metrics_bind = std::env::var("TABLEWATCH_METRICS_BIND")
            .unwrap_or_else(|_| DEFAULT_METRICS_BIND.to_string())
            .parse()
            .with_context(|| "parse TABLEWATCH_METRICS_BIND")?;
        let settings_path = std::env::var("TABLEWATCH_SETTINGS_PATH")
            .unwrap_or_else(|_| DEFAULT_SETTINGS_PATH.to_string())
            .into();
        let http_timeout_ms = match std::env::var("TABLEWATCH_HTTP_TIMEOUT_MS") {
            Ok(value) => value
                .parse()
                .with_context(|| "parse TABLEWATCH_HTTP_TIMEOUT_MS")?,
            Err(_) => DEFAULT_HTTP_TIMEOUT_MS,
        };
        Ok(Self {
            bind_addr,
            metrics_bind,
            settings_path,
            lark_base_url: non_empty_env("TABLEWATCH_LARK_BASE_URL"),
            ai_base_url: non_empty_env("TABLEWATCH_AI_BASE_URL"),
            http_timeout: Duration::from_millis(http_timeout_ms),
            watch: WatchPolicy::default(),
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("TABLEWATCH_CONFIG") {
            let contents = fs::read_to_string(&path)
                .with_context(|| format!("read TABLEWATCH_CONFIG: {path}"))?;
            config.apply_yaml(&contents)?;
        }
        Ok(config)
    }

    fn apply_yaml(&mut self, contents: &str) -> Result<()> {
        let override_cfg: ServiceConfigOverride =
            serde_yaml::from_str(contents).with_context(|| "parse tablewatch config yaml")?;
        if let Some(value) = override_cfg.bind_addr {
            self.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
        }
        if let Some(value) = override_cfg.metrics_bind {
            self.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
        }
        if let Some(value) = override_cfg.settings_path {
            self.settings_path = value.into();
        }
        if let Some(value) = override_cfg.lark_base_url {
            self.lark_base_url = Some(value);
        }
        if let Some(value) = override_cfg.ai_base_url {
            self.ai_base_url = Some(value);
        }
        if let Some(value) = override_cfg.http_timeout_ms {
            self.http_timeout = Duration::from_millis(value);
        }
        if let Some(watch) = override_cfg.watch {
            if let Some(value) = watch.initial_delay_ms {
                self.watch.initial_delay = Duration::from_millis(value);
            }
            if let Some(value) = watch.base_interval_ms {
                self.watch.base_interval = Duration::from_millis(value);
            }
            if let Some(value) = watch.max_interval_ms {
                self.watch.max_interval = Duration::from_millis(value);
            }
            if let Some(value) = watch.cap_exponent {
                self.watch.cap_exponent = value;
            }
            if let Some(value) = watch.max_attempts {
                anyhow::ensure!(value > 0, "watch.max_attempts must be at least 1");
                self.watch.max_attempts = value;
            }
        }
        Ok(())
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::set_var(key, value);
            }
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::remove_var(key);
            }
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(value) => unsafe {
                    std::env::set_var(self.key, value);
                },
                None => unsafe {
                    std::env::remove_var(self.key);
                },
            }
        }
    }

    #[test]
    #[serial]
    fn defaults_apply_without_env() {
        let _g1 = EnvGuard::unset("TABLEWATCH_BIND");
        let _g2 = EnvGuard::unset("TABLEWATCH_METRICS_BIND");
        let _g3 = EnvGuard::unset("TABLEWATCH_SETTINGS_PATH");
        let _g4 = EnvGuard::unset("TABLEWATCH_LARK_BASE_URL");
        let _g5 = EnvGuard::unset("TABLEWATCH_HTTP_TIMEOUT_MS");
        let _g6 = EnvGuard::unset("TABLEWATCH_CONFIG");

        let config = ServiceConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.bind_addr, DEFAULT_BIND.parse().expect("bind"));
        assert_eq!(config.metrics_bind, DEFAULT_METRICS_BIND.parse().expect("metrics"));
        assert_eq!(config.settings_path, PathBuf::from(DEFAULT_SETTINGS_PATH));
        assert_eq!(config.lark_base_url, None);
        assert_eq!(config.http_timeout, Duration::from_secs(30));
        assert_eq!(config.watch, WatchPolicy::default());
    }

    #[test]
    #[serial]
    fn env_values_are_parsed() {
        let _g1 = EnvGuard::set("TABLEWATCH_BIND", "127.0.0.1:18080");
        let _g2 = EnvGuard::set("TABLEWATCH_LARK_BASE_URL", "http://lark.local");
        let _g3 = EnvGuard::set("TABLEWATCH_HTTP_TIMEOUT_MS", "1500");
        let _g4 = EnvGuard::unset("TABLEWATCH_CONFIG");

        let config = ServiceConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.bind_addr.port(), 18080);
        assert_eq!(config.lark_base_url.as_deref(), Some("http://lark.local"));
        assert_eq!(config.http_timeout, Duration::from_millis(1500));
    }

    #[test]
    #[serial]
    fn invalid_bind_is_rejected() {
        let _g1 = EnvGuard::set("TABLEWATCH_BIND", "not-an-addr");
        let err = ServiceConfig::from_env().expect_err("bad bind");
        assert!(err.to_string().contains("TABLEWATCH_BIND"));
    }

    #[test]
    #[serial]
    fn yaml_overrides_env_and_watch_policy() {
        let _g1 = EnvGuard::unset("TABLEWATCH_BIND");
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("tablewatch.yaml");
        std::fs::write(
            &path,
            "bind_addr: 127.0.0.1:18081\nsettings_path: /tmp/tw.json\nwatch:\n  initial_delay_ms: 500\n  max_attempts: 3\n",
        )
        .expect("write");
        let _g2 = EnvGuard::set("TABLEWATCH_CONFIG", path.to_str().expect("path"));

        let config = ServiceConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.bind_addr.port(), 18081);
        assert_eq!(config.settings_path, PathBuf::from("/tmp/tw.json"));
        assert_eq!(config.watch.initial_delay, Duration::from_millis(500));
        assert_eq!(config.watch.max_attempts, 3);
        assert_eq!(config.watch.base_interval, WatchPolicy::default().base_interval);
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let mut config = ServiceConfig {
            bind_addr: DEFAULT_BIND.parse().expect("bind"),
            metrics_bind: DEFAULT_METRICS_BIND.parse().expect("metrics"),
            settings_path: DEFAULT_SETTINGS_PATH.into(),
            lark_base_url: None,
            ai_base_url: None,
            http_timeout: Duration::from_secs(1),
            watch: WatchPolicy::default(),
        };
        assert!(config.apply_yaml("watch:\n  max_attempts: 0\n").is_err());
    }
}
