use std::{collections::HashMap, fs};

use storage::DEFAULT_SESSION_TTL_SECONDS;
use tracing::warn;
use wizard::GatingPolicy;

#[derive(Debug, Clone)]
pub struct Settings {
    pub server_bind: String,
    pub database_url: String,
    pub session_ttl_seconds: i64,
    pub session_cookie: String,
    pub gating_redirect: GatingPolicy,
    pub seed_catalog: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_bind: "127.0.0.1:8080".into(),
            database_url: "sqlite://./data/workshop.db".into(),
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            session_cookie: "WIZARD_SESSION".into(),
            gating_redirect: GatingPolicy::default(),
            seed_catalog: true,
        }
    }
}

pub fn load_settings() -> Settings {
    let file = fs::read_to_string("server.toml").ok();
    settings_from_sources(file.as_deref(), |key| std::env::var(key).ok())
}

/// Defaults, then the flat `server.toml` table, then environment variables.
pub fn settings_from_sources(
    file: Option<&str>,
    env: impl Fn(&str) -> Option<String>,
) -> Settings {
    let mut settings = Settings::default();

    if let Some(raw) = file {
        match toml::from_str::<HashMap<String, String>>(raw) {
            Ok(file_cfg) => {
                apply(&mut settings, "bind_addr", file_cfg.get("bind_addr").cloned());
                apply(&mut settings, "database_url", file_cfg.get("database_url").cloned());
                apply(
                    &mut settings,
                    "session_ttl_seconds",
                    file_cfg.get("session_ttl_seconds").cloned(),
                );
                apply(&mut settings, "session_cookie", file_cfg.get("session_cookie").cloned());
                apply(
                    &mut settings,
                    "gating_redirect",
                    file_cfg.get("gating_redirect").cloned(),
                );
                apply(&mut settings, "seed_catalog", file_cfg.get("seed_catalog").cloned());
            }
            Err(error) => warn!(%error, "ignoring unreadable server.toml"),
        }
    }

    apply(&mut settings, "bind_addr", env("SERVER_BIND"));
    apply(&mut settings, "bind_addr", env("APP__BIND_ADDR"));
    apply(&mut settings, "database_url", env("DATABASE_URL"));
    apply(&mut settings, "database_url", env("APP__DATABASE_URL"));
    apply(
        &mut settings,
        "session_ttl_seconds",
        env("APP__SESSION_TTL_SECONDS"),
    );
    apply(&mut settings, "session_cookie", env("APP__SESSION_COOKIE"));
    apply(&mut settings, "gating_redirect", env("APP__GATING_REDIRECT"));
    apply(&mut settings, "seed_catalog", env("APP__SEED_CATALOG"));

    settings.database_url = normalize_database_url(&settings.database_url);
    settings
}

fn apply(settings: &mut Settings, key: &str, value: Option<String>) {
    let Some(value) = value else {
        return;
    };
    match key {
        "bind_addr" => settings.server_bind = value,
        "database_url" => settings.database_url = value,
        "session_cookie" if !value.trim().is_empty() => settings.session_cookie = value,
        "session_ttl_seconds" => match value.trim().parse::<i64>() {
            Ok(parsed) if parsed > 0 => settings.session_ttl_seconds = parsed,
            _ => warn!(%value, "ignoring invalid session_ttl_seconds"),
        },
        "gating_redirect" => match value.parse::<GatingPolicy>() {
            Ok(policy) => settings.gating_redirect = policy,
            Err(error) => warn!(%error, "ignoring invalid gating_redirect"),
        },
        "seed_catalog" => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" => settings.seed_catalog = true,
            "0" | "false" | "no" => settings.seed_catalog = false,
            _ => warn!(%value, "ignoring invalid seed_catalog"),
        },
        _ => {}
    }
}

fn normalize_database_url(raw_database_url: &str) -> String {
    let raw_database_url = raw_database_url.trim();

    if raw_database_url.is_empty() {
        return Settings::default().database_url;
    }

    if raw_database_url.starts_with("sqlite:") || raw_database_url.contains("://") {
        return raw_database_url.to_string();
    }

    format!("sqlite://{}", raw_database_url.replace('\\', "/"))
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
