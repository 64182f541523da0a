use std::time::Duration;

use crate::app_config::{AppConfig, Environment, InboundLimit, LlmConfig};
use crate::ConfigError;

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files. Use it in tests
/// or when the caller manages env setup.
///
/// # Errors
///
/// Returns `ConfigError` if values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// This is the core parsing/validation logic, decoupled from the actual environment
/// so it can be tested with a pure `HashMap` lookup without touching the process environment.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;
    use std::path::PathBuf;

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let invalid = |var: &str, reason: String| ConfigError::InvalidEnvVar {
        var: var.to_string(),
        reason,
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        or_default(var, default)
            .parse::<u32>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_u64 = |var: &str, default: &str| -> Result<u64, ConfigError> {
        or_default(var, default)
            .parse::<u64>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        or_default(var, default)
            .parse::<usize>()
            .map_err(|e| invalid(var, e.to_string()))
    };

    let parse_limit = |max_var: &str,
                       max_default: &str,
                       window_var: &str,
                       window_default: &str|
     -> Result<InboundLimit, ConfigError> {
        let max_requests = parse_usize(max_var, max_default)?;
        let window_secs = parse_u64(window_var, window_default)?;
        if window_secs == 0 {
            return Err(invalid(window_var, "window must be at least 1 second".into()));
        }
        Ok(InboundLimit {
            max_requests,
            window: Duration::from_secs(window_secs),
        })
    };

    let env = parse_environment(&or_default("TANKA_ENV", "development"))?;

    let bind_addr = or_default("TANKA_BIND_ADDR", "0.0.0.0:3000")
        .parse::<SocketAddr>()
        .map_err(|e| invalid("TANKA_BIND_ADDR", e.to_string()))?;
    let log_level = or_default("TANKA_LOG_LEVEL", "info");
    let categories_path = PathBuf::from(or_default(
        "TANKA_CATEGORIES_PATH",
        "./config/categories.yaml",
    ));
    let marketplace_base_url = or_default("TANKA_MARKETPLACE_BASE_URL", "https://www.amazon.co.jp");

    let scraper_timeout_secs = parse_u64("TANKA_SCRAPER_TIMEOUT_SECS", "30")?;
    if scraper_timeout_secs == 0 {
        return Err(invalid(
            "TANKA_SCRAPER_TIMEOUT_SECS",
            "navigation timeout must be finite and non-zero".into(),
        ));
    }
    let scraper_user_agent = or_default("TANKA_SCRAPER_USER_AGENT", DEFAULT_USER_AGENT);
    let scraper_min_interval_ms = parse_u64("TANKA_SCRAPER_MIN_INTERVAL_MS", "1000")?;
    let scraper_max_interval_ms = parse_u64("TANKA_SCRAPER_MAX_INTERVAL_MS", "3000")?;
    if scraper_min_interval_ms > scraper_max_interval_ms {
        return Err(invalid(
            "TANKA_SCRAPER_MIN_INTERVAL_MS",
            format!(
                "min interval {scraper_min_interval_ms}ms exceeds max interval {scraper_max_interval_ms}ms"
            ),
        ));
    }
    let scraper_hourly_cap = parse_usize("TANKA_SCRAPER_HOURLY_CAP", "120")?;
    if scraper_hourly_cap == 0 {
        return Err(invalid(
            "TANKA_SCRAPER_HOURLY_CAP",
            "hourly cap must be at least 1".into(),
        ));
    }
    let scraper_max_pages = parse_u32("TANKA_SCRAPER_MAX_PAGES", "1")?.max(1);
    let max_concurrent_categories = parse_usize("TANKA_MAX_CONCURRENT_CATEGORIES", "1")?.max(1);

    let inbound_read = parse_limit(
        "TANKA_INBOUND_READ_MAX",
        "120",
        "TANKA_INBOUND_READ_WINDOW_SECS",
        "60",
    )?;
    let inbound_refetch = parse_limit(
        "TANKA_INBOUND_REFETCH_MAX",
        "5",
        "TANKA_INBOUND_REFETCH_WINDOW_SECS",
        "60",
    )?;
    let inbound_rescrape = parse_limit(
        "TANKA_INBOUND_RESCRAPE_MAX",
        "1",
        "TANKA_INBOUND_RESCRAPE_WINDOW_SECS",
        "3600",
    )?;

    let llm = match lookup("TANKA_LLM_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let timeout_secs = parse_u64("TANKA_LLM_TIMEOUT_SECS", "20")?;
            if timeout_secs == 0 {
                return Err(invalid(
                    "TANKA_LLM_TIMEOUT_SECS",
                    "LLM timeout must be non-zero".into(),
                ));
            }
            Some(LlmConfig {
                url: url.trim_end_matches('/').to_string(),
                model: or_default("TANKA_LLM_MODEL", "gpt-4o-mini"),
                api_key: lookup("TANKA_LLM_API_KEY").ok().filter(|k| !k.is_empty()),
                timeout_secs,
            })
        }
        _ => None,
    };

    Ok(AppConfig {
        env,
        bind_addr,
        log_level,
        categories_path,
        marketplace_base_url,
        scraper_timeout_secs,
        scraper_user_agent,
        scraper_min_interval_ms,
        scraper_max_interval_ms,
        scraper_hourly_cap,
        scraper_max_pages,
        max_concurrent_categories,
        inbound_read,
        inbound_refetch,
        inbound_rescrape,
        llm,
    })
}

/// Parse a string into an `Environment` variant.
fn parse_environment(s: &str) -> Result<Environment, ConfigError> {
    match s {
        "development" => Ok(Environment::Development),
        "test" => Ok(Environment::Test),
        "production" => Ok(Environment::Production),
        other => Err(ConfigError::InvalidEnvVar {
            var: "TANKA_ENV".to_string(),
            reason: format!("unknown environment '{other}'"),
        }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
