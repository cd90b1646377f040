use island_core::llm_client::CompletionSettings;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// Largest accepted `PACING_SCALE`.
pub const MAX_PACING_SCALE: f64 = 100.0;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub chat_model: String,
    pub chat_temperature: f32,
    pub chat_max_tokens: u32,
    pub request_timeout: Duration,
    pub credential_path: PathBuf,
    /// JSON response bank replacing the built-in lines.
    pub response_bank_path: Option<PathBuf>,
    /// Facilitator persona replacing the built-in prompt.
    pub system_prompt_path: Option<PathBuf>,
    /// Multiplies every simulated delay; `0` turns pacing off.
    pub pacing_scale: f64,
    pub log_level: Level,
}

/// Reads `name`, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = std::env::var(name).unwrap_or_else(|_| default.to_string());
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidValue(name.to_string(), format!("'{}': {}", raw, e)))
}

fn optional_path(name: &str) -> Option<PathBuf> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address: SocketAddr = parse_var("BIND_ADDRESS", "0.0.0.0:3000")?;

        let chat_model = std::env::var("CHAT_MODEL").unwrap_or_else(|_| "gpt-4o".to_string());
        if chat_model.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "CHAT_MODEL".to_string(),
                "model name is empty".to_string(),
            ));
        }

        let chat_temperature: f32 = parse_var("CHAT_TEMPERATURE", "0.7")?;
        if !(0.0..=2.0).contains(&chat_temperature) {
            return Err(ConfigError::InvalidValue(
                "CHAT_TEMPERATURE".to_string(),
                format!("{} is outside 0.0..=2.0", chat_temperature),
            ));
        }

        let chat_max_tokens: u32 = parse_var("CHAT_MAX_TOKENS", "150")?;
        if chat_max_tokens == 0 {
            return Err(ConfigError::InvalidValue(
                "CHAT_MAX_TOKENS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let timeout_secs: u64 = parse_var("REQUEST_TIMEOUT_SECS", "30")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "REQUEST_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        let credential_path = std::env::var("CREDENTIAL_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./.island/credential.json"));

        let pacing_scale: f64 = parse_var("PACING_SCALE", "1.0")?;
        if !(0.0..=MAX_PACING_SCALE).contains(&pacing_scale) {
            return Err(ConfigError::InvalidValue(
                "PACING_SCALE".to_string(),
                format!("{} is outside 0.0..={}", pacing_scale, MAX_PACING_SCALE),
            ));
        }

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        Ok(Self {
            bind_address,
            chat_model,
            chat_temperature,
            chat_max_tokens,
            request_timeout: Duration::from_secs(timeout_secs),
            credential_path,
            response_bank_path: optional_path("RESPONSE_BANK_PATH"),
            system_prompt_path: optional_path("SYSTEM_PROMPT_PATH"),
            pacing_scale,
            log_level,
        })
    }

    /// Completion request parameters for this deployment.
    pub fn completion_settings(&self, system_prompt: String) -> CompletionSettings {
        CompletionSettings {
            model: self.chat_model.clone(),
            temperature: self.chat_temperature,
            max_tokens: self.chat_max_tokens,
            timeout: self.request_timeout,
            system_prompt,
        }
    }
}

#[cfg(test)]
impl Config {
    /// Defaults without touching the process environment.
    pub(crate) fn for_tests() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 0)),
            chat_model: "gpt-4o".to_string(),
            chat_temperature: 0.7,
            chat_max_tokens: 150,
            request_timeout: Duration::from_secs(30),
            credential_path: PathBuf::from("./.island/credential.json"),
            response_bank_path: None,
            system_prompt_path: None,
            pacing_scale: 0.0,
            log_level: Level::INFO,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("CHAT_MODEL");
            env::remove_var("CHAT_TEMPERATURE");
            env::remove_var("CHAT_MAX_TOKENS");
            env::remove_var("REQUEST_TIMEOUT_SECS");
            env::remove_var("CREDENTIAL_PATH");
            env::remove_var("RESPONSE_BANK_PATH");
            env::remove_var("SYSTEM_PROMPT_PATH");
            env::remove_var("PACING_SCALE");
            env::remove_var("RUST_LOG");
        }
    }

    fn expect_invalid(var: &str) {
        let ConfigError::InvalidValue(name, _) = Config::from_env().unwrap_err();
        assert_eq!(name, var);
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.chat_model, "gpt-4o");
        assert_eq!(config.chat_temperature, 0.7);
        assert_eq!(config.chat_max_tokens, 150);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert_eq!(
            config.credential_path,
            PathBuf::from("./.island/credential.json")
        );
        assert_eq!(config.response_bank_path, None);
        assert_eq!(config.system_prompt_path, None);
        assert_eq!(config.pacing_scale, 1.0);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("CHAT_MODEL", "gemini-1.5-flash");
            env::set_var("CHAT_TEMPERATURE", "1.2");
            env::set_var("CHAT_MAX_TOKENS", "300");
            env::set_var("REQUEST_TIMEOUT_SECS", "5");
            env::set_var("CREDENTIAL_PATH", "/var/lib/island/credential.json");
            env::set_var("RESPONSE_BANK_PATH", "/etc/island/bank.json");
            env::set_var("SYSTEM_PROMPT_PATH", "/etc/island/persona.md");
            env::set_var("PACING_SCALE", "0");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.chat_model, "gemini-1.5-flash");
        assert_eq!(config.chat_temperature, 1.2);
        assert_eq!(config.chat_max_tokens, 300);
        assert_eq!(config.request_timeout, Duration::from_secs(5));
        assert_eq!(
            config.credential_path,
            PathBuf::from("/var/lib/island/credential.json")
        );
        assert_eq!(
            config.response_bank_path,
            Some(PathBuf::from("/etc/island/bank.json"))
        );
        assert_eq!(
            config.system_prompt_path,
            Some(PathBuf::from("/etc/island/persona.md"))
        );
        assert_eq!(config.pacing_scale, 0.0);
        assert_eq!(config.log_level, Level::DEBUG);

        let settings = config.completion_settings("persona".to_string());
        assert_eq!(settings.model, "gemini-1.5-flash");
        assert_eq!(settings.max_tokens, 300);
        assert_eq!(settings.timeout, Duration::from_secs(5));
        assert_eq!(settings.system_prompt, "persona");
    }

    #[test]
    #[serial]
    fn test_config_empty_optional_paths_are_unset() {
        clear_env_vars();
        unsafe {
            env::set_var("RESPONSE_BANK_PATH", "");
            env::set_var("SYSTEM_PROMPT_PATH", "  ");
        }

        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.response_bank_path, None);
        assert_eq!(config.system_prompt_path, None);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
        }
        expect_invalid("BIND_ADDRESS");
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("RUST_LOG", "not-a-level");
        }
        expect_invalid("RUST_LOG");
    }

    #[test]
    #[serial]
    fn test_config_temperature_out_of_range() {
        clear_env_vars();
        unsafe {
            env::set_var("CHAT_TEMPERATURE", "3.5");
        }
        expect_invalid("CHAT_TEMPERATURE");
    }

    #[test]
    #[serial]
    fn test_config_zero_max_tokens() {
        clear_env_vars();
        unsafe {
            env::set_var("CHAT_MAX_TOKENS", "0");
        }
        expect_invalid("CHAT_MAX_TOKENS");
    }

    #[test]
    #[serial]
    fn test_config_zero_timeout() {
        clear_env_vars();
        unsafe {
            env::set_var("REQUEST_TIMEOUT_SECS", "0");
        }
        expect_invalid("REQUEST_TIMEOUT_SECS");
    }

    #[test]
    #[serial]
    fn test_config_negative_pacing_scale() {
        clear_env_vars();
        unsafe {
            env::set_var("PACING_SCALE", "-1");
        }
        expect_invalid("PACING_SCALE");
    }

    #[test]
    #[serial]
    fn test_config_huge_pacing_scale() {
        clear_env_vars();
        unsafe {
            env::set_var("PACING_SCALE", "1e300");
        }
        expect_invalid("PACING_SCALE");

        unsafe {
            env::set_var("PACING_SCALE", "100");
        }
        let config = Config::from_env().expect("Config should load successfully");
        assert_eq!(config.pacing_scale, MAX_PACING_SCALE);
    }

    #[test]
    #[serial]
    fn test_config_non_numeric_pacing_scale() {
        clear_env_vars();
        unsafe {
            env::set_var("PACING_SCALE", "fast");
        }
        expect_invalid("PACING_SCALE");
    }
}
