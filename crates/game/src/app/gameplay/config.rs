use std::env;
use std::time::Duration;

use tracing::warn;

pub(crate) const GENERATOR_URL_ENV_VAR: &str = "ZEDLA_GENERATOR_URL";
pub(crate) const GENERATOR_MODEL_ENV_VAR: &str = "ZEDLA_GENERATOR_MODEL";
pub(crate) const GENERATOR_TIMEOUT_ENV_VAR: &str = "ZEDLA_GENERATOR_TIMEOUT_SECS";

const DEFAULT_GENERATOR_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_GENERATOR_MODEL: &str = "llama3.2";
const DEFAULT_GENERATOR_TIMEOUT_SECS: u64 = 20;
/// Grace period on top of the HTTP timeout before the session gives up.
const REPLY_TIMEOUT_MARGIN: Duration = Duration::from_secs(2);

/// World tuning in pixels and per-tick units; every value is applied once
/// per fixed tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct WorldSettings {
    pub(crate) screen_width: f32,
    pub(crate) screen_height: f32,
    pub(crate) ground_offset: f32,
    pub(crate) gravity: f32,
    pub(crate) jump_impulse: f32,
    pub(crate) player_speed: f32,
    pub(crate) enemy_speed: f32,
    pub(crate) patrol_range: f32,
    pub(crate) animation_speed: f32,
    pub(crate) prompt_range: f32,
    pub(crate) chat_range: f32,
    pub(crate) player_spawn_center_x: f32,
    pub(crate) enemy_spawn_center_x: f32,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            screen_width: 1000.0,
            screen_height: 850.0,
            ground_offset: 40.0,
            gravity: 0.8,
            jump_impulse: -18.0,
            player_speed: 7.0,
            enemy_speed: 2.0,
            patrol_range: 300.0,
            animation_speed: 0.15,
            prompt_range: 220.0,
            chat_range: 200.0,
            player_spawn_center_x: 200.0,
            enemy_spawn_center_x: 600.0,
        }
    }
}

impl WorldSettings {
    pub(crate) fn ground_y(&self) -> f32 {
        self.screen_height - self.ground_offset
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct GeneratorConfig {
    pub(crate) base_url: String,
    pub(crate) model: String,
    pub(crate) request_timeout: Duration,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GENERATOR_URL.to_string(),
            model: DEFAULT_GENERATOR_MODEL.to_string(),
            request_timeout: Duration::from_secs(DEFAULT_GENERATOR_TIMEOUT_SECS),
        }
    }
}

impl GeneratorConfig {
    pub(crate) fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from a key lookup. Blank or unparsable values are
    /// logged and replaced by defaults.
    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let base_url = non_blank(lookup(GENERATOR_URL_ENV_VAR), GENERATOR_URL_ENV_VAR)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);
        let model = non_blank(lookup(GENERATOR_MODEL_ENV_VAR), GENERATOR_MODEL_ENV_VAR)
            .unwrap_or(defaults.model);
        let request_timeout = match non_blank(
            lookup(GENERATOR_TIMEOUT_ENV_VAR),
            GENERATOR_TIMEOUT_ENV_VAR,
        ) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(
                        env_var = GENERATOR_TIMEOUT_ENV_VAR,
                        value = raw.as_str(),
                        "invalid generator timeout; falling back to default"
                    );
                    defaults.request_timeout
                }
            },
            None => defaults.request_timeout,
        };
        Self {
            base_url,
            model,
            request_timeout,
        }
    }

    pub(crate) fn reply_timeout(&self) -> Duration {
        self.request_timeout.saturating_add(REPLY_TIMEOUT_MARGIN)
    }
}

fn non_blank(value: Option<String>, env_var: &'static str) -> Option<String> {
    let value = value?;
    let trimmed = value.trim();
    if trimmed.is_empty() {
        warn!(env_var, "blank env var value; falling back to default");
        return None;
    }
    Some(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn ground_line_sits_above_screen_bottom() {
        assert_eq!(WorldSettings::default().ground_y(), 810.0);
    }

    #[test]
    fn prompt_range_exceeds_chat_range() {
        let settings = WorldSettings::default();
        assert!(settings.prompt_range > settings.chat_range);
    }

    #[test]
    fn missing_env_uses_defaults() {
        let config = GeneratorConfig::from_lookup(lookup_from(&[]));
        assert_eq!(config, GeneratorConfig::default());
        assert_eq!(config.reply_timeout(), Duration::from_secs(22));
    }

    #[test]
    fn env_values_override_defaults() {
        let config = GeneratorConfig::from_lookup(lookup_from(&[
            (GENERATOR_URL_ENV_VAR, "http://gpu-box:11434/"),
            (GENERATOR_MODEL_ENV_VAR, "mistral"),
            (GENERATOR_TIMEOUT_ENV_VAR, "5"),
        ]));

        assert_eq!(config.base_url, "http://gpu-box:11434");
        assert_eq!(config.model, "mistral");
        assert_eq!(config.request_timeout, Duration::from_secs(5));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = GeneratorConfig::from_lookup(lookup_from(&[
            (GENERATOR_MODEL_ENV_VAR, "   "),
            (GENERATOR_TIMEOUT_ENV_VAR, "soon"),
        ]));

        assert_eq!(config.model, DEFAULT_GENERATOR_MODEL);
        assert_eq!(
            config.request_timeout,
            Duration::from_secs(DEFAULT_GENERATOR_TIMEOUT_SECS)
        );
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let config =
            GeneratorConfig::from_lookup(lookup_from(&[(GENERATOR_TIMEOUT_ENV_VAR, "0")]));
        assert_eq!(
            config.request_timeout,
            Duration::from_secs(DEFAULT_GENERATOR_TIMEOUT_SECS)
        );
    }
}
