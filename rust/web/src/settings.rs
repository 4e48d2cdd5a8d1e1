use serde::{Deserialize, Serialize};
use std::fs;
use std::time::Duration;
use thiserror::Error;

pub const CONFIG_PATH_ENV: &str = "FOURINROW_CONFIG";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// Gameplay timing and opponent selection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameSettings {
    pub matchmaking_timeout_ms: u64,
    pub grace_period_ms: u64,
    /// Pause before the automated opponent replies; zero is allowed.
    pub think_delay_ms: u64,
    pub retention_secs: u64,
    pub sweep_interval_secs: u64,
    pub opponent: String,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            matchmaking_timeout_ms: 10_000,
            grace_period_ms: 30_000,
            think_delay_ms: 500,
            retention_secs: 30 * 60,
            sweep_interval_secs: 60,
            opponent: "baseline".into(),
        }
    }
}

impl GameSettings {
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.matchmaking_timeout_ms == 0 {
            return Err(SettingsError::Invalid(
                "matchmaking_timeout_ms must be > 0".into(),
            ));
        }
        if self.grace_period_ms == 0 {
            return Err(SettingsError::Invalid("grace_period_ms must be > 0".into()));
        }
        if self.sweep_interval_secs == 0 {
            return Err(SettingsError::Invalid(
                "sweep_interval_secs must be > 0".into(),
            ));
        }
        if !fourinrow_ai::OPPONENTS.contains(&self.opponent.as_str()) {
            return Err(SettingsError::Invalid(format!(
                "unknown opponent `{}` (known: {})",
                self.opponent,
                fourinrow_ai::OPPONENTS.join(", ")
            )));
        }
        Ok(())
    }

    pub fn matchmaking_timeout(&self) -> Duration {
        Duration::from_millis(self.matchmaking_timeout_ms)
    }

    pub fn grace_period(&self) -> Duration {
        Duration::from_millis(self.grace_period_ms)
    }

    pub fn think_delay(&self) -> Duration {
        Duration::from_millis(self.think_delay_ms)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueSource {
    Default,
    File,
    Env,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SettingsSources {
    pub matchmaking_timeout_ms: ValueSource,
    pub grace_period_ms: ValueSource,
    pub think_delay_ms: ValueSource,
    pub retention_secs: ValueSource,
    pub sweep_interval_secs: ValueSource,
    pub opponent: ValueSource,
}

impl Default for SettingsSources {
    fn default() -> Self {
        Self {
            matchmaking_timeout_ms: ValueSource::Default,
            grace_period_ms: ValueSource::Default,
            think_delay_ms: ValueSource::Default,
            retention_secs: ValueSource::Default,
            sweep_interval_secs: ValueSource::Default,
            opponent: ValueSource::Default,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedSettings {
    pub settings: GameSettings,
    pub sources: SettingsSources,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    matchmaking_timeout_ms: Option<u64>,
    grace_period_ms: Option<u64>,
    think_delay_ms: Option<u64>,
    retention_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
    opponent: Option<String>,
}

/// Defaults, then the TOML file named by `FOURINROW_CONFIG`, then
/// `FOURINROW_*` environment variables.
pub fn load_with_sources() -> Result<ResolvedSettings, SettingsError> {
    resolve(|key| std::env::var(key).ok())
}

fn resolve<F>(lookup: F) -> Result<ResolvedSettings, SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut settings = GameSettings::default();
    let mut sources = SettingsSources::default();
    let env = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

    if let Some(path) = env(CONFIG_PATH_ENV) {
        let file: FileSettings = toml::from_str(&fs::read_to_string(path)?)?;

        macro_rules! from_file {
            ($field:ident) => {
                if let Some(value) = file.$field {
                    settings.$field = value;
                    sources.$field = ValueSource::File;
                }
            };
        }
        from_file!(matchmaking_timeout_ms);
        from_file!(grace_period_ms);
        from_file!(think_delay_ms);
        from_file!(retention_secs);
        from_file!(sweep_interval_secs);
        from_file!(opponent);
    }

    macro_rules! from_env {
        ($field:ident, $key:literal) => {
            if let Some(raw) = env($key) {
                settings.$field = raw.trim().parse().map_err(|_| {
                    SettingsError::Invalid(format!("{} must be a non-negative integer, got {raw:?}", $key))
                })?;
                sources.$field = ValueSource::Env;
            }
        };
    }
    from_env!(matchmaking_timeout_ms, "FOURINROW_MATCHMAKING_TIMEOUT_MS");
    from_env!(grace_period_ms, "FOURINROW_GRACE_PERIOD_MS");
    from_env!(think_delay_ms, "FOURINROW_THINK_DELAY_MS");
    from_env!(retention_secs, "FOURINROW_RETENTION_SECS");
    from_env!(sweep_interval_secs, "FOURINROW_SWEEP_INTERVAL_SECS");

    if let Some(opponent) = env("FOURINROW_OPPONENT") {
        settings.opponent = opponent.trim().to_string();
        sources.opponent = ValueSource::Env;
    }

    settings.validate()?;
    Ok(ResolvedSettings { settings, sources })
}
