//! Facet types for the driftwatch configuration.
//!
//! A run compares two MySQL databases: the *reference* (the source of truth,
//! usually the development database) and the *target* (the database checked
//! for completeness, usually production).
//!
//! Parameters arrive as named values supplied by the invoking CI platform, so
//! loading goes through a lookup function instead of a config file:
//!
//! ```ignore
//! let config = Config::from_lookup(|key| std::env::var(key).ok())?;
//! ```
//!
//! Every key is looked up as-is first, then with an `INPUT_` prefix (the way
//! GitHub Actions exposes `with:` inputs to a container action).

use facet::Facet;
use std::fmt;
use std::str::FromStr;

/// Port used when `<PREFIX>_PORT` is not given.
pub const DEFAULT_PORT: u16 = 3306;

/// Key prefix for the reference database.
pub const REFERENCE_PREFIX: &str = "DEV_DB";

/// Key prefix for the target database.
pub const TARGET_PREFIX: &str = "MAIN_DB";

/// Errors that can occur while loading configuration.
///
/// These are always detected before any connection attempt.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// A required parameter was not supplied (or was empty).
    #[error("missing required parameter `{key}`")]
    Missing { key: String },

    /// A parameter was supplied but could not be parsed.
    #[error("invalid value {value:?} for `{key}`: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },
}

/// Connection parameters for one database.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct DatabaseConfig {
    /// Hostname or IP address
    pub host: String,
    /// TCP port
    pub port: u16,
    /// Login user
    pub user: String,
    /// Login password (may be empty)
    pub password: String,
    /// Database (schema) to compare
    pub database: String,
    /// Whether TLS is required
    pub ssl: bool,
    /// PEM-encoded certificate authority to verify the server against
    pub ssl_ca: Option<String>,
}

impl DatabaseConfig {
    /// Read the parameters for one side, using `prefix` (e.g. `DEV_DB`).
    fn from_params<F>(params: &Params<F>, prefix: &str) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = |suffix: &str| format!("{prefix}_{suffix}");

        Ok(Self {
            host: params.required(&key("HOST"))?,
            port: params.parse_or(&key("PORT"), DEFAULT_PORT)?,
            user: params.required(&key("USER"))?,
            password: params
                .present(&key("PASSWORD"))
                .ok_or_else(|| ConfigError::Missing {
                    key: key("PASSWORD"),
                })?,
            database: params.required(&key("NAME"))?,
            ssl: params.flag(&key("SSL"), false)?,
            ssl_ca: params.get(&key("SSL_CA")),
        })
    }
}

/// Redacted form: `user@host:port/database`. The password is never shown.
impl fmt::Display for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}@{}:{}/{}",
            self.user, self.host, self.port, self.database
        )?;
        if self.ssl {
            write!(f, " (tls)")?;
        }
        Ok(())
    }
}

/// How the process exit code reflects a completed comparison.
#[derive(Facet, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[repr(u8)]
pub enum ExitPolicy {
    /// Exit 0 whenever the comparison completes; drift is reported via outputs only.
    #[default]
    Always,
    /// Exit 1 when drift is found.
    FailOnDrift,
}

impl ExitPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExitPolicy::Always => "always",
            ExitPolicy::FailOnDrift => "fail-on-drift",
        }
    }
}

impl FromStr for ExitPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "always" => Ok(ExitPolicy::Always),
            "fail-on-drift" | "fail_on_drift" => Ok(ExitPolicy::FailOnDrift),
            other => Err(format!(
                "expected `always` or `fail-on-drift`, got `{other}`"
            )),
        }
    }
}

impl fmt::Display for ExitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full configuration for one comparison run.
#[derive(Facet, Debug, Clone, PartialEq)]
pub struct Config {
    /// The source of truth
    pub reference: DatabaseConfig,
    /// The database checked for completeness
    pub target: DatabaseConfig,
    /// Exit code policy for completed comparisons
    pub exit_policy: ExitPolicy,
    /// Normalize known-equivalent type spellings before comparing
    pub normalize_types: bool,
}

impl Config {
    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let params = Params { lookup };

        Ok(Self {
            reference: DatabaseConfig::from_params(&params, REFERENCE_PREFIX)?,
            target: DatabaseConfig::from_params(&params, TARGET_PREFIX)?,
            exit_policy: params.parse_or("EXIT_POLICY", ExitPolicy::default())?,
            normalize_types: params.flag("NORMALIZE_TYPES", false)?,
        })
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

struct Params<F> {
    lookup: F,
}

impl<F> Params<F>
where
    F: Fn(&str) -> Option<String>,
{
    /// Raw value, empty strings included.
    fn present(&self, key: &str) -> Option<String> {
        (self.lookup)(key).or_else(|| (self.lookup)(&format!("INPUT_{key}")))
    }

    /// Non-empty value, falling back to the `INPUT_` form when the plain key is empty.
    fn get(&self, key: &str) -> Option<String> {
        let non_empty = |v: String| if v.trim().is_empty() { None } else { Some(v) };
        (self.lookup)(key)
            .and_then(non_empty)
            .or_else(|| (self.lookup)(&format!("INPUT_{key}")).and_then(non_empty))
    }

    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::Missing {
            key: key.to_string(),
        })
    }

    fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(value) => match value.trim().parse::<T>() {
                Ok(parsed) => Ok(parsed),
                Err(e) => Err(ConfigError::Invalid {
                    key: key.to_string(),
                    reason: e.to_string(),
                    value,
                }),
            },
        }
    }

    fn flag(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(value) => parse_flag(&value).ok_or_else(|| ConfigError::Invalid {
                key: key.to_string(),
                value,
                reason: "expected a boolean (true/false, yes/no, 1/0, on/off)".to_string(),
            }),
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}
