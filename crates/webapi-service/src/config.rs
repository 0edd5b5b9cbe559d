//! WebApi service configuration.
//!
//! Settings come from a JSON file (`appsettings.json` by default) overlaid
//! with environment variables. Nested JSON sections are flattened into
//! `Section:Key` names and environment variables use `__` in place of `:`
//! (`Auth0__Domain` overrides `{"Auth0": {"Domain": ...}}`). Names are
//! case-insensitive, and an environment variable always replaces the file
//! value of the same name.
//!
//! The identity provider settings are validated eagerly: a missing value or
//! an unparseable signing certificate fails startup.

use crate::auth::certificate::{CertificateError, SigningCertificate};
use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use common::secret::SecretString;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const AUTH0_DOMAIN: &str = "Auth0:Domain";
pub const AUTH0_CLIENT_ID: &str = "Auth0:ClientId";
pub const AUTH0_CLIENT_SECRET: &str = "Auth0:ClientSecret";
pub const AUTH0_SIGNING_CERTIFICATE: &str = "Auth0:SigningCertificate";
pub const BIND_ADDRESS: &str = "BindAddress";
pub const JWT_CLOCK_SKEW_SECONDS: &str = "Jwt:ClockSkewSeconds";
pub const LOG_LEVEL_DEFAULT: &str = "Logging:LogLevel:Default";
pub const STATIC_FILES_ROOT: &str = "StaticFiles:Root";
pub const REQUEST_TIMEOUT_SECONDS: &str = "RequestTimeoutSeconds";

/// Settings file read by [`Config::from_env`] unless `APPSETTINGS_PATH` is set.
pub const DEFAULT_SETTINGS_FILE: &str = "appsettings.json";

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:5000";

/// Default log filter when neither `RUST_LOG` nor the settings file set one.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Identity provider settings.
///
/// Immutable for the lifetime of the process.
#[derive(Clone)]
pub struct Auth0Settings {
    /// Tenant domain, e.g. `tenant.eu.auth0.com`.
    pub domain: String,

    /// Application client id; the expected token audience.
    pub client_id: String,

    /// Application client secret. Not used for verification.
    pub client_secret: SecretString,

    /// Signing certificate as configured (base64 DER, base64 PEM or PEM).
    pub signing_certificate: String,
}

impl fmt::Debug for Auth0Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth0Settings")
            .field("domain", &self.domain)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("signing_certificate", &"[REDACTED]")
            .finish()
    }
}

impl Auth0Settings {
    /// Token authority and expected issuer: `https://{domain}`.
    pub fn authority(&self) -> String {
        format!("https://{}", self.domain)
    }

    /// Expected token audience.
    pub fn audience(&self) -> &str {
        &self.client_id
    }
}

/// WebApi service configuration.
#[derive(Clone)]
pub struct Config {
    /// Identity provider settings.
    pub auth0: Auth0Settings,

    /// Parsed signing certificate (validated at load time).
    pub signing_certificate: SigningCertificate,

    /// Server bind address (default: "0.0.0.0:5000").
    pub bind_address: String,

    /// JWT clock skew tolerance in seconds.
    pub jwt_clock_skew_seconds: i64,

    /// Default tracing filter directive.
    pub log_filter: String,

    /// Directory served for unmatched routes, if any.
    pub static_files_dir: Option<PathBuf>,

    /// Per-request timeout in seconds.
    pub request_timeout_seconds: u64,
}

/// Custom Debug implementation that redacts sensitive fields.
impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("auth0", &self.auth0)
            .field("signing_certificate", &self.signing_certificate)
            .field("bind_address", &self.bind_address)
            .field("jwt_clock_skew_seconds", &self.jwt_clock_skew_seconds)
            .field("log_filter", &self.log_filter)
            .field("static_files_dir", &self.static_files_dir)
            .field("request_timeout_seconds", &self.request_timeout_seconds)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    MissingSetting(String),

    #[error("Failed to read settings file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid settings file: {0}")]
    InvalidJson(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid request timeout configuration: {0}")]
    InvalidRequestTimeout(String),

    #[error("Invalid signing certificate: {0}")]
    InvalidCertificate(#[from] CertificateError),
}

impl Config {
    /// Load configuration from the settings file and environment.
    ///
    /// The file path is `APPSETTINGS_PATH` if set, else `appsettings.json`.
    pub fn from_env() -> Result<Self, ConfigError> {
        let path = env::var("APPSETTINGS_PATH").unwrap_or_else(|_| DEFAULT_SETTINGS_FILE.to_string());
        Self::load(path)
    }

    /// Load configuration from `path` overlaid with environment variables.
    ///
    /// A missing file is not an error; every required value may come from
    /// the environment instead.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let file_vars = match std::fs::read_to_string(path) {
            Ok(text) => flatten_json(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(target: "webapi.config", path = %path.display(), "Settings file not found");
                HashMap::new()
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        Self::from_vars(&overlay_environment(file_vars, env::vars()))
    }

    /// Load configuration from a flattened `Section:Key` map (for testing).
    ///
    /// Keys that differ only in case resolve as in [`fold_keys`].
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let vars = fold_keys(vars.iter().map(|(k, v)| (k.clone(), v.clone())));

        let auth0 = Auth0Settings {
            domain: required(&vars, AUTH0_DOMAIN)?,
            client_id: required(&vars, AUTH0_CLIENT_ID)?,
            client_secret: SecretString::from(required(&vars, AUTH0_CLIENT_SECRET)?),
            signing_certificate: required(&vars, AUTH0_SIGNING_CERTIFICATE)?,
        };

        let signing_certificate = SigningCertificate::from_setting(&auth0.signing_certificate)?;

        let bind_address =
            optional(&vars, BIND_ADDRESS).unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = optional(&vars, JWT_CLOCK_SKEW_SECONDS)
        {
            let value: i64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "{} must be a valid integer, got '{}': {}",
                    JWT_CLOCK_SKEW_SECONDS, value_str, e
                ))
            })?;

            if value <= 0 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "{} must be positive, got {}",
                    JWT_CLOCK_SKEW_SECONDS, value
                )));
            }

            if value > MAX_CLOCK_SKEW.as_secs() as i64 {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "{} must not exceed {} seconds, got {}",
                    JWT_CLOCK_SKEW_SECONDS,
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs() as i64
        };

        let log_filter = optional(&vars, LOG_LEVEL_DEFAULT)
            .map(|level| log_filter_for_level(&level))
            .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string());

        let static_files_dir = optional(&vars, STATIC_FILES_ROOT).map(PathBuf::from);

        let request_timeout_seconds = if let Some(value_str) = optional(&vars, REQUEST_TIMEOUT_SECONDS)
        {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidRequestTimeout(format!(
                    "{} must be a valid positive integer, got '{}': {}",
                    REQUEST_TIMEOUT_SECONDS, value_str, e
                ))
            })?;

            if value == 0 {
                return Err(ConfigError::InvalidRequestTimeout(format!(
                    "{} must be greater than 0",
                    REQUEST_TIMEOUT_SECONDS
                )));
            }

            value
        } else {
            DEFAULT_REQUEST_TIMEOUT_SECONDS
        };

        Ok(Config {
            auth0,
            signing_certificate,
            bind_address,
            jwt_clock_skew_seconds,
            log_filter,
            static_files_dir,
            request_timeout_seconds,
        })
    }
}

/// Translate a `Logging:LogLevel:Default` value into a tracing filter.
///
/// Accepts the usual level names (`Verbose`, `Information`, `Warning`,
/// `Critical`, `None` included). Anything else is passed through as a filter
/// directive, e.g. `webapi_service=debug,tower_http=info`.
pub fn log_filter_for_level(level: &str) -> String {
    match level.to_ascii_lowercase().as_str() {
        "verbose" | "trace" => "trace".to_string(),
        "debug" => "debug".to_string(),
        "information" | "info" => "info".to_string(),
        "warning" | "warn" => "warn".to_string(),
        "error" | "critical" => "error".to_string(),
        "none" | "off" => "off".to_string(),
        _ => level.to_string(),
    }
}

fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(&name.to_ascii_lowercase())
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    optional(vars, name).ok_or_else(|| ConfigError::MissingSetting(name.to_string()))
}

/// Flatten a JSON settings document into `Section:Key` names.
///
/// Array elements are addressed by index (`Section:Items:0`). `null` values
/// are dropped.
pub fn flatten_json(text: &str) -> Result<HashMap<String, String>, ConfigError> {
    let root: Value =
        serde_json::from_str(text).map_err(|e| ConfigError::InvalidJson(e.to_string()))?;

    if !root.is_object() {
        return Err(ConfigError::InvalidJson(
            "top-level value must be an object".to_string(),
        ));
    }

    let mut out = HashMap::new();
    flatten_value(None, &root, &mut out);
    Ok(out)
}

fn flatten_value(prefix: Option<&str>, value: &Value, out: &mut HashMap<String, String>) {
    let key_for = |child: &str| match prefix {
        Some(p) => format!("{p}:{child}"),
        None => child.to_string(),
    };

    match value {
        Value::Object(map) => {
            for (k, v) in map {
                flatten_value(Some(&key_for(k)), v, out);
            }
        }
        Value::Array(items) => {
            for (i, v) in items.iter().enumerate() {
                flatten_value(Some(&key_for(&i.to_string())), v, out);
            }
        }
        Value::Null => {}
        Value::String(s) => {
            if let Some(p) = prefix {
                out.insert(p.to_string(), s.clone());
            }
        }
        Value::Bool(_) | Value::Number(_) => {
            if let Some(p) = prefix {
                out.insert(p.to_string(), value.to_string());
            }
        }
    }
}

/// Map environment variables to setting names (`Auth0__Domain` -> `Auth0:Domain`).
pub fn environment_overrides(
    vars: impl IntoIterator<Item = (String, String)>,
) -> HashMap<String, String> {
    vars.into_iter()
        .map(|(k, v)| (k.replace("__", ":"), v))
        .collect()
}

/// Lower-case setting names.
///
/// Keys that collide after lower-casing are applied in ascending byte order
/// of their original spelling, so the result never depends on map iteration
/// order.
pub fn fold_keys(vars: impl IntoIterator<Item = (String, String)>) -> HashMap<String, String> {
    vars.into_iter()
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v))
        .collect()
}

/// Overlay environment variables on the settings file values.
///
/// Both sides are folded before merging; an environment variable replaces a
/// file value whatever the casing of either name.
pub fn overlay_environment(
    file_vars: HashMap<String, String>,
    env_vars: impl IntoIterator<Item = (String, String)>,
) -> HashMap<String, String> {
    let mut vars = fold_keys(file_vars);
    vars.extend(fold_keys(environment_overrides(env_vars)));
    vars
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::STANDARD, Engine};
    use common::secret::ExposeSecret;

    fn certificate_setting() -> String {
        let certified =
            rcgen::generate_simple_self_signed(vec!["tenant.example.com".to_string()]).unwrap();
        STANDARD.encode(certified.cert.der())
    }

    fn base_vars() -> HashMap<String, String> {
        HashMap::from([
            (AUTH0_DOMAIN.to_string(), "tenant.example.com".to_string()),
            (AUTH0_CLIENT_ID.to_string(), "client-1".to_string()),
            (AUTH0_CLIENT_SECRET.to_string(), "top-secret".to_string()),
            (AUTH0_SIGNING_CERTIFICATE.to_string(), certificate_setting()),
        ])
    }

    #[test]
    fn test_from_vars_success_with_defaults() {
        let config = Config::from_vars(&base_vars()).expect("Config should load successfully");

        assert_eq!(config.auth0.domain, "tenant.example.com");
        assert_eq!(config.auth0.client_id, "client-1");
        assert_eq!(config.auth0.client_secret.expose_secret(), "top-secret");
        assert_eq!(config.auth0.authority(), "https://tenant.example.com");
        assert_eq!(config.auth0.audience(), "client-1");
        assert_eq!(config.bind_address, DEFAULT_BIND_ADDRESS);
        assert_eq!(config.jwt_clock_skew_seconds, 300);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
        assert_eq!(config.static_files_dir, None);
        assert_eq!(config.request_timeout_seconds, DEFAULT_REQUEST_TIMEOUT_SECONDS);
    }

    #[test]
    fn test_from_vars_optional_values() {
        let mut vars = base_vars();
        vars.insert(BIND_ADDRESS.to_string(), "127.0.0.1:9000".to_string());
        vars.insert(JWT_CLOCK_SKEW_SECONDS.to_string(), "120".to_string());
        vars.insert(LOG_LEVEL_DEFAULT.to_string(), "Debug".to_string());
        vars.insert(STATIC_FILES_ROOT.to_string(), "wwwroot".to_string());
        vars.insert(REQUEST_TIMEOUT_SECONDS.to_string(), "5".to_string());

        let config = Config::from_vars(&vars).unwrap();

        assert_eq!(config.bind_address, "127.0.0.1:9000");
        assert_eq!(config.jwt_clock_skew_seconds, 120);
        assert_eq!(config.log_filter, "debug");
        assert_eq!(config.static_files_dir, Some(PathBuf::from("wwwroot")));
        assert_eq!(config.request_timeout_seconds, 5);
    }

    #[test]
    fn test_from_vars_keys_are_case_insensitive() {
        let vars: HashMap<String, String> = base_vars()
            .into_iter()
            .map(|(k, v)| (k.to_uppercase(), v))
            .collect();
        assert!(Config::from_vars(&vars).is_ok());
    }

    #[test]
    fn test_from_vars_missing_each_required_setting() {
        for name in [
            AUTH0_DOMAIN,
            AUTH0_CLIENT_ID,
            AUTH0_CLIENT_SECRET,
            AUTH0_SIGNING_CERTIFICATE,
        ] {
            let mut vars = base_vars();
            vars.remove(name);

            let result = Config::from_vars(&vars);
            assert!(
                matches!(result, Err(ConfigError::MissingSetting(ref v)) if v == name),
                "expected MissingSetting({name})"
            );
        }
    }

    #[test]
    fn test_from_vars_blank_setting_is_missing() {
        let mut vars = base_vars();
        vars.insert(AUTH0_DOMAIN.to_string(), "   ".to_string());

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::MissingSetting(v)) if v == AUTH0_DOMAIN));
    }

    #[test]
    fn test_from_vars_malformed_certificate_fails_eagerly() {
        let mut vars = base_vars();
        vars.insert(
            AUTH0_SIGNING_CERTIFICATE.to_string(),
            STANDARD.encode(b"not a certificate"),
        );

        let result = Config::from_vars(&vars);
        assert!(matches!(result, Err(ConfigError::InvalidCertificate(_))));
    }

    #[test]
    fn test_from_vars_clock_skew_validation() {
        for (value, fragment) in [
            ("abc", "must be a valid integer"),
            ("0", "must be positive"),
            ("-5", "must be positive"),
            ("601", "must not exceed 600"),
        ] {
            let mut vars = base_vars();
            vars.insert(JWT_CLOCK_SKEW_SECONDS.to_string(), value.to_string());

            let result = Config::from_vars(&vars);
            assert!(
                matches!(result, Err(ConfigError::InvalidJwtClockSkew(ref msg)) if msg.contains(fragment)),
                "value {value} should fail with '{fragment}'"
            );
        }
    }

    #[test]
    fn test_from_vars_request_timeout_validation() {
        let mut vars = base_vars();
        vars.insert(REQUEST_TIMEOUT_SECONDS.to_string(), "0".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidRequestTimeout(_))
        ));

        vars.insert(REQUEST_TIMEOUT_SECONDS.to_string(), "soon".to_string());
        assert!(matches!(
            Config::from_vars(&vars),
            Err(ConfigError::InvalidRequestTimeout(_))
        ));
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = Config::from_vars(&base_vars()).unwrap();
        let debug = format!("{config:?}");

        assert!(debug.contains("tenant.example.com"));
        assert!(!debug.contains("top-secret"));
        assert!(!debug.contains(&config.auth0.signing_certificate));
    }

    #[test]
    fn test_log_filter_for_level() {
        assert_eq!(log_filter_for_level("Verbose"), "trace");
        assert_eq!(log_filter_for_level("Information"), "info");
        assert_eq!(log_filter_for_level("Warning"), "warn");
        assert_eq!(log_filter_for_level("Critical"), "error");
        assert_eq!(log_filter_for_level("None"), "off");
        assert_eq!(
            log_filter_for_level("webapi_service=debug,tower_http=info"),
            "webapi_service=debug,tower_http=info"
        );
    }

    #[test]
    fn test_flatten_json_nested_sections() {
        let flat = flatten_json(
            r#"{
                "Logging": {"IncludeScopes": false, "LogLevel": {"Default": "Verbose"}},
                "Auth0": {"Domain": "tenant.example.com", "ClientId": null},
                "Origins": ["https://a.example.com", "https://b.example.com"],
                "RequestTimeoutSeconds": 15
            }"#,
        )
        .unwrap();

        assert_eq!(flat.get("Logging:IncludeScopes").unwrap(), "false");
        assert_eq!(flat.get("Logging:LogLevel:Default").unwrap(), "Verbose");
        assert_eq!(flat.get("Auth0:Domain").unwrap(), "tenant.example.com");
        assert!(!flat.contains_key("Auth0:ClientId"));
        assert_eq!(flat.get("Origins:1").unwrap(), "https://b.example.com");
        assert_eq!(flat.get("RequestTimeoutSeconds").unwrap(), "15");
    }

    #[test]
    fn test_flatten_json_rejects_non_object() {
        assert!(matches!(
            flatten_json("[1, 2]"),
            Err(ConfigError::InvalidJson(_))
        ));
        assert!(matches!(
            flatten_json("{ not json"),
            Err(ConfigError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_environment_overrides_map_double_underscore() {
        let overrides = environment_overrides(vec![
            ("Auth0__Domain".to_string(), "env.example.com".to_string()),
            ("PATH".to_string(), "/usr/bin".to_string()),
        ]);

        assert_eq!(overrides.get("Auth0:Domain").unwrap(), "env.example.com");
        assert_eq!(overrides.get("PATH").unwrap(), "/usr/bin");
    }

    #[test]
    fn test_environment_wins_over_file_regardless_of_case() {
        let mut file_vars = base_vars();
        file_vars.insert(AUTH0_CLIENT_ID.to_string(), "client-from-file".to_string());

        // Fresh maps get fresh hash seeds; the winner must not change.
        for _ in 0..32 {
            let vars = overlay_environment(
                file_vars.clone(),
                vec![("AUTH0__CLIENTID".to_string(), "client-from-env".to_string())],
            );
            let config = Config::from_vars(&vars).unwrap();
            assert_eq!(config.auth0.audience(), "client-from-env");
        }
    }

    #[test]
    fn test_fold_keys_resolves_case_collisions_in_fixed_order() {
        let winners: Vec<String> = (0..32)
            .map(|_| {
                let vars = HashMap::from([
                    ("AUTH0:CLIENTID".to_string(), "upper".to_string()),
                    ("Auth0:ClientId".to_string(), "mixed".to_string()),
                    ("auth0:clientid".to_string(), "lower".to_string()),
                ]);
                fold_keys(vars).remove("auth0:clientid").unwrap()
            })
            .collect();

        assert!(winners.iter().all(|w| w == "lower"));
    }

    #[test]
    fn test_load_from_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appsettings.json");
        let settings = serde_json::json!({
            "Auth0": {
                "Domain": "tenant.example.com",
                "ClientId": "client-1",
                "ClientSecret": "top-secret",
                "SigningCertificate": certificate_setting()
            },
            "Logging": {"LogLevel": {"Default": "warn"}},
            "BindAddress": "127.0.0.1:0"
        });
        std::fs::write(&path, settings.to_string()).unwrap();

        let config = Config::load(&path).unwrap();

        assert_eq!(config.auth0.client_id, "client-1");
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.bind_address, "127.0.0.1:0");
    }

    #[test]
    fn test_load_invalid_settings_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("appsettings.json");
        std::fs::write(&path, "{ broken").unwrap();

        assert!(matches!(
            Config::load(&path),
            Err(ConfigError::InvalidJson(_))
        ));
    }
}
