use std::{borrow::Cow, env, fmt, sync::Arc};

use tonic::Code;
use tracing::Level;

use crate::{
    auth::Keyfunc,
    level::{default_code_to_level, CodeToLevel},
};

/// Header whose value is copied verbatim into the log line.
pub const DEFAULT_LOG_FLAG_KEY: &str = "log-trace-key";

/// Header overriding the level of the call's logger.
pub const DEFAULT_LOG_LEVEL_KEY: &str = "log-trace-level";

/// Options of the [`GatewayLoggingLayer`](crate::middleware::gateway::GatewayLoggingLayer).
///
/// ```
/// use gateway_log::config::GatewayLogConfig;
///
/// let config = GatewayLogConfig::default()
///     .enable_dynamic_log_level()
///     .enable_account_id();
/// assert!(config.dynamic_log_level);
/// ```
#[derive(Clone)]
pub struct GatewayLogConfig {
    /// Skip reading, generating and forwarding the request ID.
    pub disable_request_id: bool,
    /// Honour the log flag and log level headers.
    pub dynamic_log_level: bool,
    /// Add the account ID field.
    pub with_account_id: bool,
    /// Verifies the token the account ID is read from. Unverified when `None`.
    pub account_id_keyfunc: Option<Keyfunc>,
    pub code_to_level: CodeToLevel,
    pub log_flag_key: Cow<'static, str>,
    pub log_level_key: Cow<'static, str>,
}

impl Default for GatewayLogConfig {
    fn default() -> Self {
        Self {
            disable_request_id: false,
            dynamic_log_level: false,
            with_account_id: false,
            account_id_keyfunc: None,
            code_to_level: Arc::new(default_code_to_level),
            log_flag_key: Cow::Borrowed(DEFAULT_LOG_FLAG_KEY),
            log_level_key: Cow::Borrowed(DEFAULT_LOG_LEVEL_KEY),
        }
    }
}

impl GatewayLogConfig {
    /// Defaults, adjusted by `GATEWAY_LOG_DISABLE_REQUEST_ID`,
    /// `GATEWAY_LOG_DYNAMIC_LEVEL` and `GATEWAY_LOG_ACCOUNT_ID`.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(disable) = env_flag("GATEWAY_LOG_DISABLE_REQUEST_ID") {
            config.disable_request_id = disable;
        }
        if let Some(dynamic) = env_flag("GATEWAY_LOG_DYNAMIC_LEVEL") {
            config.dynamic_log_level = dynamic;
        }
        if let Some(account_id) = env_flag("GATEWAY_LOG_ACCOUNT_ID") {
            config.with_account_id = account_id;
        }
        config
    }

    pub fn disable_request_id(mut self) -> Self {
        self.disable_request_id = true;
        self
    }

    /// Lets the log level header set the level of the call's logger.
    ///
    /// Lines still go through the global `tracing` filter afterwards. The one
    /// installed by [`setup`](crate::setup::setup) lets every call line
    /// through unless `RUST_LOG` is set. A custom `RUST_LOG` has to allow
    /// `gateway_log::calls` at the levels the header may ask for.
    pub fn with_dynamic_log_level(mut self, enable: bool) -> Self {
        self.dynamic_log_level = enable;
        self
    }

    pub fn enable_dynamic_log_level(self) -> Self {
        self.with_dynamic_log_level(true)
    }

    pub fn with_account_id(mut self, keyfunc: Keyfunc) -> Self {
        self.with_account_id = true;
        self.account_id_keyfunc = Some(keyfunc);
        self
    }

    /// Account ID field without signature verification.
    pub fn enable_account_id(mut self) -> Self {
        self.with_account_id = true;
        self.account_id_keyfunc = None;
        self
    }

    pub fn with_code_func<F>(mut self, code_to_level: F) -> Self
    where
        F: Fn(Code) -> Level + Send + Sync + 'static,
    {
        self.code_to_level = Arc::new(code_to_level);
        self
    }

    pub fn with_log_flag_key(mut self, key: impl Into<Cow<'static, str>>) -> Self {
        self.log_flag_key = key.into();
        self
    }

    pub fn with_log_level_key(mut self, key: impl Into<Cow<'static, str>>) -> Self {
        self.log_level_key = key.into();
        self
    }
}

impl fmt::Debug for GatewayLogConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayLogConfig")
            .field("disable_request_id", &self.disable_request_id)
            .field("dynamic_log_level", &self.dynamic_log_level)
            .field("with_account_id", &self.with_account_id)
            .field("account_id_keyfunc", &self.account_id_keyfunc.is_some())
            .field("log_flag_key", &self.log_flag_key)
            .field("log_level_key", &self.log_level_key)
            .finish_non_exhaustive()
    }
}

fn env_flag(name: &str) -> Option<bool> {
    let value = env::var(name).ok()?;
    parse_flag(&value)
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        other => {
            tracing::warn!(value = %other, "ignoring unrecognised boolean setting");
            None
        }
    }
}
