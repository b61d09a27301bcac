//! Configuration.
//!
//! Two unrelated kinds of settings live here:
//!
//! - [`SimulationConfig`]: the engine's tunables (packet step, spawn cadence,
//!   failure and denial probabilities, simulated latency range).
//! - [`ComponentConfig`]: the per-component settings edited by the config
//!   panel. The engine stores them alongside each component and never
//!   inspects them; each variant declares its field set and validation rule
//!   through [`ComponentKind::config_fields`].

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{error::ConfigError, topology::ComponentKind};

/// Engine tunables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Progress added to every packet per tick. 0.02 means 50 ticks per hop.
    pub packet_step: f64,
    /// Wall-clock time between automatic packet spawns.
    pub spawn_interval: Duration,
    /// Per-tick, per-component probability that a targeted component fails.
    pub failure_probability: f64,
    /// Probability that a spawn also records a denied access.
    pub denial_probability: f64,
    /// Upper bound (exclusive) of the simulated response time, in ms.
    pub max_response_time_ms: f64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            packet_step: 0.02,
            spawn_interval: Duration::from_millis(2000),
            failure_probability: 0.05,
            denial_probability: 0.1,
            max_response_time_ms: 100.0,
        }
    }
}

impl SimulationConfig {
    /// Check every tunable is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.packet_step > 0.0 && self.packet_step <= 1.0) {
            return Err(ConfigError::OutOfRange {
                field: "packet_step",
                value: self.packet_step,
                min: f64::MIN_POSITIVE,
                max: 1.0,
            });
        }
        check_probability("failure_probability", self.failure_probability)?;
        check_probability("denial_probability", self.denial_probability)?;
        if !(self.max_response_time_ms >= 0.0 && self.max_response_time_ms.is_finite()) {
            return Err(ConfigError::OutOfRange {
                field: "max_response_time_ms",
                value: self.max_response_time_ms,
                min: 0.0,
                max: f64::MAX,
            });
        }
        Ok(())
    }
}

fn check_probability(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::OutOfRange { field, value, min: 0.0, max: 1.0 })
    }
}

/// Authentication method offered by an identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// Client certificate.
    Certificate,
    /// Bearer token.
    Token,
    /// Password.
    Password,
    /// Biometric factor.
    Biometric,
}

/// Fallback decision of a policy engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    /// Allow unless a rule denies.
    Allow,
    /// Deny unless a rule allows.
    Deny,
}

/// Sensitivity of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessLevel {
    /// Anyone.
    Public,
    /// Authenticated principals.
    Restricted,
    /// Explicitly authorized principals.
    Confidential,
}

/// Protocol a resource is reachable over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// HTTPS.
    Https,
    /// SSH.
    Ssh,
    /// SFTP.
    Sftp,
}

/// Proxy direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProxyMode {
    /// In front of resources.
    Reverse,
    /// In front of clients.
    Forward,
}

/// TLS version terminated by a proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TlsVersion {
    /// TLS 1.2.
    #[serde(rename = "1.2")]
    V1_2,
    /// TLS 1.3.
    #[serde(rename = "1.3")]
    V1_3,
}

/// Identity provider settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProviderConfig {
    /// Offered authentication methods. No duplicates.
    pub auth_methods: Vec<AuthMethod>,
    /// Session lifetime in seconds.
    pub session_timeout_secs: u32,
}

/// Policy engine settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyEngineConfig {
    /// Free-form rule descriptions.
    pub rules: Vec<String>,
    /// Decision when no rule matches.
    pub default_action: PolicyAction,
}

/// Resource settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceConfig {
    /// Sensitivity.
    pub access_level: AccessLevel,
    /// Reachable protocols. No duplicates.
    pub protocols: Vec<Protocol>,
}

/// Client settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Device trust score, 0 to 100.
    pub trust_level: u8,
    /// Granted permissions.
    pub permissions: Vec<String>,
}

/// Proxy settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy direction.
    pub mode: ProxyMode,
    /// Terminated TLS version.
    pub tls_version: TlsVersion,
}

/// Per-component settings, one variant per [`ComponentKind`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ComponentConfig {
    /// Identity provider settings.
    IdentityProvider(IdentityProviderConfig),
    /// Policy engine settings.
    PolicyEngine(PolicyEngineConfig),
    /// Resource settings.
    Resource(ResourceConfig),
    /// Client settings.
    Client(ClientConfig),
    /// Proxy settings.
    Proxy(ProxyConfig),
}

impl ComponentConfig {
    /// Settings a freshly placed component starts with.
    pub fn default_for(kind: ComponentKind) -> Self {
        match kind {
            ComponentKind::IdentityProvider => Self::IdentityProvider(IdentityProviderConfig {
                auth_methods: vec![AuthMethod::Certificate, AuthMethod::Token],
                session_timeout_secs: 3600,
            }),
            ComponentKind::PolicyEngine => Self::PolicyEngine(PolicyEngineConfig {
                rules: Vec::new(),
                default_action: PolicyAction::Deny,
            }),
            ComponentKind::Resource => Self::Resource(ResourceConfig {
                access_level: AccessLevel::Restricted,
                protocols: vec![Protocol::Https],
            }),
            ComponentKind::Client => {
                Self::Client(ClientConfig { trust_level: 0, permissions: Vec::new() })
            },
            ComponentKind::Proxy => {
                Self::Proxy(ProxyConfig { mode: ProxyMode::Reverse, tls_version: TlsVersion::V1_3 })
            },
        }
    }

    /// Kind this config was written for.
    pub fn kind(&self) -> ComponentKind {
        match self {
            Self::IdentityProvider(_) => ComponentKind::IdentityProvider,
            Self::PolicyEngine(_) => ComponentKind::PolicyEngine,
            Self::Resource(_) => ComponentKind::Resource,
            Self::Client(_) => ComponentKind::Client,
            Self::Proxy(_) => ComponentKind::Proxy,
        }
    }

    /// Apply the field rules declared by [`ComponentKind::config_fields`].
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            Self::IdentityProvider(c) => {
                check_range(SESSION_TIMEOUT, f64::from(c.session_timeout_secs))?;
                check_unique(AUTH_METHODS.name, &c.auth_methods)
            },
            Self::Resource(c) => check_unique(PROTOCOLS.name, &c.protocols),
            Self::Client(c) => check_range(TRUST_LEVEL, f64::from(c.trust_level)),
            Self::PolicyEngine(_) | Self::Proxy(_) => Ok(()),
        }
    }
}

/// How a config field is edited and validated.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldRule {
    /// Exactly one of the options.
    Select(&'static [&'static str]),
    /// Any subset of the options, no repeats.
    MultiSelect(&'static [&'static str]),
    /// Inclusive numeric range.
    Number {
        /// Lower bound.
        min: f64,
        /// Upper bound.
        max: f64,
    },
    /// Free-form list of strings.
    List,
}

/// One editable config field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    /// Field name as serialized.
    pub name: &'static str,
    /// Edit and validation rule.
    pub rule: FieldRule,
}

const AUTH_METHODS: FieldSpec = FieldSpec {
    name: "auth_methods",
    rule: FieldRule::MultiSelect(&["certificate", "token", "password", "biometric"]),
};
const SESSION_TIMEOUT: FieldSpec = FieldSpec {
    name: "session_timeout_secs",
    rule: FieldRule::Number { min: 300.0, max: 86400.0 },
};
const RULES: FieldSpec = FieldSpec { name: "rules", rule: FieldRule::List };
const DEFAULT_ACTION: FieldSpec =
    FieldSpec { name: "default_action", rule: FieldRule::Select(&["allow", "deny"]) };
const ACCESS_LEVEL: FieldSpec = FieldSpec {
    name: "access_level",
    rule: FieldRule::Select(&["public", "restricted", "confidential"]),
};
const PROTOCOLS: FieldSpec =
    FieldSpec { name: "protocols", rule: FieldRule::MultiSelect(&["https", "ssh", "sftp"]) };
const TRUST_LEVEL: FieldSpec =
    FieldSpec { name: "trust_level", rule: FieldRule::Number { min: 0.0, max: 100.0 } };
const PERMISSIONS: FieldSpec = FieldSpec { name: "permissions", rule: FieldRule::List };
const MODE: FieldSpec = FieldSpec { name: "mode", rule: FieldRule::Select(&["reverse", "forward"]) };
const TLS_VERSION: FieldSpec =
    FieldSpec { name: "tls_version", rule: FieldRule::Select(&["1.2", "1.3"]) };

impl ComponentKind {
    /// Editable fields of this kind's config, in display order.
    pub fn config_fields(self) -> &'static [FieldSpec] {
        match self {
            Self::IdentityProvider => &[AUTH_METHODS, SESSION_TIMEOUT],
            Self::PolicyEngine => &[RULES, DEFAULT_ACTION],
            Self::Resource => &[ACCESS_LEVEL, PROTOCOLS],
            Self::Client => &[TRUST_LEVEL, PERMISSIONS],
            Self::Proxy => &[MODE, TLS_VERSION],
        }
    }
}

fn check_range(spec: FieldSpec, value: f64) -> Result<(), ConfigError> {
    match spec.rule {
        FieldRule::Number { min, max } if !(min..=max).contains(&value) => {
            Err(ConfigError::OutOfRange { field: spec.name, value, min, max })
        },
        _ => Ok(()),
    }
}

fn check_unique<T: PartialEq + std::fmt::Debug>(
    field: &'static str,
    values: &[T],
) -> Result<(), ConfigError> {
    for (i, value) in values.iter().enumerate() {
        if values[..i].contains(value) {
            return Err(ConfigError::DuplicateOption { field, value: format!("{value:?}") });
        }
    }
    Ok(())
}
