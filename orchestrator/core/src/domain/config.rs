// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Hivemind Configuration Types
//
// Defines the configuration schema for a hivemind node:
// - Kubernetes-style manifest format (apiVersion/kind/metadata/spec)
// - Swarm memory bounds and retention
// - Coordinator loop intervals, failover and resource pool sizing
// - HITL gating thresholds, review timeout and escalation limits
// - Logging settings

use hivemind_cortex::MemoryConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::domain::hitl::GatingPolicy;

pub const API_VERSION: &str = "hivemind/v1";
pub const KIND: &str = "HivemindConfig";

/// Top-level Kubernetes-style configuration manifest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HivemindConfig {
    /// API version (must be "hivemind/v1")
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Resource kind (must be "HivemindConfig")
    pub kind: String,

    pub metadata: ManifestMetadata,

    #[serde(default)]
    pub spec: HivemindSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManifestMetadata {
    pub name: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<HashMap<String, String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HivemindSpec {
    #[serde(default)]
    pub memory: MemoryConfig,

    #[serde(default)]
    pub coordinator: CoordinatorConfig,

    #[serde(default)]
    pub hitl: HitlConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub observability: Option<ObservabilityConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum FailoverStrategy {
    #[default]
    Automatic,
    Manual,
}

impl std::str::FromStr for FailoverStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "automatic" => Ok(FailoverStrategy::Automatic),
            "manual" => Ok(FailoverStrategy::Manual),
            other => Err(format!("unknown failover strategy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    /// Message queue drain interval
    #[serde(default = "default_message_interval_ms")]
    pub message_interval_ms: u64,

    #[serde(default = "default_health_check_interval")]
    pub health_check_interval_seconds: u64,

    #[serde(default = "default_load_balance_interval")]
    pub load_balance_interval_seconds: u64,

    #[serde(default)]
    pub failover_strategy: FailoverStrategy,

    /// Delay before a failed-over swarm is probed again
    #[serde(default = "default_recovery_delay")]
    pub recovery_delay_seconds: u64,

    /// Upper bound on every decision-unit call
    #[serde(default = "default_call_timeout")]
    pub call_timeout_seconds: u64,

    #[serde(default = "default_total_resources")]
    pub total_resources: u32,

    #[serde(default = "default_resources_per_swarm")]
    pub resources_per_swarm: u32,
}

impl CoordinatorConfig {
    pub fn message_interval(&self) -> Duration {
        Duration::from_millis(self.message_interval_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_secs(self.health_check_interval_seconds)
    }

    pub fn load_balance_interval(&self) -> Duration {
        Duration::from_secs(self.load_balance_interval_seconds)
    }

    pub fn recovery_delay(&self) -> Duration {
        Duration::from_secs(self.recovery_delay_seconds)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_seconds)
    }
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            message_interval_ms: default_message_interval_ms(),
            health_check_interval_seconds: default_health_check_interval(),
            load_balance_interval_seconds: default_load_balance_interval(),
            failover_strategy: FailoverStrategy::Automatic,
            recovery_delay_seconds: default_recovery_delay(),
            call_timeout_seconds: default_call_timeout(),
            total_resources: default_total_resources(),
            resources_per_swarm: default_resources_per_swarm(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HitlConfig {
    /// Minimum swarm confidence for automatic execution
    #[serde(default = "default_auto_approval_threshold")]
    pub auto_approval_threshold: f64,

    /// Financial impact above which a human must review
    #[serde(default = "default_financial_impact_threshold")]
    pub financial_impact_threshold: f64,

    #[serde(default = "default_review_timeout_minutes")]
    pub review_timeout_minutes: i64,

    #[serde(default = "default_timeout_check_interval")]
    pub timeout_check_interval_seconds: u64,

    /// Escalations after which a decision is cancelled
    #[serde(default = "default_max_escalations")]
    pub max_escalations: u32,

    #[serde(default = "default_true")]
    pub enable_auto_execution: bool,

    #[serde(default = "default_true")]
    pub enable_learning: bool,
}

impl HitlConfig {
    pub fn gating_policy(&self) -> GatingPolicy {
        GatingPolicy {
            auto_approval_threshold: self.auto_approval_threshold,
            financial_impact_threshold: self.financial_impact_threshold,
            enable_auto_execution: self.enable_auto_execution,
        }
    }

    pub fn review_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.review_timeout_minutes)
    }
}

impl Default for HitlConfig {
    fn default() -> Self {
        Self {
            auto_approval_threshold: default_auto_approval_threshold(),
            financial_impact_threshold: default_financial_impact_threshold(),
            review_timeout_minutes: default_review_timeout_minutes(),
            timeout_check_interval_seconds: default_timeout_check_interval(),
            max_escalations: default_max_escalations(),
            enable_auto_execution: true,
            enable_learning: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (e.g., "info", "debug", "trace")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format ("json" or "text")
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

// Default value functions
fn default_true() -> bool {
    true
}

fn default_message_interval_ms() -> u64 {
    100
}

fn default_health_check_interval() -> u64 {
    30
}

fn default_load_balance_interval() -> u64 {
    60
}

fn default_recovery_delay() -> u64 {
    30
}

fn default_call_timeout() -> u64 {
    10
}

fn default_total_resources() -> u32 {
    100
}

fn default_resources_per_swarm() -> u32 {
    10
}

fn default_auto_approval_threshold() -> f64 {
    0.8
}

fn default_financial_impact_threshold() -> f64 {
    10_000.0
}

fn default_review_timeout_minutes() -> i64 {
    60
}

fn default_timeout_check_interval() -> u64 {
    60
}

fn default_max_escalations() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "text".to_string()
}

impl Default for HivemindConfig {
    fn default() -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ManifestMetadata {
                name: "hivemind".to_string(),
                version: Some("1.0.0".to_string()),
                labels: None,
            },
            spec: HivemindSpec::default(),
        }
    }
}

impl HivemindConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to YAML file
    pub fn to_yaml_file(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    pub fn from_yaml_str(yaml: &str) -> anyhow::Result<Self> {
        let config = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    /// Discover configuration file using precedence order
    /// 1. HIVEMIND_CONFIG_PATH environment variable
    /// 2. ./hivemind-config.yaml (working directory)
    /// 3. ~/.hivemind/config.yaml (user home)
    /// 4. /etc/hivemind/config.yaml (system, Unix) or C:\ProgramData\Hivemind\config.yaml (Windows)
    pub fn discover_config() -> Option<PathBuf> {
        if let Ok(path) = std::env::var("HIVEMIND_CONFIG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        let cwd = PathBuf::from("./hivemind-config.yaml");
        if cwd.exists() {
            return Some(cwd);
        }

        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".hivemind").join("config.yaml");
            if user_config.exists() {
                return Some(user_config);
            }
        }

        #[cfg(unix)]
        let system_config = PathBuf::from("/etc/hivemind/config.yaml");
        #[cfg(windows)]
        let system_config = PathBuf::from("C:\\ProgramData\\Hivemind\\config.yaml");

        if system_config.exists() {
            return Some(system_config);
        }

        None
    }

    /// Load configuration with discovery, fallback to default
    pub fn load_or_default(explicit_path: Option<PathBuf>) -> anyhow::Result<Self> {
        if let Some(path) = explicit_path {
            tracing::info!("Loading configuration from explicit path: {:?}", path);
            let mut config = Self::from_yaml_file(&path)
                .map_err(|e| anyhow::anyhow!("Failed to load config at {:?}: {}", path, e))?;
            config.apply_env_overrides();
            return Ok(config);
        }

        if let Some(config_path) = Self::discover_config() {
            tracing::info!("Loading configuration from discovered path: {:?}", config_path);
            let mut config = Self::from_yaml_file(config_path)?;
            config.apply_env_overrides();
            Ok(config)
        } else {
            tracing::warn!("No configuration file found in standard locations. Using defaults.");
            let mut config = Self::default();
            config.apply_env_overrides();
            Ok(config)
        }
    }

    /// Apply environment variable overrides to configuration
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(val) = lookup("HIVEMIND_AUTO_APPROVAL_THRESHOLD") {
            match val.parse::<f64>() {
                Ok(v) if (0.0..=1.0).contains(&v) => {
                    tracing::info!("Environment override: HIVEMIND_AUTO_APPROVAL_THRESHOLD={}", v);
                    self.spec.hitl.auto_approval_threshold = v;
                }
                _ => tracing::warn!(
                    "Invalid value for HIVEMIND_AUTO_APPROVAL_THRESHOLD: '{}'. Expected 0.0-1.0. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("HIVEMIND_REVIEW_TIMEOUT_MINUTES") {
            match val.parse::<i64>() {
                Ok(v) if v > 0 => {
                    tracing::info!("Environment override: HIVEMIND_REVIEW_TIMEOUT_MINUTES={}", v);
                    self.spec.hitl.review_timeout_minutes = v;
                }
                _ => tracing::warn!(
                    "Invalid value for HIVEMIND_REVIEW_TIMEOUT_MINUTES: '{}'. Expected a positive integer. Ignoring.",
                    val
                ),
            }
        }

        if let Some(val) = lookup("HIVEMIND_FAILOVER_STRATEGY") {
            match val.parse::<FailoverStrategy>() {
                Ok(strategy) => {
                    tracing::info!("Environment override: HIVEMIND_FAILOVER_STRATEGY={}", val);
                    self.spec.coordinator.failover_strategy = strategy;
                }
                Err(e) => tracing::warn!(
                    "Invalid value for HIVEMIND_FAILOVER_STRATEGY: {}. Expected automatic/manual. Ignoring.",
                    e
                ),
            }
        }

        if let Some(val) = lookup("HIVEMIND_MEMORY_MAX_ENTRIES") {
            match val.parse::<usize>() {
                Ok(v) if v > 0 => {
                    tracing::info!("Environment override: HIVEMIND_MEMORY_MAX_ENTRIES={}", v);
                    self.spec.memory.max_entries = v;
                }
                _ => tracing::warn!(
                    "Invalid value for HIVEMIND_MEMORY_MAX_ENTRIES: '{}'. Expected a positive integer. Ignoring.",
                    val
                ),
            }
        }
    }

    pub fn logging(&self) -> LoggingConfig {
        self.spec
            .observability
            .as_ref()
            .and_then(|o| o.logging.clone())
            .unwrap_or_default()
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.api_version != API_VERSION {
            anyhow::bail!(
                "Invalid apiVersion: '{}'. Must be '{}'",
                self.api_version,
                API_VERSION
            );
        }

        if self.kind != KIND {
            anyhow::bail!("Invalid kind: '{}'. Must be '{}'", self.kind, KIND);
        }

        if self.metadata.name.is_empty() {
            anyhow::bail!("metadata.name cannot be empty");
        }

        let memory = &self.spec.memory;
        if memory.max_entries == 0 {
            anyhow::bail!("spec.memory.max_entries must be greater than 0");
        }
        if memory.retention_hours == 0 {
            anyhow::bail!("spec.memory.retention_hours must be greater than 0");
        }
        if memory.pattern_window_days <= 0 {
            anyhow::bail!("spec.memory.pattern_window_days must be greater than 0");
        }

        let coordinator = &self.spec.coordinator;
        if coordinator.message_interval_ms == 0 {
            anyhow::bail!("spec.coordinator.message_interval_ms must be greater than 0");
        }
        if coordinator.health_check_interval_seconds == 0
            || coordinator.load_balance_interval_seconds == 0
        {
            anyhow::bail!("spec.coordinator loop intervals must be greater than 0");
        }
        if coordinator.call_timeout_seconds == 0 {
            anyhow::bail!("spec.coordinator.call_timeout_seconds must be greater than 0");
        }
        if coordinator.resources_per_swarm > coordinator.total_resources {
            anyhow::bail!(
                "spec.coordinator.resources_per_swarm ({}) exceeds total_resources ({})",
                coordinator.resources_per_swarm,
                coordinator.total_resources
            );
        }

        let hitl = &self.spec.hitl;
        if !(0.0..=1.0).contains(&hitl.auto_approval_threshold) {
            anyhow::bail!(
                "spec.hitl.auto_approval_threshold must be within [0, 1], got {}",
                hitl.auto_approval_threshold
            );
        }
        if hitl.financial_impact_threshold < 0.0 {
            anyhow::bail!("spec.hitl.financial_impact_threshold cannot be negative");
        }
        if hitl.review_timeout_minutes <= 0 {
            anyhow::bail!("spec.hitl.review_timeout_minutes must be greater than 0");
        }
        if hitl.timeout_check_interval_seconds == 0 {
            anyhow::bail!("spec.hitl.timeout_check_interval_seconds must be greater than 0");
        }

        if let Some(logging) = self.spec.observability.as_ref().and_then(|o| o.logging.as_ref()) {
            if logging.format != "text" && logging.format != "json" {
                anyhow::bail!(
                    "Invalid logging format: '{}'. Must be 'text' or 'json'",
                    logging.format
                );
            }
        }

        Ok(())
    }
}
