//! Plugin host error types

use std::sync::Arc;
use thiserror::Error;

use weft_plugin_api::PluginError;

use crate::discovery::DiscoveryError;
use crate::settings::SettingsError;

/// Errors that can occur in the plugin host
#[derive(Error, Debug)]
pub enum PluginHostError {
    /// Two descriptors in one registration batch share a fully qualified name
    #[error("[DuplicateName] Duplicate plugins detected: {}", .names.join(", "))]
    DuplicateName { names: Vec<String> },

    /// A capability label has no registered provider
    #[error("[DependencyMissing] No provider for '{label}'{}", required_by_suffix(.required_by))]
    DependencyMissing {
        label: String,
        required_by: Option<String>,
    },

    /// A label was revisited while it was still being resolved
    #[error("[CyclicReference] Dependency cycle detected: {}", .chain.join(" -> "))]
    CyclicReference { chain: Vec<String> },

    /// A plugin, or one of its dependencies, failed to load
    #[error(transparent)]
    DependencyChain(#[from] Arc<DependencyChainError>),

    /// No live instance for this name
    #[error("Plugin '{fqn}' not found")]
    NotFound { fqn: String },

    /// A lifecycle transition failed
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// Settings store error
    #[error("Settings error: {0}")]
    Settings(#[from] SettingsError),

    /// Manifest discovery error
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),
}

fn required_by_suffix(required_by: &Option<String>) -> String {
    required_by
        .as_ref()
        .map(|by| format!(" (required by {})", by))
        .unwrap_or_default()
}

/// Lifecycle stage a hook belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleStage {
    Enable,
    Start,
    Stop,
    Disable,
}

impl std::fmt::Display for LifecycleStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Enable => "enable",
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Disable => "disable",
        };
        f.write_str(s)
    }
}

/// Lifecycle precondition violations and hook failures on a single instance
#[derive(Error, Debug)]
pub enum LifecycleError {
    #[error("[NotEnabledError] Plugin '{name}' is not enabled")]
    NotEnabled { name: String },

    #[error("[AlreadyEnabledError] Plugin '{name}' is already enabled and cannot be re-enabled")]
    AlreadyEnabled { name: String },

    #[error("Plugin '{name}' failed to {stage}: {source}")]
    Hook {
        name: String,
        stage: LifecycleStage,
        #[source]
        source: PluginError,
    },
}

/// Why an individual plugin failed to load
#[derive(Error, Debug)]
pub enum ChainCause {
    /// The plugin already has a live instance
    #[error("Already loaded")]
    AlreadyLoaded,

    /// The plugin's factory returned an error
    #[error("Construction failed: {0}")]
    Construct(#[source] PluginError),

    /// Enabling or starting the instance failed
    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    /// An accessor target no longer resolves to any provider
    #[error("Accessor target '{label}' has no provider")]
    Unresolved { label: String },

    /// A dependency failed, so this plugin never started
    #[error("Dependency '{}' failed", .0.fqn)]
    Dependency(#[source] Arc<DependencyChainError>),

    /// No descriptor is registered under this name
    #[error("No descriptor registered")]
    Unregistered,
}

/// A per-plugin load failure, tagged with the plugin that failed and the
/// chain of plugins the failure travelled through
#[derive(Error, Debug)]
#[error("[DependencyChainError] {fqn} has failed an entire dependency chain: {cause}")]
pub struct DependencyChainError {
    /// Plugin this error is recorded for
    pub fqn: String,
    /// This plugin followed by the dependencies the failure came through
    pub chain: Vec<String>,
    /// What went wrong
    #[source]
    pub cause: ChainCause,
}

impl DependencyChainError {
    pub fn new(fqn: impl Into<String>, cause: ChainCause) -> Self {
        let fqn = fqn.into();
        let mut chain = vec![fqn.clone()];
        if let ChainCause::Dependency(dependency) = &cause {
            chain.extend(dependency.chain.iter().cloned());
        }
        Self { fqn, chain, cause }
    }

    /// Soft failure recorded when a registered plugin is already running
    pub fn already_loaded(fqn: impl Into<String>) -> Self {
        Self::new(fqn, ChainCause::AlreadyLoaded)
    }

    pub fn is_already_loaded(&self) -> bool {
        matches!(self.cause, ChainCause::AlreadyLoaded)
    }

    /// Plugin where the failure originated
    pub fn root_fqn(&self) -> &str {
        self.chain.last().map(String::as_str).unwrap_or(&self.fqn)
    }

    /// Error that started the chain
    pub fn root_cause(&self) -> &ChainCause {
        match &self.cause {
            ChainCause::Dependency(dependency) => dependency.root_cause(),
            cause => cause,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_name_display() {
        let err = PluginHostError::DuplicateName {
            names: vec!["a-v1".to_string(), "b-v1".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("DuplicateName"));
        assert!(msg.contains("a-v1, b-v1"));
    }

    #[test]
    fn test_dependency_missing_display() {
        let err = PluginHostError::DependencyMissing {
            label: "cap-y".to_string(),
            required_by: Some("X-v1".to_string()),
        };
        let msg = err.to_string();
        assert!(msg.contains("DependencyMissing"));
        assert!(msg.contains("cap-y"));
        assert!(msg.contains("required by X-v1"));

        let err = PluginHostError::DependencyMissing {
            label: "cap-y".to_string(),
            required_by: None,
        };
        assert!(!err.to_string().contains("required by"));
    }

    #[test]
    fn test_cyclic_reference_display() {
        let err = PluginHostError::CyclicReference {
            chain: vec!["M-v1".into(), "N-v1".into(), "M-v1".into()],
        };
        assert!(err.to_string().contains("M-v1 -> N-v1 -> M-v1"));
    }

    #[test]
    fn test_lifecycle_error_names_kind() {
        let err = LifecycleError::NotEnabled {
            name: "S".to_string(),
        };
        assert!(err.to_string().contains("NotEnabledError"));

        let err = LifecycleError::AlreadyEnabled {
            name: "S".to_string(),
        };
        assert!(err.to_string().contains("AlreadyEnabledError"));
    }

    #[test]
    fn test_chain_error_accumulates_dependency_chain() {
        let root = Arc::new(DependencyChainError::new(
            "B-v1",
            ChainCause::Construct(PluginError::custom("boom")),
        ));
        let dependent = DependencyChainError::new("A-v1", ChainCause::Dependency(root));

        assert_eq!(dependent.chain, vec!["A-v1", "B-v1"]);
        assert_eq!(dependent.root_fqn(), "B-v1");
        assert!(matches!(dependent.root_cause(), ChainCause::Construct(_)));
        assert!(dependent.to_string().contains("A-v1"));
    }

    #[test]
    fn test_already_loaded_is_soft_failure() {
        let err = DependencyChainError::already_loaded("A-v1");
        assert!(err.is_already_loaded());
        assert_eq!(err.chain, vec!["A-v1"]);
        assert!(err.to_string().contains("Already loaded"));
    }

    #[test]
    fn test_chain_error_converts_into_host_error() {
        let err = Arc::new(DependencyChainError::already_loaded("A-v1"));
        let host_err: PluginHostError = err.into();
        assert!(matches!(host_err, PluginHostError::DependencyChain(_)));
    }
}
