//! Plugin management commands

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use weft_core::discovery::{DiscoveredPlugin, PluginCatalog, PluginScanner};
use weft_core::settings::{FileSettings, SettingsStore, plugin_setting_path};
use weft_core::plugins::DependencyChainError;
use weft_core::{PluginHost, PluginHostConfig, PluginHostError};

/// Plugin management arguments
#[derive(Args)]
pub struct PluginArgs {
    #[command(subcommand)]
    pub command: PluginCommands,
}

/// Plugin subcommands
#[derive(Subcommand)]
pub enum PluginCommands {
    /// List discovered plugin manifests
    Scan,
    /// Show the resolved dependency chains and load order without loading
    Plan,
    /// Load every discovered plugin, dependencies first
    Load,
    /// Enable a plugin
    Enable {
        /// Plugin name to enable
        name: String,
    },
    /// Disable a plugin
    Disable {
        /// Plugin name to disable
        name: String,
    },
}

/// Run plugin command
pub async fn run(args: PluginArgs, config: &PluginHostConfig) -> Result<()> {
    match args.command {
        PluginCommands::Scan => scan_plugins(config),
        PluginCommands::Plan => plan_plugins(config),
        PluginCommands::Load => load_plugins(config).await,
        PluginCommands::Enable { name } => set_enabled(config, &name, true),
        PluginCommands::Disable { name } => set_enabled(config, &name, false),
    }
}

fn discover(config: &PluginHostConfig) -> Result<Vec<DiscoveredPlugin>> {
    let scanner = PluginScanner::new(config.plugin_dirs(), config.plugin_types.clone());
    Ok(scanner.scan()?)
}

fn scan_plugins(config: &PluginHostConfig) -> Result<()> {
    let plugins = discover(config)?;

    if plugins.is_empty() {
        println!("No plugins found");
        println!();
        for dir in config.plugin_dirs() {
            println!("Plugin directory: {}", dir.display());
        }
        println!();
        println!("To add a plugin:");
        println!("  1. Create a plugin directory: mkdir -p <plugin dir>/my-plugin");
        println!("  2. Describe it in <plugin dir>/my-plugin/plugin.toml (name, version, behaviors, accessors)");
        return Ok(());
    }

    for p in plugins {
        let m = &p.manifest;
        let behaviors = if m.behaviors.is_empty() {
            "-".to_string()
        } else {
            m.behaviors.join(", ")
        };
        println!(
            "{} v{}    [{}]    provides: {}",
            m.name, m.version, m.plugin_type, behaviors
        );
        for (alias, label) in &m.accessors {
            println!("    {} -> {}", alias, label);
        }
    }

    Ok(())
}

fn plan_plugins(config: &PluginHostConfig) -> Result<()> {
    let host = PluginHost::from_config(config)?;
    let descriptors = PluginCatalog::new().descriptors(discover(config)?);

    let registered = host.register_descriptors(descriptors)?;
    host.build_chain_map(registered.as_slice())?;

    let chain_map = host.chain_map();
    if chain_map.is_empty() {
        println!("No dependencies between plugins");
    } else {
        println!("Dependency chains:");
        for (label, fqns) in chain_map.iter() {
            println!("  {} <- {}", label, fqns.join(", "));
        }
    }

    println!();
    println!("Load order:");
    for (i, fqn) in host.load_order().iter().enumerate() {
        println!("  {}. {}", i + 1, fqn);
    }

    Ok(())
}

async fn load_plugins(config: &PluginHostConfig) -> Result<()> {
    let host = PluginHost::from_config(config)?;
    let discovered = discover(config)?;

    let mut wanted = Vec::new();
    for plugin in discovered {
        let path = plugin_setting_path(&plugin.manifest.name, "enabled");
        if host.settings().get(&path).and_then(|v| v.as_bool()) == Some(false) {
            tracing::debug!(plugin = %plugin.manifest.name, "Plugin disabled, skipping");
            println!("○ {} (disabled)", plugin.manifest.fqn());
            continue;
        }
        wanted.push(plugin);
    }

    let descriptors = PluginCatalog::new().descriptors(wanted);
    match host.load_plugin_definitions(descriptors).await {
        Ok(_) | Err(PluginHostError::DependencyChain(_)) => {}
        Err(e) => return Err(e.into()),
    }

    for (fqn, instance) in host.instances() {
        println!("✓ {} {}", fqn, instance.status());
    }
    for failure in host.failures().values() {
        for line in failure_lines(failure) {
            println!("{}", line);
        }
    }

    Ok(())
}

/// Report lines for one load failure, naming where a chained failure started
fn failure_lines(failure: &DependencyChainError) -> Vec<String> {
    let mut lines = vec![format!("✗ {} {}", failure.fqn, failure.cause)];
    if failure.chain.len() > 1 {
        lines.push(format!("    via {}", failure.chain.join(" -> ")));
        lines.push(format!(
            "    caused by {}: {}",
            failure.root_fqn(),
            failure.root_cause()
        ));
    }
    lines
}

fn set_enabled(config: &PluginHostConfig, name: &str, enabled: bool) -> Result<()> {
    let settings = FileSettings::load(&config.settings_path)?;
    settings
        .set(
            &plugin_setting_path(name, "enabled"),
            toml::Value::Boolean(enabled),
        )
        .with_context(|| format!("Failed to update {}", config.settings_path.display()))?;

    if enabled {
        println!("Enabled plugin: {}", name);
        println!("Run 'weft plugin load' to start it.");
    } else {
        println!("Disabled plugin: {}", name);
    }
    Ok(())
}
