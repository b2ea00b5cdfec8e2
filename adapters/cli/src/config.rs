//! TOML configuration of the command-line adapter.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use nightwatch_core::CellCoord;
use nightwatch_system_agents::AgentProfile;
use nightwatch_system_detection::DetectionConfig;
use nightwatch_system_map_generation::MapConfig;
use nightwatch_system_visibility::ViewConfig;
use serde::Deserialize;

/// Everything the CLI can be tuned with. Missing tables keep their defaults.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct CliConfig {
    /// Map generator settings.
    pub(crate) map: MapConfig,
    /// Detection counter settings.
    pub(crate) detection: DetectionConfig,
    /// View shared by agents spawned from the map's enemy placements.
    pub(crate) view: ViewConfig,
    /// Extra agents placed by hand.
    pub(crate) agents: Vec<AgentSpec>,
}

/// Hand-placed agent.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub(crate) struct AgentSpec {
    /// Name used in logs.
    pub(crate) name: String,
    /// Cell the agent stands on.
    pub(crate) cell: CellCoord,
    /// Behaviour of the agent.
    #[serde(default)]
    pub(crate) profile: AgentProfile,
    /// View overriding the shared one.
    #[serde(default)]
    pub(crate) view: Option<ViewConfig>,
}

impl CliConfig {
    /// Loads the configuration at `path`, or the defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };

        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let config: Self = toml::from_str(&text)
            .with_context(|| format!("failed to parse config {}", path.display()))?;
        config
            .map
            .validate()
            .with_context(|| format!("invalid [map] table in {}", path.display()))?;
        tracing::debug!(path = %path.display(), agents = config.agents.len(), "loaded config");
        Ok(config)
    }
}
