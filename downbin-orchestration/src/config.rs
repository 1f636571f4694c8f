//! Configuração do orquestrador (`downbin.toml`)

use std::path::Path;
use serde::{Deserialize, Serialize};
use downbin_core::{DisableMode, FsSettings};
use crate::error::{OrchestrationError, OrchestrationResult};

/// Configuração do orquestrador
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    /// Como o laço guloso e as cascatas registram as desabilitações
    pub disable_mode: DisableMode,
    /// Importa os fuses `_reconfig` junto com os defeitos
    pub import_reconfig: bool,
    /// Confere `total == disable | reconfig` e a sincronia dos grupos na validação
    pub check_invariants: bool,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            disable_mode: DisableMode::Disable,
            import_reconfig: true,
            check_invariants: true,
        }
    }
}

impl OrchestratorConfig {
    /// Parse a partir de TOML
    pub fn from_toml_str(content: &str) -> OrchestrationResult<Self> {
        toml::from_str(content)
            .map_err(|e| OrchestrationError::InvalidConfiguration(format!(
                "Failed to parse config: {}",
                e
            )))
    }

    /// Carrega de arquivo
    pub fn from_file(path: &Path) -> OrchestrationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            let path = path.display();
            OrchestrationError::InvalidConfiguration(format!("Failed to read {}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Serializa para TOML
    pub fn to_toml_string(&self) -> OrchestrationResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| OrchestrationError::InvalidConfiguration(format!(
                "Failed to serialize config: {}",
                e
            )))
    }

    pub fn settings(&self) -> FsSettings {
        FsSettings::with_mode(self.disable_mode)
    }
}
