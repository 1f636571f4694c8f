//! Topologia do chip: contagens de instâncias e layout de fuses

use serde::{Deserialize, Serialize};
use downbin_core::{Chip, FsSettings, SetSpec, UnitKind};
use crate::error::{OrchestrationError, OrchestrationResult};

/// Descrição completa dos Sets de um chip
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ChipTopology {
    #[serde(default)]
    pub sets: Vec<SetSpec>,
}

impl ChipTopology {
    pub fn new(sets: Vec<SetSpec>) -> Self {
        Self { sets }
    }

    /// Parse a partir de JSON
    pub fn from_json(content: &str) -> OrchestrationResult<Self> {
        serde_json::from_str(content)
            .map_err(|e| OrchestrationError::InvalidConfiguration(format!(
                "Failed to parse topology: {}",
                e
            )))
    }

    pub fn set(&self, group_kind: UnitKind) -> Option<&SetSpec> {
        self.sets.iter().find(|spec| spec.group_kind == group_kind)
    }

    /// Número de grupos de um tipo (0 se ausente)
    pub fn num_groups(&self, group_kind: UnitKind) -> u32 {
        self.set(group_kind).map_or(0, |spec| spec.num_groups)
    }

    /// Constrói o chip vazio (sem defeitos) com as regras estruturais padrão
    pub fn build(&self, settings: FsSettings) -> OrchestrationResult<Chip> {
        if self.sets.is_empty() {
            return Err(OrchestrationError::InvalidConfiguration("topology has no sets".into()));
        }
        let mut chip = Chip::with_settings(settings);
        for spec in &self.sets {
            chip.add_set(spec)?;
        }
        Ok(chip)
    }
}

/// Fonte da topologia, consultada uma vez ao construir os Sets
pub trait TopologyProvider {
    fn topology(&self) -> OrchestrationResult<ChipTopology>;
}

impl TopologyProvider for ChipTopology {
    fn topology(&self) -> OrchestrationResult<ChipTopology> {
        Ok(self.clone())
    }
}
