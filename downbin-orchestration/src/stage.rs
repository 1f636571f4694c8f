//! Máquina de estágios de um run de downbin

use std::fmt;
use serde::{Deserialize, Serialize};

/// Estágio do run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DownbinStage {
    Uninitialized = 0,
    /// Sets construídos a partir da topologia
    TopologyBuilt = 1,
    /// Regras estruturais e de SKU registradas
    RulesRegistered = 2,
    /// Defeitos e reconfigurações importados dos fuses
    DefectsImported = 3,
    /// Cadeias de pickers registradas
    PickersRegistered = 4,
    /// Laço guloso em andamento
    Downbinning = 5,
    /// Regras globais de pós-processamento aplicadas
    PostRulesApplied = 6,
    /// Validadores aprovaram
    Validated = 7,
    /// Fuses escritos
    Exported = 8,
    /// Terminal: um passo falhou
    Failed = 9,
}

impl DownbinStage {
    /// Retorna próximo estágio
    pub fn next(&self) -> Option<DownbinStage> {
        match self {
            DownbinStage::Uninitialized => Some(DownbinStage::TopologyBuilt),
            DownbinStage::TopologyBuilt => Some(DownbinStage::RulesRegistered),
            DownbinStage::RulesRegistered => Some(DownbinStage::DefectsImported),
            DownbinStage::DefectsImported => Some(DownbinStage::PickersRegistered),
            DownbinStage::PickersRegistered => Some(DownbinStage::Downbinning),
            DownbinStage::Downbinning => Some(DownbinStage::PostRulesApplied),
            DownbinStage::PostRulesApplied => Some(DownbinStage::Validated),
            DownbinStage::Validated => Some(DownbinStage::Exported),
            DownbinStage::Exported | DownbinStage::Failed => None,
        }
    }

    /// Lista o caminho feliz em ordem
    pub fn all() -> Vec<DownbinStage> {
        vec![
            DownbinStage::Uninitialized,
            DownbinStage::TopologyBuilt,
            DownbinStage::RulesRegistered,
            DownbinStage::DefectsImported,
            DownbinStage::PickersRegistered,
            DownbinStage::Downbinning,
            DownbinStage::PostRulesApplied,
            DownbinStage::Validated,
            DownbinStage::Exported,
        ]
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DownbinStage::Exported | DownbinStage::Failed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DownbinStage::Uninitialized => "uninitialized",
            DownbinStage::TopologyBuilt => "topology-built",
            DownbinStage::RulesRegistered => "rules-registered",
            DownbinStage::DefectsImported => "defects-imported",
            DownbinStage::PickersRegistered => "pickers-registered",
            DownbinStage::Downbinning => "downbinning",
            DownbinStage::PostRulesApplied => "post-rules-applied",
            DownbinStage::Validated => "validated",
            DownbinStage::Exported => "exported",
            DownbinStage::Failed => "failed",
        }
    }
}

impl fmt::Display for DownbinStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
