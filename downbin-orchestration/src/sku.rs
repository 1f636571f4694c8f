//! Configuração de SKU: alvos por tipo de unidade
//!
//! ```toml
//! name = "gx100-a"
//!
//! [units.tpc]
//! min_enable_count = 60
//! max_enable_count = 64
//! min_enable_per_group = 7
//! must_enable = [0]          # índices achatados: grupo * por_grupo + índice
//! skyline = [7, 8, 8, 8, 8, 8, 8, 9]
//!
//! [units.fbp]
//! max_enable_count = 10
//! max_imbalance = 1
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use serde::{Deserialize, Serialize};
use downbin_core::{Chip, UnitKind};
use crate::error::{OrchestrationError, OrchestrationResult};

/// Alvos de um tipo de unidade
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitSkuConfig {
    /// Piso global de habilitados
    pub min_enable_count: Option<u32>,
    /// Teto global de habilitados; o laço guloso desabilita até alcançá-lo
    pub max_enable_count: Option<u32>,
    /// Piso de habilitados em cada grupo habilitado
    pub min_enable_per_group: Option<u32>,
    /// Unidades que nunca podem ser desabilitadas
    pub must_enable: Vec<u32>,
    /// Unidades desabilitadas logo após a importação de defeitos
    pub must_disable: Vec<u32>,
    /// Perfil mínimo ordenado por grupo (vazio = sem skyline)
    pub skyline: Vec<u32>,
    /// Diferença máxima de habilitados entre partições da família
    pub max_imbalance: Option<u32>,
}

/// SKU alvo
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SkuConfig {
    pub name: String,
    #[serde(default)]
    pub units: BTreeMap<UnitKind, UnitSkuConfig>,
}

impl SkuConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), units: BTreeMap::new() }
    }

    /// Adiciona/substitui os alvos de um tipo
    pub fn unit(mut self, kind: UnitKind, config: UnitSkuConfig) -> Self {
        self.units.insert(kind, config);
        self
    }

    pub fn get(&self, kind: UnitKind) -> Option<&UnitSkuConfig> {
        self.units.get(&kind)
    }

    /// Parse a partir de TOML
    pub fn from_toml_str(content: &str) -> OrchestrationResult<Self> {
        toml::from_str(content)
            .map_err(|e| OrchestrationError::InvalidConfiguration(format!(
                "Failed to parse SKU: {}",
                e
            )))
    }

    /// Carrega de arquivo TOML
    pub fn from_file(path: &Path) -> OrchestrationResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            let path = path.display();
            OrchestrationError::InvalidConfiguration(format!("Failed to read {}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Confere o SKU contra a topologia construída
    pub fn check(&self, chip: &Chip) -> OrchestrationResult<()> {
        for (&kind, unit) in &self.units {
            let set = chip.set_of(kind).map_err(|_| {
                OrchestrationError::InvalidConfiguration(format!(
                    "SKU {} names {kind}, absent from the chip",
                    self.name
                ))
            })?;
            let total = set.num_groups() * set.per_group(kind)?;

            if let (Some(min), Some(max)) = (unit.min_enable_count, unit.max_enable_count) {
                if min > max {
                    return Err(OrchestrationError::InvalidConfiguration(format!(
                        "{kind}: min_enable_count {min} above max_enable_count {max}"
                    )));
                }
            }
            for &flat in unit.must_enable.iter().chain(&unit.must_disable) {
                if flat >= total {
                    return Err(OrchestrationError::InvalidConfiguration(format!(
                        "{kind}: unit {flat} outside the {total} available"
                    )));
                }
            }
            let clash = unit.must_enable.iter().find(|flat| unit.must_disable.contains(flat));
            if let Some(flat) = clash {
                return Err(OrchestrationError::InvalidConfiguration(format!(
                    "{kind}: unit {flat} is both must_enable and must_disable"
                )));
            }
            if unit.skyline.len() > set.num_groups() as usize {
                return Err(OrchestrationError::InvalidConfiguration(format!(
                    "{kind}: skyline longer than the {} groups",
                    set.num_groups()
                )));
            }
        }
        Ok(())
    }
}

/// Converte índice achatado em `(grupo, índice no grupo)`
pub fn split_flat(chip: &Chip, kind: UnitKind, flat: u32) -> OrchestrationResult<(usize, u32)> {
    let set = chip.set_of(kind)?;
    if kind == set.group_kind() {
        return Ok((flat as usize, 0));
    }
    let per_group = set.per_group(kind)?;
    Ok(((flat / per_group) as usize, flat % per_group))
}
