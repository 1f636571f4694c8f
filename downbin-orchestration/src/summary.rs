//! Resumo de um run, serializável

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use downbin_core::{Chip, UnitKind};
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::stage::DownbinStage;

/// Contagens finais de um tipo de unidade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UnitSummary {
    pub total: u32,
    pub enabled: u32,
    pub disabled: u32,
    pub defective: u32,
    pub reconfig: u32,
}

/// Resumo do chip ao fim (ou no meio) de um run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownbinSummary {
    pub family: String,
    pub sku: String,
    pub stage: DownbinStage,
    pub units: BTreeMap<UnitKind, UnitSummary>,
}

impl DownbinSummary {
    pub fn from_chip(
        family: &str,
        sku: &str,
        stage: DownbinStage,
        chip: &Chip,
    ) -> OrchestrationResult<Self> {
        let mut units = BTreeMap::new();
        for set in chip.sets() {
            let kinds = std::iter::once(set.group_kind()).chain(set.element_kinds());
            for kind in kinds {
                let unit = UnitSummary {
                    total: set.num_groups() * set.per_group(kind)?,
                    enabled: set.num_enabled(kind)?,
                    disabled: set.num_disabled(kind)?,
                    defective: set.num_defective(kind)?,
                    reconfig: set.num_reconfig(kind)?,
                };
                units.insert(kind, unit);
            }
        }
        Ok(Self { family: family.to_string(), sku: sku.to_string(), stage, units })
    }

    pub fn unit(&self, kind: UnitKind) -> Option<&UnitSummary> {
        self.units.get(&kind)
    }

    /// Exporta como JSON
    pub fn to_json(&self) -> OrchestrationResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| OrchestrationError::InvalidConfiguration(format!(
                "Failed to serialize summary: {}",
                e
            )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use downbin_core::{ElementSpec, SetSpec};

    #[test]
    fn test_summary_counts() {
        let mut chip = Chip::new();
        chip.add_set(&SetSpec::new(UnitKind::Gpc, 2).element(ElementSpec::new(UnitKind::Tpc, 4)))
            .unwrap();
        chip.disable_group(UnitKind::Gpc, 1).unwrap();

        let summary = DownbinSummary::from_chip("f", "s", DownbinStage::Validated, &chip).unwrap();
        let tpc = summary.unit(UnitKind::Tpc).unwrap();
        assert_eq!((tpc.total, tpc.enabled, tpc.disabled), (8, 4, 4));
        assert_eq!(summary.unit(UnitKind::Gpc).unwrap().enabled, 1);

        let json = summary.to_json().unwrap();
        assert!(json.contains("\"stage\": \"validated\""));
        assert!(json.contains("\"tpc\""));
    }
}
