//! Orquestrador de um run de downbin
//!
//! Um run tenta exatamente um SKU em um chip. Cada passo exige o estágio
//! anterior; um passo que falha leva a [`DownbinStage::Failed`] e todo passo
//! seguinte é recusado. Nenhum passo desfaz o que já foi aplicado.

use tracing::{debug, info, warn};
use downbin_core::Chip;
use crate::config::OrchestratorConfig;
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::families::common::{apply_must_disable, register_sku_pickers, register_sku_rules};
use crate::families::{ChipFamily, FamilyRegistry};
use crate::fuse::{export_fuses, import_fuses, FuseStore};
use crate::sku::SkuConfig;
use crate::stage::DownbinStage;
use crate::summary::DownbinSummary;
use crate::topology::TopologyProvider;
use crate::validator::{LegalityValidator, SkuLegalityValidator};

/// Orquestrador
pub struct Orchestrator {
    family: Box<dyn ChipFamily>,
    sku: SkuConfig,
    config: OrchestratorConfig,
    chip: Option<Chip>,
    stage: DownbinStage,
    /// Validadores externos, consultados depois do embutido
    validators: Vec<Box<dyn LegalityValidator>>,
}

fn built(chip: &mut Option<Chip>) -> OrchestrationResult<&mut Chip> {
    chip.as_mut().ok_or(OrchestrationError::InvalidStage {
        expected: DownbinStage::TopologyBuilt,
        found: DownbinStage::Uninitialized,
    })
}

impl Orchestrator {
    /// Cria orquestrador com configuração padrão
    pub fn new(family: Box<dyn ChipFamily>, sku: SkuConfig) -> Self {
        Self::with_config(family, sku, OrchestratorConfig::default())
    }

    /// Cria com configuração específica
    pub fn with_config(
        family: Box<dyn ChipFamily>,
        sku: SkuConfig,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            family,
            sku,
            config,
            chip: None,
            stage: DownbinStage::Uninitialized,
            validators: Vec::new(),
        }
    }

    /// Cria para uma família embutida
    pub fn for_family(name: &str, sku: SkuConfig) -> OrchestrationResult<Self> {
        Ok(Self::new(FamilyRegistry::with_builtin().create(name)?, sku))
    }

    /// Adiciona validador externo
    pub fn add_validator<V: LegalityValidator + 'static>(&mut self, validator: V) {
        self.validators.push(Box::new(validator));
    }

    pub fn stage(&self) -> DownbinStage {
        self.stage
    }

    pub fn family(&self) -> &dyn ChipFamily {
        self.family.as_ref()
    }

    pub fn sku(&self) -> &SkuConfig {
        &self.sku
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Chip construído (após `build_topology`)
    pub fn chip(&self) -> Option<&Chip> {
        self.chip.as_ref()
    }

    /// Executa um passo a partir de `expected`, avançando para o próximo estágio
    fn step<T>(
        &mut self,
        expected: DownbinStage,
        action: impl FnOnce(&mut Self) -> OrchestrationResult<T>,
    ) -> OrchestrationResult<T> {
        let invalid = OrchestrationError::InvalidStage { expected, found: self.stage };
        if self.stage != expected {
            return Err(invalid);
        }
        let next = expected.next().ok_or(invalid)?;

        match action(self) {
            Ok(value) => {
                info!(
                    family = self.family.name(),
                    sku = %self.sku.name,
                    stage = %next,
                    "stage reached"
                );
                self.stage = next;
                Ok(value)
            }
            Err(err) => {
                warn!(
                    family = self.family.name(),
                    sku = %self.sku.name,
                    stage = %expected,
                    error = %err,
                    "stage failed"
                );
                self.stage = DownbinStage::Failed;
                Err(err)
            }
        }
    }

    // =========================================================================
    // Passos
    // =========================================================================

    /// Constrói os Sets com a topologia padrão da família
    pub fn build_topology(&mut self) -> OrchestrationResult<()> {
        let topology = self.family.topology();
        self.build_topology_with(&topology)
    }

    /// Constrói os Sets a partir de outra fonte de topologia
    pub fn build_topology_with(
        &mut self,
        provider: &dyn TopologyProvider,
    ) -> OrchestrationResult<()> {
        self.step(DownbinStage::Uninitialized, |this| {
            let chip = provider.topology()?.build(this.config.settings())?;
            this.sku.check(&chip)?;
            this.chip = Some(chip);
            Ok(())
        })
    }

    /// Regras estruturais da família, depois as do SKU
    pub fn register_rules(&mut self) -> OrchestrationResult<()> {
        self.step(DownbinStage::TopologyBuilt, |this| {
            let chip = built(&mut this.chip)?;
            this.family.register_structural_rules(chip)?;
            register_sku_rules(chip, &this.sku)
        })
    }

    /// Importa os fuses de entrada e aplica `must_disable`
    ///
    /// Retorna quantos campos de fuse foram encontrados.
    pub fn import_defects(&mut self, store: &dyn FuseStore) -> OrchestrationResult<usize> {
        self.step(DownbinStage::RulesRegistered, |this| {
            let chip = built(&mut this.chip)?;
            let found = import_fuses(chip, store, this.config.import_reconfig)?;
            apply_must_disable(chip, &this.sku)?;
            Ok(found)
        })
    }

    /// Pickers do SKU, depois os da família
    pub fn register_pickers(&mut self) -> OrchestrationResult<()> {
        self.step(DownbinStage::DefectsImported, |this| {
            let chip = built(&mut this.chip)?;
            register_sku_pickers(chip, &this.sku)?;
            this.family.register_pickers(chip, &this.sku)
        })
    }

    /// Laço guloso na ordem da família; retorna quantas escolhas foram feitas
    pub fn downbin(&mut self) -> OrchestrationResult<u32> {
        self.step(DownbinStage::PickersRegistered, |this| {
            let chip = built(&mut this.chip)?;
            let mut steps = 0;
            for kind in this.family.downbin_order() {
                let Some(max) = this.sku.get(kind).and_then(|unit| unit.max_enable_count) else {
                    continue;
                };
                let taken = this.family.downbin_unit(chip, kind, max)?;
                debug!(%kind, max, taken, "unit downbinned");
                steps += taken;
            }
            Ok(steps)
        })
    }

    /// Regras globais da família
    pub fn apply_post_rules(&mut self) -> OrchestrationResult<()> {
        self.step(DownbinStage::Downbinning, |this| {
            let chip = built(&mut this.chip)?;
            this.family.post_rules(chip, &this.sku)
        })
    }

    /// Validador embutido, depois os externos
    pub fn validate(&mut self) -> OrchestrationResult<()> {
        self.step(DownbinStage::PostRulesApplied, |this| {
            let chip = built(&mut this.chip)?;
            let builtin = SkuLegalityValidator::new(
                this.family.partitions(chip)?,
                this.config.check_invariants,
            );
            builtin.validate(chip, &this.sku)?;
            for validator in &this.validators {
                validator.validate(chip, &this.sku)?;
                debug!(validator = validator.name(), "validator passed");
            }
            Ok(())
        })
    }

    /// Escreve o estado final no store de saída
    pub fn export(&mut self, store: &mut dyn FuseStore) -> OrchestrationResult<()> {
        self.step(DownbinStage::Validated, |this| {
            let chip = built(&mut this.chip)?;
            export_fuses(chip, store)
        })
    }

    /// Executa o run completo
    pub fn run(
        &mut self,
        input: &dyn FuseStore,
        output: &mut dyn FuseStore,
    ) -> OrchestrationResult<DownbinSummary> {
        self.build_topology()?;
        self.register_rules()?;
        self.import_defects(input)?;
        self.register_pickers()?;
        self.downbin()?;
        self.apply_post_rules()?;
        self.validate()?;
        self.export(output)?;
        self.summary()
    }

    /// Resumo do estado atual
    pub fn summary(&self) -> OrchestrationResult<DownbinSummary> {
        let chip = self.chip.as_ref().ok_or(OrchestrationError::InvalidStage {
            expected: DownbinStage::TopologyBuilt,
            found: self.stage,
        })?;
        DownbinSummary::from_chip(self.family.name(), &self.sku.name, self.stage, chip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use downbin_core::UnitKind;
    use crate::fuse::MemoryFuseStore;
    use crate::sku::UnitSkuConfig;

    #[test]
    fn test_steps_out_of_order() {
        let mut orch = Orchestrator::for_family("gx200", SkuConfig::new("x")).unwrap();
        assert_eq!(
            orch.downbin().unwrap_err(),
            OrchestrationError::InvalidStage {
                expected: DownbinStage::PickersRegistered,
                found: DownbinStage::Uninitialized
            }
        );
        // chamada fora de ordem não muda o estágio
        assert_eq!(orch.stage(), DownbinStage::Uninitialized);
        assert!(orch.summary().is_err());

        orch.build_topology().unwrap();
        assert_eq!(orch.stage(), DownbinStage::TopologyBuilt);
        assert!(orch.build_topology().is_err());
    }

    #[test]
    fn test_failure_is_terminal() {
        let sku = SkuConfig::new("strict")
            .unit(UnitKind::Tpc, UnitSkuConfig { min_enable_count: Some(36), ..Default::default() });
        let mut orch = Orchestrator::for_family("gx200", sku).unwrap();
        orch.build_topology().unwrap();
        orch.register_rules().unwrap();

        let fuses = MemoryFuseStore::new().with("opt_tpc_gpc0_defective", 0b1);
        assert!(orch.import_defects(&fuses).unwrap_err().is_infeasible());
        assert_eq!(orch.stage(), DownbinStage::Failed);
        assert!(matches!(
            orch.register_pickers(),
            Err(OrchestrationError::InvalidStage { found: DownbinStage::Failed, .. })
        ));
    }

    #[test]
    fn test_bad_sku_fails_at_topology() {
        let sku = SkuConfig::new("x").unit(UnitKind::Rop, UnitSkuConfig::default());
        let mut orch = Orchestrator::for_family("gx200", sku).unwrap();
        assert!(orch.build_topology().is_err());
        assert_eq!(orch.stage(), DownbinStage::Failed);
    }

    #[test]
    fn test_unknown_family() {
        assert!(matches!(
            Orchestrator::for_family("gx999", SkuConfig::new("x")),
            Err(OrchestrationError::UnknownFamily(_))
        ));
    }
}
