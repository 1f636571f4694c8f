//! # Famílias de chip
//!
//! Cada família fornece a topologia padrão e decide quais regras
//! estruturais e pickers registrar; o restante da maquinaria é comum.

use std::collections::{BTreeMap, HashMap};
use downbin_core::{Chip, Mask, UnitKind};
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::sku::SkuConfig;
use crate::topology::ChipTopology;

pub mod common;
pub mod gx100;
pub mod gx200;
pub mod slice_pattern;

pub use gx100::Gx100;
pub use gx200::Gx200;
pub use slice_pattern::SlicePatternRule;

/// Especialização por família de chip
pub trait ChipFamily: Send + Sync {
    fn name(&self) -> &str;

    /// Topologia padrão da família
    fn topology(&self) -> ChipTopology;

    /// Regras físicas (dependências, pares, combinações proibidas)
    fn register_structural_rules(&self, chip: &mut Chip) -> OrchestrationResult<()>;

    /// Cadeias de pickers da família; as do SKU já foram registradas
    fn register_pickers(&self, chip: &mut Chip, sku: &SkuConfig) -> OrchestrationResult<()>;

    /// Tipos reduzidos pelo laço guloso, em ordem
    fn downbin_order(&self) -> Vec<UnitKind>;

    /// Reduz `kind` até no máximo `max_enabled`; retorna quantas escolhas fez
    fn downbin_unit(
        &self,
        chip: &mut Chip,
        kind: UnitKind,
        max_enabled: u32,
    ) -> OrchestrationResult<u32> {
        common::downbin_to(chip, kind, max_enabled)
    }

    /// Regras globais executadas depois do laço guloso
    fn post_rules(&self, _chip: &mut Chip, _sku: &SkuConfig) -> OrchestrationResult<()> {
        Ok(())
    }

    /// Partições físicas por tipo de grupo (balanceamento)
    fn partitions(&self, _chip: &Chip) -> OrchestrationResult<BTreeMap<UnitKind, Vec<Mask>>> {
        Ok(BTreeMap::new())
    }
}

/// Construtor de família
pub type FamilyFactory = fn() -> Box<dyn ChipFamily>;

/// Registro de famílias por nome
#[derive(Debug, Clone, Default)]
pub struct FamilyRegistry {
    factories: HashMap<String, FamilyFactory>,
}

impl FamilyRegistry {
    /// Cria registro vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Cria registro com as famílias embutidas
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.factories.insert("gx100".into(), gx100::boxed);
        registry.factories.insert("gx200".into(), gx200::boxed);
        registry
    }

    /// Registra família
    pub fn register(
        &mut self,
        name: impl Into<String>,
        factory: FamilyFactory,
    ) -> OrchestrationResult<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(OrchestrationError::InvalidConfiguration(format!(
                "family {name} already registered"
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Instancia família pelo nome
    pub fn create(&self, name: &str) -> OrchestrationResult<Box<dyn ChipFamily>> {
        self.factories
            .get(name)
            .map(|factory| factory())
            .ok_or_else(|| OrchestrationError::UnknownFamily(name.to_string()))
    }

    /// Nomes registrados, ordenados
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
