//! Regras verificadoras: falham em vez de corrigir

use crate::chip::{Chip, ElementSetRef};
use crate::error::{FsError, FsResult};
use crate::rules::{Rule, Trigger};
use crate::unit::UnitKind;

/// Verificadora: o bit nunca pode terminar desabilitado
#[derive(Debug, Clone)]
pub struct AlwaysEnable {
    target: ElementSetRef,
    bit: u32,
}

impl AlwaysEnable {
    pub fn new(target: ElementSetRef, bit: u32) -> Self {
        Self { target, bit }
    }

    /// Protege a unidade `index` de `kind` no grupo `group` (o próprio grupo para o tipo de grupo)
    pub fn unit(
        chip: &Chip,
        set: UnitKind,
        group: usize,
        kind: UnitKind,
        index: u32,
    ) -> FsResult<Self> {
        let target = chip.element_set_ref(set, group, kind)?;
        let bit = if kind == set { group as u32 } else { index };
        Ok(Self::new(target, bit))
    }

    pub fn target(&self) -> ElementSetRef {
        self.target
    }

    pub fn bit(&self) -> u32 {
        self.bit
    }
}

impl Rule for AlwaysEnable {
    fn name(&self) -> &str {
        "always-enable"
    }

    fn triggers(&self, chip: &Chip) -> FsResult<Vec<Trigger>> {
        chip.element_set(self.target)?.is_disabled(self.bit)?;
        Ok(vec![Trigger::Elements(self.target)])
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        let es = chip.element_set(self.target)?;
        if es.is_disabled(self.bit)? {
            return Err(FsError::infeasible(format!(
                "{} {} of group {:?} must stay enabled",
                es.kind(),
                self.bit,
                es.owner()
            )));
        }
        Ok(())
    }
}
