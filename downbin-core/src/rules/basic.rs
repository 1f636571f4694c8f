//! Regras estruturais padrão de todo Set

use crate::chip::{Chip, ElementSetRef};
use crate::error::FsResult;
use crate::mask::Mask;
use crate::rules::{Rule, Trigger};
use crate::unit::UnitKind;

/// Grupo desabilitado ⇒ todos os ElementSets não derivados do grupo desabilitados
#[derive(Debug, Clone)]
pub struct BasicGroupDisable {
    set: UnitKind,
    group: usize,
}

impl BasicGroupDisable {
    pub fn new(set: UnitKind, group: usize) -> Self {
        Self { set, group }
    }
}

impl Rule for BasicGroupDisable {
    fn name(&self) -> &str {
        "basic-group-disable"
    }

    fn triggers(&self, _chip: &Chip) -> FsResult<Vec<Trigger>> {
        Ok(vec![Trigger::Group { set: self.set, index: self.group }])
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        let set = chip.set(self.set)?;
        let group = set.group(self.group)?;
        if !group.is_disabled() {
            return Ok(());
        }

        let mut targets = Vec::new();
        for &slot in group.element_sets().values() {
            let es = set.element_set(slot)?;
            if !es.is_derivative() {
                let target = ElementSetRef { set: self.set, slot };
                targets.push((target, Mask::full(es.num_elements())?));
            }
        }
        for (target, mask) in targets {
            chip.disable_elements(target, &mask)?;
        }
        Ok(())
    }
}

/// Bit de nível de grupo ligado ⇒ grupo desabilitado
///
/// Mantém `Group::is_disabled` e o ElementSet de nível de grupo em acordo
/// quando o bit chega por importação de defeitos ou por outra regra.
#[derive(Debug, Clone)]
pub struct GroupMaskSync {
    set: UnitKind,
}

impl GroupMaskSync {
    pub fn new(set: UnitKind) -> Self {
        Self { set }
    }
}

impl Rule for GroupMaskSync {
    fn name(&self) -> &str {
        "group-mask-sync"
    }

    fn triggers(&self, _chip: &Chip) -> FsResult<Vec<Trigger>> {
        Ok(vec![Trigger::Elements(ElementSetRef::group_level(self.set))])
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        let set = chip.set(self.set)?;
        let pending: Vec<usize> = set
            .group_level()
            .total_disable_mask()
            .iter_set()
            .map(|bit| bit as usize)
            .filter(|&index| set.groups().get(index).is_some_and(|g| !g.is_disabled()))
            .collect();

        for index in pending {
            chip.disable_group(self.set, index)?;
        }
        Ok(())
    }
}
