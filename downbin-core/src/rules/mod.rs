//! # Regras reativas
//!
//! Uma regra é registrada uma vez no [`Chip`] e disparada sempre que um de
//! seus gatilhos recebe bits novos. Regras corretivas desabilitam mais
//! unidades; verificadoras apenas falham com [`FsError::Infeasible`].
//!
//! | Regra | Tipo |
//! |-------|------|
//! | [`BasicGroupDisable`] | corretiva |
//! | [`GroupMaskSync`] | corretiva |
//! | [`MinGroupElementCount`] | corretiva |
//! | [`MinSubElementCount`] | corretiva |
//! | [`SubElementDependency`] | corretiva |
//! | [`CrossElementDependency`] | corretiva |
//! | [`InvalidElementCombo`] | corretiva |
//! | [`MinElementCount`] | verificadora |
//! | [`AlwaysEnable`] | verificadora |
//!
//! [`FsError::Infeasible`]: crate::error::FsError::Infeasible

use std::fmt;
use crate::chip::{Chip, ElementSetRef};
use crate::error::FsResult;
use crate::mask::Mask;
use crate::unit::UnitKind;

mod basic;
mod count;
mod dependency;
mod verify;

pub use basic::{BasicGroupDisable, GroupMaskSync};
pub use count::{MinElementCount, MinGroupElementCount, MinSubElementCount};
pub use dependency::{CrossElementDependency, InvalidElementCombo, SubElementDependency};
pub use verify::AlwaysEnable;

/// Índice de regra no registro do chip
pub type RuleId = usize;

/// Evento que dispara uma regra
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Bits novos no ElementSet
    Elements(ElementSetRef),
    /// Grupo desabilitado
    Group { set: UnitKind, index: usize },
}

/// Restrição reativa
///
/// Imutável depois de construída. `execute` relê o estado atual do chip, então
/// pode ser chamada quantas vezes for preciso sem efeito extra.
pub trait Rule: fmt::Debug + Send + Sync {
    /// Nome para diagnóstico
    fn name(&self) -> &str;

    /// Onde a regra escuta; vazio para regras executadas explicitamente
    fn triggers(&self, chip: &Chip) -> FsResult<Vec<Trigger>>;

    /// Aplica a restrição
    fn execute(&self, chip: &mut Chip) -> FsResult<()>;
}

/// Gatilhos em todos os ElementSets de `kind` de um Set
pub(crate) fn element_triggers(
    chip: &Chip,
    set: UnitKind,
    kind: UnitKind,
) -> FsResult<Vec<Trigger>> {
    let target = chip.set(set)?;
    if kind == set {
        return Ok(vec![Trigger::Elements(ElementSetRef::group_level(set))]);
    }
    (0..target.num_groups() as usize)
        .map(|group| chip.element_set_ref(set, group, kind).map(Trigger::Elements))
        .collect()
}

/// Fatia de `sub` que pertence ao elemento `element`
pub(crate) fn slice_of(sub_width: u32, element: u32, slice_len: u32) -> FsResult<Mask> {
    Mask::range(sub_width, element * slice_len, slice_len)
}
