//! Pickers de elemento

use crate::chip::Chip;
use crate::error::{FsError, FsResult};
use crate::mask::Mask;
use crate::pickers::{keep_max, ElementPicker};
use crate::rules::slice_of;
use crate::unit::UnitKind;

/// Prefere elementos sob o pai com mais irmãos habilitados
///
/// Ex.: TPCs agrupados por CPC; retirar do CPC mais cheio equilibra o dano.
#[derive(Debug, Clone)]
pub struct BalancedParent {
    set: UnitKind,
    kind: UnitKind,
    parent: UnitKind,
}

impl BalancedParent {
    pub fn new(set: UnitKind, kind: UnitKind, parent: UnitKind) -> Self {
        Self { set, kind, parent }
    }
}

impl ElementPicker for BalancedParent {
    fn name(&self) -> &str {
        "balanced-parent"
    }

    fn pick(&self, chip: &Chip, group: usize, candidates: &Mask) -> FsResult<Mask> {
        let set = chip.set(self.set)?;
        let slice_len = set.slice_len(self.parent, self.kind)?;
        let elements = set.element_set_in(group, self.kind)?;
        let enabled = elements.enabled_mask();
        keep_max(candidates, |element| {
            let siblings = slice_of(elements.num_elements(), element / slice_len, slice_len)?;
            Ok(enabled.and(&siblings)?.num_set_bits())
        })
    }
}

/// Descarta elementos protegidos (rígido)
#[derive(Debug, Clone)]
pub struct ExcludeProtected {
    set: UnitKind,
    kind: UnitKind,
}

impl ExcludeProtected {
    pub fn new(set: UnitKind, kind: UnitKind) -> Self {
        Self { set, kind }
    }
}

impl ElementPicker for ExcludeProtected {
    fn name(&self) -> &str {
        "exclude-protected"
    }

    fn pick(&self, chip: &Chip, group: usize, candidates: &Mask) -> FsResult<Mask> {
        let es = chip.set(self.set)?.element_set_in(group, self.kind)?;
        candidates.and_not(es.protected_mask())
    }
}

/// Prefere o elemento cujos dependentes estão mais desabilitados
#[derive(Debug, Clone)]
pub struct MostDisabledDependents {
    set: UnitKind,
    kind: UnitKind,
    dependent: UnitKind,
}

impl MostDisabledDependents {
    pub fn new(set: UnitKind, kind: UnitKind, dependent: UnitKind) -> Self {
        Self { set, kind, dependent }
    }
}

impl ElementPicker for MostDisabledDependents {
    fn name(&self) -> &str {
        "most-disabled-dependents"
    }

    fn pick(&self, chip: &Chip, group: usize, candidates: &Mask) -> FsResult<Mask> {
        let set = chip.set(self.set)?;
        let slice_len = set.slice_len(self.kind, self.dependent)?;
        let dependents = set.element_set_in(group, self.dependent)?;
        keep_max(candidates, |element| {
            let slice = slice_of(dependents.num_elements(), element, slice_len)?;
            Ok(dependents.total_disable_mask().and(&slice)?.num_set_bits())
        })
    }
}

/// Viés para uma máscara preferida (suave)
#[derive(Debug, Clone)]
pub struct PreferenceMask {
    set: UnitKind,
    kind: UnitKind,
    preferred: Mask,
}

impl PreferenceMask {
    pub fn new(set: UnitKind, kind: UnitKind, preferred: Mask) -> Self {
        Self { set, kind, preferred }
    }
}

impl ElementPicker for PreferenceMask {
    fn name(&self) -> &str {
        "preference-mask"
    }

    fn pick(&self, chip: &Chip, group: usize, candidates: &Mask) -> FsResult<Mask> {
        let width = chip.set(self.set)?.element_set_in(group, self.kind)?.num_elements();
        if self.preferred.width() != width {
            return Err(FsError::WidthMismatch { expected: width, found: self.preferred.width() });
        }
        let kept = candidates.and(&self.preferred)?;
        if kept.is_empty() { Ok(*candidates) } else { Ok(kept) }
    }
}
