//! Pickers de grupo

use crate::chip::Chip;
use crate::error::{FsError, FsResult};
use crate::mask::Mask;
use crate::pickers::{keep_max, keep_min, GroupPicker};
use crate::unit::UnitKind;

/// Prefere o grupo com mais `kind` já desabilitados (concentra o dano)
#[derive(Debug, Clone)]
pub struct MostDisabledSubunits {
    set: UnitKind,
    kind: UnitKind,
}

impl MostDisabledSubunits {
    pub fn new(set: UnitKind, kind: UnitKind) -> Self {
        Self { set, kind }
    }
}

impl GroupPicker for MostDisabledSubunits {
    fn name(&self) -> &str {
        "most-disabled-subunits"
    }

    fn pick(&self, chip: &Chip, candidates: &Mask) -> FsResult<Mask> {
        let set = chip.set(self.set)?;
        keep_max(candidates, |group| set.num_disabled_in_group(group as usize, self.kind))
    }
}

/// Prefere o grupo com menos `kind` protegidos e/ou desabilitados
#[derive(Debug, Clone)]
pub struct FewestProtectedOrDisabled {
    set: UnitKind,
    kind: UnitKind,
    check_protected: bool,
    check_disabled: bool,
}

impl FewestProtectedOrDisabled {
    pub fn new(set: UnitKind, kind: UnitKind, check_protected: bool, check_disabled: bool) -> Self {
        Self { set, kind, check_protected, check_disabled }
    }
}

impl GroupPicker for FewestProtectedOrDisabled {
    fn name(&self) -> &str {
        "fewest-protected-or-disabled"
    }

    fn pick(&self, chip: &Chip, candidates: &Mask) -> FsResult<Mask> {
        let set = chip.set(self.set)?;
        keep_min(candidates, |group| {
            let group = group as usize;
            let mut score = 0;
            if self.check_protected {
                score += set.num_protected_in_group(group, self.kind)?;
            }
            if self.check_disabled {
                score += set.num_disabled_in_group(group, self.kind)?;
            }
            Ok(score)
        })
    }
}

/// Equilibra partições físicas fixas
///
/// Mantém os candidatos das partições com mais unidades habilitadas
/// (grupos habilitados, ou `kind` habilitados quando informado).
/// Candidatos fora de toda partição passam intactos se nenhuma partição
/// tiver candidatos.
#[derive(Debug, Clone)]
pub struct PartitionBalance {
    set: UnitKind,
    partitions: Vec<Mask>,
    kind: Option<UnitKind>,
}

impl PartitionBalance {
    pub fn new(set: UnitKind, partitions: Vec<Mask>) -> Self {
        Self { set, partitions, kind: None }
    }

    /// Mede cada partição pelos `kind` habilitados
    pub fn counting(mut self, kind: UnitKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn partitions(&self) -> &[Mask] {
        &self.partitions
    }
}

impl GroupPicker for PartitionBalance {
    fn name(&self) -> &str {
        "partition-balance"
    }

    fn pick(&self, chip: &Chip, candidates: &Mask) -> FsResult<Mask> {
        let set = chip.set(self.set)?;
        let mut best: Option<u32> = None;
        let mut kept = Mask::new(candidates.width())?;
        for partition in &self.partitions {
            let in_partition = candidates.and(partition)?;
            if in_partition.is_empty() {
                continue;
            }
            let mut enabled = 0;
            for group in partition.iter_set() {
                enabled += match self.kind {
                    Some(kind) => set.num_enabled_in_group(group as usize, kind)?,
                    None => set.num_enabled_in_group(group as usize, self.set)?,
                };
            }
            match best {
                Some(current) if enabled < current => {}
                Some(current) if enabled == current => kept = kept.or(&in_partition)?,
                _ => {
                    best = Some(enabled);
                    kept = in_partition;
                }
            }
        }
        if best.is_none() {
            return Ok(*candidates);
        }
        Ok(kept)
    }
}

/// Ordem física preferida de desabilitação
///
/// Mantém apenas o primeiro candidato que aparece em `order`; sem nenhum,
/// devolve a entrada.
#[derive(Debug, Clone)]
pub struct PreferredOrder {
    set: UnitKind,
    order: Vec<usize>,
}

impl PreferredOrder {
    pub fn new(set: UnitKind, order: Vec<usize>) -> Self {
        Self { set, order }
    }
}

impl GroupPicker for PreferredOrder {
    fn name(&self) -> &str {
        "preferred-order"
    }

    fn pick(&self, chip: &Chip, candidates: &Mask) -> FsResult<Mask> {
        let set = chip.set(self.set)?;
        if candidates.width() != set.num_groups() {
            return Err(FsError::WidthMismatch {
                expected: set.num_groups(),
                found: candidates.width(),
            });
        }
        for &group in &self.order {
            let bit = group as u32;
            if bit < candidates.width() && candidates.is_set(bit)? {
                return Mask::with_bit(candidates.width(), bit);
            }
        }
        Ok(*candidates)
    }
}

/// Alinha grupos com o mesmo índice em outro Set
///
/// `avoid`: descarta candidatos cuja contraparte já está desabilitada.
/// `prefer`: mantém só esses candidatos. Os dois são suaves.
#[derive(Debug, Clone)]
pub struct PairedIndexPicker {
    set: UnitKind,
    other: UnitKind,
    prefer_disabled: bool,
}

impl PairedIndexPicker {
    pub fn avoid(set: UnitKind, other: UnitKind) -> Self {
        Self { set, other, prefer_disabled: false }
    }

    pub fn prefer(set: UnitKind, other: UnitKind) -> Self {
        Self { set, other, prefer_disabled: true }
    }
}

impl GroupPicker for PairedIndexPicker {
    fn name(&self) -> &str {
        "paired-index"
    }

    fn pick(&self, chip: &Chip, candidates: &Mask) -> FsResult<Mask> {
        chip.set(self.set)?;
        let other = chip.set(self.other)?;
        let mut paired_disabled = Mask::new(candidates.width())?;
        for group in candidates.iter_set() {
            if other.groups().get(group as usize).is_some_and(|g| g.is_disabled()) {
                paired_disabled.set_bit(group)?;
            }
        }

        let kept = if self.prefer_disabled {
            paired_disabled
        } else {
            candidates.and_not(&paired_disabled)?
        };
        if kept.is_empty() { Ok(*candidates) } else { Ok(kept) }
    }
}

/// Descarta grupos protegidos (rígido)
#[derive(Debug, Clone)]
pub struct ExcludeProtectedGroups {
    set: UnitKind,
}

impl ExcludeProtectedGroups {
    pub fn new(set: UnitKind) -> Self {
        Self { set }
    }
}

impl GroupPicker for ExcludeProtectedGroups {
    fn name(&self) -> &str {
        "exclude-protected-groups"
    }

    fn pick(&self, chip: &Chip, candidates: &Mask) -> FsResult<Mask> {
        candidates.and_not(&chip.set(self.set)?.protected_groups()?)
    }
}
