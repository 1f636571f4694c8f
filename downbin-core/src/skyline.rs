//! # Skyline — piso ordenado de contagens por grupo
//!
//! O skyline é o vetor de mínimos por grupo exigido pelo produto, sem
//! associação a um grupo específico. A configuração atual satisfaz o
//! skyline quando, com os dois vetores em ordem crescente e o mais curto
//! completado com zeros à esquerda, cada posição atual domina a exigida:
//!
//! ```text
//! exigido:  [0, 2, 4, 4]
//! atual:    [3, 4, 4, 5]   ✓
//! atual:    [1, 4, 4, 5]   ✓   (1 ≥ 0)
//! atual:    [0, 1, 4, 5]   ✗   (1 < 2)
//! ```

use serde::{Deserialize, Serialize};
use crate::chip::{Chip, ElementSetRef};
use crate::error::{FsError, FsResult};
use crate::mask::Mask;
use crate::pickers::GroupPicker;
use crate::rules::{element_triggers, Rule, Trigger};
use crate::set::Set;
use crate::unit::UnitKind;

/// Verifica dominância elemento a elemento após ordenação
pub fn skyline_feasible(required: &[u32], current: &[u32]) -> bool {
    let mut required = required.to_vec();
    let mut current = current.to_vec();
    required.sort_unstable();
    current.sort_unstable();

    let len = required.len().max(current.len());
    let pad = |v: &[u32], i: usize| -> u32 {
        let offset = len - v.len();
        if i < offset { 0 } else { v[i - offset] }
    };
    (0..len).all(|i| pad(&current, i) >= pad(&required, i))
}

/// Contagem habilitada de `kind` por grupo; grupos desabilitados contam 0
pub fn enabled_profile(set: &Set, kind: UnitKind) -> FsResult<Vec<u32>> {
    set.groups()
        .iter()
        .map(|group| {
            if group.is_disabled() {
                Ok(0)
            } else {
                set.num_enabled_in_group(group.index(), kind)
            }
        })
        .collect()
}

/// Verificadora: o perfil habilitado deve continuar dominando o skyline
#[derive(Debug, Clone)]
pub struct SkylineRule {
    set: UnitKind,
    kind: UnitKind,
    skyline: Vec<u32>,
}

impl SkylineRule {
    pub fn new(set: UnitKind, kind: UnitKind, skyline: Vec<u32>) -> Self {
        Self { set, kind, skyline }
    }

    pub fn skyline(&self) -> &[u32] {
        &self.skyline
    }
}

impl Rule for SkylineRule {
    fn name(&self) -> &str {
        "skyline"
    }

    fn triggers(&self, chip: &Chip) -> FsResult<Vec<Trigger>> {
        let set = chip.set(self.set)?;
        if self.skyline.len() > set.num_groups() as usize {
            return Err(FsError::InvalidArgument(format!(
                "skyline of {} entries for {} {} groups",
                self.skyline.len(),
                set.num_groups(),
                self.set
            )));
        }
        let mut triggers = element_triggers(chip, self.set, self.kind)?;
        if self.kind != self.set {
            triggers.push(Trigger::Elements(ElementSetRef::group_level(self.set)));
        }
        Ok(triggers)
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        let profile = enabled_profile(chip.set(self.set)?, self.kind)?;
        if !skyline_feasible(&self.skyline, &profile) {
            return Err(FsError::infeasible(format!(
                "{} profile {profile:?} no longer covers skyline {:?}",
                self.kind, self.skyline
            )));
        }
        Ok(())
    }
}

/// O que o candidato perde ao ser escolhido
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkylineMode {
    /// O grupo inteiro
    DisableGroup,
    /// Um elemento do grupo
    ReduceElement,
}

/// Descarta candidatos cuja perda quebraria o skyline (rígido)
#[derive(Debug, Clone)]
pub struct SkylinePicker {
    set: UnitKind,
    kind: UnitKind,
    skyline: Vec<u32>,
    mode: SkylineMode,
}

impl SkylinePicker {
    pub fn new(set: UnitKind, kind: UnitKind, skyline: Vec<u32>, mode: SkylineMode) -> Self {
        Self { set, kind, skyline, mode }
    }
}

impl GroupPicker for SkylinePicker {
    fn name(&self) -> &str {
        "skyline"
    }

    fn pick(&self, chip: &Chip, candidates: &Mask) -> FsResult<Mask> {
        let profile = enabled_profile(chip.set(self.set)?, self.kind)?;
        let mut kept = Mask::new(candidates.width())?;
        for group in candidates.iter_set() {
            let index = group as usize;
            if index >= profile.len() {
                return Err(FsError::IndexOutOfRange { index, count: profile.len() });
            }
            let mut simulated = profile.clone();
            simulated[index] = match self.mode {
                SkylineMode::DisableGroup => 0,
                SkylineMode::ReduceElement => simulated[index].saturating_sub(1),
            };
            if skyline_feasible(&self.skyline, &simulated) {
                kept.set_bit(group)?;
            }
        }
        Ok(kept)
    }
}
