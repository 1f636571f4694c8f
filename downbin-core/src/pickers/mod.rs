//! # Pickers — filtros heurísticos da busca gulosa
//!
//! Um picker recebe a máscara de candidatos e devolve um subconjunto dela.
//! Os pickers de um Set formam cadeias por papel, executadas em ordem de
//! registro (a primeira registrada tem maior prioridade):
//!
//! ```text
//! disable_one_group:    enabled ─▶ [GroupPicker]* ─▶ menor índice
//! disable_one_element:  grupos  ─▶ [GroupPicker]* ─▶ grupo
//!                       elementos do grupo ─▶ [ElementPicker]* ─▶ menor índice
//! ```
//!
//! Pickers "suaves" devolvem a entrada inalterada quando o filtro esvaziaria
//! a máscara; os "rígidos" deixam o esvaziamento virar inviabilidade.

use std::fmt;
use crate::chip::Chip;
use crate::error::FsResult;
use crate::mask::Mask;

mod element;
mod group;

pub use element::{BalancedParent, ExcludeProtected, MostDisabledDependents, PreferenceMask};
pub use group::{
    ExcludeProtectedGroups, FewestProtectedOrDisabled, MostDisabledSubunits, PairedIndexPicker,
    PartitionBalance, PreferredOrder,
};

/// Escolhe entre índices de grupo
pub trait GroupPicker: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Estreita `candidates` (bits = índices de grupo)
    fn pick(&self, chip: &Chip, candidates: &Mask) -> FsResult<Mask>;
}

/// Escolhe entre elementos de um grupo
pub trait ElementPicker: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// Estreita `candidates` (bits = índices de elemento dentro de `group`)
    fn pick(&self, chip: &Chip, group: usize, candidates: &Mask) -> FsResult<Mask>;
}

/// Mantém os candidatos de maior pontuação
pub(crate) fn keep_max(candidates: &Mask, score: impl Fn(u32) -> FsResult<u32>) -> FsResult<Mask> {
    keep_best(candidates, score, |a, b| a > b)
}

/// Mantém os candidatos de menor pontuação
pub(crate) fn keep_min(candidates: &Mask, score: impl Fn(u32) -> FsResult<u32>) -> FsResult<Mask> {
    keep_best(candidates, score, |a, b| a < b)
}

fn keep_best(
    candidates: &Mask,
    score: impl Fn(u32) -> FsResult<u32>,
    better: impl Fn(u32, u32) -> bool,
) -> FsResult<Mask> {
    let mut best: Option<u32> = None;
    let mut kept = Mask::new(candidates.width())?;
    for bit in candidates.iter_set() {
        let value = score(bit)?;
        match best {
            Some(current) if value == current => kept.set_bit(bit)?,
            Some(current) if !better(value, current) => {}
            _ => {
                best = Some(value);
                kept.clear_all();
                kept.set_bit(bit)?;
            }
        }
    }
    Ok(kept)
}
