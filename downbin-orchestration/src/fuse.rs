//! # Fuses — importação de defeitos e exportação do resultado
//!
//! Nomes determinísticos:
//!
//! ```text
//! opt_<tipo>_<campo>                  layout achatado (grupo g no bit g * por_grupo)
//! opt_<tipo>_<grupo><índice>_<campo>  layout por grupo
//!
//! campo ∈ { disable | enable, defective, reconfig }
//! ```
//!
//! Tipos de grupo usam sempre o layout achatado sobre os índices de grupo.

use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use downbin_core::{Chip, DisableMode, FusePolarity, FuseLayout, Mask, Set, UnitKind, MAX_WIDTH};
use crate::error::{OrchestrationError, OrchestrationResult};

/// Campo de fuse de uma unidade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FuseField {
    Disable,
    Enable,
    Defective,
    Reconfig,
}

impl FuseField {
    pub fn suffix(&self) -> &'static str {
        match self {
            FuseField::Disable => "disable",
            FuseField::Enable => "enable",
            FuseField::Defective => "defective",
            FuseField::Reconfig => "reconfig",
        }
    }

    /// Campo principal de um layout
    pub fn primary(layout: &FuseLayout) -> Self {
        match layout.polarity {
            FusePolarity::Disable => FuseField::Disable,
            FusePolarity::Enable => FuseField::Enable,
        }
    }
}

/// Monta o nome do fuse
///
/// `group` = `Some((tipo_de_grupo, índice))` para layouts por grupo.
pub fn fuse_name(kind: UnitKind, group: Option<(UnitKind, usize)>, field: FuseField) -> String {
    match group {
        Some((group_kind, index)) => format!("opt_{kind}_{group_kind}{index}_{}", field.suffix()),
        None => format!("opt_{kind}_{}", field.suffix()),
    }
}

/// Armazenamento de valores de fuse
pub trait FuseStore {
    fn read(&self, name: &str) -> Option<u32>;
    fn write(&mut self, name: &str, value: u32);
}

/// Store em memória, exportável como JSON
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MemoryFuseStore {
    fuses: BTreeMap<String, u32>,
}

impl MemoryFuseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder para montar defeitos em testes e ferramentas
    pub fn with(mut self, name: impl Into<String>, value: u32) -> Self {
        self.fuses.insert(name.into(), value);
        self
    }

    pub fn len(&self) -> usize {
        self.fuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fuses.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.fuses.iter().map(|(name, &value)| (name.as_str(), value))
    }

    pub fn to_json(&self) -> OrchestrationResult<String> {
        serde_json::to_string_pretty(&self.fuses)
            .map_err(|e| OrchestrationError::Fuse(format!("Failed to serialize fuses: {}", e)))
    }

    pub fn from_json(content: &str) -> OrchestrationResult<Self> {
        let fuses = serde_json::from_str(content)
            .map_err(|e| OrchestrationError::Fuse(format!("Failed to parse fuses: {}", e)))?;
        Ok(Self { fuses })
    }
}

impl FuseStore for MemoryFuseStore {
    fn read(&self, name: &str) -> Option<u32> {
        self.fuses.get(name).copied()
    }

    fn write(&mut self, name: &str, value: u32) {
        self.fuses.insert(name.to_string(), value);
    }
}

/// Tipos de um Set na ordem de importação: elementos antes do nível de grupo
fn kinds_in_order(set: &Set) -> Vec<UnitKind> {
    let mut kinds: Vec<UnitKind> = set.element_kinds().collect();
    kinds.push(set.group_kind());
    kinds
}

fn is_per_group(set: &Set, kind: UnitKind, layout: &FuseLayout) -> bool {
    layout.per_group && kind != set.group_kind()
}

/// Lê um campo: uma máscara por ElementSet de `kind`; `None` se nenhum fuse existe
fn read_field(
    store: &dyn FuseStore,
    set: &Set,
    kind: UnitKind,
    field: FuseField,
) -> OrchestrationResult<Option<Vec<Mask>>> {
    let layout = set.fuse_layout(kind)?;
    let width = set.per_group(kind)?;
    let to_mask = |name: &str, width: u32, value: u32| {
        Mask::from_bits(width, value)
            .map_err(|_| OrchestrationError::Fuse(format!(
                "{name} = {value:#x} wider than {width} bits"
            )))
    };

    if is_per_group(set, kind, &layout) {
        let mut masks = Vec::with_capacity(set.num_groups() as usize);
        let mut found = false;
        for group in 0..set.num_groups() as usize {
            let name = fuse_name(kind, Some((set.group_kind(), group)), field);
            // fuse ausente não altera o grupo
            let mask = match store.read(&name) {
                Some(value) => {
                    found = true;
                    to_mask(&name, width, value)?
                }
                None if field == FuseField::Enable => Mask::full(width)?,
                None => Mask::new(width)?,
            };
            masks.push(mask);
        }
        return Ok(found.then_some(masks));
    }

    let name = fuse_name(kind, None, field);
    let Some(value) = store.read(&name) else {
        return Ok(None);
    };
    if kind == set.group_kind() {
        return Ok(Some(vec![to_mask(&name, set.num_groups(), value)?]));
    }
    let flat = to_mask(&name, flat_width(set, kind, width)?, value)?;
    let masks = (0..set.num_groups())
        .map(|group| flat.extract(group * width, width))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Some(masks))
}

fn flat_width(set: &Set, kind: UnitKind, per_group: u32) -> OrchestrationResult<u32> {
    let width = set.num_groups() * per_group;
    if width > MAX_WIDTH {
        return Err(OrchestrationError::Fuse(format!(
            "flat {kind} fuse needs {width} bits, above {MAX_WIDTH}"
        )));
    }
    Ok(width)
}

/// Escreve um campo a partir de uma máscara por ElementSet de `kind`
fn write_field(
    store: &mut dyn FuseStore,
    set: &Set,
    kind: UnitKind,
    field: FuseField,
    masks: &[Mask],
) -> OrchestrationResult<()> {
    let layout = set.fuse_layout(kind)?;
    if is_per_group(set, kind, &layout) {
        for (group, mask) in masks.iter().enumerate() {
            store.write(&fuse_name(kind, Some((set.group_kind(), group)), field), mask.value());
        }
        return Ok(());
    }

    let width = if kind == set.group_kind() { set.num_groups() } else { set.per_group(kind)? };
    if kind != set.group_kind() {
        flat_width(set, kind, width)?;
    }
    let value = masks
        .iter()
        .enumerate()
        .fold(0u32, |acc, (group, mask)| acc | (mask.value() << (group as u32 * width)));
    store.write(&fuse_name(kind, None, field), value);
    Ok(())
}

/// Importa defeitos, desabilitações prévias e (opcionalmente) reconfigurações
///
/// Retorna quantos campos foram encontrados no store.
pub fn import_fuses(
    chip: &mut Chip,
    store: &dyn FuseStore,
    import_reconfig: bool,
) -> OrchestrationResult<usize> {
    let group_kinds: Vec<UnitKind> = chip.sets().map(Set::group_kind).collect();
    let mut found = 0;

    for group_kind in group_kinds {
        let kinds = kinds_in_order(chip.set(group_kind)?);
        for kind in kinds {
            let layout = chip.set(group_kind)?.fuse_layout(kind)?;
            // defective e reconfig antes do campo principal, que já contém esses bits
            let mut fields = Vec::with_capacity(3);
            if layout.defective {
                fields.push((FuseField::Defective, DisableMode::Defective));
            }
            if layout.reconfig && import_reconfig {
                fields.push((FuseField::Reconfig, DisableMode::Reconfig));
            }
            fields.push((FuseField::primary(&layout), DisableMode::Disable));

            for (field, mode) in fields {
                let Some(masks) = read_field(store, chip.set(group_kind)?, kind, field)? else {
                    continue;
                };
                found += 1;
                for (group, mask) in masks.iter().enumerate() {
                    let disabled = if field == FuseField::Enable { mask.inverted() } else { *mask };
                    if disabled.is_empty() {
                        continue;
                    }
                    trace!(%kind, group, bits = %disabled, field = field.suffix(), "fuse imported");
                    let target = chip.element_set_ref(group_kind, group, kind)?;
                    chip.disable_elements_as(target, &disabled, mode)?;
                }
            }
        }
    }
    debug!(fields = found, "fuses imported");
    Ok(found)
}

/// Escreve o estado final de todos os Sets
pub fn export_fuses(chip: &Chip, store: &mut dyn FuseStore) -> OrchestrationResult<()> {
    for set in chip.sets() {
        for kind in kinds_in_order(set) {
            let layout = set.fuse_layout(kind)?;
            let sets = set.element_sets_of(kind)?;

            let mut disabled = Vec::with_capacity(sets.len());
            for es in &sets {
                // sem fuse próprio, reconfig sai como desabilitado
                let mask =
                    if layout.reconfig { *es.disable_mask() } else { *es.total_disable_mask() };
                disabled.push(mask);
            }
            let primary = FuseField::primary(&layout);
            let values: Vec<Mask> = match primary {
                FuseField::Enable => disabled.iter().map(Mask::inverted).collect(),
                _ => disabled,
            };
            write_field(store, set, kind, primary, &values)?;

            if layout.defective {
                let defective: Vec<Mask> = sets.iter().map(|es| *es.defective_mask()).collect();
                write_field(store, set, kind, FuseField::Defective, &defective)?;
            }
            if layout.reconfig {
                let reconfig: Vec<Mask> = sets.iter().map(|es| *es.reconfig_mask()).collect();
                write_field(store, set, kind, FuseField::Reconfig, &reconfig)?;
            }
        }
    }
    Ok(())
}
