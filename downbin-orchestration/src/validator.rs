//! Validação final de legalidade

use std::collections::BTreeMap;
use downbin_core::{enabled_profile, skyline_feasible, Chip, Mask, UnitKind};
use crate::error::{OrchestrationError, OrchestrationResult};
use crate::sku::{split_flat, SkuConfig};

/// Validador consultado uma vez, depois do run
pub trait LegalityValidator {
    fn name(&self) -> &str;

    fn validate(&self, chip: &Chip, sku: &SkuConfig) -> OrchestrationResult<()>;
}

/// Validador externo nulo
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExternalValidator;

impl LegalityValidator for NoExternalValidator {
    fn name(&self) -> &str {
        "none"
    }

    fn validate(&self, _chip: &Chip, _sku: &SkuConfig) -> OrchestrationResult<()> {
        Ok(())
    }
}

/// Confere o chip final contra o SKU, independentemente das regras registradas
#[derive(Debug, Clone, Default)]
pub struct SkuLegalityValidator {
    /// Partições físicas por tipo de grupo; sem entrada, cada grupo é uma partição
    partitions: BTreeMap<UnitKind, Vec<Mask>>,
    check_invariants: bool,
}

fn failed(reason: String) -> OrchestrationError {
    OrchestrationError::ValidationFailed(reason)
}

impl SkuLegalityValidator {
    pub fn new(partitions: BTreeMap<UnitKind, Vec<Mask>>, check_invariants: bool) -> Self {
        Self { partitions, check_invariants }
    }

    fn check_invariants(&self, chip: &Chip) -> OrchestrationResult<()> {
        for set in chip.sets() {
            for es in set.element_sets() {
                if !es.is_consistent() {
                    return Err(failed(format!(
                        "{} masks out of sync in group {:?}",
                        es.kind(),
                        es.owner()
                    )));
                }
                let overlap = es.protected_mask().and(es.total_disable_mask())?;
                if !overlap.is_empty() {
                    return Err(failed(format!("protected {} disabled: {overlap}", es.kind())));
                }
            }
            for group in set.groups() {
                if group.is_disabled() != set.group_level().is_disabled(group.index() as u32)? {
                    return Err(failed(format!(
                        "{} {} flag disagrees with group mask",
                        set.group_kind(),
                        group.index()
                    )));
                }
            }
        }
        Ok(())
    }

    fn imbalance(&self, chip: &Chip, kind: UnitKind) -> OrchestrationResult<u32> {
        let set = chip.set_of(kind)?;
        let per_partition: Vec<u32> = match self.partitions.get(&set.group_kind()) {
            Some(partitions) => {
                let mut counts = Vec::with_capacity(partitions.len());
                for partition in partitions {
                    let mut enabled = 0;
                    for group in partition.iter_set() {
                        if !set.group(group as usize)?.is_disabled() {
                            enabled += set.num_enabled_in_group(group as usize, kind)?;
                        }
                    }
                    counts.push(enabled);
                }
                counts
            }
            None => enabled_profile(set, kind)?,
        };
        let max = per_partition.iter().copied().max().unwrap_or(0);
        let min = per_partition.iter().copied().min().unwrap_or(0);
        Ok(max - min)
    }
}

impl LegalityValidator for SkuLegalityValidator {
    fn name(&self) -> &str {
        "sku-legality"
    }

    fn validate(&self, chip: &Chip, sku: &SkuConfig) -> OrchestrationResult<()> {
        if self.check_invariants {
            self.check_invariants(chip)?;
        }

        for (&kind, unit) in &sku.units {
            let set = chip.set_of(kind)?;
            let enabled = set.num_enabled(kind)?;
            if let Some(min) = unit.min_enable_count {
                if enabled < min {
                    return Err(failed(format!(
                        "{kind}: {enabled} enabled, SKU {} needs at least {min}",
                        sku.name
                    )));
                }
            }
            if let Some(max) = unit.max_enable_count {
                if enabled > max {
                    return Err(failed(format!(
                        "{kind}: {enabled} enabled, SKU {} allows at most {max}",
                        sku.name
                    )));
                }
            }
            if let Some(min) = unit.min_enable_per_group {
                for group in set.groups().iter().filter(|g| !g.is_disabled()) {
                    let count = set.num_enabled_in_group(group.index(), kind)?;
                    if count < min {
                        return Err(failed(format!(
                            "{kind}: group {} keeps {count}, below {min}",
                            group.index()
                        )));
                    }
                }
            }
            for &flat in &unit.must_enable {
                if unit_disabled(chip, kind, flat)? {
                    return Err(failed(format!("{kind} {flat} must stay enabled")));
                }
            }
            for &flat in &unit.must_disable {
                if !unit_disabled(chip, kind, flat)? {
                    return Err(failed(format!("{kind} {flat} must be disabled")));
                }
            }
            if !unit.skyline.is_empty() {
                let profile = enabled_profile(set, kind)?;
                if !skyline_feasible(&unit.skyline, &profile) {
                    return Err(failed(format!(
                        "{kind}: profile {profile:?} below skyline {:?}",
                        unit.skyline
                    )));
                }
            }
            if let Some(max) = unit.max_imbalance {
                let imbalance = self.imbalance(chip, kind)?;
                if imbalance > max {
                    return Err(failed(format!(
                        "{kind}: partition imbalance {imbalance} above {max}"
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Estado de uma unidade dada por índice achatado
pub fn unit_disabled(chip: &Chip, kind: UnitKind, flat: u32) -> OrchestrationResult<bool> {
    let (group, index) = split_flat(chip, kind, flat)?;
    let set = chip.set_of(kind)?;
    if kind == set.group_kind() {
        return Ok(set.group(group)?.is_disabled());
    }
    Ok(set.element_set_in(group, kind)?.is_disabled(index)?)
}
