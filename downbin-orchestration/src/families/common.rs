//! Registro de regras e pickers derivados do SKU, comum a todas as famílias

use std::sync::Arc;
use tracing::debug;
use downbin_core::prelude::*;
use crate::error::OrchestrationResult;
use crate::sku::{split_flat, SkuConfig};

/// Regras do SKU: contagens mínimas, unidades obrigatórias e skyline
///
/// Unidades em `must_enable` também são marcadas como protegidas.
pub fn register_sku_rules(chip: &mut Chip, sku: &SkuConfig) -> OrchestrationResult<()> {
    for (&kind, unit) in &sku.units {
        let set = chip.owner_of(kind)?;

        if let Some(min) = unit.min_enable_count {
            chip.add_rule(MinElementCount::new(set, kind, min))?;
        }
        if let Some(min) = unit.min_enable_per_group {
            if kind != set {
                chip.add_rule(MinGroupElementCount::new(set, kind, min))?;
            }
        }
        for &flat in &unit.must_enable {
            let (group, index) = split_flat(chip, kind, flat)?;
            let rule = AlwaysEnable::unit(chip, set, group, kind, index)?;
            if kind == set {
                chip.protect_group(set, group)?;
            } else {
                let width = chip.element_set(rule.target())?.num_elements();
                chip.protect_elements(rule.target(), &Mask::with_bit(width, index)?)?;
            }
            chip.add_rule(rule)?;
        }
        if !unit.skyline.is_empty() {
            chip.add_rule(SkylineRule::new(set, kind, unit.skyline.clone()))?;
        }
    }
    debug!(sku = %sku.name, rules = chip.num_rules(), "sku rules registered");
    Ok(())
}

/// Desabilita as unidades de `must_disable`
pub fn apply_must_disable(chip: &mut Chip, sku: &SkuConfig) -> OrchestrationResult<()> {
    for (&kind, unit) in &sku.units {
        let set = chip.owner_of(kind)?;
        for &flat in &unit.must_disable {
            let (group, index) = split_flat(chip, kind, flat)?;
            if kind == set {
                chip.disable_group(set, group)?;
            } else {
                chip.disable_element(set, group, kind, index)?;
            }
        }
    }
    Ok(())
}

/// Pickers do SKU, registrados antes dos da família (maior prioridade)
///
/// Proteção: grupos protegidos nunca são escolhidos e elementos protegidos
/// nunca saem da cadeia de elemento. Skyline: candidatos que quebrariam o
/// perfil são descartados.
pub fn register_sku_pickers(chip: &mut Chip, sku: &SkuConfig) -> OrchestrationResult<()> {
    let group_kinds: Vec<UnitKind> = chip.sets().map(|set| set.group_kind()).collect();
    for group_kind in group_kinds {
        chip.set_mut(group_kind)?
            .register_group_disable_picker(Arc::new(ExcludeProtectedGroups::new(group_kind)));
    }

    for (&kind, unit) in &sku.units {
        let set_kind = chip.owner_of(kind)?;
        let set = chip.set_mut(set_kind)?;
        if kind != set_kind && !unit.must_enable.is_empty() {
            let spare = Arc::new(FewestProtectedOrDisabled::new(set_kind, kind, true, false));
            set.register_group_disable_picker(spare.clone());
            set.register_group_reduce_picker(kind, spare)?;
            let unprotected = ExcludeProtected::new(set_kind, kind);
            set.register_element_disable_picker(kind, Arc::new(unprotected))?;
        }
        if kind != set_kind && !unit.skyline.is_empty() {
            let skyline = unit.skyline.clone();
            set.register_group_disable_picker(Arc::new(SkylinePicker::new(
                set_kind,
                kind,
                skyline.clone(),
                SkylineMode::DisableGroup,
            )));
            set.register_group_reduce_picker(
                kind,
                Arc::new(SkylinePicker::new(set_kind, kind, skyline, SkylineMode::ReduceElement)),
            )?;
        }
    }
    Ok(())
}

/// Laço guloso: desabilita `kind` até restarem no máximo `max_enabled`
pub fn downbin_to(chip: &mut Chip, kind: UnitKind, max_enabled: u32) -> OrchestrationResult<u32> {
    let set = chip.owner_of(kind)?;
    let mut steps = 0;
    while chip.set(set)?.num_enabled(kind)? > max_enabled {
        if kind == set {
            chip.disable_one_group(set)?;
        } else {
            chip.disable_one_element(set, kind)?;
        }
        steps += 1;
    }
    debug!(%kind, max_enabled, steps, "downbin target reached");
    Ok(steps)
}
