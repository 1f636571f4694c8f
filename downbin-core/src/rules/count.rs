//! Regras de contagem mínima

use crate::chip::Chip;
use crate::error::{FsError, FsResult};
use crate::mask::Mask;
use crate::rules::{element_triggers, slice_of, Rule, Trigger};
use crate::unit::UnitKind;

/// Grupo com menos de `min` elementos `kind` habilitados ⇒ grupo desabilitado
#[derive(Debug, Clone)]
pub struct MinGroupElementCount {
    set: UnitKind,
    kind: UnitKind,
    min: u32,
}

impl MinGroupElementCount {
    pub fn new(set: UnitKind, kind: UnitKind, min: u32) -> Self {
        Self { set, kind, min }
    }

    /// Usa o tipo principal do Set
    pub fn for_primary(chip: &Chip, set: UnitKind, min: u32) -> FsResult<Self> {
        let kind = chip
            .set(set)?
            .primary_kind()
            .ok_or_else(|| FsError::InvalidArgument(format!(
                "{set} set has no primary element kind"
            )))?;
        Ok(Self::new(set, kind, min))
    }
}

impl Rule for MinGroupElementCount {
    fn name(&self) -> &str {
        "min-group-element-count"
    }

    fn triggers(&self, chip: &Chip) -> FsResult<Vec<Trigger>> {
        if self.kind == self.set {
            return Err(FsError::InvalidArgument(format!("{} is the group kind", self.kind)));
        }
        element_triggers(chip, self.set, self.kind)
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        let set = chip.set(self.set)?;
        let mut starved = Vec::new();
        for group in set.groups().iter().filter(|g| !g.is_disabled()) {
            if set.num_enabled_in_group(group.index(), self.kind)? < self.min {
                starved.push(group.index());
            }
        }
        for index in starved {
            tracing::debug!(
                set = %self.set,
                group = index,
                kind = %self.kind,
                min = self.min,
                "group below minimum"
            );
            chip.disable_group(self.set, index)?;
        }
        Ok(())
    }
}

/// Elemento cuja fatia de `sub` tem menos de `min_per_element` habilitados
/// ⇒ elemento desabilitado
#[derive(Debug, Clone)]
pub struct MinSubElementCount {
    set: UnitKind,
    group: usize,
    kind: UnitKind,
    sub: UnitKind,
    min_per_element: u32,
}

impl MinSubElementCount {
    pub fn new(
        set: UnitKind,
        group: usize,
        kind: UnitKind,
        sub: UnitKind,
        min_per_element: u32,
    ) -> Self {
        Self { set, group, kind, sub, min_per_element }
    }
}

impl Rule for MinSubElementCount {
    fn name(&self) -> &str {
        "min-sub-element-count"
    }

    fn triggers(&self, chip: &Chip) -> FsResult<Vec<Trigger>> {
        chip.set(self.set)?.slice_len(self.kind, self.sub)?;
        Ok(vec![Trigger::Elements(chip.element_set_ref(self.set, self.group, self.sub)?)])
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        let set = chip.set(self.set)?;
        let slice_len = set.slice_len(self.kind, self.sub)?;
        let elements = set.element_set_in(self.group, self.kind)?;
        let subs = set.element_set_in(self.group, self.sub)?;

        let mut starved = Mask::new(elements.num_elements())?;
        for element in elements.enabled_mask().iter_set() {
            let slice = slice_of(subs.num_elements(), element, slice_len)?;
            let disabled = subs.total_disable_mask().and(&slice)?.num_set_bits();
            if slice_len - disabled < self.min_per_element {
                starved.set_bit(element)?;
            }
        }
        if starved.is_empty() {
            return Ok(());
        }
        let target = chip.element_set_ref(self.set, self.group, self.kind)?;
        chip.disable_elements(target, &starved)
    }
}

/// Verificadora: total habilitado de `kind` (opcionalmente mascarado) ≥ `min`
#[derive(Debug, Clone)]
pub struct MinElementCount {
    set: UnitKind,
    kind: UnitKind,
    min: u32,
    /// Uma máscara por ElementSet de `kind` (por grupo, ou uma só para o tipo de grupo)
    masks: Option<Vec<Mask>>,
}

impl MinElementCount {
    pub fn new(set: UnitKind, kind: UnitKind, min: u32) -> Self {
        Self { set, kind, min, masks: None }
    }

    /// Conta apenas os bits dentro das máscaras dadas
    pub fn with_masks(mut self, masks: Vec<Mask>) -> Self {
        self.masks = Some(masks);
        self
    }

    fn enabled(&self, chip: &Chip) -> FsResult<u32> {
        let sets = chip.set(self.set)?.element_sets_of(self.kind)?;
        let mut total = 0;
        for (index, es) in sets.iter().enumerate() {
            total += match &self.masks {
                Some(masks) => es.enabled_mask().and(&masks[index])?.num_set_bits(),
                None => es.num_enabled(),
            };
        }
        Ok(total)
    }
}

impl Rule for MinElementCount {
    fn name(&self) -> &str {
        "min-element-count"
    }

    fn triggers(&self, chip: &Chip) -> FsResult<Vec<Trigger>> {
        let sets = chip.set(self.set)?.element_sets_of(self.kind)?;
        if let Some(masks) = &self.masks {
            if masks.len() != sets.len() {
                return Err(FsError::InvalidArgument(format!(
                    "{} masks given for {} {} element sets",
                    masks.len(),
                    sets.len(),
                    self.kind
                )));
            }
            for (mask, es) in masks.iter().zip(&sets) {
                if mask.width() != es.num_elements() {
                    return Err(FsError::WidthMismatch {
                        expected: es.num_elements(),
                        found: mask.width(),
                    });
                }
            }
        }
        element_triggers(chip, self.set, self.kind)
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        let enabled = self.enabled(chip)?;
        if enabled < self.min {
            return Err(FsError::infeasible(format!(
                "{} enabled count {enabled} fell below the minimum of {}",
                self.kind, self.min
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::set::{ElementSpec, SetSpec};

    fn fbp_chip() -> Chip {
        let mut chip = Chip::new();
        chip.add_set(
            &SetSpec::new(UnitKind::Fbp, 2)
                .primary(UnitKind::Ltc)
                .element(ElementSpec::new(UnitKind::Ltc, 2))
                .element(ElementSpec::new(UnitKind::L2Slice, 8)),
        )
        .unwrap();
        chip
    }

    #[test]
    fn test_min_group_element_count_disables_group() {
        let mut chip = fbp_chip();
        let rule = MinGroupElementCount::for_primary(&chip, UnitKind::Fbp, 2).unwrap();
        chip.add_rule(rule).unwrap();

        chip.disable_element(UnitKind::Fbp, 1, UnitKind::Ltc, 0).unwrap();
        let set = chip.set(UnitKind::Fbp).unwrap();
        assert!(set.group(1).unwrap().is_disabled());
        assert!(!set.group(0).unwrap().is_disabled());
        assert_eq!(set.num_enabled_in_group(1, UnitKind::L2Slice).unwrap(), 0);
    }

    #[test]
    fn test_min_group_element_count_rejects_group_kind() {
        let mut chip = fbp_chip();
        assert!(chip.add_rule(MinGroupElementCount::new(UnitKind::Fbp, UnitKind::Fbp, 1)).is_err());
    }

    #[test]
    fn test_min_sub_element_count() {
        let mut chip = fbp_chip();
        chip.add_rule(MinSubElementCount::new(UnitKind::Fbp, 0, UnitKind::Ltc, UnitKind::L2Slice, 3))
            .unwrap();

        let slices = chip.element_set_ref(UnitKind::Fbp, 0, UnitKind::L2Slice).unwrap();
        chip.disable_elements(slices, &Mask::from_bits(8, 0b0001_0000).unwrap()).unwrap();
        let ltcs = chip.set(UnitKind::Fbp).unwrap().element_set_in(0, UnitKind::Ltc).unwrap();
        assert_eq!(ltcs.num_disabled(), 0);

        chip.disable_elements(slices, &Mask::from_bits(8, 0b0010_0000).unwrap()).unwrap();
        let ltcs = chip.set(UnitKind::Fbp).unwrap().element_set_in(0, UnitKind::Ltc).unwrap();
        assert_eq!(ltcs.total_disable_mask().value(), 0b10);
    }

    #[test]
    fn test_min_element_count_verifier() {
        let mut chip = fbp_chip();
        chip.add_rule(MinElementCount::new(UnitKind::Fbp, UnitKind::Ltc, 3)).unwrap();

        chip.disable_element(UnitKind::Fbp, 0, UnitKind::Ltc, 0).unwrap();
        let err = chip.disable_element(UnitKind::Fbp, 1, UnitKind::Ltc, 1).unwrap_err();
        assert!(err.is_infeasible());
        // sem rollback: o bit que disparou a falha permanece
        assert_eq!(chip.set(UnitKind::Fbp).unwrap().num_enabled(UnitKind::Ltc).unwrap(), 2);
    }

    #[test]
    fn test_min_element_count_with_masks() {
        let mut chip = fbp_chip();
        let only_low = Mask::from_bits(2, 0b01).unwrap();
        let rule = MinElementCount::new(UnitKind::Fbp, UnitKind::Ltc, 2).with_masks(vec![only_low, only_low]);
        chip.add_rule(rule).unwrap();

        chip.disable_element(UnitKind::Fbp, 0, UnitKind::Ltc, 1).unwrap();
        assert!(chip.disable_element(UnitKind::Fbp, 1, UnitKind::Ltc, 0).unwrap_err().is_infeasible());
    }

    #[test]
    fn test_min_element_count_mask_shape_checked() {
        let mut chip = fbp_chip();
        let rule = MinElementCount::new(UnitKind::Fbp, UnitKind::Ltc, 1).with_masks(vec![Mask::full(2).unwrap()]);
        assert!(chip.add_rule(rule).is_err());
    }
}
