//! Regras de dependência estrutural

use crate::chip::{Chip, ElementSetRef};
use crate::error::{FsError, FsResult};
use crate::mask::Mask;
use crate::rules::{slice_of, Rule, Trigger};
use crate::unit::UnitKind;

/// Dependência bidirecional entre um elemento e sua fatia de sub-elementos
///
/// Elemento desabilitado ⇒ fatia desabilitada; fatia toda desabilitada ⇒
/// elemento desabilitado.
#[derive(Debug, Clone)]
pub struct SubElementDependency {
    set: UnitKind,
    group: usize,
    kind: UnitKind,
    sub: UnitKind,
}

impl SubElementDependency {
    pub fn new(set: UnitKind, group: usize, kind: UnitKind, sub: UnitKind) -> Self {
        Self { set, group, kind, sub }
    }
}

impl Rule for SubElementDependency {
    fn name(&self) -> &str {
        "sub-element-dependency"
    }

    fn triggers(&self, chip: &Chip) -> FsResult<Vec<Trigger>> {
        chip.set(self.set)?.slice_len(self.kind, self.sub)?;
        Ok(vec![
            Trigger::Elements(chip.element_set_ref(self.set, self.group, self.kind)?),
            Trigger::Elements(chip.element_set_ref(self.set, self.group, self.sub)?),
        ])
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        let set = chip.set(self.set)?;
        let slice_len = set.slice_len(self.kind, self.sub)?;
        let elements = set.element_set_in(self.group, self.kind)?;
        let subs = set.element_set_in(self.group, self.sub)?;

        let mut sub_mask = Mask::new(subs.num_elements())?;
        let mut element_mask = Mask::new(elements.num_elements())?;
        for element in 0..elements.num_elements() {
            let slice = slice_of(subs.num_elements(), element, slice_len)?;
            if elements.is_disabled(element)? {
                sub_mask = sub_mask.or(&slice)?;
            } else if subs.total_disable_mask().contains(&slice) {
                element_mask.set_bit(element)?;
            }
        }

        if !sub_mask.is_empty() {
            let target = chip.element_set_ref(self.set, self.group, self.sub)?;
            chip.disable_elements(target, &sub_mask)?;
        }
        if !element_mask.is_empty() {
            let target = chip.element_set_ref(self.set, self.group, self.kind)?;
            chip.disable_elements(target, &element_mask)?;
        }
        Ok(())
    }
}

/// Elemento 1 desabilitado ⇒ elemento 2 desabilitado
///
/// Para o tipo de grupo, o elemento é o próprio grupo e o índice interno é
/// ignorado. Use [`CrossElementDependency::pair`] para a relação simétrica.
#[derive(Debug, Clone)]
pub struct CrossElementDependency {
    set: UnitKind,
    kind: UnitKind,
    from: (usize, u32),
    to: (usize, u32),
}

impl CrossElementDependency {
    pub fn new(set: UnitKind, kind: UnitKind, from: (usize, u32), to: (usize, u32)) -> Self {
        Self { set, kind, from, to }
    }

    /// As duas direções de um par físico
    pub fn pair(set: UnitKind, kind: UnitKind, a: (usize, u32), b: (usize, u32)) -> [Self; 2] {
        [Self::new(set, kind, a, b), Self::new(set, kind, b, a)]
    }

    fn bit(&self, (group, index): (usize, u32)) -> u32 {
        if self.kind == self.set { group as u32 } else { index }
    }
}

impl Rule for CrossElementDependency {
    fn name(&self) -> &str {
        "cross-element-dependency"
    }

    fn triggers(&self, chip: &Chip) -> FsResult<Vec<Trigger>> {
        for end in [self.from, self.to] {
            let target = chip.element_set_ref(self.set, end.0, self.kind)?;
            chip.element_set(target)?.is_disabled(self.bit(end))?;
        }
        Ok(vec![Trigger::Elements(chip.element_set_ref(self.set, self.from.0, self.kind)?)])
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        let source = chip.element_set_ref(self.set, self.from.0, self.kind)?;
        if !chip.element_set(source)?.is_disabled(self.bit(self.from))? {
            return Ok(());
        }
        let (group, index) = self.to;
        chip.disable_element(self.set, group, self.kind, index)
    }
}

/// Combinação proibida de bits desabilitados
///
/// Quando `total_disable ⊇ combo`, o ElementSet inteiro e o grupo dono são
/// desabilitados.
#[derive(Debug, Clone)]
pub struct InvalidElementCombo {
    target: ElementSetRef,
    combo: Mask,
}

impl InvalidElementCombo {
    pub fn new(target: ElementSetRef, combo: Mask) -> Self {
        Self { target, combo }
    }
}

impl Rule for InvalidElementCombo {
    fn name(&self) -> &str {
        "invalid-element-combo"
    }

    fn triggers(&self, chip: &Chip) -> FsResult<Vec<Trigger>> {
        let es = chip.element_set(self.target)?;
        if self.combo.width() != es.num_elements() {
            return Err(FsError::WidthMismatch {
                expected: es.num_elements(),
                found: self.combo.width(),
            });
        }
        if self.combo.is_empty() {
            return Err(FsError::InvalidArgument(format!("empty {} combo", es.kind())));
        }
        Ok(vec![Trigger::Elements(self.target)])
    }

    fn execute(&self, chip: &mut Chip) -> FsResult<()> {
        let es = chip.element_set(self.target)?;
        if !es.total_disable_mask().contains(&self.combo) {
            return Ok(());
        }
        let full = Mask::full(es.num_elements())?;
        let owner = es.owner();
        tracing::debug!(kind = %es.kind(), ?owner, combo = %self.combo, "invalid combo disabled");

        chip.disable_elements(self.target, &full)?;
        if let Some(group) = owner {
            chip.disable_group(self.target.set, group)?;
        }
        Ok(())
    }
}
