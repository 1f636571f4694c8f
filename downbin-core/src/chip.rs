//! # Chip — raiz da arena e motor de cascata
//!
//! Dono de todos os [`Set`]s e do registro de regras. Toda mutação passa por
//! métodos `disable*` que recebem `&mut self`; os ouvintes são executados em
//! ordem de registro, sincronamente, e podem chamar de volta qualquer
//! `disable*`. A recursão termina porque a desabilitação é monotônica sobre
//! um universo finito.
//!
//! Falhas no meio de uma cascata não desfazem o que já foi aplicado; o run
//! inteiro é tratado como perdido pelo chamador.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, trace};
use crate::element_set::ElementSet;
use crate::error::{FsError, FsResult};
use crate::mask::Mask;
use crate::rules::{BasicGroupDisable, GroupMaskSync, Rule, RuleId, Trigger};
use crate::set::{Set, SetSpec, GROUP_LEVEL_SLOT};
use crate::settings::{DisableMode, FsSettings};
use crate::unit::UnitKind;

/// Referência estável a um ElementSet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementSetRef {
    /// Tipo de grupo do Set dono
    pub set: UnitKind,
    /// Slot na arena do Set
    pub slot: usize,
}

impl ElementSetRef {
    /// ElementSet de nível de grupo de um Set
    pub fn group_level(set: UnitKind) -> Self {
        Self { set, slot: GROUP_LEVEL_SLOT }
    }
}

/// Chip inteiro: Sets + regras + configurações
#[derive(Debug, Default)]
pub struct Chip {
    sets: BTreeMap<UnitKind, Set>,
    /// Tipo de elemento → tipo de grupo do Set que o contém
    owners: BTreeMap<UnitKind, UnitKind>,
    rules: Vec<Arc<dyn Rule>>,
    settings: FsSettings,
}

impl Chip {
    /// Cria chip vazio
    pub fn new() -> Self {
        Self::default()
    }

    /// Cria com configurações específicas
    pub fn with_settings(settings: FsSettings) -> Self {
        Self { settings, ..Self::default() }
    }

    pub fn settings(&self) -> FsSettings {
        self.settings
    }

    pub fn set_settings(&mut self, settings: FsSettings) {
        self.settings = settings;
    }

    /// Adiciona um Set e registra as regras estruturais padrão
    ///
    /// Cada grupo recebe um [`BasicGroupDisable`]; o nível de grupo recebe
    /// um [`GroupMaskSync`].
    pub fn add_set(&mut self, spec: &SetSpec) -> FsResult<()> {
        let set = Set::new(spec)?;
        let group_kind = set.group_kind();
        if self.owners.contains_key(&group_kind) {
            return Err(FsError::InvalidArgument(format!("{group_kind} already belongs to a set")));
        }
        if let Some(kind) = set.element_kinds().find(|kind| self.owners.contains_key(kind)) {
            return Err(FsError::InvalidArgument(format!("{kind} already belongs to a set")));
        }

        self.owners.insert(group_kind, group_kind);
        for kind in set.element_kinds() {
            self.owners.insert(kind, group_kind);
        }
        let num_groups = set.num_groups() as usize;
        self.sets.insert(group_kind, set);

        self.add_rule(GroupMaskSync::new(group_kind))?;
        for group in 0..num_groups {
            self.add_rule(BasicGroupDisable::new(group_kind, group))?;
        }
        debug!(set = %group_kind, groups = num_groups, "set added");
        Ok(())
    }

    pub fn sets(&self) -> impl Iterator<Item = &Set> {
        self.sets.values()
    }

    /// Set identificado pelo tipo de grupo
    pub fn set(&self, group_kind: UnitKind) -> FsResult<&Set> {
        self.sets.get(&group_kind).ok_or(FsError::UnknownSet(group_kind))
    }

    /// Acesso mutável ao Set (registro de pickers)
    pub fn set_mut(&mut self, group_kind: UnitKind) -> FsResult<&mut Set> {
        self.sets.get_mut(&group_kind).ok_or(FsError::UnknownSet(group_kind))
    }

    /// Set que contém `kind` (grupo ou elemento)
    pub fn set_of(&self, kind: UnitKind) -> FsResult<&Set> {
        let owner = self.owners.get(&kind).ok_or(FsError::UnknownSet(kind))?;
        self.set(*owner)
    }

    /// Tipo de grupo do Set que contém `kind`
    pub fn owner_of(&self, kind: UnitKind) -> FsResult<UnitKind> {
        self.owners.get(&kind).copied().ok_or(FsError::UnknownSet(kind))
    }

    pub fn contains(&self, kind: UnitKind) -> bool {
        self.owners.contains_key(&kind)
    }

    /// Referência ao ElementSet `kind` do grupo `group` no Set `set`
    pub fn element_set_ref(
        &self,
        set: UnitKind,
        group: usize,
        kind: UnitKind,
    ) -> FsResult<ElementSetRef> {
        let slot = self.set(set)?.slot_of(group, kind)?;
        Ok(ElementSetRef { set, slot })
    }

    pub fn element_set(&self, target: ElementSetRef) -> FsResult<&ElementSet> {
        self.set(target.set)?.element_set(target.slot)
    }

    fn element_set_mut(&mut self, target: ElementSetRef) -> FsResult<&mut ElementSet> {
        self.set_mut(target.set)?.element_set_mut(target.slot)
    }

    // =========================================================================
    // Regras
    // =========================================================================

    /// Registra regra; seus gatilhos recebem o id como ouvinte
    pub fn add_rule<R: Rule + 'static>(&mut self, rule: R) -> FsResult<RuleId> {
        self.add_shared_rule(Arc::new(rule))
    }

    /// Registra regra já compartilhada
    pub fn add_shared_rule(&mut self, rule: Arc<dyn Rule>) -> FsResult<RuleId> {
        let triggers = rule.triggers(self)?;
        for trigger in &triggers {
            match *trigger {
                Trigger::Elements(target) => {
                    self.element_set(target)?;
                }
                Trigger::Group { set, index } => {
                    self.set(set)?.group(index)?;
                }
            }
        }

        let id = self.rules.len();
        for trigger in triggers {
            match trigger {
                Trigger::Elements(target) => self.element_set_mut(target)?.add_listener(id),
                Trigger::Group { set, index } => {
                    self.set_mut(set)?.group_mut(index)?.add_listener(id)
                }
            }
        }
        trace!(rule = rule.name(), id, "rule registered");
        self.rules.push(rule);
        Ok(id)
    }

    pub fn rule(&self, id: RuleId) -> FsResult<&Arc<dyn Rule>> {
        self.rules.get(id).ok_or(FsError::IndexOutOfRange { index: id, count: self.rules.len() })
    }

    pub fn num_rules(&self) -> usize {
        self.rules.len()
    }

    /// Executa uma regra registrada explicitamente
    pub fn execute_rule(&mut self, id: RuleId) -> FsResult<()> {
        let rule = Arc::clone(self.rule(id)?);
        rule.execute(self)
    }

    /// Executa uma regra avulsa (sem registro, sem gatilhos)
    pub fn run_rule(&mut self, rule: &dyn Rule) -> FsResult<()> {
        trace!(rule = rule.name(), "running detached rule");
        rule.execute(self)
    }

    fn notify(&mut self, listeners: &[RuleId]) -> FsResult<()> {
        for &id in listeners {
            let rule = Arc::clone(&self.rules[id]);
            rule.execute(self)?;
        }
        Ok(())
    }

    // =========================================================================
    // Desabilitação
    // =========================================================================

    /// Desabilita elementos no modo ativo e dispara a cascata
    pub fn disable_elements(&mut self, target: ElementSetRef, mask: &Mask) -> FsResult<()> {
        let mode = self.settings.disable_mode;
        self.disable_elements_as(target, mask, mode)
    }

    /// Desabilita elementos registrando-os no modo dado
    ///
    /// Bits já desabilitados são ignorados; sem bits novos nenhum ouvinte
    /// dispara. As cascatas usam sempre o modo ativo das configurações.
    pub fn disable_elements_as(
        &mut self,
        target: ElementSetRef,
        mask: &Mask,
        mode: DisableMode,
    ) -> FsResult<()> {
        let es = self.element_set_mut(target)?;
        let newly = es.apply_disable(mask, mode)?;
        if newly.is_empty() {
            return Ok(());
        }
        trace!(kind = %es.kind(), owner = ?es.owner(), bits = %newly, ?mode, "elements disabled");
        let listeners = es.listeners().to_vec();
        self.notify(&listeners)
    }

    /// Desabilita um único elemento
    pub fn disable_element(
        &mut self,
        set: UnitKind,
        group: usize,
        kind: UnitKind,
        index: u32,
    ) -> FsResult<()> {
        let target = self.element_set_ref(set, group, kind)?;
        let width = self.element_set(target)?.num_elements();
        let bit = if kind == set { group as u32 } else { index };
        self.disable_elements(target, &Mask::with_bit(width, bit)?)
    }

    /// Desabilita um grupo inteiro (idempotente)
    pub fn disable_group(&mut self, set_kind: UnitKind, index: usize) -> FsResult<()> {
        let set = self.set_mut(set_kind)?;
        let width = set.num_groups();
        let group = set.group_mut(index)?;
        if !group.mark_disabled() {
            return Ok(());
        }
        let listeners = group.listeners().to_vec();
        debug!(set = %set_kind, group = index, "group disabled");

        self.disable_elements(
            ElementSetRef::group_level(set_kind),
            &Mask::with_bit(width, index as u32)?,
        )?;
        self.notify(&listeners)
    }

    /// Marca elementos como protegidos
    pub fn protect_elements(&mut self, target: ElementSetRef, mask: &Mask) -> FsResult<()> {
        self.element_set_mut(target)?.protect(mask)
    }

    /// Marca um grupo como protegido (flag + bit de nível de grupo)
    pub fn protect_group(&mut self, set_kind: UnitKind, index: usize) -> FsResult<()> {
        let set = self.set_mut(set_kind)?;
        let width = set.num_groups();
        set.group_mut(index)?.mark_protected();
        self.protect_elements(
            ElementSetRef::group_level(set_kind),
            &Mask::with_bit(width, index as u32)?,
        )
    }

    // =========================================================================
    // Busca gulosa
    // =========================================================================

    /// Escolhe e desabilita um grupo pela cadeia de pickers
    pub fn disable_one_group(&mut self, set_kind: UnitKind) -> FsResult<usize> {
        let set = self.set(set_kind)?;
        let mut candidates = set.enabled_groups();
        if candidates.is_empty() {
            return Err(FsError::infeasible(format!("no enabled {set_kind} left to disable")));
        }
        for picker in set.group_disable_pickers() {
            let narrowed = picker.pick(self, &candidates)?;
            candidates = narrow(picker.name(), &candidates, narrowed)?;
        }

        let chosen = lowest(&candidates, set_kind)? as usize;
        debug!(
            set = %set_kind,
            group = chosen,
            candidates = %candidates,
            "picked group to disable"
        );
        self.disable_group(set_kind, chosen)?;
        Ok(chosen)
    }

    /// Escolhe e desabilita um elemento `kind`: primeiro o grupo, depois o elemento
    pub fn disable_one_element(
        &mut self,
        set_kind: UnitKind,
        kind: UnitKind,
    ) -> FsResult<(usize, u32)> {
        let set = self.set(set_kind)?;
        if kind == set_kind {
            return Err(FsError::InvalidArgument(format!(
                "{kind} is a group kind; use disable_one_group"
            )));
        }

        let mut groups = Mask::new(set.num_groups())?;
        for group in set.groups().iter().filter(|g| !g.is_disabled()) {
            if set.num_enabled_in_group(group.index(), kind)? > 0 {
                groups.set_bit(group.index() as u32)?;
            }
        }
        if groups.is_empty() {
            return Err(FsError::infeasible(format!("no enabled {kind} left in {set_kind}")));
        }
        for picker in set.group_reduce_pickers(kind) {
            let narrowed = picker.pick(self, &groups)?;
            groups = narrow(picker.name(), &groups, narrowed)?;
        }
        let group = lowest(&groups, set_kind)? as usize;

        let mut elements = set.element_set_in(group, kind)?.enabled_mask();
        for picker in set.element_disable_pickers(kind) {
            let narrowed = picker.pick(self, group, &elements)?;
            elements = narrow(picker.name(), &elements, narrowed)?;
        }
        let element = lowest(&elements, kind)?;

        debug!(set = %set_kind, %kind, group, element, "picked element to disable");
        self.disable_element(set_kind, group, kind, element)?;
        Ok((group, element))
    }
}

/// Aplica o contrato de estreitamento de um picker
fn narrow(picker: &str, input: &Mask, output: Mask) -> FsResult<Mask> {
    if !output.is_subset_of(input) {
        return Err(FsError::PickerContract(picker.to_string()));
    }
    if output.is_empty() {
        return Err(FsError::infeasible(format!("picker {picker} rejected every candidate")));
    }
    Ok(output)
}

fn lowest(candidates: &Mask, kind: UnitKind) -> FsResult<u32> {
    candidates
        .lowest_set()
        .ok_or_else(|| FsError::infeasible(format!("no {kind} candidate left")))
}
