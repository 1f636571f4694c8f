//! Group — uma instância concreta da unidade de topo

use std::collections::BTreeMap;
use crate::error::{FsError, FsResult};
use crate::rules::RuleId;
use crate::unit::UnitKind;

/// Instância de grupo (ex.: GPC #3)
///
/// Pertence ao [`Set`](crate::set::Set) identificado por `kind`; os
/// ElementSets vivem na arena do Set e são referenciados por slot.
#[derive(Debug, Clone)]
pub struct Group {
    kind: UnitKind,
    index: usize,
    disabled: bool,
    protected: bool,
    /// Tipo de elemento → slot na arena do Set
    element_sets: BTreeMap<UnitKind, usize>,
    listeners: Vec<RuleId>,
}

impl Group {
    pub(crate) fn new(kind: UnitKind, index: usize) -> Self {
        Self {
            kind,
            index,
            disabled: false,
            protected: false,
            element_sets: BTreeMap::new(),
            listeners: Vec::new(),
        }
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_protected(&self) -> bool {
        self.protected
    }

    pub fn listeners(&self) -> &[RuleId] {
        &self.listeners
    }

    /// Slots dos ElementSets deste grupo, por tipo
    pub fn element_sets(&self) -> &BTreeMap<UnitKind, usize> {
        &self.element_sets
    }

    /// Slot do ElementSet de um tipo
    pub fn slot(&self, kind: UnitKind) -> FsResult<usize> {
        self.element_sets
            .get(&kind)
            .copied()
            .ok_or(FsError::UnknownUnit { kind, set: self.kind })
    }

    pub(crate) fn attach(&mut self, kind: UnitKind, slot: usize) {
        self.element_sets.insert(kind, slot);
    }

    pub(crate) fn add_listener(&mut self, rule: RuleId) {
        self.listeners.push(rule);
    }

    /// Marca como desabilitado; retorna `false` se já estava
    pub(crate) fn mark_disabled(&mut self) -> bool {
        !std::mem::replace(&mut self.disabled, true)
    }

    pub(crate) fn mark_protected(&mut self) {
        self.protected = true;
    }
}
