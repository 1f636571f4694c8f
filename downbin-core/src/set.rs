//! # Set — hierarquia de um tipo de unidade de topo
//!
//! Arena dona de todos os [`Group`]s e [`ElementSet`]s de um tipo de grupo.
//! O slot 0 é sempre o ElementSet de nível de grupo, que espelha quais
//! instâncias estão desabilitadas; os demais slots são
//! `1 + grupo * tipos + posição_do_tipo`.

use std::collections::BTreeMap;
use std::sync::Arc;
use serde::{Deserialize, Serialize};
use crate::element_set::ElementSet;
use crate::error::{FsError, FsResult};
use crate::group::Group;
use crate::mask::Mask;
use crate::pickers::{ElementPicker, GroupPicker};
use crate::unit::{FuseLayout, UnitKind};

/// Slot do ElementSet de nível de grupo
pub const GROUP_LEVEL_SLOT: usize = 0;

/// Descrição de um tipo de elemento dentro do grupo
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementSpec {
    pub kind: UnitKind,
    /// Instâncias por grupo
    pub per_group: u32,
    /// Estado derivado de regras de dependência
    #[serde(default)]
    pub derivative: bool,
    #[serde(default = "FuseLayout::per_group")]
    pub fuse: FuseLayout,
}

impl ElementSpec {
    pub fn new(kind: UnitKind, per_group: u32) -> Self {
        Self { kind, per_group, derivative: false, fuse: FuseLayout::per_group() }
    }

    pub fn derivative(mut self) -> Self {
        self.derivative = true;
        self
    }

    pub fn fuse(mut self, fuse: FuseLayout) -> Self {
        self.fuse = fuse;
        self
    }
}

/// Descrição de um Set (fornecida pela topologia)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSpec {
    pub group_kind: UnitKind,
    pub num_groups: u32,
    #[serde(default)]
    pub group_fuse: FuseLayout,
    /// Tipo de elemento principal (ex.: TPC para GPC)
    #[serde(default)]
    pub primary: Option<UnitKind>,
    #[serde(default)]
    pub elements: Vec<ElementSpec>,
}

impl SetSpec {
    pub fn new(group_kind: UnitKind, num_groups: u32) -> Self {
        Self {
            group_kind,
            num_groups,
            group_fuse: FuseLayout::flat(),
            primary: None,
            elements: Vec::new(),
        }
    }

    pub fn group_fuse(mut self, fuse: FuseLayout) -> Self {
        self.group_fuse = fuse;
        self
    }

    pub fn primary(mut self, kind: UnitKind) -> Self {
        self.primary = Some(kind);
        self
    }

    pub fn element(mut self, element: ElementSpec) -> Self {
        self.elements.push(element);
        self
    }
}

/// Hierarquia completa de um tipo de grupo + pickers registrados
#[derive(Debug, Clone)]
pub struct Set {
    group_kind: UnitKind,
    num_groups: u32,
    groups: Vec<Group>,
    element_sets: Vec<ElementSet>,
    specs: Vec<ElementSpec>,
    primary_kind: Option<UnitKind>,
    fuse_layouts: BTreeMap<UnitKind, FuseLayout>,
    group_disable_pickers: Vec<Arc<dyn GroupPicker>>,
    group_reduce_pickers: BTreeMap<UnitKind, Vec<Arc<dyn GroupPicker>>>,
    element_disable_pickers: BTreeMap<UnitKind, Vec<Arc<dyn ElementPicker>>>,
}

impl Set {
    /// Constrói a hierarquia a partir da descrição
    pub fn new(spec: &SetSpec) -> FsResult<Self> {
        let group_kind = spec.group_kind;
        if !group_kind.is_group() {
            return Err(FsError::InvalidArgument(format!("{group_kind} is not a group kind")));
        }
        if spec.num_groups == 0 {
            return Err(FsError::InvalidArgument(format!(
                "{group_kind} set needs at least one group"
            )));
        }

        let mut fuse_layouts = BTreeMap::new();
        fuse_layouts.insert(group_kind, spec.group_fuse);
        for element in &spec.elements {
            if element.kind.is_group() {
                return Err(FsError::InvalidArgument(format!(
                    "{} is a group kind and cannot be an element of {group_kind}",
                    element.kind
                )));
            }
            if element.per_group == 0 {
                return Err(FsError::InvalidArgument(format!(
                    "{} needs at least one instance",
                    element.kind
                )));
            }
            if fuse_layouts.insert(element.kind, element.fuse).is_some() {
                return Err(FsError::InvalidArgument(format!(
                    "{} listed twice in {group_kind}",
                    element.kind
                )));
            }
        }
        if let Some(primary) = spec.primary {
            if !spec.elements.iter().any(|e| e.kind == primary) {
                return Err(FsError::UnknownUnit { kind: primary, set: group_kind });
            }
        }

        let mut element_sets = vec![ElementSet::new(group_kind, spec.num_groups, false, None)?];
        let mut groups = Vec::with_capacity(spec.num_groups as usize);
        for index in 0..spec.num_groups as usize {
            let mut group = Group::new(group_kind, index);
            for element in &spec.elements {
                group.attach(element.kind, element_sets.len());
                element_sets.push(ElementSet::new(
                    element.kind,
                    element.per_group,
                    element.derivative,
                    Some(index),
                )?);
            }
            groups.push(group);
        }

        Ok(Self {
            group_kind,
            num_groups: spec.num_groups,
            groups,
            element_sets,
            specs: spec.elements.clone(),
            primary_kind: spec.primary,
            fuse_layouts,
            group_disable_pickers: Vec::new(),
            group_reduce_pickers: BTreeMap::new(),
            element_disable_pickers: BTreeMap::new(),
        })
    }

    pub fn group_kind(&self) -> UnitKind {
        self.group_kind
    }

    pub fn num_groups(&self) -> u32 {
        self.num_groups
    }

    pub fn primary_kind(&self) -> Option<UnitKind> {
        self.primary_kind
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    pub fn group(&self, index: usize) -> FsResult<&Group> {
        self.groups
            .get(index)
            .ok_or(FsError::IndexOutOfRange { index, count: self.groups.len() })
    }

    pub(crate) fn group_mut(&mut self, index: usize) -> FsResult<&mut Group> {
        let count = self.groups.len();
        self.groups.get_mut(index).ok_or(FsError::IndexOutOfRange { index, count })
    }

    /// Tipos de elemento, na ordem da topologia
    pub fn element_kinds(&self) -> impl Iterator<Item = UnitKind> + '_ {
        self.specs.iter().map(|spec| spec.kind)
    }

    /// Contém o tipo (grupo ou elemento)
    pub fn contains(&self, kind: UnitKind) -> bool {
        self.fuse_layouts.contains_key(&kind)
    }

    fn check_kind(&self, kind: UnitKind) -> FsResult<()> {
        if !self.contains(kind) {
            return Err(FsError::UnknownUnit { kind, set: self.group_kind });
        }
        Ok(())
    }

    fn spec(&self, kind: UnitKind) -> FsResult<&ElementSpec> {
        self.specs
            .iter()
            .find(|spec| spec.kind == kind)
            .ok_or(FsError::UnknownUnit { kind, set: self.group_kind })
    }

    /// Instâncias por grupo (1 para o próprio tipo de grupo)
    pub fn per_group(&self, kind: UnitKind) -> FsResult<u32> {
        if kind == self.group_kind {
            return Ok(1);
        }
        Ok(self.spec(kind)?.per_group)
    }

    /// Tamanho da fatia uniforme de `sub` sob cada `kind`
    pub fn slice_len(&self, kind: UnitKind, sub: UnitKind) -> FsResult<u32> {
        let outer = self.per_group(kind)?;
        let inner = self.per_group(sub)?;
        if kind == self.group_kind || sub == self.group_kind || inner % outer != 0 {
            return Err(FsError::InvalidArgument(format!(
                "{sub} ({inner} per group) is not uniformly distributed under {kind} ({outer} per group)"
            )));
        }
        Ok(inner / outer)
    }

    pub fn is_derivative(&self, kind: UnitKind) -> FsResult<bool> {
        if kind == self.group_kind {
            return Ok(false);
        }
        Ok(self.spec(kind)?.derivative)
    }

    pub fn fuse_layout(&self, kind: UnitKind) -> FsResult<FuseLayout> {
        self.fuse_layouts
            .get(&kind)
            .copied()
            .ok_or(FsError::UnknownUnit { kind, set: self.group_kind })
    }

    pub fn element_sets(&self) -> &[ElementSet] {
        &self.element_sets
    }

    pub fn element_set(&self, slot: usize) -> FsResult<&ElementSet> {
        self.element_sets
            .get(slot)
            .ok_or(FsError::IndexOutOfRange { index: slot, count: self.element_sets.len() })
    }

    pub(crate) fn element_set_mut(&mut self, slot: usize) -> FsResult<&mut ElementSet> {
        let count = self.element_sets.len();
        self.element_sets.get_mut(slot).ok_or(FsError::IndexOutOfRange { index: slot, count })
    }

    /// ElementSet que espelha os grupos desabilitados
    pub fn group_level(&self) -> &ElementSet {
        &self.element_sets[GROUP_LEVEL_SLOT]
    }

    /// Slot do ElementSet `kind` no grupo `group`
    pub fn slot_of(&self, group: usize, kind: UnitKind) -> FsResult<usize> {
        if kind == self.group_kind {
            return Ok(GROUP_LEVEL_SLOT);
        }
        self.check_kind(kind)?;
        self.group(group)?.slot(kind)
    }

    /// ElementSet de `kind` dentro de `group`
    pub fn element_set_in(&self, group: usize, kind: UnitKind) -> FsResult<&ElementSet> {
        if kind == self.group_kind {
            return Err(FsError::InvalidArgument(format!(
                "{kind} is the group kind; use the group-level element set"
            )));
        }
        self.element_set(self.slot_of(group, kind)?)
    }

    /// Todos os ElementSets de um tipo (apenas o de nível de grupo para o tipo de grupo)
    pub fn element_sets_of(&self, kind: UnitKind) -> FsResult<Vec<&ElementSet>> {
        if kind == self.group_kind {
            return Ok(vec![self.group_level()]);
        }
        self.check_kind(kind)?;
        self.groups
            .iter()
            .map(|group| group.slot(kind).map(|slot| &self.element_sets[slot]))
            .collect()
    }

    fn sum(&self, kind: UnitKind, f: impl Fn(&ElementSet) -> u32) -> FsResult<u32> {
        Ok(self.element_sets_of(kind)?.into_iter().map(f).sum())
    }

    pub fn num_enabled(&self, kind: UnitKind) -> FsResult<u32> {
        self.sum(kind, ElementSet::num_enabled)
    }

    pub fn num_disabled(&self, kind: UnitKind) -> FsResult<u32> {
        self.sum(kind, ElementSet::num_disabled)
    }

    pub fn num_reconfig(&self, kind: UnitKind) -> FsResult<u32> {
        self.sum(kind, ElementSet::num_reconfig)
    }

    pub fn num_defective(&self, kind: UnitKind) -> FsResult<u32> {
        self.sum(kind, ElementSet::num_defective)
    }

    pub fn num_protected(&self, kind: UnitKind) -> FsResult<u32> {
        self.sum(kind, ElementSet::num_protected)
    }

    fn per_group_count(
        &self,
        group: usize,
        kind: UnitKind,
        mask_of: impl Fn(&ElementSet) -> &Mask,
    ) -> FsResult<u32> {
        if kind == self.group_kind {
            self.group(group)?;
            return Ok(mask_of(self.group_level()).is_set(group as u32)? as u32);
        }
        Ok(mask_of(self.element_set_in(group, kind)?).num_set_bits())
    }

    pub fn num_enabled_in_group(&self, group: usize, kind: UnitKind) -> FsResult<u32> {
        let disabled = self.per_group_count(group, kind, ElementSet::total_disable_mask)?;
        Ok(self.per_group(kind)? - disabled)
    }

    pub fn num_disabled_in_group(&self, group: usize, kind: UnitKind) -> FsResult<u32> {
        self.per_group_count(group, kind, ElementSet::total_disable_mask)
    }

    pub fn num_reconfig_in_group(&self, group: usize, kind: UnitKind) -> FsResult<u32> {
        self.per_group_count(group, kind, ElementSet::reconfig_mask)
    }

    pub fn num_defective_in_group(&self, group: usize, kind: UnitKind) -> FsResult<u32> {
        self.per_group_count(group, kind, ElementSet::defective_mask)
    }

    pub fn num_protected_in_group(&self, group: usize, kind: UnitKind) -> FsResult<u32> {
        self.per_group_count(group, kind, ElementSet::protected_mask)
    }

    /// Contagem de habilitados por grupo, indexada pelo grupo
    pub fn enabled_counts(&self, kind: UnitKind) -> FsResult<Vec<u32>> {
        (0..self.groups.len())
            .map(|group| self.num_enabled_in_group(group, kind))
            .collect()
    }

    /// Grupos ainda habilitados
    pub fn enabled_groups(&self) -> Mask {
        self.group_level().enabled_mask()
    }

    /// Grupos protegidos (por bit de nível de grupo ou pela flag do grupo)
    pub fn protected_groups(&self) -> FsResult<Mask> {
        let mut mask = *self.group_level().protected_mask();
        for group in self.groups.iter().filter(|g| g.is_protected()) {
            mask.set_bit(group.index() as u32)?;
        }
        Ok(mask)
    }

    pub fn group_disable_pickers(&self) -> &[Arc<dyn GroupPicker>] {
        &self.group_disable_pickers
    }

    pub fn group_reduce_pickers(&self, kind: UnitKind) -> &[Arc<dyn GroupPicker>] {
        self.group_reduce_pickers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn element_disable_pickers(&self, kind: UnitKind) -> &[Arc<dyn ElementPicker>] {
        self.element_disable_pickers.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Registra picker de desabilitação de grupo (ordem = prioridade)
    pub fn register_group_disable_picker(&mut self, picker: Arc<dyn GroupPicker>) {
        self.group_disable_pickers.push(picker);
    }

    /// Registra picker que escolhe de qual grupo retirar um `kind`
    pub fn register_group_reduce_picker(
        &mut self,
        kind: UnitKind,
        picker: Arc<dyn GroupPicker>,
    ) -> FsResult<()> {
        self.check_element_kind(kind)?;
        self.group_reduce_pickers.entry(kind).or_default().push(picker);
        Ok(())
    }

    /// Registra picker que escolhe qual `kind` desabilitar dentro do grupo
    pub fn register_element_disable_picker(
        &mut self,
        kind: UnitKind,
        picker: Arc<dyn ElementPicker>,
    ) -> FsResult<()> {
        self.check_element_kind(kind)?;
        self.element_disable_pickers.entry(kind).or_default().push(picker);
        Ok(())
    }

    fn check_element_kind(&self, kind: UnitKind) -> FsResult<()> {
        self.spec(kind).map(|_| ())
    }
}
