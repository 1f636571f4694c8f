//! ElementSet — coleção de sub-unidades idênticas de um grupo

use serde::Serialize;
use crate::error::{FsError, FsResult};
use crate::mask::Mask;
use crate::rules::RuleId;
use crate::settings::DisableMode;
use crate::unit::UnitKind;

/// Estado de desabilitação de um conjunto de elementos
///
/// `total_disable == disable | reconfig` sempre vale; bits em
/// `total_disable` nunca são limpos. A disjunção com `protected` é
/// verificada por regras, não por esta estrutura.
#[derive(Debug, Clone, Serialize)]
pub struct ElementSet {
    kind: UnitKind,
    num_elements: u32,
    derivative: bool,
    /// Grupo dono dentro do Set; `None` para o ElementSet de nível de grupo
    owner: Option<usize>,
    defective: Mask,
    disable: Mask,
    reconfig: Mask,
    protected: Mask,
    total_disable: Mask,
    #[serde(skip)]
    listeners: Vec<RuleId>,
}

impl ElementSet {
    /// Cria conjunto com todos os elementos habilitados
    pub fn new(
        kind: UnitKind,
        num_elements: u32,
        derivative: bool,
        owner: Option<usize>,
    ) -> FsResult<Self> {
        let empty = Mask::new(num_elements)?;
        Ok(Self {
            kind,
            num_elements,
            derivative,
            owner,
            defective: empty,
            disable: empty,
            reconfig: empty,
            protected: empty,
            total_disable: empty,
            listeners: Vec::new(),
        })
    }

    pub fn kind(&self) -> UnitKind {
        self.kind
    }

    pub fn num_elements(&self) -> u32 {
        self.num_elements
    }

    /// Estado derivado de outros conjuntos (não desabilitado diretamente pelo grupo)
    pub fn is_derivative(&self) -> bool {
        self.derivative
    }

    pub fn owner(&self) -> Option<usize> {
        self.owner
    }

    pub fn defective_mask(&self) -> &Mask {
        &self.defective
    }

    pub fn disable_mask(&self) -> &Mask {
        &self.disable
    }

    pub fn reconfig_mask(&self) -> &Mask {
        &self.reconfig
    }

    pub fn protected_mask(&self) -> &Mask {
        &self.protected
    }

    pub fn total_disable_mask(&self) -> &Mask {
        &self.total_disable
    }

    /// Elementos ainda habilitados
    pub fn enabled_mask(&self) -> Mask {
        self.total_disable.inverted()
    }

    pub fn listeners(&self) -> &[RuleId] {
        &self.listeners
    }

    pub(crate) fn add_listener(&mut self, rule: RuleId) {
        self.listeners.push(rule);
    }

    pub fn num_enabled(&self) -> u32 {
        self.total_disable.num_unset_bits()
    }

    pub fn num_disabled(&self) -> u32 {
        self.total_disable.num_set_bits()
    }

    pub fn num_reconfig(&self) -> u32 {
        self.reconfig.num_set_bits()
    }

    pub fn num_defective(&self) -> u32 {
        self.defective.num_set_bits()
    }

    pub fn num_protected(&self) -> u32 {
        self.protected.num_set_bits()
    }

    pub fn is_disabled(&self, bit: u32) -> FsResult<bool> {
        self.total_disable.is_set(bit)
    }

    pub fn is_fully_disabled(&self) -> bool {
        self.total_disable.is_full()
    }

    fn check_width(&self, mask: &Mask) -> FsResult<()> {
        if mask.width() != self.num_elements {
            return Err(FsError::WidthMismatch { expected: self.num_elements, found: mask.width() });
        }
        Ok(())
    }

    /// Aplica a desabilitação sem notificar ouvintes
    ///
    /// Retorna os bits recém-desabilitados; vazio quando nada mudou.
    /// Quem chama é responsável por disparar os ouvintes.
    pub(crate) fn apply_disable(&mut self, mask: &Mask, mode: DisableMode) -> FsResult<Mask> {
        self.check_width(mask)?;
        let newly = mask.and_not(&self.total_disable)?;
        if newly.is_empty() {
            return Ok(newly);
        }

        self.total_disable = self.total_disable.or(&newly)?;
        match mode {
            DisableMode::Disable => self.disable = self.disable.or(&newly)?,
            DisableMode::Reconfig => self.reconfig = self.reconfig.or(&newly)?,
            DisableMode::Defective => {
                self.defective = self.defective.or(&newly)?;
                self.disable = self.disable.or(&newly)?;
            }
        }
        Ok(newly)
    }

    /// Marca elementos como protegidos (nunca devem ser desabilitados)
    pub(crate) fn protect(&mut self, mask: &Mask) -> FsResult<()> {
        self.check_width(mask)?;
        self.protected = self.protected.or(mask)?;
        Ok(())
    }

    /// Verifica `total_disable == disable | reconfig`
    pub fn is_consistent(&self) -> bool {
        self.disable.or(&self.reconfig).is_ok_and(|union| union == self.total_disable)
    }
}
