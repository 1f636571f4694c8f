//! Erros do motor de floorsweeping

use thiserror::Error;
use crate::unit::UnitKind;

pub type FsResult<T> = Result<T, FsError>;

/// Categoria do erro
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Violação de contrato (bug do chamador, nunca recuperável)
    Contract,
    /// Configuração inviável para o run atual
    Infeasible,
}

/// Erros do motor
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FsError {
    /// Bit fora da largura da máscara
    #[error("Bit {bit} out of range for mask width {width}")]
    BitOutOfRange { bit: u32, width: u32 },

    /// Padrão com bits acima da largura
    #[error("Pattern {pattern:#x} exceeds mask width {width}")]
    PatternOutOfRange { pattern: u32, width: u32 },

    /// Largura acima do suportado
    #[error("Mask width {0} exceeds the 32-bit limit")]
    WidthTooLarge(u32),

    /// Operação entre máscaras de larguras diferentes
    #[error("Mask width mismatch: expected {expected}, found {found}")]
    WidthMismatch { expected: u32, found: u32 },

    /// Tipo de unidade ausente no Set consultado
    #[error("Unit kind {kind} is not part of the {set} set")]
    UnknownUnit { kind: UnitKind, set: UnitKind },

    /// Nenhum Set contém o tipo pedido
    #[error("No set registered for unit kind {0}")]
    UnknownSet(UnitKind),

    /// Índice de grupo/slot inválido
    #[error("Index {index} out of range ({count} available)")]
    IndexOutOfRange { index: usize, count: usize },

    /// Picker devolveu candidatos fora da entrada
    #[error("Picker {0} enlarged its candidate mask")]
    PickerContract(String),

    /// Argumento inválido
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuração inviável
    #[error("Infeasible: {0}")]
    Infeasible(String),
}

impl FsError {
    /// Cria erro de inviabilidade
    pub fn infeasible(reason: impl Into<String>) -> Self {
        FsError::Infeasible(reason.into())
    }

    /// Categoria do erro
    pub fn kind(&self) -> ErrorKind {
        match self {
            FsError::Infeasible(_) => ErrorKind::Infeasible,
            _ => ErrorKind::Contract,
        }
    }

    /// Verdadeiro para falhas de inviabilidade
    pub fn is_infeasible(&self) -> bool {
        self.kind() == ErrorKind::Infeasible
    }
}
