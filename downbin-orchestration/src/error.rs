//! Erros de orquestração

use thiserror::Error;
use downbin_core::FsError;
use crate::stage::DownbinStage;

pub type OrchestrationResult<T> = Result<T, OrchestrationError>;

/// Erros de orquestração
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrchestrationError {
    /// Erro do motor de floorsweeping
    #[error("Floorsweep error: {0}")]
    Floorsweep(#[from] FsError),

    /// Passo chamado fora de ordem
    #[error("Invalid stage: expected {expected}, found {found}")]
    InvalidStage { expected: DownbinStage, found: DownbinStage },

    /// Família de chip desconhecida
    #[error("Unknown chip family: {0}")]
    UnknownFamily(String),

    /// Configuração inválida
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Validação final reprovada
    #[error("Validation failed: {0}")]
    ValidationFailed(String),

    /// Fuse ausente ou inválido
    #[error("Fuse error: {0}")]
    Fuse(String),
}

impl OrchestrationError {
    /// Inviabilidade do SKU (o chamador pode tentar outro SKU)
    pub fn is_infeasible(&self) -> bool {
        match self {
            OrchestrationError::Floorsweep(err) => err.is_infeasible(),
            OrchestrationError::ValidationFailed(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = OrchestrationError::UnknownFamily("gx999".into());
        assert!(err.to_string().contains("Unknown chip family"));
    }

    #[test]
    fn test_fs_error_conversion() {
        let err: OrchestrationError = FsError::infeasible("no gpc left").into();
        assert!(err.to_string().contains("Floorsweep error"));
        assert!(err.is_infeasible());

        let err: OrchestrationError = FsError::WidthTooLarge(40).into();
        assert!(!err.is_infeasible());
    }

    #[test]
    fn test_stage_error_display() {
        let err = OrchestrationError::InvalidStage {
            expected: DownbinStage::TopologyBuilt,
            found: DownbinStage::Uninitialized,
        };
        assert_eq!(err.to_string(), "Invalid stage: expected topology-built, found uninitialized");
    }
}
