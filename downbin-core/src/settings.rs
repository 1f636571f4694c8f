//! Configurações globais de desabilitação

use serde::{Deserialize, Serialize};

/// Como um bit recém-desabilitado é registrado
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisableMode {
    /// Desabilitação deliberada (downbin)
    #[default]
    Disable,
    /// Defeito de fabricação; também entra em `disable`
    Defective,
    /// Configuração alternativa
    Reconfig,
}

/// Configurações ativas do [`Chip`](crate::chip::Chip)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FsSettings {
    /// Modo aplicado por `disable_elements` e pelas cascatas
    #[serde(default)]
    pub disable_mode: DisableMode,
}

impl FsSettings {
    pub fn with_mode(disable_mode: DisableMode) -> Self {
        Self { disable_mode }
    }
}
