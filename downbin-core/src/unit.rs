//! Tipos de unidade de hardware e metadados de fusível

use std::fmt;
use serde::{Deserialize, Serialize};

/// Tipo de unidade de hardware
///
/// Enumeração fechada. Tipos de grupo são as instâncias de topo de um
/// [`Set`](crate::set::Set); tipos de elemento vivem dentro de um grupo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitKind {
    /// Graphics processing cluster (grupo)
    Gpc,
    /// Texture processing cluster
    Tpc,
    /// Primitive engine shared
    Pes,
    /// Compute processing cluster
    Cpc,
    /// Raster operations unit
    Rop,
    /// Frame buffer partition (grupo)
    Fbp,
    /// Frame buffer I/O
    Fbio,
    /// Level-two cache partition
    Ltc,
    /// Fatia de L2
    L2Slice,
    /// Link de interconexão (grupo sem elementos)
    Link,
}

impl UnitKind {
    /// Todos os tipos, em ordem estável
    pub const ALL: [UnitKind; 10] = [
        UnitKind::Gpc,
        UnitKind::Tpc,
        UnitKind::Pes,
        UnitKind::Cpc,
        UnitKind::Rop,
        UnitKind::Fbp,
        UnitKind::Fbio,
        UnitKind::Ltc,
        UnitKind::L2Slice,
        UnitKind::Link,
    ];

    /// Nome usado nos fusíveis (`opt_<nome>_...`)
    pub fn fuse_name(&self) -> &'static str {
        match self {
            UnitKind::Gpc => "gpc",
            UnitKind::Tpc => "tpc",
            UnitKind::Pes => "pes",
            UnitKind::Cpc => "cpc",
            UnitKind::Rop => "rop",
            UnitKind::Fbp => "fbp",
            UnitKind::Fbio => "fbio",
            UnitKind::Ltc => "ltc",
            UnitKind::L2Slice => "l2slice",
            UnitKind::Link => "link",
        }
    }

    /// Verdadeiro para tipos de grupo (topo de hierarquia)
    pub fn is_group(&self) -> bool {
        matches!(self, UnitKind::Gpc | UnitKind::Fbp | UnitKind::Link)
    }

    /// Busca pelo nome de fusível
    pub fn from_fuse_name(name: &str) -> Option<UnitKind> {
        Self::ALL.iter().copied().find(|k| k.fuse_name() == name)
    }
}

impl fmt::Display for UnitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.fuse_name())
    }
}

/// Polaridade do fusível principal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusePolarity {
    /// Bit em 1 = unidade desabilitada (`_disable`)
    #[default]
    Disable,
    /// Bit em 1 = unidade habilitada (`_enable`)
    Enable,
}

impl FusePolarity {
    /// Sufixo do nome do fusível
    pub fn suffix(&self) -> &'static str {
        match self {
            FusePolarity::Disable => "disable",
            FusePolarity::Enable => "enable",
        }
    }
}

/// Metadados de fusível de um tipo de unidade
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FuseLayout {
    /// Um fusível por grupo (`opt_tpc_gpc3_disable`) ou um único achatado
    #[serde(default)]
    pub per_group: bool,
    /// Polaridade do fusível principal
    #[serde(default)]
    pub polarity: FusePolarity,
    /// Possui fusível `_defective`
    #[serde(default = "default_true")]
    pub defective: bool,
    /// Possui fusível `_reconfig`
    #[serde(default)]
    pub reconfig: bool,
}

fn default_true() -> bool {
    true
}

impl FuseLayout {
    /// Layout achatado com `_disable` e `_defective`
    pub const fn flat() -> Self {
        Self { per_group: false, polarity: FusePolarity::Disable, defective: true, reconfig: false }
    }

    /// Layout com um fusível por grupo
    pub const fn per_group() -> Self {
        Self { per_group: true, polarity: FusePolarity::Disable, defective: true, reconfig: false }
    }

    /// Troca a polaridade para `_enable`
    pub const fn enable_polarity(mut self) -> Self {
        self.polarity = FusePolarity::Enable;
        self
    }

    /// Adiciona fusível `_reconfig`
    pub const fn with_reconfig(mut self) -> Self {
        self.reconfig = true;
        self
    }

    /// Remove fusível `_defective`
    pub const fn without_defective(mut self) -> Self {
        self.defective = false;
        self
    }
}

impl Default for FuseLayout {
    fn default() -> Self {
        Self::flat()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuse_names_round_trip() {
        for kind in UnitKind::ALL {
            assert_eq!(UnitKind::from_fuse_name(kind.fuse_name()), Some(kind));
        }
        assert_eq!(UnitKind::from_fuse_name("sm"), None);
    }

    #[test]
    fn test_group_kinds() {
        assert!(UnitKind::Gpc.is_group());
        assert!(UnitKind::Link.is_group());
        assert!(!UnitKind::L2Slice.is_group());
    }

    #[test]
    fn test_serde_lowercase() {
        let json = serde_json::to_string(&UnitKind::L2Slice).unwrap();
        assert_eq!(json, "\"l2slice\"");
        let kind: UnitKind = serde_json::from_str("\"tpc\"").unwrap();
        assert_eq!(kind, UnitKind::Tpc);
    }

    #[test]
    fn test_fuse_layout_builders() {
        let layout = FuseLayout::per_group().with_reconfig().enable_polarity();
        assert!(layout.per_group);
        assert!(layout.reconfig);
        assert_eq!(layout.polarity.suffix(), "enable");
        assert!(!FuseLayout::flat().without_defective().defective);
    }
}
