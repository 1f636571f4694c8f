//! # 🧩 downbin-core — Máscaras, Regras e Pickers
//!
//! Modelo hierárquico de unidades de hardware de uma GPU e o motor que
//! decide quais unidades desabilitar além das defeituosas.
//!
//! ## Modelo
//!
//! ```text
//! Chip
//!  ├── Set (GPC)                        um por tipo de grupo
//!  │    ├── slot 0: ElementSet (GPC)    nível de grupo: quais GPCs caíram
//!  │    ├── Group 0 ── TPC, PES, CPC    ElementSets por grupo
//!  │    ├── Group 1 ── ...
//!  │    └── pickers (disable / reduce / element)
//!  ├── Set (FBP) ...
//!  └── rules: Vec<Arc<dyn Rule>>        ouvintes referenciados por id
//! ```
//!
//! ## Propagação
//!
//! `Chip::disable_*` aplica os bits e executa, em ordem de registro, as
//! regras que escutam o ElementSet ou grupo afetado. As regras podem
//! desabilitar mais unidades (corretivas) ou abortar o run com
//! [`FsError::Infeasible`] (verificadoras). Não há rollback.
//!
//! ## Busca gulosa
//!
//! `Chip::disable_one_group` e `Chip::disable_one_element` passam os
//! candidatos pelas cadeias de pickers do Set e desabilitam o menor índice
//! restante.
//!
//! ## Exemplo
//!
//! ```ignore
//! use downbin_core::prelude::*;
//!
//! let mut chip = Chip::new();
//! chip.add_set(&SetSpec::new(UnitKind::Gpc, 8)
//!     .primary(UnitKind::Tpc)
//!     .element(ElementSpec::new(UnitKind::Tpc, 9)))?;
//! chip.add_rule(MinGroupElementCount::new(UnitKind::Gpc, UnitKind::Tpc, 1))?;
//!
//! chip.disable_element(UnitKind::Gpc, 3, UnitKind::Tpc, 0)?;
//! let (gpc, tpc) = chip.disable_one_element(UnitKind::Gpc, UnitKind::Tpc)?;
//! ```

pub mod chip;
pub mod element_set;
pub mod error;
pub mod group;
pub mod mask;
pub mod pickers;
pub mod rules;
pub mod set;
pub mod settings;
pub mod skyline;
pub mod unit;

pub use chip::{Chip, ElementSetRef};
pub use element_set::ElementSet;
pub use error::{ErrorKind, FsError, FsResult};
pub use group::Group;
pub use mask::{Mask, MAX_WIDTH};
pub use set::{ElementSpec, Set, SetSpec, GROUP_LEVEL_SLOT};
pub use settings::{DisableMode, FsSettings};
pub use skyline::{enabled_profile, skyline_feasible, SkylineMode, SkylinePicker, SkylineRule};
pub use unit::{FuseLayout, FusePolarity, UnitKind};

/// Importações de uso comum
pub mod prelude {
    pub use crate::chip::{Chip, ElementSetRef};
    pub use crate::error::{FsError, FsResult};
    pub use crate::mask::Mask;
    pub use crate::pickers::{
        BalancedParent, ElementPicker, ExcludeProtected, ExcludeProtectedGroups,
        FewestProtectedOrDisabled, GroupPicker, MostDisabledDependents, MostDisabledSubunits,
        PairedIndexPicker, PartitionBalance, PreferenceMask, PreferredOrder,
    };
    pub use crate::rules::{
        AlwaysEnable, CrossElementDependency, InvalidElementCombo, MinElementCount,
        MinGroupElementCount, MinSubElementCount, Rule, RuleId, SubElementDependency, Trigger,
    };
    pub use crate::set::{ElementSpec, SetSpec};
    pub use crate::settings::{DisableMode, FsSettings};
    pub use crate::skyline::{
        enabled_profile, skyline_feasible, SkylineMode, SkylinePicker, SkylineRule,
    };
    pub use crate::unit::{FuseLayout, UnitKind};
}
