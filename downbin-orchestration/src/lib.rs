//! # 🎭 downbin-orchestration — Runs de Downbin por Família
//!
//! Compõe o motor de `downbin-core` em um run completo para um SKU: monta a
//! topologia da família, registra regras e pickers, importa os defeitos dos
//! fuses, executa o laço guloso, valida e exporta os fuses finais.
//!
//! ## Estágios
//!
//! ```text
//! Uninitialized ─► TopologyBuilt ─► RulesRegistered ─► DefectsImported
//!                                                            │
//!    Exported ◄─ Validated ◄─ PostRulesApplied ◄─ Downbinning ◄─ PickersRegistered
//!
//!    qualquer passo com erro ─► Failed (terminal)
//! ```
//!
//! ## Exemplo
//!
//! ```ignore
//! use downbin_orchestration::prelude::*;
//!
//! let sku = SkuConfig::from_file(Path::new("skus/gx100-a.toml"))?;
//! let input = MemoryFuseStore::from_json(&std::fs::read_to_string("fuses.json")?)?;
//! let mut output = MemoryFuseStore::new();
//!
//! let mut orch = Orchestrator::for_family("gx100", sku)?;
//! let summary = orch.run(&input, &mut output)?;
//! println!("{}", summary.to_json()?);
//! ```

pub mod config;
pub mod error;
pub mod families;
pub mod fuse;
pub mod orchestrator;
pub mod sku;
pub mod stage;
pub mod summary;
pub mod topology;
pub mod validator;

pub use config::OrchestratorConfig;
pub use error::{OrchestrationError, OrchestrationResult};
pub use families::{ChipFamily, FamilyFactory, FamilyRegistry, Gx100, Gx200, SlicePatternRule};
pub use fuse::{export_fuses, fuse_name, import_fuses, FuseField, FuseStore, MemoryFuseStore};
pub use orchestrator::Orchestrator;
pub use sku::{SkuConfig, UnitSkuConfig};
pub use stage::DownbinStage;
pub use summary::{DownbinSummary, UnitSummary};
pub use topology::{ChipTopology, TopologyProvider};
pub use validator::{LegalityValidator, NoExternalValidator, SkuLegalityValidator};

/// Prelude com os tipos de uso comum
pub mod prelude {
    pub use crate::{
        ChipFamily, ChipTopology, DownbinStage, DownbinSummary, FamilyRegistry, FuseStore,
        LegalityValidator, MemoryFuseStore, OrchestrationError, OrchestrationResult, Orchestrator,
        OrchestratorConfig, SkuConfig, TopologyProvider, UnitSkuConfig,
    };
    pub use downbin_core::prelude::*;
}
