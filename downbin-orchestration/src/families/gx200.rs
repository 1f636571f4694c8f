//! # GX200 — família com padrões de fatias de cache
//!
//! ```text
//!   GPC ×6 ─┬─ TPC ×6 (principal)
//!           └─ PES ×2 ← 3 TPCs cada
//!
//!   FBP ×8 ─┬─ FBIO ×1 ← 2 LTCs
//!           ├─ LTC ×2 (principal, reconfig)
//!           └─ L2 slice ×8 ← 4 por LTC, padrão global (ver slice_pattern)
//! ```

use std::sync::Arc;
use downbin_core::prelude::*;
use crate::error::OrchestrationResult;
use crate::families::gx100::edge_first_order;
use crate::families::{ChipFamily, SlicePatternRule};
use crate::sku::SkuConfig;
use crate::topology::ChipTopology;

pub const NUM_GPCS: u32 = 6;
pub const TPCS_PER_GPC: u32 = 6;
pub const NUM_FBPS: u32 = 8;

/// Família GX200
#[derive(Debug, Clone, Copy, Default)]
pub struct Gx200;

impl Gx200 {
    pub fn new() -> Self {
        Self
    }

    fn slice_pattern(sku: &SkuConfig) -> SlicePatternRule {
        let rule = SlicePatternRule::new(UnitKind::Fbp, UnitKind::Ltc, UnitKind::L2Slice);
        match sku.get(UnitKind::L2Slice).and_then(|unit| unit.max_enable_count) {
            Some(max) => rule.max_enabled(max),
            None => rule,
        }
    }
}

pub fn boxed() -> Box<dyn ChipFamily> {
    Box::new(Gx200::new())
}

impl ChipFamily for Gx200 {
    fn name(&self) -> &str {
        "gx200"
    }

    fn topology(&self) -> ChipTopology {
        let ltc_fuses = FuseLayout::flat().with_reconfig();
        ChipTopology::new(vec![
            SetSpec::new(UnitKind::Gpc, NUM_GPCS)
                .primary(UnitKind::Tpc)
                .element(ElementSpec::new(UnitKind::Tpc, TPCS_PER_GPC))
                .element(ElementSpec::new(UnitKind::Pes, 2).derivative()),
            SetSpec::new(UnitKind::Fbp, NUM_FBPS)
                .primary(UnitKind::Ltc)
                .element(ElementSpec::new(UnitKind::Fbio, 1).fuse(FuseLayout::flat()))
                .element(ElementSpec::new(UnitKind::Ltc, 2).fuse(ltc_fuses))
                .element(ElementSpec::new(UnitKind::L2Slice, 8).derivative()),
        ])
    }

    fn register_structural_rules(&self, chip: &mut Chip) -> OrchestrationResult<()> {
        let num_gpcs = chip.set(UnitKind::Gpc)?.num_groups() as usize;
        for gpc in 0..num_gpcs {
            let pes = SubElementDependency::new(UnitKind::Gpc, gpc, UnitKind::Pes, UnitKind::Tpc);
            chip.add_rule(pes)?;
        }
        chip.add_rule(MinGroupElementCount::new(UnitKind::Gpc, UnitKind::Tpc, 1))?;

        let num_fbps = chip.set(UnitKind::Fbp)?.num_groups() as usize;
        for fbp in 0..num_fbps {
            for (kind, sub) in [(UnitKind::Ltc, UnitKind::L2Slice), (UnitKind::Fbio, UnitKind::Ltc)] {
                chip.add_rule(SubElementDependency::new(UnitKind::Fbp, fbp, kind, sub))?;
            }
        }
        chip.add_rule(MinGroupElementCount::new(UnitKind::Fbp, UnitKind::Ltc, 1))?;
        Ok(())
    }

    fn register_pickers(&self, chip: &mut Chip, _sku: &SkuConfig) -> OrchestrationResult<()> {
        let gpcs = chip.set_mut(UnitKind::Gpc)?;
        let order = edge_first_order(gpcs.num_groups());
        gpcs.register_group_disable_picker(
            Arc::new(MostDisabledSubunits::new(UnitKind::Gpc, UnitKind::Tpc)),
        );
        gpcs.register_group_disable_picker(Arc::new(PreferredOrder::new(UnitKind::Gpc, order)));
        gpcs.register_group_reduce_picker(
            UnitKind::Tpc,
            Arc::new(FewestProtectedOrDisabled::new(UnitKind::Gpc, UnitKind::Tpc, false, true)),
        )?;
        gpcs.register_element_disable_picker(
            UnitKind::Tpc,
            Arc::new(BalancedParent::new(UnitKind::Gpc, UnitKind::Tpc, UnitKind::Pes)),
        )?;

        let fbps = chip.set_mut(UnitKind::Fbp)?;
        fbps.register_group_disable_picker(
            Arc::new(MostDisabledSubunits::new(UnitKind::Fbp, UnitKind::Ltc)),
        );
        fbps.register_group_disable_picker(
            Arc::new(MostDisabledSubunits::new(UnitKind::Fbp, UnitKind::L2Slice)),
        );
        fbps.register_group_reduce_picker(
            UnitKind::Ltc,
            Arc::new(MostDisabledSubunits::new(UnitKind::Fbp, UnitKind::L2Slice)),
        )?;
        fbps.register_element_disable_picker(
            UnitKind::Ltc,
            Arc::new(MostDisabledDependents::new(UnitKind::Fbp, UnitKind::Ltc, UnitKind::L2Slice)),
        )?;
        Ok(())
    }

    fn downbin_order(&self) -> Vec<UnitKind> {
        vec![UnitKind::Gpc, UnitKind::Fbp, UnitKind::Tpc, UnitKind::Ltc]
    }

    fn post_rules(&self, chip: &mut Chip, sku: &SkuConfig) -> OrchestrationResult<()> {
        chip.run_rule(&Self::slice_pattern(sku))?;
        Ok(())
    }
}
