//! # GX100 — família com pares NOC e skyline
//!
//! ```text
//!   GPC ×8 ─┬─ TPC ×9 (principal)
//!           ├─ PES ×3 ← 3 TPCs cada
//!           ├─ CPC ×3 ← 3 TPCs cada
//!           └─ ROP ×2 (ambos perdidos ⇒ GPC perdido)
//!
//!   FBP ×12 ─┬─ FBIO ×1 ← 2 LTCs
//!            ├─ LTC ×2 (principal, reconfig)
//!            └─ L2 slice ×8 ← 4 por LTC, mínimo 3
//!
//!   FBP 2k ⇄ FBP 2k+1 (par NOC)      LINK ×12 ↔ FBP de mesmo índice
//! ```

use std::collections::BTreeMap;
use std::sync::Arc;
use downbin_core::prelude::*;
use crate::error::OrchestrationResult;
use crate::families::ChipFamily;
use crate::sku::SkuConfig;
use crate::topology::ChipTopology;

pub const NUM_GPCS: u32 = 8;
pub const TPCS_PER_GPC: u32 = 9;
pub const NUM_FBPS: u32 = 12;
pub const NUM_LINKS: u32 = 12;

const MIN_SLICES_PER_LTC: u32 = 3;

/// Família GX100
#[derive(Debug, Clone, Copy, Default)]
pub struct Gx100;

impl Gx100 {
    pub fn new() -> Self {
        Self
    }
}

pub fn boxed() -> Box<dyn ChipFamily> {
    Box::new(Gx100::new())
}

/// Ordem física de desabilitação: das bordas para o centro
pub(crate) fn edge_first_order(num_groups: u32) -> Vec<usize> {
    let mut order = Vec::with_capacity(num_groups as usize);
    let (mut low, mut high) = (0usize, num_groups as usize);
    while low < high {
        high -= 1;
        order.push(high);
        if low < high {
            order.push(low);
        }
        low += 1;
    }
    order
}

/// Metades físicas do Set
pub(crate) fn halves(num_groups: u32) -> OrchestrationResult<Vec<Mask>> {
    let half = num_groups / 2;
    Ok(vec![Mask::range(num_groups, 0, half)?, Mask::range(num_groups, half, num_groups - half)?])
}

impl ChipFamily for Gx100 {
    fn name(&self) -> &str {
        "gx100"
    }

    fn topology(&self) -> ChipTopology {
        let ltc_fuses = FuseLayout::flat().with_reconfig();
        ChipTopology::new(vec![
            SetSpec::new(UnitKind::Gpc, NUM_GPCS)
                .primary(UnitKind::Tpc)
                .element(ElementSpec::new(UnitKind::Tpc, TPCS_PER_GPC))
                .element(ElementSpec::new(UnitKind::Pes, 3).derivative())
                .element(ElementSpec::new(UnitKind::Cpc, 3).derivative())
                .element(ElementSpec::new(UnitKind::Rop, 2).fuse(FuseLayout::flat())),
            SetSpec::new(UnitKind::Fbp, NUM_FBPS)
                .primary(UnitKind::Ltc)
                .element(ElementSpec::new(UnitKind::Fbio, 1).fuse(FuseLayout::flat()))
                .element(ElementSpec::new(UnitKind::Ltc, 2).fuse(ltc_fuses))
                .element(ElementSpec::new(UnitKind::L2Slice, 8).derivative()),
            SetSpec::new(UnitKind::Link, NUM_LINKS)
                .group_fuse(FuseLayout::flat().enable_polarity()),
        ])
    }

    fn register_structural_rules(&self, chip: &mut Chip) -> OrchestrationResult<()> {
        let num_gpcs = chip.set(UnitKind::Gpc)?.num_groups() as usize;
        let rops = chip.set(UnitKind::Gpc)?.per_group(UnitKind::Rop)?;
        for gpc in 0..num_gpcs {
            for sub in [UnitKind::Pes, UnitKind::Cpc] {
                chip.add_rule(SubElementDependency::new(UnitKind::Gpc, gpc, sub, UnitKind::Tpc))?;
            }
            let target = chip.element_set_ref(UnitKind::Gpc, gpc, UnitKind::Rop)?;
            chip.add_rule(InvalidElementCombo::new(target, Mask::full(rops)?))?;
        }
        chip.add_rule(MinGroupElementCount::new(UnitKind::Gpc, UnitKind::Tpc, 1))?;

        let num_fbps = chip.set(UnitKind::Fbp)?.num_groups() as usize;
        for fbp in 0..num_fbps {
            for (kind, sub) in [(UnitKind::Ltc, UnitKind::L2Slice), (UnitKind::Fbio, UnitKind::Ltc)] {
                chip.add_rule(SubElementDependency::new(UnitKind::Fbp, fbp, kind, sub))?;
            }
            chip.add_rule(MinSubElementCount::new(
                UnitKind::Fbp,
                fbp,
                UnitKind::Ltc,
                UnitKind::L2Slice,
                MIN_SLICES_PER_LTC,
            ))?;
        }
        chip.add_rule(MinGroupElementCount::new(UnitKind::Fbp, UnitKind::Ltc, 1))?;

        // pares NOC
        for pair in 0..num_fbps / 2 {
            let (low, high) = ((2 * pair, 0), (2 * pair + 1, 0));
            for rule in CrossElementDependency::pair(UnitKind::Fbp, UnitKind::Fbp, low, high) {
                chip.add_rule(rule)?;
            }
        }
        tracing::debug!(
            family = self.name(),
            rules = chip.num_rules(),
            "structural rules registered"
        );
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
            Arc::new(BalancedParent::new(UnitKind::Gpc, UnitKind::Tpc, UnitKind::Cpc)),
        )?;

        let fbps = chip.set_mut(UnitKind::Fbp)?;
        let partitions = halves(fbps.num_groups())?;
        fbps.register_group_disable_picker(
            Arc::new(PartitionBalance::new(UnitKind::Fbp, partitions.clone())),
        );
        fbps.register_group_disable_picker(
            Arc::new(PairedIndexPicker::prefer(UnitKind::Fbp, UnitKind::Link)),
        );
        fbps.register_group_disable_picker(
            Arc::new(MostDisabledSubunits::new(UnitKind::Fbp, UnitKind::Ltc)),
        );
        fbps.register_group_reduce_picker(
            UnitKind::Ltc,
            Arc::new(PartitionBalance::new(UnitKind::Fbp, partitions).counting(UnitKind::Ltc)),
        )?;
        fbps.register_group_reduce_picker(
            UnitKind::Ltc,
            Arc::new(MostDisabledSubunits::new(UnitKind::Fbp, UnitKind::L2Slice)),
        )?;
        fbps.register_element_disable_picker(
            UnitKind::Ltc,
            Arc::new(MostDisabledDependents::new(UnitKind::Fbp, UnitKind::Ltc, UnitKind::L2Slice)),
        )?;

        // link sem seu FBP não tem uso: cai primeiro o link cujo FBP já caiu
        let links = PairedIndexPicker::prefer(UnitKind::Link, UnitKind::Fbp);
        chip.set_mut(UnitKind::Link)?.register_group_disable_picker(Arc::new(links));
        Ok(())
    }

    fn downbin_order(&self) -> Vec<UnitKind> {
        vec![UnitKind::Gpc, UnitKind::Fbp, UnitKind::Tpc, UnitKind::Ltc, UnitKind::Link]
    }

    fn partitions(&self, chip: &Chip) -> OrchestrationResult<BTreeMap<UnitKind, Vec<Mask>>> {
        let num_fbps = chip.set(UnitKind::Fbp)?.num_groups();
        Ok(BTreeMap::from([(UnitKind::Fbp, halves(num_fbps)?)]))
    }
}
