//! Testes de integração para downbin-core

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use downbin_core::prelude::*;

fn three_by_three() -> Chip {
    let mut chip = Chip::new();
    chip.add_set(
        &SetSpec::new(UnitKind::Gpc, 3)
            .primary(UnitKind::Tpc)
            .element(ElementSpec::new(UnitKind::Tpc, 3)),
    )
    .unwrap();
    chip
}

fn fbp_with_slices(groups: u32) -> Chip {
    let mut chip = Chip::new();
    chip.add_set(
        &SetSpec::new(UnitKind::Fbp, groups)
            .primary(UnitKind::Ltc)
            .element(ElementSpec::new(UnitKind::Ltc, 2))
            .element(ElementSpec::new(UnitKind::L2Slice, 8).derivative()),
    )
    .unwrap();
    for group in 0..groups as usize {
        chip.add_rule(SubElementDependency::new(UnitKind::Fbp, group, UnitKind::Ltc, UnitKind::L2Slice))
            .unwrap();
        chip.add_rule(MinSubElementCount::new(UnitKind::Fbp, group, UnitKind::Ltc, UnitKind::L2Slice, 3))
            .unwrap();
    }
    chip
}

fn check_invariants(chip: &Chip) {
    for set in chip.sets() {
        for es in set.element_sets() {
            assert!(es.is_consistent(), "{} inconsistent", es.kind());
        }
        for group in set.groups() {
            assert_eq!(group.is_disabled(), set.group_level().is_disabled(group.index() as u32).unwrap());
        }
    }
}

#[test]
fn test_scenario_most_disabled_group_picker() {
    let mut chip = three_by_three();
    let picker = MostDisabledSubunits::new(UnitKind::Gpc, UnitKind::Tpc);
    let all = Mask::full(3).unwrap();

    chip.disable_element(UnitKind::Gpc, 0, UnitKind::Tpc, 0).unwrap();
    assert_eq!(picker.pick(&chip, &all).unwrap().value(), 0b001);
    chip.disable_element(UnitKind::Gpc, 1, UnitKind::Tpc, 0).unwrap();
    assert_eq!(picker.pick(&chip, &all).unwrap().value(), 0b011);
    chip.disable_element(UnitKind::Gpc, 2, UnitKind::Tpc, 0).unwrap();
    assert_eq!(picker.pick(&chip, &all).unwrap(), all);

    chip.disable_element(UnitKind::Gpc, 1, UnitKind::Tpc, 1).unwrap();
    assert_eq!(picker.pick(&chip, &all).unwrap().value(), 0b010);

    chip.set_mut(UnitKind::Gpc).unwrap().register_group_disable_picker(Arc::new(picker));
    assert_eq!(chip.disable_one_group(UnitKind::Gpc).unwrap(), 1);
    check_invariants(&chip);
}

#[test]
fn test_scenario_min_sub_element_count() {
    let mut chip = fbp_with_slices(2);
    let slices = chip.element_set_ref(UnitKind::Fbp, 0, UnitKind::L2Slice).unwrap();

    chip.disable_elements(slices, &Mask::from_bits(8, 0b0000_0011).unwrap()).unwrap();

    let set = chip.set(UnitKind::Fbp).unwrap();
    let ltcs = set.element_set_in(0, UnitKind::Ltc).unwrap();
    assert_eq!(ltcs.total_disable_mask().value(), 0b01);
    let slices = set.element_set_in(0, UnitKind::L2Slice).unwrap();
    assert_eq!(slices.total_disable_mask().value(), 0b0000_1111);
    assert_eq!(set.num_disabled_in_group(1, UnitKind::L2Slice).unwrap(), 0);
    check_invariants(&chip);
}

#[test]
fn test_scenario_always_enable() {
    let mut chip = three_by_three();
    chip.add_rule(MinGroupElementCount::new(UnitKind::Gpc, UnitKind::Tpc, 2)).unwrap();
    let rule = AlwaysEnable::unit(&chip, UnitKind::Gpc, 0, UnitKind::Tpc, 1).unwrap();
    chip.add_rule(rule).unwrap();

    // direto
    let mut direct = three_by_three();
    let rule = AlwaysEnable::unit(&direct, UnitKind::Gpc, 0, UnitKind::Tpc, 1).unwrap();
    direct.add_rule(rule).unwrap();
    assert!(direct.disable_element(UnitKind::Gpc, 0, UnitKind::Tpc, 1).unwrap_err().is_infeasible());

    // em cascata: 2 TPCs de GPC0 caem ⇒ GPC0 cai ⇒ TPC1 cai
    chip.disable_element(UnitKind::Gpc, 0, UnitKind::Tpc, 0).unwrap();
    let err = chip.disable_element(UnitKind::Gpc, 0, UnitKind::Tpc, 2).unwrap_err();
    assert!(err.is_infeasible());

    // grupo inteiro
    let mut whole = three_by_three();
    let rule = AlwaysEnable::unit(&whole, UnitKind::Gpc, 0, UnitKind::Tpc, 1).unwrap();
    whole.add_rule(rule).unwrap();
    assert!(whole.disable_group(UnitKind::Gpc, 0).unwrap_err().is_infeasible());
    assert!(whole.disable_group(UnitKind::Gpc, 1).is_ok());
}

/// Conta execuções; escuta um ElementSet e um grupo
#[derive(Debug)]
struct CountingRule {
    target: ElementSetRef,
    group: (UnitKind, usize),
    runs: Arc<AtomicUsize>,
}

impl Rule for CountingRule {
    fn name(&self) -> &str {
        "counting"
    }

    fn triggers(&self, _chip: &Chip) -> FsResult<Vec<Trigger>> {
        let (set, index) = self.group;
        Ok(vec![Trigger::Elements(self.target), Trigger::Group { set, index }])
    }

    fn execute(&self, _chip: &mut Chip) -> FsResult<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn test_idempotence() {
    let mut chip = fbp_with_slices(2);
    let slices = chip.element_set_ref(UnitKind::Fbp, 1, UnitKind::L2Slice).unwrap();
    let runs = Arc::new(AtomicUsize::new(0));
    chip.add_rule(CountingRule { target: slices, group: (UnitKind::Fbp, 0), runs: Arc::clone(&runs) })
        .unwrap();
    let mask = Mask::from_bits(8, 0b0100_0000).unwrap();

    chip.disable_elements(slices, &mask).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    let before = chip.element_set(slices).unwrap().clone();
    chip.disable_elements(slices, &mask).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    let after = chip.element_set(slices).unwrap();
    assert_eq!(before.total_disable_mask(), after.total_disable_mask());
    assert_eq!(before.disable_mask(), after.disable_mask());

    chip.disable_group(UnitKind::Fbp, 0).unwrap();
    let after_group = runs.load(Ordering::SeqCst);
    assert!(after_group > 1);
    chip.disable_group(UnitKind::Fbp, 0).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), after_group);
    assert_eq!(chip.set(UnitKind::Fbp).unwrap().enabled_groups().value(), 0b10);
}

#[test]
fn test_monotonicity_across_greedy_run() {
    let mut chip = fbp_with_slices(4);
    chip.add_rule(MinGroupElementCount::new(UnitKind::Fbp, UnitKind::Ltc, 1)).unwrap();

    let mut previous = chip.set(UnitKind::Fbp).unwrap().num_disabled(UnitKind::L2Slice).unwrap();
    while chip.set(UnitKind::Fbp).unwrap().num_enabled(UnitKind::Ltc).unwrap() > 3 {
        chip.disable_one_element(UnitKind::Fbp, UnitKind::Ltc).unwrap();
        let disabled = chip.set(UnitKind::Fbp).unwrap().num_disabled(UnitKind::L2Slice).unwrap();
        assert!(disabled > previous);
        previous = disabled;
    }
    check_invariants(&chip);
}

#[test]
fn test_cascade_group_disable_fills_non_derivative() {
    let mut chip = fbp_with_slices(3);
    chip.disable_group(UnitKind::Fbp, 2).unwrap();

    let set = chip.set(UnitKind::Fbp).unwrap();
    assert!(set.element_set_in(2, UnitKind::Ltc).unwrap().is_fully_disabled());
    // derivado acompanha pela dependência
    assert!(set.element_set_in(2, UnitKind::L2Slice).unwrap().is_fully_disabled());
    check_invariants(&chip);
}

#[test]
fn test_defect_import_mode_and_cascade() {
    let mut chip = fbp_with_slices(2);
    let ltcs = chip.element_set_ref(UnitKind::Fbp, 1, UnitKind::Ltc).unwrap();
    chip.disable_elements_as(ltcs, &Mask::with_bit(2, 1).unwrap(), DisableMode::Defective)
        .unwrap();

    let set = chip.set(UnitKind::Fbp).unwrap();
    let ltc = set.element_set_in(1, UnitKind::Ltc).unwrap();
    assert_eq!(ltc.defective_mask().value(), 0b10);
    let slices = set.element_set_in(1, UnitKind::L2Slice).unwrap();
    // cascata usa o modo ativo
    assert_eq!(slices.defective_mask().value(), 0);
    assert_eq!(slices.disable_mask().value(), 0b1111_0000);
}

#[derive(Debug)]
struct Enlarging;

impl GroupPicker for Enlarging {
    fn name(&self) -> &str {
        "enlarging"
    }

    fn pick(&self, _chip: &Chip, candidates: &Mask) -> FsResult<Mask> {
        Ok(Mask::full(candidates.width())?)
    }
}

#[test]
fn test_picker_contract_violation() {
    let mut chip = three_by_three();
    chip.disable_group(UnitKind::Gpc, 0).unwrap();
    chip.set_mut(UnitKind::Gpc).unwrap().register_group_disable_picker(Arc::new(Enlarging));

    let err = chip.disable_one_group(UnitKind::Gpc).unwrap_err();
    assert_eq!(err, FsError::PickerContract("enlarging".into()));
    assert!(!err.is_infeasible());
}

#[test]
fn test_two_stage_element_chain() {
    let mut chip = three_by_three();
    let set = chip.set_mut(UnitKind::Gpc).unwrap();
    set.register_group_reduce_picker(
        UnitKind::Tpc,
        Arc::new(FewestProtectedOrDisabled::new(UnitKind::Gpc, UnitKind::Tpc, false, true)),
    )
    .unwrap();
    set.register_element_disable_picker(
        UnitKind::Tpc,
        Arc::new(PreferenceMask::new(UnitKind::Gpc, UnitKind::Tpc, Mask::with_bit(3, 2).unwrap())),
    )
    .unwrap();

    assert_eq!(chip.disable_one_element(UnitKind::Gpc, UnitKind::Tpc).unwrap(), (0, 2));
    assert_eq!(chip.disable_one_element(UnitKind::Gpc, UnitKind::Tpc).unwrap(), (1, 2));
    assert_eq!(chip.disable_one_element(UnitKind::Gpc, UnitKind::Tpc).unwrap(), (2, 2));
    // preferência esgotada: cai para o menor índice
    assert_eq!(chip.disable_one_element(UnitKind::Gpc, UnitKind::Tpc).unwrap(), (0, 0));
}
