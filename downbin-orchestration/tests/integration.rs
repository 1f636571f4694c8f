//! Testes de integração: runs completos por família

use downbin_orchestration::prelude::*;
use downbin_orchestration::NoExternalValidator;

fn gx100_sku() -> SkuConfig {
    SkuConfig::from_toml_str(
        r#"
name = "gx100-a"

[units.gpc]
must_enable = [0]

[units.tpc]
min_enable_count = 60
max_enable_count = 64
skyline = [8, 8, 8, 8, 8, 8, 8, 8]

[units.fbp]
max_enable_count = 10

[units.ltc]
max_enable_count = 20

[units.link]
max_enable_count = 10
"#,
    )
    .unwrap()
}

#[test]
fn test_gx100_full_run() {
    let input = MemoryFuseStore::new()
        .with("opt_tpc_gpc2_defective", 0b1)
        .with("opt_ltc_defective", 1 << 7);
    let mut output = MemoryFuseStore::new();

    let mut orch = Orchestrator::for_family("gx100", gx100_sku()).unwrap();
    orch.add_validator(NoExternalValidator);
    let summary = orch.run(&input, &mut output).unwrap();

    assert_eq!(summary.stage, DownbinStage::Exported);
    assert_eq!(summary.unit(UnitKind::Tpc).unwrap().enabled, 64);
    assert_eq!(summary.unit(UnitKind::Tpc).unwrap().defective, 1);
    assert_eq!(summary.unit(UnitKind::Fbp).unwrap().enabled, 10);
    assert_eq!(summary.unit(UnitKind::Ltc).unwrap().enabled, 20);
    assert_eq!(summary.unit(UnitKind::Link).unwrap().enabled, 10);

    // o FBP com LTC defeituoso cai junto com seu par NOC
    let chip = orch.chip().unwrap();
    let fbps = chip.set(UnitKind::Fbp).unwrap();
    assert!(fbps.group(2).unwrap().is_disabled());
    assert!(fbps.group(3).unwrap().is_disabled());
    assert_eq!(chip.set(UnitKind::Gpc).unwrap().enabled_counts(UnitKind::Tpc).unwrap(), vec![8; 8]);

    assert_eq!(output.read("opt_fbp_disable"), Some(0b1100));
    assert_eq!(output.read("opt_link_enable"), Some(0xFF3));
    assert_eq!(output.read("opt_ltc_disable"), Some(0xF0));
    assert_eq!(output.read("opt_ltc_defective"), Some(0x80));
    assert_eq!(output.read("opt_gpc_disable"), Some(0));
    for gpc in 0..8 {
        assert_eq!(output.read(&format!("opt_tpc_gpc{gpc}_disable")), Some(0b1), "gpc {gpc}");
    }
}

#[test]
fn test_gx100_unreachable_skyline_is_infeasible() {
    let sku = SkuConfig::new("gx100-full").unit(
        UnitKind::Tpc,
        UnitSkuConfig { max_enable_count: Some(64), skyline: vec![9; 8], ..Default::default() },
    );
    let mut orch = Orchestrator::for_family("gx100", sku).unwrap();
    let err = orch.run(&MemoryFuseStore::new(), &mut MemoryFuseStore::new()).unwrap_err();

    assert!(err.is_infeasible());
    assert_eq!(orch.stage(), DownbinStage::Failed);
}

#[test]
fn test_gx200_slice_pattern_run() {
    let sku = SkuConfig::new("gx200-b")
        .unit(UnitKind::Tpc, UnitSkuConfig { max_enable_count: Some(32), ..Default::default() })
        .unit(UnitKind::L2Slice, UnitSkuConfig { max_enable_count: Some(48), ..Default::default() });
    let input = MemoryFuseStore::new().with("opt_l2slice_fbp1_defective", 0b0100);
    let mut output = MemoryFuseStore::new();

    let mut orch = Orchestrator::for_family("gx200", sku).unwrap();
    let summary = orch.run(&input, &mut output).unwrap();

    assert_eq!(summary.unit(UnitKind::Tpc).unwrap().enabled, 32);
    assert_eq!(summary.unit(UnitKind::L2Slice).unwrap().enabled, 48);
    assert_eq!(summary.unit(UnitKind::Ltc).unwrap().enabled, 16);

    assert_eq!(output.read("opt_l2slice_fbp0_disable"), Some(0x21));
    assert_eq!(output.read("opt_l2slice_fbp1_disable"), Some(0x84));
    assert_eq!(output.read("opt_l2slice_fbp1_defective"), Some(0b0100));
    assert_eq!(output.read("opt_tpc_gpc3_disable"), Some(0b1));
    assert_eq!(output.read("opt_tpc_gpc4_disable"), Some(0));
}

#[test]
fn test_fuse_round_trip() {
    let input = MemoryFuseStore::new().with("opt_ltc_reconfig", 0b1);
    let mut first = MemoryFuseStore::new();
    let summary = Orchestrator::for_family("gx200", SkuConfig::new("plain"))
        .unwrap()
        .run(&input, &mut first)
        .unwrap();

    let ltc = summary.unit(UnitKind::Ltc).unwrap();
    assert_eq!((ltc.enabled, ltc.reconfig), (15, 1));
    assert_eq!(summary.unit(UnitKind::L2Slice).unwrap().enabled, 60);
    assert_eq!(first.read("opt_ltc_disable"), Some(0));
    assert_eq!(first.read("opt_ltc_reconfig"), Some(0b1));
    assert_eq!(first.read("opt_l2slice_fbp0_disable"), Some(0x0F));

    // o store exportado, relido, reproduz o mesmo chip
    let reloaded = MemoryFuseStore::from_json(&first.to_json().unwrap()).unwrap();
    let mut second = MemoryFuseStore::new();
    let again = Orchestrator::for_family("gx200", SkuConfig::new("plain"))
        .unwrap()
        .run(&reloaded, &mut second)
        .unwrap();
    assert_eq!(again, summary);
    assert_eq!(second, first);
}

#[test]
fn test_rerun_on_exported_store_keeps_defects() {
    let input = MemoryFuseStore::new().with("opt_tpc_gpc2_defective", 0b1);
    let mut first = MemoryFuseStore::new();
    let summary = Orchestrator::for_family("gx200", SkuConfig::new("plain"))
        .unwrap()
        .run(&input, &mut first)
        .unwrap();
    assert_eq!(summary.unit(UnitKind::Tpc).unwrap().defective, 1);
    assert_eq!(first.read("opt_tpc_gpc2_defective"), Some(0b1));

    let mut second = MemoryFuseStore::new();
    let again = Orchestrator::for_family("gx200", SkuConfig::new("plain"))
        .unwrap()
        .run(&first, &mut second)
        .unwrap();
    assert_eq!(again.unit(UnitKind::Tpc).unwrap().defective, 1);
    assert_eq!(second.read("opt_tpc_gpc2_disable"), Some(0b1));
    assert_eq!(second.read("opt_tpc_gpc2_defective"), Some(0b1));
    assert_eq!(second, first);
}

#[derive(Debug)]
struct RejectAll;

impl LegalityValidator for RejectAll {
    fn name(&self) -> &str {
        "reject-all"
    }

    fn validate(&self, _chip: &Chip, sku: &SkuConfig) -> OrchestrationResult<()> {
        Err(OrchestrationError::ValidationFailed(format!("{} rejected", sku.name)))
    }
}

#[test]
fn test_external_validator_stops_export() {
    let mut orch = Orchestrator::for_family("gx200", SkuConfig::new("x")).unwrap();
    orch.add_validator(RejectAll);

    orch.build_topology().unwrap();
    orch.register_rules().unwrap();
    assert_eq!(orch.import_defects(&MemoryFuseStore::new()).unwrap(), 0);
    orch.register_pickers().unwrap();
    assert_eq!(orch.downbin().unwrap(), 0);
    orch.apply_post_rules().unwrap();
    assert_eq!(orch.stage(), DownbinStage::PostRulesApplied);

    let err = orch.validate().unwrap_err();
    assert_eq!(err, OrchestrationError::ValidationFailed("x rejected".into()));
    assert_eq!(orch.stage(), DownbinStage::Failed);
    assert!(orch.export(&mut MemoryFuseStore::new()).is_err());
    assert_eq!(orch.summary().unwrap().stage, DownbinStage::Failed);
}

#[test]
fn test_custom_topology() {
    let topology = ChipTopology::from_json(
        r#"{
  "sets": [
    {
      "group_kind": "gpc",
      "num_groups": 2,
      "primary": "tpc",
      "elements": [
        { "kind": "tpc", "per_group": 6 },
        { "kind": "pes", "per_group": 2, "derivative": true }
      ]
    },
    {
      "group_kind": "fbp",
      "num_groups": 2,
      "primary": "ltc",
      "elements": [
        { "kind": "fbio", "per_group": 1 },
        { "kind": "ltc", "per_group": 2 },
        { "kind": "l2slice", "per_group": 8, "derivative": true }
      ]
    }
  ]
}"#,
    )
    .unwrap();
    let sku = SkuConfig::new("small").unit(UnitKind::Tpc, UnitSkuConfig { max_enable_count: Some(10), ..Default::default() });

    let mut orch = Orchestrator::for_family("gx200", sku).unwrap();
    orch.build_topology_with(&topology).unwrap();
    orch.register_rules().unwrap();
    orch.import_defects(&MemoryFuseStore::new()).unwrap();
    orch.register_pickers().unwrap();
    assert_eq!(orch.downbin().unwrap(), 2);
    orch.apply_post_rules().unwrap();
    orch.validate().unwrap();

    let mut output = MemoryFuseStore::new();
    orch.export(&mut output).unwrap();
    assert_eq!(orch.stage(), DownbinStage::Exported);
    assert_eq!(output.read("opt_tpc_gpc0_disable"), Some(0b1));
    assert_eq!(output.read("opt_tpc_gpc1_disable"), Some(0b1));
}

#[test]
fn test_orchestrator_config_from_toml() {
    let config = OrchestratorConfig::from_toml_str("disable_mode = \"defective\"\nimport_reconfig = false\n").unwrap();
    let sku = SkuConfig::new("x").unit(UnitKind::Tpc, UnitSkuConfig { max_enable_count: Some(35), ..Default::default() });
    let family = FamilyRegistry::with_builtin().create("gx200").unwrap();

    let mut orch = Orchestrator::with_config(family, sku, config);
    let input = MemoryFuseStore::new().with("opt_ltc_reconfig", 0b1);
    let summary = orch.run(&input, &mut MemoryFuseStore::new()).unwrap();

    // reconfig ignorado; a escolha gulosa sai como defeito
    assert_eq!(summary.unit(UnitKind::Ltc).unwrap().enabled, 16);
    assert_eq!(summary.unit(UnitKind::Tpc).unwrap().defective, 1);
}
