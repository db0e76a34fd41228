use super::*;

const DUAL_OFF: &str = r#"
setup:
  run_id: 60.A-9252(M)
  folder: HD206893
  concatenation: None
  date: 2020-09-20
  resolution: MEDIUM
  polarisation: IN
  constraints:
    airmass: 1.6
ObservingBlocks:
  zeta_first:
    mode: dual_off
    target: HD 206893
    calib: false
    companion: [129, 198.5]
    dit: 30
    ndit: 4
  alpha_second:
    mode: single_on
    target: HD 1234
    calib: true
    dit: 1
    ndit: 32
    description: Calibrator for HD 206893
    target_fields:
      properMotionRa: 0.0
"#;

#[test]
fn test_parse_keeps_file_order() {
    let config = ObsConfig::from_yaml_str(DUAL_OFF).unwrap();
    assert_eq!(config.labels(), vec!["zeta_first", "alpha_second"]);
}

#[test]
fn test_setup_fields() {
    let config = ObsConfig::from_yaml_str(DUAL_OFF).unwrap();
    let setup = &config.setup;
    assert_eq!(setup.run_id, "60.A-9252(M)");
    assert_eq!(setup.concatenation_name(), None);
    assert_eq!(setup.resolution, Some(Resolution::Medium));
    assert_eq!(setup.polarisation, Some(Polarisation::In));
    assert_eq!(
        setup.observation_date().unwrap(),
        NaiveDate::from_ymd_opt(2020, 9, 20)
    );
    assert_eq!(setup.overrides.constraints["airmass"], Value::from(1.6));
}

#[test]
fn test_ob_definition_fields() {
    let config = ObsConfig::from_yaml_str(DUAL_OFF).unwrap();
    let first = config.observing_blocks[0].definition().unwrap();
    assert_eq!(first.mode, "dual_off");
    assert_eq!(first.companion, Some([129.0, 198.5]));
    assert_eq!(first.dit, Some(30.0));
    assert_eq!(first.ndit, Some(4));
    assert!(first.overrides.is_empty());

    let second = config.observing_blocks[1].definition().unwrap();
    assert_eq!(second.calib, Some(true));
    assert_eq!(
        second.overrides.description.as_deref(),
        Some("Calibrator for HD 206893")
    );
    assert_eq!(
        second.overrides.target_fields["properMotionRa"],
        Value::from(0.0)
    );
}

#[test]
fn test_concatenation_name_disabling() {
    let mut setup = ObsConfig::from_yaml_str(DUAL_OFF).unwrap().setup;
    for disabled in ["none", "NONE", " None ", ""] {
        setup.concatenation = disabled.to_string();
        assert_eq!(setup.concatenation_name(), None, "{:?}", disabled);
    }
    setup.concatenation = "HD206893 sequence".to_string();
    assert_eq!(setup.concatenation_name(), Some("HD206893 sequence"));
}

#[test]
fn test_missing_required_ob_field() {
    let yaml = r#"
setup:
  run_id: 60.A-9252(M)
  folder: test
ObservingBlocks:
  broken:
    target: HD 1234
"#;
    let config = ObsConfig::from_yaml_str(yaml).unwrap();
    match config.observing_blocks[0].definition() {
        Err(ConfigurationError::MissingField { label, field }) => {
            assert_eq!(label, "broken");
            assert_eq!(field, "mode");
        }
        other => panic!("expected MissingField, got {:?}", other),
    }
}

#[test]
fn test_bad_date_is_invalid_value() {
    let yaml = r#"
setup:
  run_id: 60.A-9252(M)
  folder: test
  date: 20-09-2020
ObservingBlocks: {}
"#;
    let config = ObsConfig::from_yaml_str(yaml).unwrap();
    assert!(matches!(
        config.setup.observation_date(),
        Err(ConfigurationError::InvalidValue { .. })
    ));
    assert!(config.observing_blocks.is_empty());
}

#[test]
fn test_missing_setup_is_parse_error() {
    let err = ObsConfig::from_yaml_str("ObservingBlocks: {}\n").unwrap_err();
    assert!(matches!(err, ConfigurationError::Parse(_)));
}

#[test]
fn test_from_file_reports_path() {
    let err = ObsConfig::from_file("/definitely/not/here.yml").unwrap_err();
    match err {
        ConfigurationError::Io { path, .. } => assert!(path.contains("not/here.yml")),
        other => panic!("expected Io, got {:?}", other),
    }
}

#[test]
fn test_from_file_reads_tempfile() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("obs.yml");
    std::fs::write(&path, DUAL_OFF).unwrap();
    let config = ObsConfig::from_file(&path).unwrap();
    assert_eq!(config.observing_blocks.len(), 2);
}
