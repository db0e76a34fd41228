use super::*;
use crate::config::{ObsConfig, Overrides};
use crate::models::target::Magnitudes;

fn setup() -> SetupConfig {
    SetupConfig {
        run_id: "60.A-9252(M)".to_string(),
        folder: "test".to_string(),
        concatenation: "none".to_string(),
        date: None,
        resolution: Some(Resolution::High),
        polarisation: Some(Polarisation::Out),
        ft_polarisation: None,
        overrides: Overrides::default(),
    }
}

fn definition(mode: &str, calib: Option<bool>, companion: Option<[f64; 2]>) -> ObDefinition {
    ObDefinition {
        mode: mode.to_string(),
        target: "HD 1234".to_string(),
        calib,
        resolution: None,
        polarisation: None,
        dit: Some(30.0),
        ndit: Some(4),
        reference_dit: None,
        reference_ndit: None,
        companion,
        companion_name: None,
        companion_mag: None,
        sky_offset: None,
        overrides: Overrides::default(),
    }
}

fn settings(mode: ObservationMode, def: &ObDefinition) -> ModeSettings {
    ModeSettings::from_definition("ob", mode, def, &setup()).unwrap()
}

fn names(plan: &TemplatePlan) -> Vec<&str> {
    plan.iter().map(|t| t.name()).collect()
}

#[test]
fn test_mode_from_str() {
    for mode in ObservationMode::ALL {
        assert_eq!(mode.as_str().parse::<ObservationMode>().unwrap(), mode);
    }
    match "dual_narrow".parse::<ObservationMode>() {
        Err(ConfigurationError::UnknownMode { mode, expected }) => {
            assert_eq!(mode, "dual_narrow");
            assert!(expected.contains("dual_wide_on"));
        }
        other => panic!("expected UnknownMode, got {:?}", other),
    }
}

#[test]
fn test_calib_required_for_calibration_capable_modes() {
    for mode in [
        ObservationMode::SingleOn,
        ObservationMode::DualOff,
        ObservationMode::DualWideOff,
    ] {
        let companion = mode.needs_companion().then_some([100.0, 50.0]);
        let def = definition(mode.as_str(), None, companion);
        match ModeSettings::from_definition("ob", mode, &def, &setup()) {
            Err(ConfigurationError::MissingField { field, .. }) => assert_eq!(field, "calib"),
            other => panic!("{}: expected MissingField, got {:?}", mode, other),
        }
    }
}

#[test]
fn test_calib_rejected_for_other_modes() {
    for mode in [
        ObservationMode::SingleOff,
        ObservationMode::DualOn,
        ObservationMode::DualWideOn,
    ] {
        let def = definition(mode.as_str(), Some(false), Some([100.0, 50.0]));
        assert!(matches!(
            ModeSettings::from_definition("ob", mode, &def, &setup()),
            Err(ConfigurationError::InvalidValue { .. })
        ));
    }
}

#[test]
fn test_companion_required_off_axis() {
    let def = definition("dual_on", None, None);
    match ModeSettings::from_definition("ob", ObservationMode::DualOn, &def, &setup()) {
        Err(ConfigurationError::MissingField { field, .. }) => assert_eq!(field, "companion"),
        other => panic!("expected MissingField, got {:?}", other),
    }
}

#[test]
fn test_settings_fall_back_to_setup() {
    let def = definition("single_on", Some(false), None);
    let s = settings(ObservationMode::SingleOn, &def);
    assert_eq!(s.resolution, Resolution::High);
    assert_eq!(s.polarisation, Polarisation::Out);
    assert_eq!(s.ft_polarisation, Polarisation::Out);
    assert_eq!(s.reference_dit, 30.0);
    assert_eq!(s.sky_offset, DEFAULT_SKY_OFFSET);
}

#[test]
fn test_template_counts_and_order() {
    let cases = [
        (ObservationMode::SingleOn, vec!["GRAVITY_single_acq", "GRAVITY_single_obs_exp"]),
        (ObservationMode::SingleOff, vec!["GRAVITY_single_acq", "GRAVITY_single_obs_exp"]),
        (
            ObservationMode::DualOn,
            vec!["GRAVITY_dual_acq", "GRAVITY_dual_obs_exp", "GRAVITY_dual_obs_swap"],
        ),
        (
            ObservationMode::DualOff,
            vec!["GRAVITY_dual_acq", "GRAVITY_dual_obs_exp", "GRAVITY_dual_obs_exp"],
        ),
        (
            ObservationMode::DualWideOff,
            vec![
                "GRAVITY_dual_wide_acq",
                "GRAVITY_dual_wide_obs_exp",
                "GRAVITY_dual_wide_obs_exp",
            ],
        ),
        (
            ObservationMode::DualWideOn,
            vec![
                "GRAVITY_dual_wide_acq",
                "GRAVITY_dual_wide_obs_exp",
                "GRAVITY_dual_wide_obs_swap",
            ],
        ),
    ];
    for (mode, expected) in cases {
        let calib = mode.accepts_calibration().then_some(false);
        let companion = mode.needs_companion().then_some([100.0, 50.0]);
        let plan = (mode.strategy())(&settings(mode, &definition(mode.as_str(), calib, companion)));
        assert_eq!(names(&plan), expected, "{}", mode);
        assert_eq!(plan.template_count(), expected.len());
        assert_eq!(plan.acquisition.kind(), TemplateKind::Acquisition);
    }
}

#[test]
fn test_calibration_flag_switches_template_classification() {
    let def = definition("dual_off", Some(true), Some([100.0, 50.0]));
    let plan = (ObservationMode::DualOff.strategy())(&settings(ObservationMode::DualOff, &def));
    for tpl in &plan.science {
        assert_eq!(tpl.name(), "GRAVITY_dual_obs_calibrator");
        assert_eq!(tpl.kind(), TemplateKind::Calibration);
    }
}

#[test]
fn test_dual_off_reference_exposure() {
    let mut def = definition("dual_off", Some(false), Some([129.0, 198.0]));
    def.reference_dit = Some(1.0);
    def.reference_ndit = Some(32);
    let plan = (ObservationMode::DualOff.strategy())(&settings(ObservationMode::DualOff, &def));

    let companion = &plan.science[0];
    assert_eq!(companion.param("SEQ.RELOFF.X"), Some(&Value::from(129.0)));
    assert_eq!(companion.param("DET2.DIT"), Some(&Value::from(30.0)));

    let reference = &plan.science[1];
    assert_eq!(reference.param("SEQ.RELOFF.X"), Some(&Value::from(0.0)));
    assert_eq!(reference.param("DET2.DIT"), Some(&Value::from(1.0)));
    assert_eq!(reference.param("DET2.NDIT.OBJECT"), Some(&Value::from(32)));
}

#[test]
fn test_wide_modes_use_ft_relative_offsets() {
    let companion = [-2100.0, 1350.0];
    let narrow = settings(
        ObservationMode::DualOff,
        &definition("dual_off", Some(false), Some(companion)),
    );
    let narrow_plan = (ObservationMode::DualOff.strategy())(&narrow);
    assert_eq!(
        narrow_plan.acquisition.param("SEQ.INS.SOBJ.X"),
        Some(&Value::from(-2100.0))
    );
    assert_eq!(narrow_plan.acquisition.param("SEQ.FT.ROBJ.X"), None);

    let wide = settings(
        ObservationMode::DualWideOff,
        &definition("dual_wide_off", Some(false), Some(companion)),
    );
    let wide_plan = (ObservationMode::DualWideOff.strategy())(&wide);
    assert_eq!(wide_plan.acquisition.param("SEQ.INS.SOBJ.X"), None);
    assert_eq!(
        wide_plan.acquisition.param("SEQ.FT.ROBJ.X"),
        Some(&Value::from(2100.0))
    );
    assert_eq!(
        wide_plan.acquisition.param("SEQ.FT.ROBJ.Y"),
        Some(&Value::from(-1350.0))
    );
    assert_eq!(
        wide_plan.science[1].param("SEQ.RELOFF.X"),
        Some(&Value::from(2100.0))
    );
}

#[test]
fn test_generation_is_deterministic() {
    let config = ObsConfig::from_yaml_str(crate::config::samples::sample("dual_off").unwrap())
        .unwrap();
    let def = config.observing_blocks[0].definition().unwrap();
    let s = ModeSettings::from_definition("ob", ObservationMode::DualOff, &def, &config.setup)
        .unwrap();
    let first = (ObservationMode::DualOff.strategy())(&s);
    let second = (ObservationMode::DualOff.strategy())(&s);
    assert_eq!(first, second);
}

#[test]
fn test_apply_target_maps_magnitudes() {
    let def = definition("single_on", Some(false), None);
    let mut plan =
        (ObservationMode::SingleOn.strategy())(&settings(ObservationMode::SingleOn, &def));
    let mut target = Target::new("HD 1234");
    target.parallax = Some(0.0123);
    target.magnitudes = Magnitudes {
        v: Some(7.1),
        r: Some(6.8),
        h: Some(5.2),
        k: Some(5.0),
    };

    apply_target(ObservationMode::SingleOn, &mut plan.acquisition, &target);
    let acq = &plan.acquisition;
    assert_eq!(acq.param("SEQ.FT.ROBJ.NAME"), Some(&Value::from("HD 1234")));
    assert_eq!(acq.param("SEQ.FT.ROBJ.MAG"), Some(&Value::from(5.0)));
    assert_eq!(acq.param("SEQ.FI.HMAG"), Some(&Value::from(5.2)));
    assert_eq!(acq.param("COU.GS.MAG"), Some(&Value::from(7.1)));
    assert_eq!(acq.param("TEL.TARG.PARALLAX"), Some(&Value::from(0.0123)));
    assert_eq!(acq.param("SEQ.INS.SOBJ.MAG"), Some(&Value::from(5.0)));
}

#[test]
fn test_guide_star_magnitude_falls_back_to_r() {
    let def = definition("single_on", Some(false), None);
    let mut plan =
        (ObservationMode::SingleOn.strategy())(&settings(ObservationMode::SingleOn, &def));
    let mut target = Target::new("HD 1234");
    target.magnitudes = Magnitudes {
        r: Some(6.8),
        k: Some(5.0),
        ..Magnitudes::default()
    };

    apply_target(ObservationMode::SingleOn, &mut plan.acquisition, &target);
    assert_eq!(plan.acquisition.param("COU.GS.MAG"), Some(&Value::from(6.8)));
    assert_eq!(plan.acquisition.param("SEQ.FI.HMAG"), None);
}

#[test]
fn test_apply_target_leaves_absent_magnitudes_unset() {
    let def = definition("dual_on", None, Some([100.0, 50.0]));
    let mut plan = (ObservationMode::DualOn.strategy())(&settings(ObservationMode::DualOn, &def));
    let target = Target::new("HD 1234");
    apply_target(ObservationMode::DualOn, &mut plan.acquisition, &target);
    assert_eq!(plan.acquisition.param("SEQ.FT.ROBJ.MAG"), None);
    assert_eq!(plan.acquisition.param("COU.GS.MAG"), None);
    assert_eq!(plan.acquisition.param("SEQ.INS.SOBJ.X"), Some(&Value::from(100.0)));
}
