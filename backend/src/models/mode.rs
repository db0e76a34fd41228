//! GRAVITY observation modes and their template-generation strategies.
//!
//! Every mode produces one acquisition template followed by an ordered list
//! of science (or calibration) exposures:
//!
//! | mode            | acquisition              | exposures                                 |
//! |-----------------|--------------------------|-------------------------------------------|
//! | `single_on`     | `GRAVITY_single_acq`     | `obs_exp` or `obs_calibrator`             |
//! | `single_off`    | `GRAVITY_single_acq`     | `obs_exp` (offset)                        |
//! | `dual_on`       | `GRAVITY_dual_acq`       | `obs_exp`, `obs_swap`                     |
//! | `dual_off`      | `GRAVITY_dual_acq`       | companion + reference, `exp`/`calibrator` |
//! | `dual_wide_off` | `GRAVITY_dual_wide_acq`  | companion + reference, `exp`/`calibrator` |
//! | `dual_wide_on`  | `GRAVITY_dual_wide_acq`  | `obs_exp`, `obs_swap`                     |
//!
//! Narrow modes express fiber offsets as the science object relative to the
//! fringe-tracking star. Wide modes point at the science object and give the
//! fringe-tracking star relative to it, so every offset changes sign and moves
//! to the `FT` keywords.

use std::fmt;
use std::str::FromStr;

use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::target::Target;
use super::template::{Template, TemplateKind};
use crate::config::{ObDefinition, Polarisation, Resolution, SetupConfig};
use crate::error::ConfigurationError;

/// Default sky offset [RA, DEC] in mas.
pub const DEFAULT_SKY_OFFSET: [f64; 2] = [2000.0, 2000.0];

/// The closed set of observation modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObservationMode {
    SingleOn,
    SingleOff,
    DualOn,
    DualOff,
    DualWideOff,
    DualWideOn,
}

impl ObservationMode {
    pub const ALL: [ObservationMode; 6] = [
        ObservationMode::SingleOn,
        ObservationMode::SingleOff,
        ObservationMode::DualOn,
        ObservationMode::DualOff,
        ObservationMode::DualWideOff,
        ObservationMode::DualWideOn,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ObservationMode::SingleOn => "single_on",
            ObservationMode::SingleOff => "single_off",
            ObservationMode::DualOn => "dual_on",
            ObservationMode::DualOff => "dual_off",
            ObservationMode::DualWideOff => "dual_wide_off",
            ObservationMode::DualWideOn => "dual_wide_on",
        }
    }

    /// Modes that can be flagged as calibrator observations; `calib` is
    /// mandatory for these and rejected for the others.
    pub fn accepts_calibration(&self) -> bool {
        matches!(
            self,
            ObservationMode::SingleOn | ObservationMode::DualOff | ObservationMode::DualWideOff
        )
    }

    /// Every mode except `single_on` places the science fiber away from the
    /// fringe-tracking star.
    pub fn needs_companion(&self) -> bool {
        !matches!(self, ObservationMode::SingleOn)
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, ObservationMode::DualWideOff | ObservationMode::DualWideOn)
    }

    pub fn acquisition_template(&self) -> &'static str {
        match self {
            ObservationMode::SingleOn | ObservationMode::SingleOff => "GRAVITY_single_acq",
            ObservationMode::DualOn | ObservationMode::DualOff => "GRAVITY_dual_acq",
            ObservationMode::DualWideOff | ObservationMode::DualWideOn => "GRAVITY_dual_wide_acq",
        }
    }

    /// Template-generation strategy of this mode.
    pub fn strategy(&self) -> Strategy {
        match self {
            ObservationMode::SingleOn => plan_single_on,
            ObservationMode::SingleOff => plan_single_off,
            ObservationMode::DualOn => plan_dual_on,
            ObservationMode::DualOff => plan_dual_off,
            ObservationMode::DualWideOff => plan_dual_wide_off,
            ObservationMode::DualWideOn => plan_dual_wide_on,
        }
    }

    fn expected() -> String {
        Self::ALL
            .iter()
            .map(|m| m.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl FromStr for ObservationMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ConfigurationError::UnknownMode {
                mode: s.to_string(),
                expected: Self::expected(),
            })
    }
}

impl fmt::Display for ObservationMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated instrument settings of one OB.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSettings {
    pub calibration: bool,
    pub resolution: Resolution,
    pub polarisation: Polarisation,
    pub ft_polarisation: Polarisation,
    pub dit: f64,
    pub ndit: u32,
    pub reference_dit: f64,
    pub reference_ndit: u32,
    /// Science object relative to the fringe-tracking star, mas
    pub companion: [f64; 2],
    pub companion_name: Option<String>,
    pub companion_mag: Option<f64>,
    pub sky_offset: [f64; 2],
}

impl ModeSettings {
    /// Check the mode-specific requirements of `definition` and fill in
    /// defaults from `setup`.
    pub fn from_definition(
        label: &str,
        mode: ObservationMode,
        definition: &ObDefinition,
        setup: &SetupConfig,
    ) -> Result<Self, ConfigurationError> {
        let calibration = match (mode.accepts_calibration(), definition.calib) {
            (true, Some(flag)) => flag,
            (true, None) => return Err(ConfigurationError::missing(label, "calib")),
            (false, Some(_)) => {
                return Err(ConfigurationError::invalid(
                    label,
                    "calib",
                    format!("mode {} has no calibrator variant", mode),
                ))
            }
            (false, None) => false,
        };

        let dit = definition
            .dit
            .ok_or_else(|| ConfigurationError::missing(label, "dit"))?;
        if !dit.is_finite() || dit <= 0.0 {
            return Err(ConfigurationError::invalid(label, "dit", "must be positive"));
        }
        let ndit = definition
            .ndit
            .ok_or_else(|| ConfigurationError::missing(label, "ndit"))?;
        if ndit == 0 {
            return Err(ConfigurationError::invalid(label, "ndit", "must be at least 1"));
        }
        let reference_dit = definition.reference_dit.unwrap_or(dit);
        if !reference_dit.is_finite() || reference_dit <= 0.0 {
            return Err(ConfigurationError::invalid(
                label,
                "reference_dit",
                "must be positive",
            ));
        }
        let reference_ndit = definition.reference_ndit.unwrap_or(ndit).max(1);

        let companion = match (mode.needs_companion(), definition.companion) {
            (true, Some(offset)) => offset,
            (true, None) => return Err(ConfigurationError::missing(label, "companion")),
            (false, Some(_)) => {
                return Err(ConfigurationError::invalid(
                    label,
                    "companion",
                    format!("mode {} observes the fringe-tracking star itself", mode),
                ))
            }
            (false, None) => [0.0, 0.0],
        };
        if companion.iter().any(|v| !v.is_finite()) {
            return Err(ConfigurationError::invalid(label, "companion", "not a finite offset"));
        }

        let polarisation = definition
            .polarisation
            .or(setup.polarisation)
            .unwrap_or(Polarisation::In);

        Ok(Self {
            calibration,
            resolution: definition
                .resolution
                .or(setup.resolution)
                .unwrap_or(Resolution::Medium),
            polarisation,
            ft_polarisation: setup.ft_polarisation.unwrap_or(polarisation),
            dit,
            ndit,
            reference_dit,
            reference_ndit,
            companion,
            companion_name: definition.companion_name.clone(),
            companion_mag: definition.companion_mag,
            sky_offset: definition.sky_offset.unwrap_or(DEFAULT_SKY_OFFSET),
        })
    }
}

/// Templates generated for one OB, in execution order.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplatePlan {
    pub acquisition: Template,
    pub science: Vec<Template>,
}

impl TemplatePlan {
    pub fn template_count(&self) -> usize {
        1 + self.science.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Template> {
        std::iter::once(&self.acquisition).chain(self.science.iter())
    }
}

/// Builds the templates of one mode from validated settings.
pub type Strategy = fn(&ModeSettings) -> TemplatePlan;

// ==================== Strategies ====================

fn plan_single_on(s: &ModeSettings) -> TemplatePlan {
    let mode = ObservationMode::SingleOn;
    TemplatePlan {
        acquisition: acquisition(mode, s),
        science: vec![exposure(
            exposure_name("GRAVITY_single_obs", s.calibration),
            s.calibration,
            s.dit,
            s.ndit,
            [0.0, 0.0],
            s,
        )],
    }
}

fn plan_single_off(s: &ModeSettings) -> TemplatePlan {
    let mode = ObservationMode::SingleOff;
    TemplatePlan {
        acquisition: acquisition(mode, s),
        science: vec![exposure(
            "GRAVITY_single_obs_exp".to_string(),
            false,
            s.dit,
            s.ndit,
            s.companion,
            s,
        )],
    }
}

fn plan_dual_on(s: &ModeSettings) -> TemplatePlan {
    let mode = ObservationMode::DualOn;
    TemplatePlan {
        acquisition: acquisition(mode, s),
        science: vec![
            exposure("GRAVITY_dual_obs_exp".to_string(), false, s.dit, s.ndit, s.companion, s),
            exposure("GRAVITY_dual_obs_swap".to_string(), false, s.dit, s.ndit, s.companion, s),
        ],
    }
}

fn plan_dual_off(s: &ModeSettings) -> TemplatePlan {
    let mode = ObservationMode::DualOff;
    let name = exposure_name("GRAVITY_dual_obs", s.calibration);
    TemplatePlan {
        acquisition: acquisition(mode, s),
        science: vec![
            exposure(name.clone(), s.calibration, s.dit, s.ndit, s.companion, s),
            exposure(
                name,
                s.calibration,
                s.reference_dit,
                s.reference_ndit,
                [0.0, 0.0],
                s,
            ),
        ],
    }
}

fn plan_dual_wide_off(s: &ModeSettings) -> TemplatePlan {
    let mode = ObservationMode::DualWideOff;
    let name = exposure_name("GRAVITY_dual_wide_obs", s.calibration);
    TemplatePlan {
        acquisition: acquisition(mode, s),
        science: vec![
            exposure(name.clone(), s.calibration, s.dit, s.ndit, [0.0, 0.0], s),
            exposure(
                name,
                s.calibration,
                s.reference_dit,
                s.reference_ndit,
                negate(s.companion),
                s,
            ),
        ],
    }
}

fn plan_dual_wide_on(s: &ModeSettings) -> TemplatePlan {
    let mode = ObservationMode::DualWideOn;
    TemplatePlan {
        acquisition: acquisition(mode, s),
        science: vec![
            exposure("GRAVITY_dual_wide_obs_exp".to_string(), false, s.dit, s.ndit, [0.0, 0.0], s),
            exposure("GRAVITY_dual_wide_obs_swap".to_string(), false, s.dit, s.ndit, [0.0, 0.0], s),
        ],
    }
}

// ==================== Builders ====================

fn exposure_name(prefix: &str, calibration: bool) -> String {
    if calibration {
        format!("{}_calibrator", prefix)
    } else {
        format!("{}_exp", prefix)
    }
}

fn negate(offset: [f64; 2]) -> [f64; 2] {
    [-offset[0], -offset[1]]
}

fn acquisition(mode: ObservationMode, s: &ModeSettings) -> Template {
    let mut tpl = Template::new(mode.acquisition_template(), TemplateKind::Acquisition)
        .with_param("INS.SPEC.RES", s.resolution.as_str())
        .with_param("INS.SPEC.POL", s.polarisation.as_str())
        .with_param("INS.FT.POL", s.ft_polarisation.as_str())
        .with_param("COU.AG.GSSOURCE", "SCIENCE");

    if mode.needs_companion() {
        let (keyword, offset) = if mode.is_wide() {
            ("SEQ.FT.ROBJ", negate(s.companion))
        } else {
            ("SEQ.INS.SOBJ", s.companion)
        };
        tpl.set_param(&format!("{}.X", keyword), offset[0]);
        tpl.set_param(&format!("{}.Y", keyword), offset[1]);
        if let Some(ref name) = s.companion_name {
            tpl.set_param("SEQ.INS.SOBJ.NAME", name.as_str());
        }
        if let Some(mag) = s.companion_mag {
            tpl.set_param("SEQ.INS.SOBJ.MAG", mag);
        }
    }
    tpl
}

fn exposure(
    name: String,
    calibration: bool,
    dit: f64,
    ndit: u32,
    offset: [f64; 2],
    s: &ModeSettings,
) -> Template {
    let kind = if calibration {
        TemplateKind::Calibration
    } else {
        TemplateKind::Science
    };
    Template::new(name, kind)
        .with_param("DET2.DIT", dit)
        .with_param("DET2.NDIT.OBJECT", ndit)
        .with_param("DET2.NDIT.SKY", ndit)
        .with_param("SEQ.OBSSEQ", "O S")
        .with_param("SEQ.RELOFF.X", offset[0])
        .with_param("SEQ.RELOFF.Y", offset[1])
        .with_param("SEQ.SKY.X", s.sky_offset[0])
        .with_param("SEQ.SKY.Y", s.sky_offset[1])
}

// ==================== Target mapping ====================

/// Write the target-derived acquisition parameters.
///
/// Touches only keywords the strategies never set, so applying it before or
/// after generation gives the same template. Absent catalog values leave the
/// keyword unset.
pub fn apply_target(mode: ObservationMode, acquisition: &mut Template, target: &Target) {
    acquisition.set_param("SEQ.FT.ROBJ.NAME", target.name.as_str());

    let k = target.magnitudes.k;
    set_or_clear(acquisition, "SEQ.FT.ROBJ.MAG", k, &target.name, "K");
    set_or_clear(acquisition, "SEQ.FI.HMAG", target.magnitudes.h, &target.name, "H");
    // guide star magnitude: V, else R
    let guide = target.magnitudes.v.or(target.magnitudes.r);
    set_or_clear(acquisition, "COU.GS.MAG", guide, &target.name, "V or R");
    set_or_clear(acquisition, "TEL.TARG.PARALLAX", target.parallax, &target.name, "parallax");

    if !mode.needs_companion() {
        acquisition.set_param("SEQ.INS.SOBJ.NAME", target.name.as_str());
        set_or_clear(acquisition, "SEQ.INS.SOBJ.MAG", k, &target.name, "K");
    }
}

fn set_or_clear(tpl: &mut Template, key: &str, value: Option<f64>, target: &str, what: &str) {
    match value {
        Some(v) => tpl.set_param(key, Value::from(v)),
        None => {
            warn!("No {} value for target {}, leaving {} unset", what, target, key);
            tpl.remove_param(key);
        }
    }
}

#[cfg(test)]
#[path = "mode_tests.rs"]
mod mode_tests;
