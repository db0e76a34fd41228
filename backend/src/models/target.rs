//! Target description and sexagesimal coordinate formatting.
//!
//! Coordinates are stored in the form the P2 store expects:
//!
//! - RA as hours, `HH:MM:SS.sss`, always zero-padded
//! - DEC as degrees, `±D:MM:SS.sss`, always signed, degrees unpadded
//!
//! Formatting rounds to the last printed digit using integer arithmetic, so
//! carries (59.9996 s) propagate and no locale setting can alter the output.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

const MS_PER_HOUR: i64 = 3_600_000;
const MS_PER_DAY: i64 = 24 * MS_PER_HOUR;

/// Format a right ascension given in degrees as `HH:MM:SS.sss`.
pub fn format_ra(ra_deg: f64) -> String {
    let hours = ra_deg.rem_euclid(360.0) / 15.0;
    let mut total_ms = (hours * MS_PER_HOUR as f64).round() as i64;
    if total_ms >= MS_PER_DAY {
        total_ms -= MS_PER_DAY;
    }
    let (h, m, s, ms) = split_millis(total_ms);
    format!("{:02}:{:02}:{:02}.{:03}", h, m, s, ms)
}

/// Format a declination given in degrees as `±D:MM:SS.sss`.
pub fn format_dec(dec_deg: f64) -> String {
    let total_mas = (dec_deg.abs() * MS_PER_HOUR as f64).round() as i64;
    let sign = if dec_deg < 0.0 && total_mas > 0 { '-' } else { '+' };
    let (d, m, s, ms) = split_millis(total_mas);
    format!("{}{}:{:02}:{:02}.{:03}", sign, d, m, s, ms)
}

/// Split a count of thousandths of a second into (units, minutes, seconds,
/// thousandths).
fn split_millis(total: i64) -> (i64, i64, i64, i64) {
    (
        total / MS_PER_HOUR,
        (total / 60_000) % 60,
        (total / 1000) % 60,
        total % 1000,
    )
}

fn parse_sexagesimal(value: &str) -> Option<(f64, f64)> {
    let parts: Vec<&str> = value.trim().split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let sign = if parts[0].trim_start().starts_with('-') {
        -1.0
    } else {
        1.0
    };
    let units: f64 = parts[0].trim().trim_start_matches(&['-', '+'][..]).parse().ok()?;
    let minutes: f64 = parts[1].parse().ok()?;
    let seconds: f64 = parts[2].parse().ok()?;
    if !(0.0..60.0).contains(&minutes) || !(0.0..60.0).contains(&seconds) {
        return None;
    }
    Some((sign, units + minutes / 60.0 + seconds / 3600.0))
}

/// Parse a `HH:MM:SS.sss` right ascension back to degrees.
pub fn parse_ra(ra: &str) -> Option<f64> {
    let (sign, hours) = parse_sexagesimal(ra)?;
    if sign < 0.0 || hours >= 24.0 {
        return None;
    }
    Some(hours * 15.0)
}

/// Parse a `±D:MM:SS.sss` declination back to degrees.
pub fn parse_dec(dec: &str) -> Option<f64> {
    let (sign, degrees) = parse_sexagesimal(dec)?;
    if degrees > 90.0 {
        return None;
    }
    Some(sign * degrees)
}

/// Convert a proper motion from mas/yr to arcsec/yr, rounded to 5 decimals.
pub fn proper_motion_arcsec(mas_per_year: f64) -> f64 {
    (mas_per_year / 1000.0 * 1e5).round() / 1e5
}

/// Catalog magnitudes used by acquisition templates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Magnitudes {
    pub v: Option<f64>,
    pub r: Option<f64>,
    pub h: Option<f64>,
    pub k: Option<f64>,
}

/// An astronomical target as sent to the remote store.
///
/// Fields the catalog could not provide stay `None` and are never written to
/// the remote OB.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Target {
    pub name: String,
    pub ra: Option<String>,
    pub dec: Option<String>,
    /// arcsec/yr
    pub proper_motion_ra: Option<f64>,
    /// arcsec/yr
    pub proper_motion_dec: Option<f64>,
    /// arcsec
    pub parallax: Option<f64>,
    pub magnitudes: Magnitudes,
}

impl Target {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// True once both coordinates are known.
    pub fn is_resolved(&self) -> bool {
        self.ra.is_some() && self.dec.is_some()
    }

    /// Target section fields for the remote OB, present values only.
    pub fn ob_fields(&self) -> BTreeMap<String, Value> {
        let mut fields = BTreeMap::new();
        fields.insert("name".to_string(), Value::from(self.name.clone()));
        if let Some(ref ra) = self.ra {
            fields.insert("ra".to_string(), Value::from(ra.clone()));
        }
        if let Some(ref dec) = self.dec {
            fields.insert("dec".to_string(), Value::from(dec.clone()));
        }
        if let Some(pm) = self.proper_motion_ra {
            fields.insert("properMotionRa".to_string(), Value::from(pm));
        }
        if let Some(pm) = self.proper_motion_dec {
            fields.insert("properMotionDec".to_string(), Value::from(pm));
        }
        fields
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_format_ra_known_values() {
        // Sirius: 101.28715533 deg = 06h45m08.917s
        assert_eq!(format_ra(101.287_155_33), "06:45:08.917");
        assert_eq!(format_ra(0.0), "00:00:00.000");
        assert_eq!(format_ra(343.097375), "22:52:23.370");
    }

    #[test]
    fn test_format_ra_carries_and_wraps() {
        // 23:59:59.9996 rounds up past midnight
        let deg = (23.0 + 59.0 / 60.0 + 59.9996 / 3600.0) * 15.0;
        assert_eq!(format_ra(deg), "00:00:00.000");
        // 00:00:59.9996 carries into the minutes
        let deg = (59.9996 / 3600.0) * 15.0;
        assert_eq!(format_ra(deg), "00:01:00.000");
        assert_eq!(format_ra(-15.0), "23:00:00.000");
    }

    #[test]
    fn test_format_dec_known_values() {
        // Sirius: -16.71611586 deg = -16:42:58.017
        assert_eq!(format_dec(-16.716_115_86), "-16:42:58.017");
        assert_eq!(format_dec(5.5), "+5:30:00.000");
        assert_eq!(format_dec(0.0), "+0:00:00.000");
        assert_eq!(format_dec(-0.503_944_444_444_444_4), "-0:30:14.200");
    }

    #[test]
    fn test_format_dec_tiny_negative_is_positive_zero() {
        assert_eq!(format_dec(-1e-12), "+0:00:00.000");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert_eq!(parse_ra("25:00:00.000"), None);
        assert_eq!(parse_ra("12:61:00"), None);
        assert_eq!(parse_ra("12 30 00"), None);
        assert_eq!(parse_dec("+91:00:00"), None);
        assert_eq!(parse_dec("+10:00"), None);
    }

    #[test]
    fn test_proper_motion_conversion() {
        assert_eq!(proper_motion_arcsec(-546.01), -0.54601);
        assert_eq!(proper_motion_arcsec(93.412345), 0.09341);
        assert_eq!(proper_motion_arcsec(0.0), 0.0);
    }

    #[test]
    fn test_ob_fields_omit_absent_values() {
        let mut target = Target::new("HD 1234");
        target.ra = Some("04:41:04.770".to_string());
        target.dec = Some("+13:55:42.700".to_string());
        let fields = target.ob_fields();
        assert_eq!(fields.len(), 3);
        assert!(!fields.contains_key("properMotionRa"));
        assert!(target.is_resolved());

        target.proper_motion_ra = Some(0.0);
        assert_eq!(target.ob_fields()["properMotionRa"], Value::from(0.0));
    }

    proptest! {
        #[test]
        fn prop_ra_round_trips_within_half_millisecond(ra in 0.0f64..359.9999) {
            let parsed = parse_ra(&format_ra(ra)).unwrap();
            // 0.5 ms of time = 7.5 mas = 2.09e-6 deg, modulo the 24h wrap
            let diff = (parsed - ra).abs();
            prop_assert!(diff < 2.1e-6 || (360.0 - diff) < 2.1e-6);
        }

        #[test]
        fn prop_dec_round_trips_within_half_milliarcsec(dec in -90.0f64..=90.0) {
            let text = format_dec(dec);
            prop_assert!(text.starts_with('+') || text.starts_with('-'));
            let parsed = parse_dec(&text).unwrap();
            prop_assert!((parsed - dec).abs() < 1.4e-7);
        }

        #[test]
        fn prop_ra_fields_are_zero_padded(ra in -720.0f64..720.0) {
            let text = format_ra(ra);
            prop_assert_eq!(text.len(), 12);
            prop_assert_eq!(&text[2..3], ":");
            prop_assert_eq!(&text[5..6], ":");
        }
    }
}
