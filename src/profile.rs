//! Profile document model and codec.
//!
//! A profile is a human-editable YAML document describing a full display
//! layout. Serialization is canonical: map keys emit in lexicographic order
//! (the maps are BTreeMaps, so ordering holds by construction) and optional
//! fields are omitted entirely when empty instead of being written as null.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Rotation and reflection tokens, one per bit of the rotation mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rotation {
    #[serde(rename = "rotate0")]
    Rotate0,
    #[serde(rename = "rotate90")]
    Rotate90,
    #[serde(rename = "rotate180")]
    Rotate180,
    #[serde(rename = "rotate270")]
    Rotate270,
    #[serde(rename = "reflectx")]
    ReflectX,
    #[serde(rename = "reflecty")]
    ReflectY,
}

/// Mode timing flag tokens, one per bit of the mode-flag mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ModeFlag {
    #[serde(rename = "hsync+")]
    HsyncPositive,
    #[serde(rename = "hsync-")]
    HsyncNegative,
    #[serde(rename = "vsync+")]
    VsyncPositive,
    #[serde(rename = "vsync-")]
    VsyncNegative,
    #[serde(rename = "interlace")]
    Interlace,
    #[serde(rename = "doublescan")]
    DoubleScan,
    #[serde(rename = "csync")]
    Csync,
    #[serde(rename = "csync+")]
    CsyncPositive,
    #[serde(rename = "csync-")]
    CsyncNegative,
    #[serde(rename = "hskew")]
    HskewPresent,
    #[serde(rename = "bcast")]
    Bcast,
    #[serde(rename = "pixelmultiplex")]
    PixelMultiplex,
    #[serde(rename = "doubleclock")]
    DoubleClock,
    #[serde(rename = "halveclock")]
    HalveClock,
}

/// A named display layout.
///
/// The name is how a profile is addressed on disk; it is never part of the
/// document itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(skip)]
    pub name: String,
    #[serde(rename = "match", skip_serializing_if = "BTreeMap::is_empty")]
    pub match_rules: BTreeMap<String, Rule>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub outputs: BTreeMap<String, Output>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub primary: String,
}

/// How an output is recognized when a stored profile is matched against
/// connected hardware.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rule {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub edid: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub prefers: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub supports: String,
}

/// Mode request for one output. The hints narrow mode selection when
/// several modes share a resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Mode {
    pub resolution: String,
    #[serde(rename = "ratehint", skip_serializing_if = "Option::is_none")]
    pub rate_hint: Option<f64>,
    #[serde(rename = "flaghint", skip_serializing_if = "Vec::is_empty")]
    pub flag_hint: Vec<ModeFlag>,
}

/// Desired state of one active output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Output {
    pub crtc: u32,
    pub mode: Mode,
    pub panning: String,
    pub position: String,
    pub rotation: Vec<Rotation>,
    pub scale: f64,
}

/// Serialize a profile to its canonical text form.
///
/// A profile whose outputs map is empty describes nothing worth storing
/// and is rejected, even if it carries match rules.
pub fn write(profile: &Profile) -> Result<String> {
    if profile.outputs.is_empty() {
        return Err(Error::EmptyProfile);
    }
    Ok(serde_yaml::to_string(profile)?)
}

/// Parse a stored document. Unknown fields are ignored; missing optional
/// fields take their empty values.
pub fn read(text: &str) -> Result<Profile> {
    Ok(serde_yaml::from_str(text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_output() -> Output {
        Output {
            crtc: 0,
            mode: Mode {
                resolution: "1920x1080".to_string(),
                rate_hint: None,
                flag_hint: Vec::new(),
            },
            panning: "1920x1200".to_string(),
            position: "1920x0".to_string(),
            rotation: vec![Rotation::Rotate0],
            scale: 1.4,
        }
    }

    fn full_profile() -> Profile {
        let mut match_rules = BTreeMap::new();
        match_rules.insert(
            "LVDS1".to_string(),
            Rule {
                edid: "70b13ad1e146a7e9a63a3e1f733996bb".to_string(),
                prefers: "1920x1080".to_string(),
                supports: "1920x1080".to_string(),
            },
        );
        match_rules.insert(
            "DP1".to_string(),
            Rule {
                edid: "73e0b78b21eccb78174dc4325ab459e6".to_string(),
                prefers: "3840x2160".to_string(),
                supports: "3840x2160".to_string(),
            },
        );

        let mut outputs = BTreeMap::new();
        outputs.insert(
            "LVDS1".to_string(),
            Output {
                crtc: 0,
                mode: Mode {
                    resolution: "1920x1080".to_string(),
                    rate_hint: Some(59.95),
                    flag_hint: vec![ModeFlag::HsyncPositive, ModeFlag::VsyncNegative],
                },
                panning: "1920x1200".to_string(),
                position: "3840x0".to_string(),
                rotation: vec![Rotation::Rotate0],
                scale: 1.4,
            },
        );
        outputs.insert(
            "DP1".to_string(),
            Output {
                crtc: 1,
                mode: Mode {
                    resolution: "3840x2160".to_string(),
                    rate_hint: Some(60.0),
                    flag_hint: vec![ModeFlag::Interlace],
                },
                panning: "3840x2160".to_string(),
                position: "1920x0".to_string(),
                rotation: vec![Rotation::Rotate270, Rotation::ReflectY],
                scale: 2.0,
            },
        );

        Profile {
            name: "should be transient".to_string(),
            match_rules,
            outputs,
            primary: "DP1".to_string(),
        }
    }

    #[test]
    fn writes_minimal_profile() {
        let mut outputs = BTreeMap::new();
        outputs.insert("LVDS1".to_string(), minimal_output());
        let profile = Profile {
            outputs,
            ..Profile::default()
        };

        let want = "\
outputs:
  LVDS1:
    crtc: 0
    mode:
      resolution: 1920x1080
    panning: 1920x1200
    position: 1920x0
    rotation:
    - rotate0
    scale: 1.4
";
        assert_eq!(write(&profile).unwrap(), want);
    }

    #[test]
    fn writes_full_profile_sorting_keys_and_dropping_name() {
        let want = "\
match:
  DP1:
    edid: 73e0b78b21eccb78174dc4325ab459e6
    prefers: 3840x2160
    supports: 3840x2160
  LVDS1:
    edid: 70b13ad1e146a7e9a63a3e1f733996bb
    prefers: 1920x1080
    supports: 1920x1080
outputs:
  DP1:
    crtc: 1
    mode:
      resolution: 3840x2160
      ratehint: 60.0
      flaghint:
      - interlace
    panning: 3840x2160
    position: 1920x0
    rotation:
    - rotate270
    - reflecty
    scale: 2.0
  LVDS1:
    crtc: 0
    mode:
      resolution: 1920x1080
      ratehint: 59.95
      flaghint:
      - hsync+
      - vsync-
    panning: 1920x1200
    position: 3840x0
    rotation:
    - rotate0
    scale: 1.4
primary: DP1
";
        assert_eq!(write(&full_profile()).unwrap(), want);
    }

    #[test]
    fn rejects_profile_without_outputs() {
        let mut match_rules = BTreeMap::new();
        match_rules.insert(
            "LVDS1".to_string(),
            Rule {
                edid: "70b13ad1e146a7e9a63a3e1f733996bb".to_string(),
                ..Rule::default()
            },
        );
        let profile = Profile {
            match_rules,
            ..Profile::default()
        };

        assert!(matches!(write(&profile), Err(Error::EmptyProfile)));
    }

    #[test]
    fn read_then_write_is_stable() {
        let first = write(&full_profile()).unwrap();
        let reread = read(&first).unwrap();
        assert_eq!(write(&reread).unwrap(), first);
    }

    #[test]
    fn roundtrips_hex_like_geometry_strings() {
        let mut outputs = BTreeMap::new();
        let mut output = minimal_output();
        output.position = "0x0".to_string();
        outputs.insert("eDP1".to_string(), output);
        let profile = Profile {
            outputs,
            ..Profile::default()
        };

        let first = write(&profile).unwrap();
        let reread = read(&first).unwrap();
        assert_eq!(reread.outputs["eDP1"].position, "0x0");
        assert_eq!(write(&reread).unwrap(), first);
    }

    #[test]
    fn reads_missing_optional_fields_as_empty() {
        let text = "\
outputs:
  LVDS1:
    crtc: 2
    mode:
      resolution: 1920x1080
";
        let profile = read(text).unwrap();
        let output = &profile.outputs["LVDS1"];
        assert_eq!(output.crtc, 2);
        assert_eq!(output.mode.resolution, "1920x1080");
        assert_eq!(output.mode.rate_hint, None);
        assert!(output.mode.flag_hint.is_empty());
        assert_eq!(output.panning, "");
        assert_eq!(output.position, "");
        assert!(output.rotation.is_empty());
        assert_eq!(output.scale, 0.0);
        assert!(profile.match_rules.is_empty());
        assert!(profile.primary.is_empty());
    }

    #[test]
    fn reads_ignoring_unknown_fields() {
        let text = "\
outputs:
  LVDS1:
    crtc: 0
    mode:
      resolution: 1920x1080
      pixelclock: 148500000
legacy_section: true
";
        let profile = read(text).unwrap();
        assert_eq!(profile.outputs["LVDS1"].mode.resolution, "1920x1080");
    }

    #[test]
    fn read_reports_parse_failures_with_location() {
        let err = read("outputs: [").unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
        assert!(err.to_string().contains("line"));
    }
}
