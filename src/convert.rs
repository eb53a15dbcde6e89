//! Conversion from live display state to the profile document model.
//!
//! Everything here is pure: bitmask decoding walks fixed (bit, token)
//! tables in ascending bit order, and the converter only reshapes data the
//! query layer already fetched.

use std::collections::BTreeMap;

use crate::profile::{self, Mode, ModeFlag, Profile, Rotation, Rule};
use crate::randr;

/// Mode-flag bits as the protocol defines them, lowest bit first.
const MODE_FLAG_BITS: [(u32, ModeFlag); 14] = [
    (1 << 0, ModeFlag::HsyncPositive),
    (1 << 1, ModeFlag::HsyncNegative),
    (1 << 2, ModeFlag::VsyncPositive),
    (1 << 3, ModeFlag::VsyncNegative),
    (1 << 4, ModeFlag::Interlace),
    (1 << 5, ModeFlag::DoubleScan),
    (1 << 6, ModeFlag::Csync),
    (1 << 7, ModeFlag::CsyncPositive),
    (1 << 8, ModeFlag::CsyncNegative),
    (1 << 9, ModeFlag::HskewPresent),
    (1 << 10, ModeFlag::Bcast),
    (1 << 11, ModeFlag::PixelMultiplex),
    (1 << 12, ModeFlag::DoubleClock),
    (1 << 13, ModeFlag::HalveClock),
];

/// Rotation and reflection bits, lowest bit first.
const ROTATION_BITS: [(u16, Rotation); 6] = [
    (1 << 0, Rotation::Rotate0),
    (1 << 1, Rotation::Rotate90),
    (1 << 2, Rotation::Rotate180),
    (1 << 3, Rotation::Rotate270),
    (1 << 4, Rotation::ReflectX),
    (1 << 5, Rotation::ReflectY),
];

/// Decode a mode-flag mask into tokens, ascending by bit index.
/// Reserved bits are ignored; a zero mask decodes to an empty list.
pub fn decode_mode_flags(mask: u32) -> Vec<ModeFlag> {
    MODE_FLAG_BITS
        .iter()
        .filter(|&&(bit, _)| mask & bit != 0)
        .map(|&(_, flag)| flag)
        .collect()
}

/// Decode a rotation mask into tokens, ascending by bit index.
pub fn decode_rotation(mask: u16) -> Vec<Rotation> {
    ROTATION_BITS
        .iter()
        .filter(|&&(bit, _)| mask & bit != 0)
        .map(|&(_, rotation)| rotation)
        .collect()
}

/// Build a profile from the connected outputs and the resolved primary.
///
/// Every connected output gets a match rule; only active outputs also get
/// an entry in the outputs map.
pub fn to_profile(connected: &[randr::Output], primary: Option<&randr::Output>) -> Profile {
    let mut match_rules = BTreeMap::new();
    let mut outputs = BTreeMap::new();

    for output in connected {
        let mut rule = Rule {
            edid: edid_fingerprint(&output.edid),
            ..Rule::default()
        };

        if let Some(preferred) = &output.preferred_mode {
            rule.prefers = preferred.resolution.to_string();
        }

        if let Some(mode) = &output.mode {
            let entry = to_profile_output(output, mode);
            rule.supports = entry.mode.resolution.clone();
            outputs.insert(output.name.clone(), entry);
        }

        match_rules.insert(output.name.clone(), rule);
    }

    Profile {
        name: String::new(),
        match_rules,
        outputs,
        primary: primary.map(|output| output.name.clone()).unwrap_or_default(),
    }
}

fn to_profile_output(output: &randr::Output, mode: &randr::Mode) -> profile::Output {
    profile::Output {
        crtc: output.crtc,
        mode: Mode {
            resolution: mode.resolution.to_string(),
            rate_hint: Some(round_rate(mode.rate)),
            flag_hint: decode_mode_flags(mode.flags),
        },
        panning: output.panning.to_string(),
        position: output.position.to_string(),
        rotation: decode_rotation(output.rotation),
        scale: output.scale,
    }
}

/// Round a refresh rate to two decimals, halves away from zero.
fn round_rate(rate: f64) -> f64 {
    (rate * 100.0).round() / 100.0
}

/// 32-character lowercase hex fingerprint of the raw EDID block.
/// An output without EDID data hashes the empty block.
fn edid_fingerprint(data: &[u8]) -> String {
    format!("{:x}", md5::compute(data))
}
