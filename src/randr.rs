//! RandR session and output enumeration.
//!
//! One `Session` owns one display connection. Queries borrow the session,
//! run synchronously, and never retry; dropping the session closes the
//! transport, including on error paths partway through a query.

use std::collections::HashMap;
use std::fmt;

use tracing::debug;
use x11rb::connection::Connection;
use x11rb::protocol::randr::{self as xrandr, ConnectionExt as RandrConnectionExt, ModeInfo};
use x11rb::protocol::xproto::{ConnectionExt as XprotoConnectionExt, Timestamp, Window};
use x11rb::rust_connection::RustConnection;

use crate::error::Result;

/// EDID property read cap, in 32-bit units. A single fixed-length read of
/// 400 bytes; larger blocks are truncated.
const EDID_LENGTH: u32 = 100;

/// A width/height or x/y pair, printed in the `<W>x<H>` form profiles use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Geometry(pub i32, pub i32);

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.0, self.1)
    }
}

/// One mode an output supports or drives, refresh rate already derived.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Mode {
    pub resolution: Geometry,
    pub rate: f64,
    pub flags: u32,
}

/// Everything the server reports about one connected output.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Output {
    pub id: u32,
    pub name: String,
    /// Index within the output's own CRTC list; xrandr numbers CRTCs this
    /// way, and stored profiles follow suit.
    pub crtc: u32,
    pub edid: Vec<u8>,
    pub supported_modes: Vec<Mode>,
    pub preferred_mode: Option<Mode>,
    pub mode: Option<Mode>,
    pub position: Geometry,
    pub panning: Geometry,
    pub scale: f64,
    pub rotation: u16,
}

impl Output {
    pub fn is_active(&self) -> bool {
        self.mode.is_some()
    }
}

/// Live RandR session: the connection plus the screen's cached mode
/// catalogue.
pub struct Session {
    conn: RustConnection,
    root: Window,
    config_timestamp: Timestamp,
    outputs: Vec<xrandr::Output>,
    modes: HashMap<xrandr::Mode, ModeInfo>,
}

impl Session {
    /// Connect to the display server, initialize RandR and cache the
    /// screen's resources. Any failure here is fatal and leaves no session
    /// behind.
    pub fn connect(display: Option<&str>) -> Result<Self> {
        let (conn, screen_num) = x11rb::connect(display)?;
        let root = conn.setup().roots[screen_num].root;
        conn.randr_query_version(1, 5)?.reply()?;

        let resources = conn.randr_get_screen_resources(root)?.reply()?;
        debug!(
            outputs = resources.outputs.len(),
            modes = resources.modes.len(),
            "fetched screen resources"
        );

        let modes = resources.modes.iter().map(|info| (info.id, *info)).collect();
        Ok(Self {
            conn,
            root,
            config_timestamp: resources.config_timestamp,
            outputs: resources.outputs,
            modes,
        })
    }

    /// Enumerate connected outputs, in server order.
    ///
    /// Output-info and CRTC-info failures abort the whole call. The EDID
    /// property walk is cosmetic; failures there leave the field empty.
    pub fn connected_outputs(&self) -> Result<Vec<Output>> {
        let mut connected = Vec::new();
        for &output_id in &self.outputs {
            let info = self
                .conn
                .randr_get_output_info(output_id, self.config_timestamp)?
                .reply()?;
            if info.connection != xrandr::Connection::CONNECTED {
                continue;
            }

            let mut output = Output {
                id: output_id,
                name: String::from_utf8_lossy(&info.name).into_owned(),
                edid: self.edid_bytes(output_id),
                ..Output::default()
            };

            for (i, &mode_id) in info.modes.iter().enumerate() {
                let mode = self.mode(mode_id);
                // The first num_preferred entries are the preferred prefix,
                // in server order.
                if i < usize::from(info.num_preferred) {
                    output.preferred_mode = Some(mode);
                }
                output.supported_modes.push(mode);
            }

            if info.crtc != x11rb::NONE {
                output.crtc = crtc_index(info.crtc, &info.crtcs);

                let crtc = self
                    .conn
                    .randr_get_crtc_info(info.crtc, self.config_timestamp)?
                    .reply()?;
                output.mode = Some(self.mode(crtc.mode));
                output.position = Geometry(i32::from(crtc.x), i32::from(crtc.y));
                output.panning = Geometry(i32::from(crtc.width), i32::from(crtc.height));
                output.rotation = u16::from(crtc.rotation);
                // TODO derive scale from the CRTC transform
                output.scale = 1.0;
            }

            debug!(name = %output.name, active = output.is_active(), "found connected output");
            connected.push(output);
        }
        Ok(connected)
    }

    /// Resolve which of the already-fetched outputs the server marks as
    /// primary. A primary outside the connected set is not an error.
    pub fn find_primary<'a>(&self, outputs: &'a [Output]) -> Result<Option<&'a Output>> {
        let reply = self.conn.randr_get_output_primary(self.root)?.reply()?;
        Ok(match_primary(reply.output, outputs))
    }

    /// Resolve a mode id through the cached catalogue. Unknown ids resolve
    /// to an all-zero mode.
    fn mode(&self, mode_id: xrandr::Mode) -> Mode {
        match self.modes.get(&mode_id) {
            Some(info) => Mode {
                resolution: Geometry(i32::from(info.width), i32::from(info.height)),
                rate: refresh_rate(info.dot_clock, info.htotal, info.vtotal),
                flags: u32::from(info.mode_flags),
            },
            None => Mode::default(),
        }
    }

    /// Raw EDID block of an output, or empty when the property walk fails
    /// at any step.
    fn edid_bytes(&self, output_id: xrandr::Output) -> Vec<u8> {
        let Some(props) = self
            .conn
            .randr_list_output_properties(output_id)
            .ok()
            .and_then(|cookie| cookie.reply().ok())
        else {
            debug!(output = output_id, "output property list unavailable");
            return Vec::new();
        };

        for atom in props.atoms {
            let Some(name) = self
                .conn
                .get_atom_name(atom)
                .ok()
                .and_then(|cookie| cookie.reply().ok())
            else {
                continue;
            };
            if name.name == b"EDID" {
                if let Some(prop) = self
                    .conn
                    .randr_get_output_property(
                        output_id,
                        atom,
                        x11rb::NONE,
                        0,
                        EDID_LENGTH,
                        false,
                        false,
                    )
                    .ok()
                    .and_then(|cookie| cookie.reply().ok())
                {
                    return prop.data;
                }
            }
        }
        Vec::new()
    }
}

/// Vertical refresh in Hz: dot clock over total raster area. Zero totals
/// pass through to the division and yield a non-finite rate.
fn refresh_rate(dot_clock: u32, htotal: u16, vtotal: u16) -> f64 {
    f64::from(dot_clock) / (f64::from(htotal) * f64::from(vtotal))
}

/// Position of the assigned CRTC within the output's own CRTC list.
fn crtc_index(assigned: xrandr::Crtc, crtcs: &[xrandr::Crtc]) -> u32 {
    crtcs.iter().position(|&c| c == assigned).unwrap_or(0) as u32
}

fn match_primary(id: u32, outputs: &[Output]) -> Option<&Output> {
    outputs.iter().find(|output| output.id == id)
}
