//! Persisted window geometry
//!
//! The size is only tracked while the window is in its normal state, so a
//! maximized session does not overwrite the size the user restores to.

use serde::{Deserialize, Serialize};

/// Window flags reported by the toolkit
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WindowFlags {
    pub maximized: bool,
    pub fullscreen: bool,
    pub minimized: bool,
}

/// Saved window size and state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowGeometry {
    /// -1 lets the toolkit pick
    pub width: i32,
    pub height: i32,
    pub is_maximized: bool,
    /// Not restored on the next start
    #[serde(skip)]
    pub is_fullscreen: bool,
    pub is_minimized: bool,
}

impl Default for WindowGeometry {
    fn default() -> Self {
        Self {
            width: -1,
            height: -1,
            is_maximized: false,
            is_fullscreen: false,
            is_minimized: false,
        }
    }
}

impl WindowGeometry {
    /// Whether the window is in its normal, resizable state
    pub fn is_normal(&self) -> bool {
        !(self.is_maximized || self.is_fullscreen || self.is_minimized)
    }

    /// Record a new allocation; returns true if anything changed
    pub fn on_resize(&mut self, width: i32, height: i32) -> bool {
        if !self.is_normal() {
            return false;
        }
        let mut changed = false;
        if width != self.width {
            self.width = width;
            changed = true;
        }
        if height != self.height {
            self.height = height;
            changed = true;
        }
        changed
    }

    /// Record new window flags; returns true if anything changed
    pub fn on_state(&mut self, flags: WindowFlags) -> bool {
        let mut changed = false;
        if flags.maximized != self.is_maximized {
            self.is_maximized = flags.maximized;
            changed = true;
        }
        if flags.fullscreen != self.is_fullscreen {
            self.is_fullscreen = flags.fullscreen;
            changed = true;
        }
        if flags.minimized != self.is_minimized {
            self.is_minimized = flags.minimized;
            tracing::info!(minimized = flags.minimized, "Window minimized state changed");
            changed = true;
        }
        changed
    }
}
