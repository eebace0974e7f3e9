// SPDX-License-Identifier: MPL-2.0
//! Screens as reported by the backend.
use crate::coordinates::{Position, Size};

/// One display mode: resolution and refresh rate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenMode {
    pub resolution: Size,
    pub refresh_rate: f32,
}

/// A physical screen attached to the system.
///
/// Plain data.  Backends enumerate screens; switching modes is up to the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct Screen {
    name: String,
    /// Physical size in millimeters, zero when unknown.
    physical_size: Size,
    position: Position,
    mode: ScreenMode,
}

impl Screen {
    pub fn new(name: impl Into<String>, position: Position, mode: ScreenMode, physical_size: Size) -> Screen {
        Screen { name: name.into(), physical_size, position, mode }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn physical_size(&self) -> Size {
        self.physical_size
    }
    pub fn position(&self) -> Position {
        self.position
    }
    pub fn mode(&self) -> ScreenMode {
        self.mode
    }
    pub fn resolution(&self) -> Size {
        self.mode.resolution
    }

    /// Position that centers a window of `size` on this screen.
    pub fn center_of(&self, size: Size) -> Position {
        let res = self.resolution();
        Position::new(
            self.position.x() + (res.width() - size.width()) / 2,
            self.position.y() + (res.height() - size.height()) / 2,
        )
    }
}

impl std::fmt::Display for Screen {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}@{}Hz", self.name, self.mode.resolution, self.mode.refresh_rate)
    }
}
