// SPDX-License-Identifier: MPL-2.0
/*!
OpenGL framebuffer configurations and contexts.

Configurations come from the backend through [`crate::window::Window::gl_configs`]; they cannot
be made by hand.  Contexts are created synchronously on the dispatcher thread because the caller
needs the handle back.
*/
use std::fmt::Display;
use std::ops::BitOr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum GlError {
    #[error("OpenGL {major}.{minor} is not supported")]
    VersionNotSupported { major: u32, minor: u32 },
    #[error("no framebuffer configuration was set before creating a context")]
    NoConfig,
    #[error("context creation failed: {0}")]
    Context(String),
}

/**
One framebuffer configuration the backend can provide.

Fields describe the configuration; the backend id and validity are private.  Only
[`GLConfig::from_backend`] produces a valid configuration, so one that starts from
`GLConfig::default()` is rejected by [`crate::window::Window::gl_set_config`].
*/
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct GLConfig {
    valid: bool,
    id: u64,

    /// Hardware accelerated.
    pub accelerated: bool,
    /// Framebuffer alpha composites with the desktop.
    pub transparent: bool,

    pub red_bits: u8,
    pub green_bits: u8,
    pub blue_bits: u8,
    pub alpha_bits: u8,

    pub accum_red_bits: u8,
    pub accum_green_bits: u8,
    pub accum_blue_bits: u8,
    pub accum_alpha_bits: u8,

    /// Multisample count, 0 when not multisampled.
    pub samples: u8,
    pub aux_buffers: u8,
    pub depth_bits: u8,
    pub stencil_bits: u8,

    pub double_buffered: bool,
    pub stereoscopic: bool,
}

impl GLConfig {
    /// Builds the configuration a backend enumerated, identified by the backend's `id`.
    pub fn from_backend(id: u64, attributes: GLConfig) -> GLConfig {
        GLConfig { valid: true, id, ..attributes }
    }

    pub fn is_valid(&self) -> bool {
        self.valid
    }

    /// The backend's identifier for this configuration.
    pub fn backend_id(&self) -> u64 {
        self.id
    }

    pub(crate) fn assert_valid(&self) {
        assert!(
            self.valid,
            "GLConfig is invalid; use a configuration returned by Window::gl_configs"
        );
    }
}

impl Display for GLConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "GLConfig(id={}, rgba={}/{}/{}/{}, depth={}, stencil={}, samples={}, double={}, accelerated={})",
            self.id,
            self.red_bits,
            self.green_bits,
            self.blue_bits,
            self.alpha_bits,
            self.depth_bits,
            self.stencil_bits,
            self.samples,
            self.double_buffered,
            self.accelerated
        )
    }
}

/// Flags requested at context creation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct GLContextFlags(u8);

impl GLContextFlags {
    pub const NONE: GLContextFlags = GLContextFlags(0);
    pub const DEBUG: GLContextFlags = GLContextFlags(1 << 0);
    pub const FORWARD_COMPATIBLE: GLContextFlags = GLContextFlags(1 << 1);
    pub const CORE_PROFILE: GLContextFlags = GLContextFlags(1 << 2);
    pub const COMPATIBILITY_PROFILE: GLContextFlags = GLContextFlags(1 << 3);

    pub const fn contains(self, other: GLContextFlags) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn bits(self) -> u8 {
        self.0
    }
}

impl BitOr for GLContextFlags {
    type Output = GLContextFlags;
    fn bitor(self, rhs: Self) -> Self {
        GLContextFlags(self.0 | rhs.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum VSyncMode {
    #[default]
    VerticalSync,
    NoVerticalSync,
    /// Sync when the frame is on time, tear when it is late.
    AdaptiveVerticalSync,
}

impl Display for VSyncMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VSyncMode::VerticalSync => "VerticalSync",
            VSyncMode::NoVerticalSync => "NoVerticalSync",
            VSyncMode::AdaptiveVerticalSync => "AdaptiveVerticalSync",
        };
        f.write_str(s)
    }
}

/// A backend's handle for a created context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeContextId(pub u64);

/**
An OpenGL rendering context.

Clones refer to the same context.  Destroying a context twice panics.
*/
#[derive(Debug, Clone)]
pub struct GLContext {
    id: NativeContextId,
    destroyed: Arc<AtomicBool>,
}

impl GLContext {
    pub(crate) fn new(id: NativeContextId) -> GLContext {
        GLContext { id, destroyed: Arc::new(AtomicBool::new(false)) }
    }

    pub fn native_id(&self) -> NativeContextId {
        self.id
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed.load(Ordering::Acquire)
    }

    pub(crate) fn mark_destroyed(&self) {
        let was = self.destroyed.swap(true, Ordering::AcqRel);
        assert!(!was, "GLContext {:?} was already destroyed", self.id);
    }
}

impl PartialEq for GLContext {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.destroyed, &other.destroyed)
    }
}
impl Eq for GLContext {}

/**
Whether a `GL_VERSION` style string is at least `major.minor`.

The string is `major.minor[.release]` optionally followed by a space and vendor text.
Anything else is unsupported.

```
use gl_window::gl::version_supported;
assert!(version_supported("4.6.0 NVIDIA 535.54", 3, 3));
assert!(!version_supported("2.1 Mesa", 3, 0));
assert!(!version_supported("garbage", 1, 0));
```
*/
pub fn version_supported(version: &str, major: u32, minor: u32) -> bool {
    let number = version.split(' ').next().unwrap_or_default();
    let parts: Vec<&str> = number.split('.').collect();
    if parts.len() != 2 && parts.len() != 3 {
        return false;
    }
    let (Ok(have_major), Ok(have_minor)) = (parts[0].parse::<u32>(), parts[1].parse::<u32>()) else {
        return false;
    };
    have_major > major || (have_major == major && have_minor >= minor)
}

/// Whether the space separated `extensions` list names `extension`.
pub fn extension_supported(extensions: &str, extension: &str) -> bool {
    extensions.split(' ').any(|e| e == extension)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions() {
        assert!(version_supported("1.4", 1, 4));
        assert!(version_supported("3.0.1", 2, 9));
        assert!(!version_supported("1.3", 1, 4));
        assert!(!version_supported("", 1, 0));
        assert!(!version_supported("4", 1, 0));
        assert!(!version_supported("1.2.3.4", 1, 0));
        assert!(!version_supported("a.b", 0, 0));
    }

    #[test]
    fn extensions() {
        let list = "GLX_ARB_create_context GLX_EXT_swap_control GLX_EXT_swap_control_tear";
        assert!(extension_supported(list, "GLX_EXT_swap_control"));
        assert!(!extension_supported(list, "GLX_EXT_swap"));
    }

    #[test]
    fn flags_combine() {
        let f = GLContextFlags::DEBUG | GLContextFlags::CORE_PROFILE;
        assert!(f.contains(GLContextFlags::DEBUG));
        assert!(!f.contains(GLContextFlags::FORWARD_COMPATIBLE));
    }

    #[test]
    fn manual_config_is_invalid() {
        let manual = GLConfig { red_bits: 8, ..Default::default() };
        assert!(!manual.is_valid());
        let real = GLConfig::from_backend(3, manual);
        assert!(real.is_valid());
        assert_eq!(real.backend_id(), 3);
    }

    #[test]
    #[should_panic]
    fn double_destroy_panics() {
        let c = GLContext::new(NativeContextId(1));
        c.mark_destroyed();
        c.clone().mark_destroyed();
    }
}
