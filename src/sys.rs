// SPDX-License-Identifier: MPL-2.0
//! Native backends.  Each implements [`crate::backend::Backend`] over a trait that a binding
//! crate (xcb, windows-sys) provides.
pub mod win32;
pub mod x11;
