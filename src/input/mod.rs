// SPDX-License-Identifier: MPL-2.0
/*!
Keyboard and mouse state for a window.

Native event pumps decode platform key and button codes into the types in this module and feed
them to the window, which keeps a watcher of what is currently held down.  The watchers are what
make focus loss safe: when a window loses focus, every key and button still marked down is
released with a synthetic `Up` event, since the OS does not reliably deliver key-up events to a
window that is no longer focused.

# Design principles

* Keys are *physical* keys.  Text input arrives separately as typed characters.
* Lock keys (caps, num, scroll) report `On`/`Off` rather than `Down`/`Up`.
* Keys the platform code cannot name are still tracked by their raw code, so they are released on
  focus loss like any other key.
*/
///Keyboard keys, states, and the per-window keyboard watcher.
pub mod keyboard;
///Mouse buttons, states, and the per-window mouse watcher.
pub mod mouse;
