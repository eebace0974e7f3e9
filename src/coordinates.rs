//SPDX-License-Identifier: MPL-2.0
use std::fmt::Display;

/// A position in screen pixels, relative to the upper-left corner of the screen.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    x: i32,
    y: i32,
}
impl Position {
    #[inline]
    pub const fn new(x: i32, y: i32) -> Position {
        Position { x, y }
    }

    #[inline] pub const fn x(&self) -> i32 { self.x }
    #[inline] pub const fn y(&self) -> i32 { self.y }

    #[inline] pub const fn is_zero(&self) -> bool { self.x == 0 && self.y == 0 }
}

impl Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A size in pixels.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Size {
    width: i32,
    height: i32,
}

impl Size {
    #[inline] pub const fn new(width: i32, height: i32) -> Size {
        Size { width, height }
    }

    #[inline] pub const fn width(&self) -> i32 { self.width }
    #[inline] pub const fn height(&self) -> i32 { self.height }

    /// Both components are nonzero.
    #[inline] pub const fn is_set(&self) -> bool { self.width != 0 && self.height != 0 }
}

impl Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/**
Thickness of the decorations the window manager draws around a window.

Reported asynchronously by some window managers; all zero when unknown.
*/
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Extents {
    pub left: i32,
    pub right: i32,
    pub bottom: i32,
    pub top: i32,
}

impl Extents {
    pub const ZERO: Extents = Extents { left: 0, right: 0, bottom: 0, top: 0 };

    pub const fn new(left: i32, right: i32, bottom: i32, top: i32) -> Extents {
        Extents { left, right, bottom, top }
    }

    pub const fn is_zero(&self) -> bool {
        self.left == 0 && self.right == 0 && self.bottom == 0 && self.top == 0
    }

    #[inline] pub const fn horizontal(&self) -> i32 { self.left + self.right }
    #[inline] pub const fn vertical(&self) -> i32 { self.top + self.bottom }
}

#[cfg(test)] mod test {
    use super::*;

    #[test] fn size_is_set() {
        assert!(Size::new(1, 1).is_set());
        assert!(!Size::new(0, 150).is_set());
        assert!(!Size::default().is_set());
    }

    #[test] fn extents_totals() {
        let e = Extents::new(1, 2, 3, 20);
        assert_eq!(e.horizontal(), 3);
        assert_eq!(e.vertical(), 23);
        assert!(!e.is_zero());
        assert!(Extents::ZERO.is_zero());
    }
}
