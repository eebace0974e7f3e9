// SPDX-License-Identifier: MPL-2.0
/*!
Cursor and icon images.

Both are compared by identity: two cursors built from identical pixels are still different
cursors, and a clone is the same cursor.  Native windows cache the platform resource realized
from a cursor under that identity (see [`ResourceCache`]), because building one costs an image
conversion and a native allocation.
*/
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::coordinates::Position;

/// An RGBA8 image, row-major, top row first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    width: u32,
    height: u32,
    rgba: Arc<[u8]>,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("image data is {actual} bytes but a {width}x{height} RGBA image needs {expected}")]
pub struct ImageSizeError {
    width: u32,
    height: u32,
    expected: usize,
    actual: usize,
}

impl Image {
    pub fn new(width: u32, height: u32, rgba: Vec<u8>) -> Result<Image, ImageSizeError> {
        let expected = width as usize * height as usize * 4;
        if rgba.len() != expected {
            return Err(ImageSizeError { width, height, expected, actual: rgba.len() });
        }
        Ok(Image { width, height, rgba: rgba.into() })
    }

    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }
    #[inline]
    pub fn rgba(&self) -> &[u8] {
        &self.rgba
    }
}

static NEXT_RESOURCE_ID: AtomicU64 = AtomicU64::new(1);

impl ResourceId {
    fn next() -> ResourceId {
        ResourceId(NEXT_RESOURCE_ID.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug)]
struct CursorInner {
    id: ResourceId,
    image: Image,
    hotspot: Position,
}

/// A mouse cursor: an image plus the hotspot within it.
#[derive(Debug, Clone)]
pub struct Cursor(Arc<CursorInner>);

impl Cursor {
    pub fn new(image: Image, hotspot: Position) -> Cursor {
        Cursor(Arc::new(CursorInner { id: ResourceId::next(), image, hotspot }))
    }
    pub fn image(&self) -> &Image {
        &self.0.image
    }
    pub fn hotspot(&self) -> Position {
        self.0.hotspot
    }

    /// Identity key. Never reused by another cursor or icon in this process.
    pub fn id(&self) -> ResourceId {
        self.0.id
    }
}

impl PartialEq for Cursor {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Cursor {}

#[derive(Debug)]
struct IconInner {
    id: ResourceId,
    image: Image,
}

/// A window icon.
#[derive(Debug, Clone)]
pub struct Icon(Arc<IconInner>);

impl Icon {
    pub fn new(image: Image) -> Icon {
        Icon(Arc::new(IconInner { id: ResourceId::next(), image }))
    }
    pub fn image(&self) -> &Image {
        &self.0.image
    }
    pub fn id(&self) -> ResourceId {
        self.0.id
    }
}

impl PartialEq for Icon {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Icon {}

/// Identity of a [`Cursor`] or [`Icon`].
///
/// Assigned from a process-wide counter when the cursor or icon is built, so an id outlives
/// its cursor without ever naming a different one.  A cache entry for a dropped cursor stays
/// until it is freed.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct ResourceId(u64);

/**
Realized native resources keyed by cursor or icon identity.

Entries live until [`ResourceCache::remove`]; nothing is collected automatically.
*/
#[derive(Debug)]
pub struct ResourceCache<R> {
    entries: HashMap<ResourceId, R>,
}

impl<R> Default for ResourceCache<R> {
    fn default() -> Self {
        ResourceCache { entries: HashMap::new() }
    }
}

impl<R> ResourceCache<R> {
    pub fn get(&self, id: ResourceId) -> Option<&R> {
        self.entries.get(&id)
    }

    /// Returns the cached resource, realizing it with `realize` on a miss.
    ///
    /// A failed realization caches nothing.
    pub fn get_or_try_insert<E>(
        &mut self,
        id: ResourceId,
        realize: impl FnOnce() -> Result<R, E>,
    ) -> Result<&R, E> {
        use std::collections::hash_map::Entry;
        match self.entries.entry(id) {
            Entry::Occupied(o) => Ok(o.into_mut()),
            Entry::Vacant(v) => Ok(v.insert(realize()?)),
        }
    }

    pub fn remove(&mut self, id: ResourceId) -> Option<R> {
        self.entries.remove(&id)
    }

    pub fn drain(&mut self) -> impl Iterator<Item = R> + '_ {
        self.entries.drain().map(|(_, r)| r)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)] mod test {
    use super::*;

    fn pixel() -> Image {
        Image::new(1, 1, vec![255, 0, 0, 255]).unwrap()
    }

    #[test] fn cursor_identity() {
        let a = Cursor::new(pixel(), Position::new(0, 0));
        let b = Cursor::new(pixel(), Position::new(0, 0));
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
        assert_eq!(a.id(), a.clone().id());
    }

    #[test] fn image_size_checked() {
        assert!(Image::new(2, 2, vec![0; 15]).is_err());
        assert!(Image::new(2, 2, vec![0; 16]).is_ok());
    }

    #[test] fn cache_realizes_once() {
        let cursor = Cursor::new(pixel(), Position::new(0, 0));
        let mut cache: ResourceCache<u32> = ResourceCache::default();
        let mut calls = 0;
        for _ in 0..2 {
            let r: Result<&u32, ()> = cache.get_or_try_insert(cursor.id(), || {
                calls += 1;
                Ok(7)
            });
            assert_eq!(*r.unwrap(), 7);
        }
        assert_eq!(calls, 1);
        assert_eq!(cache.remove(cursor.id()), Some(7));
        assert!(cache.is_empty());
    }

    #[test] fn dropped_cursor_id_is_not_reused() {
        let mut cache: ResourceCache<u32> = ResourceCache::default();
        let red = Cursor::new(pixel(), Position::new(0, 0));
        let red_id = red.id();
        let _ = cache.get_or_try_insert(red_id, || Ok::<_, ()>(1));
        drop(red);

        let blue = Cursor::new(Image::new(1, 1, vec![0, 0, 255, 255]).unwrap(), Position::new(0, 0));
        assert_ne!(blue.id(), red_id);
        let mut realized = false;
        let handle = cache.get_or_try_insert(blue.id(), || {
            realized = true;
            Ok::<_, ()>(2)
        });
        assert_eq!(handle.copied(), Ok(2));
        assert!(realized);
    }

    #[test] fn icons_and_cursors_never_share_ids() {
        let cursor = Cursor::new(pixel(), Position::new(0, 0));
        let icon = Icon::new(pixel());
        assert_ne!(cursor.id(), icon.id());
        assert_eq!(icon.id(), icon.clone().id());
    }
}
