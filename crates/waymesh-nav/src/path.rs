//! Polygon corridor with monotonic front trimming.

use waymesh_common::Vec3;

use crate::mesh::PolyRef;

/// A completed path: the polygon corridor plus the snapped endpoints.
/// The corridor only ever shrinks from the front; an agent can never move
/// the path backwards.
#[derive(Debug, Clone)]
pub struct Path {
    corridor: Vec<PolyRef>,
    start: Vec3,
    target: Vec3,
}

impl Path {
    pub fn new(corridor: Vec<PolyRef>, start: Vec3, target: Vec3) -> Self {
        Self {
            corridor,
            start,
            target,
        }
    }

    pub fn corridor(&self) -> &[PolyRef] {
        &self.corridor
    }

    pub fn start(&self) -> Vec3 {
        self.start
    }

    pub fn target(&self) -> Vec3 {
        self.target
    }

    pub fn len(&self) -> usize {
        self.corridor.len()
    }

    pub fn is_empty(&self) -> bool {
        self.corridor.is_empty()
    }

    pub fn first(&self) -> Option<PolyRef> {
        self.corridor.first().copied()
    }

    pub fn last(&self) -> Option<PolyRef> {
        self.corridor.last().copied()
    }

    /// Trim the corridor so `poly` becomes its head. Scans forward only;
    /// returns false (corridor untouched) when `poly` is not ahead.
    pub fn advance_to(&mut self, poly: PolyRef) -> bool {
        match self.corridor.iter().position(|&p| p == poly) {
            Some(i) => {
                self.corridor.drain(..i);
                true
            }
            None => false,
        }
    }

    /// Drop the whole corridor; the path is finished.
    pub fn consume(&mut self) {
        self.corridor.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn refs(ids: &[usize]) -> Vec<PolyRef> {
        ids.iter().map(|&i| PolyRef::new(1, i)).collect()
    }

    #[test]
    fn advance_trims_to_suffix() {
        let mut path = Path::new(refs(&[0, 1, 2, 3]), Vec3::ZERO, Vec3::X);
        assert!(path.advance_to(PolyRef::new(1, 2)));
        assert_eq!(path.corridor(), &refs(&[2, 3])[..]);
    }

    #[test]
    fn advance_to_head_is_a_no_op() {
        let mut path = Path::new(refs(&[0, 1]), Vec3::ZERO, Vec3::X);
        assert!(path.advance_to(PolyRef::new(1, 0)));
        assert_eq!(path.len(), 2);
    }

    #[test]
    fn advance_never_moves_backwards() {
        let mut path = Path::new(refs(&[0, 1, 2, 3]), Vec3::ZERO, Vec3::X);
        assert!(path.advance_to(PolyRef::new(1, 2)));
        // Poly 0 is behind now; the corridor must not grow back.
        assert!(!path.advance_to(PolyRef::new(1, 0)));
        assert_eq!(path.corridor(), &refs(&[2, 3])[..]);
    }

    #[test]
    fn every_trim_is_a_contiguous_suffix() {
        let original = refs(&[0, 1, 2, 3, 4, 5]);
        let mut path = Path::new(original.clone(), Vec3::ZERO, Vec3::X);
        for &step in &[1usize, 3, 3, 5] {
            path.advance_to(PolyRef::new(1, step));
            let tail = &original[original.len() - path.len()..];
            assert_eq!(path.corridor(), tail);
        }
    }

    #[test]
    fn consume_empties_the_corridor() {
        let mut path = Path::new(refs(&[0, 1]), Vec3::ZERO, Vec3::X);
        path.consume();
        assert!(path.is_empty());
        assert!(path.first().is_none());
    }
}
