use image::RgbaImage;

use crate::io::{self, IoError};

// ============================================================================
// CANVAS SNAPSHOT: one rendered state of the canvas
// ============================================================================

/// The canvas as PNG bytes. Compressed line drawings are a few KB each,
/// so a long undo trail stays cheap.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CanvasSnapshot {
    pub width: u32,
    pub height: u32,
    png: Vec<u8>,
}

impl CanvasSnapshot {
    pub fn capture(pixels: &RgbaImage) -> Result<Self, IoError> {
        Ok(Self {
            width: pixels.width(),
            height: pixels.height(),
            png: io::encode_png(pixels)?,
        })
    }

    pub fn decode(&self) -> Result<RgbaImage, IoError> {
        io::decode_image(&self.png)
    }

    pub fn memory_size(&self) -> usize {
        self.png.len()
    }
}

// ============================================================================
// SNAPSHOT HISTORY: linear undo/redo over canvas snapshots
// ============================================================================

const DEFAULT_MEMORY_LIMIT: usize = 64 * 1024 * 1024;

/// Linear list of snapshots with a cursor. Pushing past the cursor drops
/// the redo tail. When non-empty, `index < entries.len()`.
pub struct SnapshotHistory {
    entries: Vec<CanvasSnapshot>,
    index: Option<usize>,
    max_entries: usize,
    max_memory_bytes: Option<usize>,
    total_memory: usize,
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new(100)
    }
}

impl SnapshotHistory {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: Vec::new(),
            index: None,
            max_entries: max_entries.max(1),
            max_memory_bytes: Some(DEFAULT_MEMORY_LIMIT),
            total_memory: 0,
        }
    }

    /// Start over with a single entry (canvas init, clear, new background).
    pub fn reset(&mut self, initial: CanvasSnapshot) {
        self.total_memory = initial.memory_size();
        self.entries.clear();
        self.entries.push(initial);
        self.index = Some(0);
    }

    /// Record a new state after the current one.
    pub fn push(&mut self, snapshot: CanvasSnapshot) {
        let keep = self.index.map_or(0, |i| i + 1);
        for dropped in self.entries.drain(keep..) {
            self.total_memory -= dropped.memory_size();
        }
        self.total_memory += snapshot.memory_size();
        self.entries.push(snapshot);
        self.index = Some(self.entries.len() - 1);
        self.prune();
    }

    /// Step back one entry and return it.
    pub fn undo(&mut self) -> Option<&CanvasSnapshot> {
        let i = self.index.filter(|&i| i > 0)?;
        self.index = Some(i - 1);
        self.entries.get(i - 1)
    }

    /// Step forward one entry and return it.
    pub fn redo(&mut self) -> Option<&CanvasSnapshot> {
        let i = self.index.filter(|&i| i + 1 < self.entries.len())?;
        self.index = Some(i + 1);
        self.entries.get(i + 1)
    }

    pub fn can_undo(&self) -> bool {
        self.index.is_some_and(|i| i > 0)
    }

    pub fn can_redo(&self) -> bool {
        self.index.is_some_and(|i| i + 1 < self.entries.len())
    }

    pub fn index(&self) -> Option<usize> {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn memory_usage(&self) -> usize {
        self.total_memory
    }

    /// Drop the oldest entries beyond the count/memory limits. The newest
    /// entry is always kept and the cursor keeps pointing at the same state.
    fn prune(&mut self) {
        let mut dropped = 0;
        while self.entries.len() - dropped > self.max_entries
            || self
                .max_memory_bytes
                .is_some_and(|max| self.total_memory > max && self.entries.len() - dropped > 1)
        {
            self.total_memory -= self.entries[dropped].memory_size();
            dropped += 1;
        }
        if dropped == 0 {
            return;
        }
        self.entries.drain(..dropped);
        self.index = self.index.map(|i| i.saturating_sub(dropped));
        log_warn!(
            "Undo history pruned {} oldest snapshot(s); {} kept, {} bytes",
            dropped,
            self.entries.len(),
            self.total_memory
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    /// A 4×4 image whose top-left pixel encodes `n`, so snapshots differ.
    fn snap(n: u8) -> CanvasSnapshot {
        let mut img = RgbaImage::from_pixel(4, 4, Rgba([255, 255, 255, 255]));
        img.put_pixel(0, 0, Rgba([n, 0, 0, 255]));
        CanvasSnapshot::capture(&img).unwrap()
    }

    fn marker(s: &CanvasSnapshot) -> u8 {
        s.decode().unwrap().get_pixel(0, 0)[0]
    }

    /// Marker of the snapshot the cursor points at.
    fn current(h: &SnapshotHistory) -> Option<u8> {
        h.index().and_then(|i| h.entries.get(i)).map(marker)
    }

    #[test]
    fn empty_history_cannot_move() {
        let mut h = SnapshotHistory::new(10);
        assert!(h.is_empty());
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(h.undo().is_none());
        assert!(h.redo().is_none());
        assert!(current(&h).is_none());
    }

    #[test]
    fn undo_after_n_strokes_restores_previous_snapshot() {
        let mut h = SnapshotHistory::new(50);
        h.reset(snap(0));
        for n in 1..=5 {
            h.push(snap(n));
        }
        assert_eq!(h.len(), 6);
        let restored = h.undo().map(marker);
        assert_eq!(restored, Some(4));
        assert_eq!(h.index(), Some(4));
    }

    #[test]
    fn redo_is_unavailable_at_the_end() {
        let mut h = SnapshotHistory::new(50);
        h.reset(snap(0));
        h.push(snap(1));
        assert!(!h.can_redo());
        assert!(h.redo().is_none());
        assert_eq!(h.index(), Some(1));

        h.undo();
        assert!(h.can_redo());
        assert_eq!(h.redo().map(marker), Some(1));
        assert!(!h.can_redo());
    }

    #[test]
    fn undo_stops_at_the_initial_state() {
        let mut h = SnapshotHistory::new(50);
        h.reset(snap(0));
        assert!(!h.can_undo());
        h.push(snap(1));
        assert_eq!(h.undo().map(marker), Some(0));
        assert!(h.undo().is_none());
        assert_eq!(h.index(), Some(0));
    }

    #[test]
    fn push_after_undo_truncates_redo_tail() {
        let mut h = SnapshotHistory::new(50);
        h.reset(snap(0));
        h.push(snap(1));
        h.push(snap(2));
        h.undo();
        h.undo();
        h.push(snap(9));
        assert_eq!(h.len(), 2);
        assert!(!h.can_redo());
        assert_eq!(current(&h), Some(9));
        assert_eq!(h.undo().map(marker), Some(0));
    }

    #[test]
    fn reset_discards_everything() {
        let mut h = SnapshotHistory::new(50);
        h.reset(snap(0));
        h.push(snap(1));
        h.push(snap(2));
        h.reset(snap(7));
        assert_eq!(h.len(), 1);
        assert_eq!(h.index(), Some(0));
        assert_eq!(h.memory_usage(), snap(7).memory_size());
    }

    #[test]
    fn count_limit_drops_oldest_and_keeps_cursor_on_same_state() {
        let mut h = SnapshotHistory::new(3);
        h.reset(snap(0));
        for n in 1..=4 {
            h.push(snap(n));
        }
        assert_eq!(h.len(), 3);
        assert_eq!(current(&h), Some(4));
        assert_eq!(h.undo().map(marker), Some(3));
        assert_eq!(h.undo().map(marker), Some(2));
        assert!(!h.can_undo());
    }

    #[test]
    fn memory_limit_keeps_at_least_the_newest_entry() {
        let mut h = SnapshotHistory::new(100);
        h.max_memory_bytes = Some(1);
        h.reset(snap(0));
        h.push(snap(1));
        h.push(snap(2));
        assert_eq!(h.len(), 1);
        assert_eq!(current(&h), Some(2));
        assert_eq!(h.memory_usage(), snap(2).memory_size());
    }
}
