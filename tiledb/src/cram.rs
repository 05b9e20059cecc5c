use bitvec::vec::BitVec;

/// Read/write access to the configuration memory of one tile.
///
/// The CRAM itself is owned and synchronized by the caller; the database
/// only issues `(frame, bit)` accesses through this trait while
/// translating, and makes no bounds promises beyond what the tile database
/// file encodes.
pub trait CramView {
    fn read(&self, frame: usize, bit: usize) -> bool;
    fn write(&mut self, frame: usize, bit: usize, value: bool);
}

/// A plain zero-initialized tile CRAM buffer, frame-major.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct TileCram {
    frames: usize,
    bits_per_frame: usize,
    data: BitVec,
}

impl TileCram {
    pub fn new(frames: usize, bits_per_frame: usize) -> Self {
        Self {
            frames,
            bits_per_frame,
            data: BitVec::repeat(false, frames * bits_per_frame),
        }
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn bits_per_frame(&self) -> usize {
        self.bits_per_frame
    }
}

impl CramView for TileCram {
    fn read(&self, frame: usize, bit: usize) -> bool {
        assert!(frame < self.frames && bit < self.bits_per_frame);
        self.data[frame * self.bits_per_frame + bit]
    }

    fn write(&mut self, frame: usize, bit: usize, value: bool) {
        assert!(frame < self.frames && bit < self.bits_per_frame);
        self.data.set(frame * self.bits_per_frame + bit, value);
    }
}
