//! Sprite sheets and background keying

use crate::sim::{BearAnim, Rect};

/// A grid of equally sized animation frames
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpriteSheet {
    pub width: u32,
    pub height: u32,
    pub cols: u32,
    pub rows: u32,
}

impl SpriteSheet {
    /// Bear sheet: 4 columns × 2 rows, walking on the first row, attacking on the second
    pub const BEAR_COLS: u32 = 4;
    pub const BEAR_ROWS: u32 = 2;
    pub const WALK_START: u32 = 0;
    pub const ATTACK_START: u32 = 4;

    pub fn bears(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            cols: Self::BEAR_COLS,
            rows: Self::BEAR_ROWS,
        }
    }

    pub fn frame_count(&self) -> u32 {
        self.cols * self.rows
    }

    /// Frame size in source pixels
    pub fn frame_size(&self) -> (f32, f32) {
        (
            self.width as f32 / self.cols.max(1) as f32,
            self.height as f32 / self.rows.max(1) as f32,
        )
    }

    /// Source rectangle of a frame in pixels, snapped to whole pixels
    pub fn frame_px(&self, index: u32) -> Rect {
        let index = index % self.frame_count().max(1);
        let (fw, fh) = self.frame_size();
        let col = index % self.cols.max(1);
        let row = index / self.cols.max(1);
        Rect::new(
            (col as f32 * fw).floor(),
            (row as f32 * fh).floor(),
            fw,
            fh,
        )
    }

    /// Normalized texture coordinates `[u0, v0, u1, v1]` of a frame
    pub fn frame_uv(&self, index: u32) -> [f32; 4] {
        if self.width == 0 || self.height == 0 {
            return [0.0, 0.0, 1.0, 1.0];
        }
        let src = self.frame_px(index);
        let (w, h) = (self.width as f32, self.height as f32);
        [
            src.x / w,
            src.y / h,
            src.right() / w,
            src.bottom() / h,
        ]
    }
}

/// Sheet index of a bear's current frame
pub fn bear_frame_index(anim: BearAnim, frame: u32) -> u32 {
    match anim {
        BearAnim::Walking => SpriteSheet::WALK_START + frame,
        BearAnim::Attacking => SpriteSheet::ATTACK_START + frame,
    }
}

/// Whether a pixel belongs to the light backdrop the sprites were drawn on
#[inline]
pub fn is_backdrop(r: u8, g: u8, b: u8) -> bool {
    let brightness = (r as u32 + g as u32 + b as u32) as f32 / 3.0;
    if brightness > 200.0 || (r > 220 && g > 220 && b > 220) {
        return true;
    }
    // Uniform light greys
    brightness > 180.0 && r.abs_diff(g) < 20 && g.abs_diff(b) < 20
}

/// Make backdrop pixels of an RGBA8 buffer fully transparent.
/// Returns the number of pixels keyed out.
pub fn chroma_key(rgba: &mut [u8]) -> usize {
    let mut keyed = 0;
    for px in rgba.chunks_exact_mut(4) {
        if is_backdrop(px[0], px[1], px[2]) {
            px[3] = 0;
            keyed += 1;
        }
    }
    keyed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bear_frames_on_grid() {
        let sheet = SpriteSheet::bears(800, 400);
        assert_eq!(sheet.frame_px(0), Rect::new(0.0, 0.0, 200.0, 200.0));
        assert_eq!(sheet.frame_px(3), Rect::new(600.0, 0.0, 200.0, 200.0));
        assert_eq!(sheet.frame_px(5), Rect::new(200.0, 200.0, 200.0, 200.0));
        assert_eq!(sheet.frame_uv(7), [0.75, 0.5, 1.0, 1.0]);
    }

    #[test]
    fn test_frame_index_by_state() {
        assert_eq!(bear_frame_index(BearAnim::Walking, 2), 2);
        assert_eq!(bear_frame_index(BearAnim::Attacking, 2), 6);
    }

    #[test]
    fn test_uneven_sheet_snaps_to_pixels() {
        let sheet = SpriteSheet::bears(1001, 401);
        let frame = sheet.frame_px(5);
        assert_eq!(frame.x, 250.0);
        assert_eq!(frame.y, 200.0);
    }

    #[test]
    fn test_chroma_key() {
        let mut pixels = vec![
            255, 255, 255, 255, // white
            230, 225, 221, 255, // near white
            190, 188, 192, 255, // light grey
            190, 120, 60, 255, // bright but coloured
            40, 30, 20, 255, // dark fur
        ];
        assert_eq!(chroma_key(&mut pixels), 3);
        let alphas: Vec<u8> = pixels.chunks(4).map(|p| p[3]).collect();
        assert_eq!(alphas, vec![0, 0, 0, 255, 255]);
    }
}
