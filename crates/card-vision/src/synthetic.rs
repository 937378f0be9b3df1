//! Synthetic table frames for calibration and tests.
//!
//! A frame is a dark screen with a felt rectangle inset by 5% on each side.
//! Cards are drawn into the card slots of a [`PlatformProfile`], computed
//! with the same geometry the reader uses, so a rendered frame reads back
//! slot for slot. Each card carries a deterministic block glyph (10 x 14 cells)
//! in red or black ink.

use card_vision_core::{parse_cards, Card, CardParseError, PixelRect};
use card_vision_table::{slot_rects, PlatformProfile, RegionRole};
use image::{Rgb, RgbImage};

pub const DEFAULT_WIDTH: u32 = 800;
pub const DEFAULT_HEIGHT: u32 = 600;

pub const SCREEN: Rgb<u8> = Rgb([18, 18, 22]);
pub const FELT: Rgb<u8> = Rgb([35, 110, 50]);
pub const CARD_FACE: Rgb<u8> = Rgb([245, 245, 240]);
pub const RED_INK: Rgb<u8> = Rgb([200, 30, 30]);
pub const BLACK_INK: Rgb<u8> = Rgb([25, 25, 25]);

const GLYPH_COLS: u32 = 10;
const GLYPH_ROWS: u32 = 14;
const GLYPH_SEED: u64 = 0x5eed_ca4d;

/// Cards to draw.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TableScene {
    pub hero: Vec<Card>,
    pub board: Vec<Card>,
}

impl TableScene {
    pub fn new(hero: Vec<Card>, board: Vec<Card>) -> Self {
        Self { hero, board }
    }

    /// Parse comma or space separated card lists, e.g. `("Ah Kd", "Qs,Jc,Th")`.
    pub fn parse(hero: &str, board: &str) -> Result<Self, CardParseError> {
        Ok(Self {
            hero: parse_cards(hero)?,
            board: parse_cards(board)?,
        })
    }
}

/// Felt rectangle of a `width x height` synthetic frame.
pub fn table_rect(width: u32, height: u32) -> PixelRect {
    let mx = width / 20;
    let my = height / 20;
    PixelRect::new(
        mx,
        my,
        width.saturating_sub(2 * mx),
        height.saturating_sub(2 * my),
    )
}

/// A frame with no table on it.
pub fn render_empty_screen(width: u32, height: u32) -> RgbImage {
    RgbImage::from_pixel(width, height, SCREEN)
}

/// Render `scene` on a table laid out by `profile`.
///
/// Cards beyond a region's slot count are not drawn.
pub fn render_table(
    profile: &PlatformProfile,
    scene: &TableScene,
    width: u32,
    height: u32,
) -> RgbImage {
    let mut img = render_empty_screen(width, height);
    let table = table_rect(width, height);
    fill(&mut img, table, FELT);

    for region in profile.named_regions() {
        let cards = match region.role {
            RegionRole::HeroCards => &scene.hero,
            RegionRole::BoardCards => &scene.board,
            _ => continue,
        };
        for (&card, slot) in cards.iter().zip(slot_rects(&region, table)) {
            draw_card(&mut img, card, slot);
        }
    }
    img
}

/// Draw one card filling `slot` up to a thin felt border.
pub fn draw_card(img: &mut RgbImage, card: Card, slot: PixelRect) {
    let inset_x = (slot.width / 40).max(1);
    let inset_y = (slot.height / 40).max(1);
    let face = PixelRect::new(
        slot.x + inset_x,
        slot.y + inset_y,
        slot.width.saturating_sub(2 * inset_x),
        slot.height.saturating_sub(2 * inset_y),
    );
    fill(img, face, CARD_FACE);

    let ink = match card.color() {
        card_vision_core::SuitColor::Red => RED_INK,
        card_vision_core::SuitColor::Black => BLACK_INK,
    };
    let gx = face.width * 3 / 100;
    let gy = face.height * 3 / 100;
    let gw = face.width.saturating_sub(2 * gx);
    let gh = face.height.saturating_sub(2 * gy);
    for r in 0..GLYPH_ROWS {
        for c in 0..GLYPH_COLS {
            if !glyph_cell(card, c, r) {
                continue;
            }
            let x0 = face.x + gx + c * gw / GLYPH_COLS;
            let x1 = face.x + gx + (c + 1) * gw / GLYPH_COLS;
            let y0 = face.y + gy + r * gh / GLYPH_ROWS;
            let y1 = face.y + gy + (r + 1) * gh / GLYPH_ROWS;
            fill(img, PixelRect::new(x0, y0, x1 - x0, y1 - y0), ink);
        }
    }
}

/// Whether glyph cell `(col, row)` of `card` is inked (about 40% are).
pub fn glyph_cell(card: Card, col: u32, row: u32) -> bool {
    let key = GLYPH_SEED + card.index() as u64 * 256 + (row * GLYPH_COLS + col) as u64;
    splitmix64(key) % 5 < 2
}

fn splitmix64(x: u64) -> u64 {
    let mut z = x.wrapping_add(0x9e37_79b9_7f4a_7c15);
    z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
    z ^ (z >> 31)
}

fn fill(img: &mut RgbImage, rect: PixelRect, color: Rgb<u8>) {
    let Some(r) = rect.clip_to(img.width(), img.height()) else {
        return;
    };
    for y in r.y..r.y + r.height {
        for x in r.x..r.x + r.width {
            img.put_pixel(x, y, color);
        }
    }
}
