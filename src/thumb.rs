//! Newspaper-style thumbnail renderer.
//!
//! Produces an 840x472 PNG styled like an aged broadsheet front page: parchment
//! background with per-pixel noise and a vignette, double border, masthead,
//! dateline rules, and the wrapped headline. All randomness is seeded from the
//! headline text, so the same headline always renders the same image.

use ab_glyph::{FontVec, PxScale};
use chrono::NaiveDate;
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::error::Error;
use std::hash::{DefaultHasher, Hash, Hasher};
use std::sync::OnceLock;
use tracing::{info, instrument, warn};

pub const WIDTH: u32 = 840;
pub const HEIGHT: u32 = 472;

const PARCHMENT: Rgb<u8> = Rgb([0xf4, 0xea, 0xd5]);
const INK: Rgb<u8> = Rgb([0x1a, 0x16, 0x10]);
const FADED_INK: Rgb<u8> = Rgb([0x5a, 0x50, 0x3e]);
const BORDER: Rgb<u8> = Rgb([0xc4, 0xb8, 0x9c]);

const SERIF_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSerif-Bold.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
];
const TEXT_PATHS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSerif.ttf",
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
];

static HEADLINE_FONT: OnceLock<Option<FontVec>> = OnceLock::new();
static TEXT_FONT: OnceLock<Option<FontVec>> = OnceLock::new();

fn load_font(paths: &[&str]) -> Option<FontVec> {
    for path in paths {
        if let Ok(bytes) = std::fs::read(path) {
            if let Ok(font) = FontVec::try_from_vec(bytes) {
                return Some(font);
            }
        }
    }
    warn!(?paths, "No usable font found; thumbnails render without text");
    None
}

fn headline_font() -> Option<&'static FontVec> {
    HEADLINE_FONT.get_or_init(|| load_font(SERIF_PATHS)).as_ref()
}

fn text_font() -> Option<&'static FontVec> {
    TEXT_FONT.get_or_init(|| load_font(TEXT_PATHS)).as_ref()
}

fn headline_seed(headline: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    headline.hash(&mut hasher);
    hasher.finish()
}

/// Greedy word wrap against a measurement function. Words that overflow a
/// line on their own get a line to themselves. At most `max_lines` lines;
/// overflow past that is dropped.
pub fn wrap_headline<F>(headline: &str, max_width: u32, max_lines: usize, measure: F) -> Vec<String>
where
    F: Fn(&str) -> u32,
{
    let mut lines: Vec<String> = Vec::new();
    let mut current = String::new();
    for word in headline.split_whitespace() {
        let candidate = if current.is_empty() {
            word.to_string()
        } else {
            format!("{current} {word}")
        };
        if measure(&candidate) <= max_width || current.is_empty() {
            current = candidate;
        } else {
            lines.push(current);
            current = word.to_string();
            if lines.len() == max_lines {
                break;
            }
        }
    }
    if !current.is_empty() && lines.len() < max_lines {
        lines.push(current);
    }
    lines.truncate(max_lines);
    lines
}

fn paint_background(img: &mut RgbImage, seed: u64) {
    let mut rng = StdRng::seed_from_u64(seed);
    let cx = WIDTH as f32 / 2.0;
    let cy = HEIGHT as f32 / 2.0;
    let max_dist = (cx * cx + cy * cy).sqrt();
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            let noise: i16 = rng.random_range(-8..=8);
            let apply = |base: u8, darken: i16| -> f32 {
                (base as i16 + noise - darken).clamp(0, 255) as f32
            };
            // Paper yellows unevenly: green and blue channels fade faster.
            let r = apply(PARCHMENT[0], 0);
            let g = apply(PARCHMENT[1], 3);
            let b = apply(PARCHMENT[2], 8);
            let dx = x as f32 - cx;
            let dy = y as f32 - cy;
            let dist = (dx * dx + dy * dy).sqrt();
            let vignette = 1.0 - (dist / max_dist) * 0.15;
            img.put_pixel(
                x,
                y,
                Rgb([
                    (r * vignette) as u8,
                    (g * vignette) as u8,
                    (b * vignette) as u8,
                ]),
            );
        }
    }
}

fn draw_centered(img: &mut RgbImage, font: &FontVec, scale: PxScale, y: i32, color: Rgb<u8>, text: &str) {
    let (w, _) = text_size(scale, font, text);
    let x = (WIDTH as i32 - w as i32) / 2;
    draw_text_mut(img, color, x, y, scale, font, text);
}

/// Render the thumbnail for one day's roundup.
pub fn render(headline: &str, date: NaiveDate, site_name: &str, tagline: &str, vol_num: usize) -> RgbImage {
    let mut img = RgbImage::new(WIDTH, HEIGHT);
    paint_background(&mut img, headline_seed(headline));

    // Double border inset from the edge.
    draw_hollow_rect_mut(
        &mut img,
        Rect::at(8, 8).of_size(WIDTH - 17, HEIGHT - 17),
        BORDER,
    );
    draw_hollow_rect_mut(
        &mut img,
        Rect::at(12, 12).of_size(WIDTH - 25, HEIGHT - 25),
        BORDER,
    );

    if let (Some(serif), Some(text)) = (headline_font(), text_font()) {
        draw_centered(&mut img, serif, PxScale::from(54.0), 30, INK, &site_name.to_uppercase());
        draw_centered(&mut img, text, PxScale::from(18.0), 92, FADED_INK, tagline);

        // Dateline between two rules.
        draw_filled_rect_mut(&mut img, Rect::at(40, 122).of_size(WIDTH - 80, 2), INK);
        let dateline = format!(
            "Vol. I, No. {}  —  {}",
            vol_num,
            date.format("%A, %B %-d, %Y")
        );
        draw_centered(&mut img, text, PxScale::from(18.0), 132, INK, &dateline);
        draw_filled_rect_mut(&mut img, Rect::at(40, 160).of_size(WIDTH - 80, 2), INK);

        let scale = PxScale::from(58.0);
        let measure = |s: &str| text_size(scale, serif, s).0;
        let lines = wrap_headline(headline, WIDTH - 100, 3, measure);
        let mut y = 190;
        for line in &lines {
            draw_centered(&mut img, serif, scale, y, INK, line);
            y += 70;
        }
    }

    // A touch of blur softens the type like worn newsprint.
    image::imageops::blur(&img, 0.3)
}

/// Render and write `images/{slug}.png` under the site root.
#[instrument(level = "info", skip_all, fields(slug = %slug))]
pub async fn write_thumbnail(
    site_root: &str,
    slug: &str,
    headline: &str,
    date: NaiveDate,
    site_name: &str,
    tagline: &str,
    vol_num: usize,
) -> Result<String, Box<dyn Error>> {
    let root = site_root.trim_end_matches('/');
    tokio::fs::create_dir_all(format!("{root}/images")).await?;
    let path = format!("{root}/images/{slug}.png");
    let img = render(headline, date, site_name, tagline, vol_num);
    // image's save is synchronous; the file is small enough not to matter.
    img.save(&path)?;
    info!(%path, "Wrote thumbnail");
    Ok(path)
}
