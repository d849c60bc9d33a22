use std::io;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

use ab_glyph::{FontRef, PxScale};
use async_trait::async_trait;
use image::{ImageFormat, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::debug;

use crate::error::{GeneratorError, GeneratorResult};
use crate::traits::{ImageRequest, SceneImageGenerator};

const WIDTH: u32 = 1280;
const HEIGHT: u32 = 720;

const TITLE_SCALE: f32 = 48.0;
const BODY_SCALE: f32 = 24.0;
const MAX_DESCRIPTION_CHARS: usize = 80;
const MAX_KEY_POINTS: usize = 4;
const WATERMARK: &str = "MOCK";

const FONT_DATA: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);

/// Slide background colours, cycled per generated image.
const PALETTE: [[u8; 3]; 6] = [
    [41, 98, 255],
    [0, 150, 136],
    [156, 39, 176],
    [255, 87, 34],
    [76, 175, 80],
    [233, 30, 99],
];

/// Solid-colour slide with the scene title, its key points (or the
/// description) and a watermark.
#[derive(Debug, Default)]
pub struct MockImageGenerator {
    next_color: AtomicUsize,
}

impl MockImageGenerator {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SceneImageGenerator for MockImageGenerator {
    async fn generate(&self, request: &ImageRequest, output: &Path) -> GeneratorResult<()> {
        let color = PALETTE[self.next_color.fetch_add(1, Ordering::Relaxed) % PALETTE.len()];
        let slide = render_slide(color, request)?;

        if let Some(parent) = output.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let path = output.to_path_buf();
        tokio::task::spawn_blocking(move || slide.save_with_format(&path, ImageFormat::Png))
            .await
            .map_err(|e| GeneratorError::Io(io::Error::other(e)))??;

        debug!(title = %request.title, "Mock slide written to {}", output.display());
        Ok(())
    }
}

fn slide_font() -> GeneratorResult<FontRef<'static>> {
    FontRef::try_from_slice(FONT_DATA)
        .map_err(|e| GeneratorError::config(format!("embedded slide font unreadable: {}", e)))
}

pub(crate) fn render_slide(background: [u8; 3], request: &ImageRequest) -> GeneratorResult<RgbImage> {
    let font = slide_font()?;
    let mut img = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb(background));
    let shade = Rgb(background.map(|c| c / 2));
    let soft = Rgb(background.map(|c| c + ((255 - c) as u16 * 3 / 4) as u8));

    let title_top = (HEIGHT / 3) as i32;
    draw_filled_rect_mut(&mut img, title_band(&font, &request.title, title_top), shade);
    draw_centered(&mut img, &font, TITLE_SCALE, title_top, &request.title, WHITE);

    let mut y = (HEIGHT / 2 + 30) as i32;
    for line in body_lines(request) {
        draw_centered(&mut img, &font, BODY_SCALE, y, &line, soft);
        y += 40;
    }

    draw_text_mut(
        &mut img,
        soft,
        WIDTH as i32 - 120,
        HEIGHT as i32 - 40,
        PxScale::from(BODY_SCALE),
        &font,
        WATERMARK,
    );
    Ok(img)
}

/// Shaded band behind the title, padded around the rendered text.
fn title_band(font: &FontRef<'_>, title: &str, top: i32) -> Rect {
    let (w, h) = text_size(PxScale::from(TITLE_SCALE), font, title);
    let width = (w + 80).min(WIDTH);
    let height = h.max(1) + 40;
    Rect::at(((WIDTH - width) / 2) as i32, top - 20).of_size(width, height)
}

fn draw_centered(img: &mut RgbImage, font: &FontRef<'_>, scale: f32, y: i32, text: &str, color: Rgb<u8>) {
    let scale = PxScale::from(scale);
    let (w, _) = text_size(scale, font, text);
    let x = (WIDTH as i32 - w as i32) / 2;
    draw_text_mut(img, color, x.max(0), y, scale, font, text);
}

/// Key points as bullets, or the truncated description when there are none.
fn body_lines(request: &ImageRequest) -> Vec<String> {
    if request.key_points.is_empty() {
        if request.description.trim().is_empty() {
            return Vec::new();
        }
        return vec![truncate(&request.description, MAX_DESCRIPTION_CHARS)];
    }
    request
        .key_points
        .iter()
        .take(MAX_KEY_POINTS)
        .map(|point| format!("\u{2022} {}", truncate(point, MAX_DESCRIPTION_CHARS)))
        .collect()
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let mut cut: String = text.chars().take(max_chars).collect();
        cut.push_str("...");
        cut
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn request() -> ImageRequest {
        ImageRequest {
            title: "Cells".into(),
            description: "A slide about cells".into(),
            narration: None,
            key_points: vec!["Smallest unit".into(), "Divide".into()],
        }
    }

    fn count_pixels(img: &RgbImage, x: u32, y: u32, w: u32, h: u32, color: Rgb<u8>) -> usize {
        (y..y + h)
            .flat_map(|py| (x..x + w).map(move |px| (px, py)))
            .filter(|(px, py)| img.get_pixel(*px, *py) == &color)
            .count()
    }

    #[test]
    fn test_render_slide_layout() {
        let img = render_slide(PALETTE[0], &request()).unwrap();
        assert_eq!(img.dimensions(), (WIDTH, HEIGHT));
        assert_eq!(img.get_pixel(0, 0), &Rgb(PALETTE[0]));

        // Title band corner is shaded, and the title itself is drawn in white
        let font = slide_font().unwrap();
        let band = title_band(&font, "Cells", (HEIGHT / 3) as i32);
        let shade = Rgb(PALETTE[0].map(|c| c / 2));
        assert_eq!(img.get_pixel(band.left() as u32 + 2, band.top() as u32 + 2), &shade);
        assert!(count_pixels(&img, band.left() as u32, band.top() as u32, band.width(), band.height(), WHITE) > 0);
    }

    #[test]
    fn test_watermark_is_drawn() {
        let img = render_slide(PALETTE[2], &request()).unwrap();
        let background = Rgb(PALETTE[2]);
        let marked = count_pixels(&img, WIDTH - 120, HEIGHT - 40, 100, 30, background);
        assert!(marked < 100 * 30, "watermark area is untouched");
    }

    #[test]
    fn test_body_lines() {
        let lines = body_lines(&request());
        assert_eq!(lines, vec!["\u{2022} Smallest unit".to_string(), "\u{2022} Divide".to_string()]);

        let long = ImageRequest {
            description: "x".repeat(100),
            ..Default::default()
        };
        let lines = body_lines(&long);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].chars().count(), MAX_DESCRIPTION_CHARS + 3);
        assert!(lines[0].ends_with("..."));

        assert!(body_lines(&ImageRequest::default()).is_empty());
    }

    #[tokio::test]
    async fn test_writes_png_and_cycles_colours() {
        let dir = TempDir::new().unwrap();
        let generator = MockImageGenerator::new();
        let first = dir.path().join("images").join("scene_000.png");
        let second = dir.path().join("images").join("scene_001.png");

        generator.generate(&request(), &first).await.unwrap();
        generator.generate(&request(), &second).await.unwrap();

        let a = image::open(&first).unwrap().to_rgb8();
        let b = image::open(&second).unwrap().to_rgb8();
        assert_eq!(a.get_pixel(0, 0), &Rgb(PALETTE[0]));
        assert_eq!(b.get_pixel(0, 0), &Rgb(PALETTE[1]));
    }
}
