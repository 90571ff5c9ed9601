#![forbid(unsafe_code)]

use image::codecs::png::PngEncoder;
use image::{ColorType, GrayImage, ImageEncoder, Luma};

/// Minimum recorded stroke samples distinguishing a deliberate signature
/// from an accidental tap. Below this the capture is rejected and the
/// canvas cleared.
pub const MIN_INK_SAMPLES: usize = 30;

// Breathing room around the trimmed bounding box, and the half-width of the
// square stamped per sample point.
const TRIM_PADDING: u32 = 2;
const STROKE_RADIUS: i64 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    Signature,
    Initials,
}

impl SignatureKind {
    /// Wire discriminator sent with the upload.
    pub fn as_field(self) -> &'static str {
        match self {
            SignatureKind::Signature => "signature",
            SignatureKind::Initials => "initials",
        }
    }

    /// Human-readable prefix for the uploaded filename.
    pub fn display_name(self) -> &'static str {
        match self {
            SignatureKind::Signature => "Signature",
            SignatureKind::Initials => "Initials",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CaptureError {
    CanvasNotInitialized,
    EmptyCanvas,
    InsufficientInk { samples: usize },
    Encode { detail: String },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InkPoint {
    pub x: f32,
    pub y: f32,
}

/// Freehand ink input for one signature pad. Samples arrive in stroke order;
/// coordinates are canvas-local and clamped at capture time.
#[derive(Debug, Clone, PartialEq)]
pub struct InkCanvas {
    width: u32,
    height: u32,
    samples: Vec<InkPoint>,
}

impl InkCanvas {
    pub fn new(width: u32, height: u32) -> Result<Self, CaptureError> {
        if width == 0 || height == 0 {
            return Err(CaptureError::CanvasNotInitialized);
        }
        Ok(Self {
            width,
            height,
            samples: Vec::new(),
        })
    }

    pub fn add_sample(&mut self, x: f32, y: f32) {
        self.samples.push(InkPoint { x, y });
    }

    pub fn extend(&mut self, points: impl IntoIterator<Item = (f32, f32)>) {
        for (x, y) in points {
            self.add_sample(x, y);
        }
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    fn clamped(&self, p: InkPoint) -> (u32, u32) {
        let x = p.x.max(0.0).min((self.width - 1) as f32).round() as u32;
        let y = p.y.max(0.0).min((self.height - 1) as f32).round() as u32;
        (x, y)
    }
}

/// Rasterized, trimmed signature image ready for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    pub png: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Rasterizes the canvas to a PNG trimmed to the ink bounding box. The full
/// canvas is never uploaded; the trim keeps asset sizes proportional to the
/// actual signature. An empty or below-threshold canvas is rejected and
/// cleared, forcing a fresh stroke on the next attempt.
pub fn capture(canvas: &mut InkCanvas) -> Result<CapturedImage, CaptureError> {
    if canvas.samples.is_empty() {
        return Err(CaptureError::EmptyCanvas);
    }
    if canvas.samples.len() < MIN_INK_SAMPLES {
        let samples = canvas.samples.len();
        canvas.clear();
        return Err(CaptureError::InsufficientInk { samples });
    }

    let mut min_x = u32::MAX;
    let mut min_y = u32::MAX;
    let mut max_x = 0u32;
    let mut max_y = 0u32;
    for &p in &canvas.samples {
        let (x, y) = canvas.clamped(p);
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }
    let min_x = min_x.saturating_sub(TRIM_PADDING);
    let min_y = min_y.saturating_sub(TRIM_PADDING);
    let max_x = (max_x + TRIM_PADDING).min(canvas.width - 1);
    let max_y = (max_y + TRIM_PADDING).min(canvas.height - 1);

    let width = max_x - min_x + 1;
    let height = max_y - min_y + 1;
    let mut img = GrayImage::from_pixel(width, height, Luma([255u8]));

    for &p in &canvas.samples {
        let (x, y) = canvas.clamped(p);
        let cx = x as i64 - min_x as i64;
        let cy = y as i64 - min_y as i64;
        for dy in -STROKE_RADIUS..=STROKE_RADIUS {
            for dx in -STROKE_RADIUS..=STROKE_RADIUS {
                let px = cx + dx;
                let py = cy + dy;
                if px >= 0 && py >= 0 && (px as u32) < width && (py as u32) < height {
                    img.put_pixel(px as u32, py as u32, Luma([0u8]));
                }
            }
        }
    }

    let mut png = Vec::new();
    PngEncoder::new(&mut png)
        .write_image(img.as_raw(), width, height, ColorType::L8)
        .map_err(|e| CaptureError::Encode {
            detail: e.to_string(),
        })?;

    Ok(CapturedImage { png, width, height })
}
