//! Face crops for the emotion classifier.
//!
//! With SCRFD landmarks the face is warped onto the InsightFace five-point
//! template (4-DOF similarity transform); without them we fall back to a
//! square crop around the detection box.

use crate::types::BoundingBox;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma};

/// InsightFace reference landmarks, defined on a 112×112 canvas.
const REFERENCE_LANDMARKS_112: [(f32, f32); 5] = [
    (38.2946, 51.6963), // left eye
    (73.5318, 51.5014), // right eye
    (56.0252, 71.7366), // nose
    (41.5493, 92.3655), // left mouth
    (70.7299, 92.2041), // right mouth
];
const REFERENCE_SIZE: f32 = 112.0;

/// Margin applied around the detection box for the fallback crop.
const CROP_MARGIN: f32 = 1.2;

/// Similarity transform `dst = [[a, -b], [b, a]] * src + [tx, ty]`.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Similarity {
    a: f32,
    b: f32,
    tx: f32,
    ty: f32,
}

impl Similarity {
    /// Closed-form least-squares fit mapping `src` points onto `dst`.
    fn estimate(src: &[(f32, f32); 5], dst: &[(f32, f32); 5]) -> Option<Self> {
        let n = src.len() as f32;
        let mean = |pts: &[(f32, f32); 5]| {
            let (sx, sy) = pts.iter().fold((0.0, 0.0), |acc, p| (acc.0 + p.0, acc.1 + p.1));
            (sx / n, sy / n)
        };
        let (smx, smy) = mean(src);
        let (dmx, dmy) = mean(dst);

        let mut dot = 0.0f32;
        let mut cross = 0.0f32;
        let mut norm = 0.0f32;
        for (s, d) in src.iter().zip(dst.iter()) {
            let (sx, sy) = (s.0 - smx, s.1 - smy);
            let (dx, dy) = (d.0 - dmx, d.1 - dmy);
            dot += sx * dx + sy * dy;
            cross += sx * dy - sy * dx;
            norm += sx * sx + sy * sy;
        }

        if norm < 1e-12 {
            return None;
        }

        let a = dot / norm;
        let b = cross / norm;
        Some(Self {
            a,
            b,
            tx: dmx - (a * smx - b * smy),
            ty: dmy - (b * smx + a * smy),
        })
    }

    /// Map a destination point back into source space.
    fn invert_point(&self, x: f32, y: f32) -> (f32, f32) {
        let det = self.a * self.a + self.b * self.b;
        let (dx, dy) = (x - self.tx, y - self.ty);
        (
            (self.a * dx + self.b * dy) / det,
            (-self.b * dx + self.a * dy) / det,
        )
    }
}

/// Bilinear sample; out-of-bounds pixels read as black.
fn sample_bilinear(gray: &GrayImage, x: f32, y: f32) -> f32 {
    let (w, h) = (gray.width() as i64, gray.height() as i64);
    let x0 = x.floor() as i64;
    let y0 = y.floor() as i64;
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let px = |x: i64, y: i64| -> f32 {
        if x >= 0 && x < w && y >= 0 && y < h {
            gray.get_pixel(x as u32, y as u32).0[0] as f32
        } else {
            0.0
        }
    };

    px(x0, y0) * (1.0 - fx) * (1.0 - fy)
        + px(x0 + 1, y0) * fx * (1.0 - fy)
        + px(x0, y0 + 1) * (1.0 - fx) * fy
        + px(x0 + 1, y0 + 1) * fx * fy
}

/// Warp a face onto the five-point template at `out_size`×`out_size`.
///
/// Returns `None` when the landmarks are degenerate (all coincident).
pub fn align_face(gray: &GrayImage, landmarks: &[(f32, f32); 5], out_size: u32) -> Option<GrayImage> {
    let k = out_size as f32 / REFERENCE_SIZE;
    let reference = REFERENCE_LANDMARKS_112.map(|(x, y)| (x * k, y * k));
    let transform = Similarity::estimate(landmarks, &reference)?;

    Some(GrayImage::from_fn(out_size, out_size, |ox, oy| {
        let (sx, sy) = transform.invert_point(ox as f32, oy as f32);
        Luma([sample_bilinear(gray, sx, sy).round().clamp(0.0, 255.0) as u8])
    }))
}

/// Square crop around the detection box, resized to `out_size`×`out_size`.
pub fn crop_face(gray: &GrayImage, face: &BoundingBox, out_size: u32) -> GrayImage {
    let (img_w, img_h) = (gray.width() as f32, gray.height() as f32);
    let (cx, cy) = face.center();
    let side = (face.width.max(face.height) * CROP_MARGIN)
        .min(img_w.min(img_h))
        .max(1.0);

    let x0 = (cx - side / 2.0).clamp(0.0, img_w - side);
    let y0 = (cy - side / 2.0).clamp(0.0, img_h - side);

    let crop = imageops::crop_imm(gray, x0 as u32, y0 as u32, side as u32, side as u32).to_image();
    imageops::resize(&crop, out_size, out_size, FilterType::Triangle)
}

/// Produce the classifier input for a detected face.
pub fn face_crop(gray: &GrayImage, face: &BoundingBox, out_size: u32) -> GrayImage {
    face.landmarks
        .as_ref()
        .and_then(|lms| align_face(gray, lms, out_size))
        .unwrap_or_else(|| crop_face(gray, face, out_size))
}
