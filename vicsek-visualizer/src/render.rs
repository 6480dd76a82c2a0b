use image::{ImageBuffer, Rgba, RgbaImage};
use imageproc::drawing::draw_filled_circle_mut;
use log::warn;
use palette::{FromColor, Hsv, Srgb};
use rand::seq::SliceRandom;
use rand::Rng;
use vicsek_common::Snapshot;

// Color definitions for named colors (RGBA format)
const COLOR_MAP: &[(&str, [u8; 4])] = &[
    ("black", [0, 0, 0, 255]),
    ("white", [255, 255, 255, 255]),
    ("red", [255, 0, 0, 255]),
    ("green", [0, 255, 0, 255]),
    ("blue", [0, 0, 255, 255]),
    ("yellow", [255, 255, 0, 255]),
    ("cyan", [0, 255, 255, 255]),
    ("magenta", [255, 0, 255, 255]),
];

/// A rendered video frame.
pub struct Frame {
    pub index: usize,
    pub image: RgbaImage,
}

/// Maps world coordinates onto the output image.
#[derive(Debug, Clone, Copy)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
    pub pixels_per_unit: f64,
    pub point_radius_px: i32,
}

impl FrameLayout {
    /// Fits the world into `width` x `height` pixels (height follows the aspect
    /// ratio when not given). Both dimensions are rounded down to even numbers,
    /// as 4:2:0 encoding requires.
    pub fn new(world_width: f64, world_height: f64, width: u32, height: Option<u32>, point_radius: f64) -> Self {
        let aspect_ratio = world_width / world_height;
        let height = height.unwrap_or_else(|| (width as f64 / aspect_ratio).round() as u32);
        let width = (width & !1).max(2);
        let height = (height & !1).max(2);

        let scale_x = width as f64 / world_width;
        let scale_y = height as f64 / world_height;
        let pixels_per_unit = scale_x.min(scale_y); // Use smaller scale to ensure everything fits
        let point_radius_px = ((point_radius * pixels_per_unit).round() as i32).max(1);

        Self { width, height, pixels_per_unit, point_radius_px }
    }

    /// Pixel coordinates of a world position; y is flipped so the origin is bottom-left.
    pub fn world_to_pixel(&self, x: f64, y: f64) -> (i32, i32) {
        let px = (x * self.pixels_per_unit).floor() as i32;
        let py = self.height as i32 - 1 - (y * self.pixels_per_unit).floor() as i32;
        (px, py)
    }
}

/// Parse a color name to RGBA values
pub fn parse_color(color_name: &str) -> [u8; 4] {
    for &(name, color) in COLOR_MAP {
        if name.eq_ignore_ascii_case(color_name) {
            return color;
        }
    }
    warn!("Color '{}' not recognized, using black.", color_name);
    [0, 0, 0, 255]
}

/// One color per particle, spread over the hue circle and shuffled so that
/// neighboring indices do not look alike.
pub fn generate_color_palette<R: Rng + ?Sized>(count: usize, rng: &mut R) -> Vec<[u8; 4]> {
    let count = count.max(1);
    let mut colors: Vec<[u8; 4]> = (0..count)
        .map(|i| {
            let hue = (i as f32) / (count as f32);
            let saturation = 0.7 + rng.random_range(-0.1..0.1);
            let value = 0.8 + rng.random_range(-0.1..0.1);
            let rgb = Srgb::from_color(Hsv::new(hue * 360.0, saturation, value));
            [
                (rgb.red * 255.0) as u8,
                (rgb.green * 255.0) as u8,
                (rgb.blue * 255.0) as u8,
                255,
            ]
        })
        .collect();
    colors.shuffle(rng);
    colors
}

/// Draw a snapshot frame
pub fn draw_frame(
    snapshot: &Snapshot,
    frame_index: usize,
    layout: &FrameLayout,
    bg_color: [u8; 4],
    color_palette: &[[u8; 4]],
) -> Frame {
    let mut image = ImageBuffer::from_pixel(layout.width, layout.height, Rgba(bg_color));

    for (i, &(x, y)) in snapshot.positions.iter().enumerate() {
        let (px, py) = layout.world_to_pixel(x, y);
        if px >= 0 && px < layout.width as i32 && py >= 0 && py < layout.height as i32 {
            let color = color_palette[i % color_palette.len()];
            draw_filled_circle_mut(&mut image, (px, py), layout.point_radius_px, Rgba(color));
        }
    }

    Frame { index: frame_index, image }
}

/// RGBA to planar YUV 4:2:0 (BT.601). Expects even dimensions.
pub fn rgb_to_yuv420(image: &RgbaImage) -> Vec<u8> {
    let width = image.width() as usize;
    let height = image.height() as usize;
    let (chroma_width, chroma_height) = (width / 2, height / 2);

    let mut yuv = vec![0u8; width * height + 2 * chroma_width * chroma_height];
    let (y_plane, chroma) = yuv.split_at_mut(width * height);
    let (u_plane, v_plane) = chroma.split_at_mut(chroma_width * chroma_height);

    for (y_out, pixel) in y_plane.iter_mut().zip(image.pixels()) {
        let [r, g, b, _] = pixel.0.map(|c| c as f32);
        *y_out = (0.299 * r + 0.587 * g + 0.114 * b).round() as u8;
    }

    // Average each 2x2 block for the subsampled chroma planes
    for cy in 0..chroma_height {
        for cx in 0..chroma_width {
            let (mut sum_u, mut sum_v) = (0f32, 0f32);
            for dy in 0..2 {
                for dx in 0..2 {
                    let pixel = image.get_pixel((2 * cx + dx) as u32, (2 * cy + dy) as u32);
                    let [r, g, b, _] = pixel.0.map(|c| c as f32);
                    sum_u += -0.169 * r - 0.331 * g + 0.5 * b + 128.0;
                    sum_v += 0.5 * r - 0.419 * g - 0.081 * b + 128.0;
                }
            }
            let idx = cy * chroma_width + cx;
            u_plane[idx] = (sum_u / 4.0).round().clamp(0.0, 255.0) as u8;
            v_plane[idx] = (sum_v / 4.0).round().clamp(0.0, 255.0) as u8;
        }
    }

    yuv
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn snapshot(positions: Vec<(f64, f64)>) -> Snapshot {
        Snapshot {
            step: 3,
            particle_count: positions.len() as u32,
            order_parameter: 1.0,
            mean_neighbor_count: 1.0,
            positions,
            headings: None,
        }
    }

    #[test]
    fn layout_keeps_aspect_and_even_dimensions() {
        let layout = FrameLayout::new(20.0, 10.0, 801, None, 0.1);
        assert_eq!(layout.width, 800);
        assert_eq!(layout.height, 400);
        assert!((layout.pixels_per_unit - 40.0).abs() < 1e-9);
        assert_eq!(layout.point_radius_px, 4);
    }

    #[test]
    fn world_origin_maps_to_bottom_left() {
        let layout = FrameLayout::new(20.0, 20.0, 200, Some(200), 0.1);
        assert_eq!(layout.world_to_pixel(0.0, 0.0), (0, 199));
        assert_eq!(layout.world_to_pixel(19.99, 19.99), (199, 0));
    }

    #[test]
    fn particles_are_drawn_in_palette_color() {
        let layout = FrameLayout::new(20.0, 20.0, 100, Some(100), 0.5);
        let frame = draw_frame(&snapshot(vec![(10.0, 10.0)]), 7, &layout, [255, 255, 255, 255], &[[255, 0, 0, 255]]);
        assert_eq!(frame.index, 7);
        let (px, py) = layout.world_to_pixel(10.0, 10.0);
        assert_eq!(frame.image.get_pixel(px as u32, py as u32).0, [255, 0, 0, 255]);
        assert_eq!(frame.image.get_pixel(0, 0).0, [255, 255, 255, 255]);
    }

    #[test]
    fn yuv_planes_have_420_sizes() {
        let image = ImageBuffer::from_pixel(8, 4, Rgba([255, 255, 255, 255]));
        let yuv = rgb_to_yuv420(&image);
        assert_eq!(yuv.len(), 8 * 4 + 2 * 4 * 2);
        assert!(yuv[..32].iter().all(|&y| y == 255));
        assert!(yuv[32..].iter().all(|&c| (127..=129).contains(&c)));
    }

    #[test]
    fn named_colors_and_palette() {
        assert_eq!(parse_color("Blue"), [0, 0, 255, 255]);
        assert_eq!(parse_color("chartreuse"), [0, 0, 0, 255]);
        let mut rng = StdRng::seed_from_u64(4);
        let palette = generate_color_palette(12, &mut rng);
        assert_eq!(palette.len(), 12);
        assert!(palette.iter().all(|c| c[3] == 255));
    }
}
