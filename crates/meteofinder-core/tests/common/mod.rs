#![allow(dead_code)]

use std::path::{Path, PathBuf};

use ndarray::Array2;

use meteofinder_core::raster::{ColorPlanes, Raster};

/// Synthetic night sky. Pixels are RGB in [0, 1].
pub struct Sky {
    width: usize,
    height: usize,
    red: Array2<f32>,
    green: Array2<f32>,
    blue: Array2<f32>,
}

impl Sky {
    pub fn new(width: usize, height: usize, background: f32) -> Self {
        Self {
            width,
            height,
            red: Array2::from_elem((height, width), background),
            green: Array2::from_elem((height, width), background),
            blue: Array2::from_elem((height, width), background),
        }
    }

    /// Add uniform noise in `[-amplitude, amplitude]` from a fixed-seed LCG.
    pub fn with_noise(mut self, amplitude: f32, seed: u64) -> Self {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        let mut next = || {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as f32 / (1u64 << 31) as f32) * 2.0 - 1.0
        };
        for row in 0..self.height {
            for col in 0..self.width {
                let n = next() * amplitude;
                for plane in [&mut self.red, &mut self.green, &mut self.blue] {
                    plane[[row, col]] = (plane[[row, col]] + n).clamp(0.0, 1.0);
                }
            }
        }
        self
    }

    /// Solid gray line of the given half-width.
    pub fn line(self, from: (f32, f32), to: (f32, f32), radius: f32, value: f32) -> Self {
        self.paint(from, to, radius, [value; 3], None)
    }

    pub fn colored_line(self, from: (f32, f32), to: (f32, f32), radius: f32, rgb: [f32; 3]) -> Self {
        self.paint(from, to, radius, rgb, None)
    }

    /// Gray line lit for `dash` px, dark for `gap` px, repeating.
    pub fn dashed_line(
        self,
        from: (f32, f32),
        to: (f32, f32),
        radius: f32,
        value: f32,
        dash: f32,
        gap: f32,
    ) -> Self {
        self.paint(from, to, radius, [value; 3], Some((dash, gap)))
    }

    fn paint(
        mut self,
        from: (f32, f32),
        to: (f32, f32),
        radius: f32,
        rgb: [f32; 3],
        pattern: Option<(f32, f32)>,
    ) -> Self {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let len = (dx * dx + dy * dy).sqrt();
        let (ux, uy) = (dx / len, dy / len);
        for row in 0..self.height {
            for col in 0..self.width {
                let (px, py) = (col as f32 - from.0, row as f32 - from.1);
                let t = px * ux + py * uy;
                if t < 0.0 || t > len {
                    continue;
                }
                let across = (px * uy - py * ux).abs();
                if across > radius {
                    continue;
                }
                if let Some((dash, gap)) = pattern {
                    if t % (dash + gap) >= dash {
                        continue;
                    }
                }
                self.red[[row, col]] = rgb[0];
                self.green[[row, col]] = rgb[1];
                self.blue[[row, col]] = rgb[2];
            }
        }
        self
    }

    /// Grayscale raster (luminance) at full resolution.
    pub fn gray_raster(&self) -> Raster {
        Raster::new(self.planes().luminance(), 8)
    }

    /// Colour raster at full resolution.
    pub fn color_raster(&self) -> Raster {
        Raster::from_color(self.planes(), 8)
    }

    fn planes(&self) -> ColorPlanes {
        ColorPlanes {
            red: self.red.clone(),
            green: self.green.clone(),
            blue: self.blue.clone(),
        }
    }

    /// Write an 8-bit grayscale PNG.
    pub fn save_gray(&self, path: &Path) {
        let luma = self.planes().luminance();
        let img = image::GrayImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            image::Luma([to_u8(luma[[y as usize, x as usize]])])
        });
        img.save(path).unwrap();
    }

    /// Write an 8-bit RGB PNG.
    pub fn save_rgb(&self, path: &Path) {
        let img = image::RgbImage::from_fn(self.width as u32, self.height as u32, |x, y| {
            let (r, c) = (y as usize, x as usize);
            image::Rgb([
                to_u8(self.red[[r, c]]),
                to_u8(self.green[[r, c]]),
                to_u8(self.blue[[r, c]]),
            ])
        });
        img.save(path).unwrap();
    }
}

fn to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// A long, bright, straight diagonal streak on a quiet sky.
pub fn meteor_sky() -> Sky {
    Sky::new(400, 300, 0.08)
        .with_noise(0.02, 7)
        .line((50.0, 60.0), (330.0, 242.0), 1.5, 0.95)
}

/// The meteor streak drawn `radius` px wide either side, like a fireball.
pub fn fireball_sky(radius: f32) -> Sky {
    Sky::new(400, 300, 0.08)
        .with_noise(0.02, 7)
        .line((50.0, 60.0), (330.0, 242.0), radius, 0.95)
}

/// A short streak of moderate brightness, about 36 px long.
pub fn faint_short_sky() -> Sky {
    Sky::new(200, 150, 0.05)
        .with_noise(0.01, 11)
        .line((70.0, 60.0), (100.0, 80.0), 1.5, 0.5)
}

/// Sky noise only.
pub fn empty_sky() -> Sky {
    Sky::new(320, 240, 0.1).with_noise(0.03, 3)
}

/// Five parallel trails, like stars drifting during a long exposure.
pub fn star_trail_sky() -> Sky {
    (0..5).fold(Sky::new(400, 300, 0.06).with_noise(0.01, 5), |sky, i| {
        let y = 40.0 + 50.0 * i as f32;
        sky.line((40.0, y), (300.0, y + 30.0), 1.2, 0.9)
    })
}

/// A long line broken into short lit dashes, like blinking aircraft lights.
pub fn dotted_sky() -> Sky {
    Sky::new(400, 300, 0.06)
        .with_noise(0.01, 13)
        .dashed_line((40.0, 80.0), (340.0, 220.0), 1.5, 0.9, 6.0, 8.0)
}

/// A streak in saturated red, like an aircraft navigation light.
pub fn red_light_sky() -> Sky {
    Sky::new(400, 300, 0.04)
        .with_noise(0.01, 17)
        .colored_line((50.0, 200.0), (330.0, 60.0), 1.5, [0.95, 0.1, 0.1])
}

/// Write `sky` as `<dir>/<name>` and return the path.
pub fn write_sky(dir: &Path, name: &str, sky: &Sky) -> PathBuf {
    let path = dir.join(name);
    sky.save_gray(&path);
    path
}
