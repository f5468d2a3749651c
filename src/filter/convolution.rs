//! Zero-padded 2D convolution over RGBA buffers.

use super::Kernel;
use image::RgbaImage;

const CHANNELS: usize = 4;

/// Convolves every channel of `source` with `kernel`.
///
/// Returns the raw weighted sums, `width * height * 4` values in the
/// source's row-major RGBA layout. Samples outside the image contribute
/// zero. Values are not clamped: a sharpen kernel can overshoot
/// `0..=255` in both directions.
pub fn convolve(source: &RgbaImage, kernel: &Kernel) -> Vec<f32> {
    let width = source.width() as usize;
    let height = source.height() as usize;
    let pixels = source.as_raw();
    let side = kernel.side();
    let half = kernel.half_side() as isize;

    let mut output = vec![0.0f32; width * height * CHANNELS];

    for y in 0..height {
        for x in 0..width {
            let mut acc = [0.0f32; CHANNELS];

            for ky in 0..side {
                let sy = y as isize + ky as isize - half;
                if sy < 0 || sy >= height as isize {
                    continue;
                }
                for kx in 0..side {
                    let sx = x as isize + kx as isize - half;
                    if sx < 0 || sx >= width as isize {
                        continue;
                    }
                    let weight = kernel.weight(ky, kx);
                    if weight == 0.0 {
                        continue;
                    }
                    let offset = (sy as usize * width + sx as usize) * CHANNELS;
                    for (c, sum) in acc.iter_mut().enumerate() {
                        *sum += pixels[offset + c] as f32 * weight;
                    }
                }
            }

            let offset = (y * width + x) * CHANNELS;
            output[offset..offset + CHANNELS].copy_from_slice(&acc);
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;
    use proptest::prelude::*;

    fn uniform(width: u32, height: u32, value: u8) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([value; 4]))
    }

    #[test]
    fn test_sharpen_uniform_interior_unchanged() {
        let source = uniform(5, 5, 100);
        let output = convolve(&source, &Kernel::sharpen());

        // Centre pixel: 5*100 - 4*100
        let centre = (2 * 5 + 2) * CHANNELS;
        assert_eq!(output[centre], 100.0);
    }

    #[test]
    fn test_sharpen_border_overshoots() {
        let source = uniform(3, 3, 100);
        let output = convolve(&source, &Kernel::sharpen());

        // Corner has two zero neighbours: 5*100 - 2*100
        assert_eq!(output[0], 300.0);
        // Edge has one zero neighbour: 5*100 - 3*100
        assert_eq!(output[CHANNELS], 200.0);
    }

    #[test]
    fn test_sharpen_can_go_negative() {
        let mut source = uniform(3, 3, 255);
        source.put_pixel(1, 1, Rgba([0, 0, 0, 0]));
        let output = convolve(&source, &Kernel::sharpen());

        let centre = 4 * CHANNELS;
        assert_eq!(output[centre], -1020.0);
    }

    #[test]
    fn test_single_pixel_image() {
        let source = uniform(1, 1, 10);
        let output = convolve(&source, &Kernel::sharpen());
        assert_eq!(output, vec![50.0; 4]);
    }

    proptest! {
        #[test]
        fn prop_identity_reproduces_source(
            width in 1u32..12,
            height in 1u32..12,
            seed in any::<u64>(),
        ) {
            let source = RgbaImage::from_fn(width, height, |x, y| {
                let v = seed
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(((y * width + x) as u64).wrapping_mul(1442695040888963407));
                let b = v.to_le_bytes();
                Rgba([b[0], b[3], b[5], b[7]])
            });

            let output = convolve(&source, &Kernel::identity());
            let expected: Vec<f32> = source.as_raw().iter().map(|&v| v as f32).collect();
            prop_assert_eq!(output, expected);
        }
    }
}
