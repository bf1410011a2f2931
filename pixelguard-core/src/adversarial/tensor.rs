//! Minimal CHW float tensor for classifier input and gradients.

use crate::error::{PixelGuardError, Result};
use crate::pixel::{PixelBuffer, CHANNELS};

/// Dense `channels x height x width` tensor of `f32`, channel-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: [usize; 3],
    data: Vec<f32>,
}

impl Tensor {
    pub fn zeros(shape: [usize; 3]) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.iter().product()],
        }
    }

    pub fn from_vec(shape: [usize; 3], data: Vec<f32>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(PixelGuardError::ModelInference(format!(
                "tensor of shape {shape:?} needs {expected} values, got {}",
                data.len()
            )));
        }
        Ok(Self { shape, data })
    }

    /// Convert an RGB buffer to a `[3, H, W]` tensor with values in `[0, 1]`.
    pub fn from_pixels(image: &PixelBuffer) -> Self {
        let (width, height) = (image.width() as usize, image.height() as usize);
        let plane = width * height;
        let mut data = vec![0.0f32; plane * CHANNELS];

        for (i, pixel) in image.samples().chunks_exact(CHANNELS).enumerate() {
            for (c, &sample) in pixel.iter().enumerate() {
                data[c * plane + i] = sample as f32 / 255.0;
            }
        }

        Self {
            shape: [CHANNELS, height, width],
            data,
        }
    }

    /// Convert a `[3, H, W]` tensor in `[0, 1]` back to 8-bit samples.
    /// Values are clamped to `[0, 1]` and rounded to the nearest level.
    pub fn to_pixels(&self) -> Result<PixelBuffer> {
        let [channels, height, width] = self.shape;
        if channels != CHANNELS {
            return Err(PixelGuardError::ShapeMismatch {
                expected: [CHANNELS, height, width],
                actual: self.shape,
            });
        }

        let plane = width * height;
        let mut samples = Vec::with_capacity(plane * CHANNELS);
        for i in 0..plane {
            for c in 0..CHANNELS {
                let value = self.data[c * plane + i].clamp(0.0, 1.0);
                samples.push((value * 255.0).round() as u8);
            }
        }

        PixelBuffer::new(width as u32, height as u32, samples)
    }

    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn ensure_shape(&self, expected: [usize; 3]) -> Result<()> {
        if self.shape != expected {
            return Err(PixelGuardError::ShapeMismatch {
                expected,
                actual: self.shape,
            });
        }
        Ok(())
    }

    fn at(&self, c: usize, y: usize, x: usize) -> f32 {
        self.data[(c * self.shape[1] + y) * self.shape[2] + x]
    }

    /// Bilinear resampling with half-pixel centres (`align_corners = false`).
    pub fn resize_bilinear(&self, height: usize, width: usize) -> Tensor {
        let [channels, in_h, in_w] = self.shape;
        if (in_h, in_w) == (height, width) {
            return self.clone();
        }

        let rows: Vec<(usize, usize, f32)> = (0..height)
            .map(|y| source_index(y, in_h, height))
            .collect();
        let cols: Vec<(usize, usize, f32)> = (0..width)
            .map(|x| source_index(x, in_w, width))
            .collect();

        let mut out = Tensor::zeros([channels, height, width]);
        let mut idx = 0;
        for c in 0..channels {
            for &(y0, y1, wy) in &rows {
                for &(x0, x1, wx) in &cols {
                    let top = self.at(c, y0, x0) * (1.0 - wx) + self.at(c, y0, x1) * wx;
                    let bottom = self.at(c, y1, x0) * (1.0 - wx) + self.at(c, y1, x1) * wx;
                    out.data[idx] = top * (1.0 - wy) + bottom * wy;
                    idx += 1;
                }
            }
        }
        out
    }

    /// Per-channel `(x - mean) / std`.
    pub fn normalize(&mut self, mean: &[f32; 3], std: &[f32; 3]) {
        let plane = self.shape[1] * self.shape[2];
        for (c, channel) in self.data.chunks_mut(plane).enumerate().take(3) {
            for value in channel {
                *value = (*value - mean[c]) / std[c];
            }
        }
    }

    /// Elementwise sign; zero stays zero.
    pub fn sign(&self) -> Tensor {
        let data = self
            .data
            .iter()
            .map(|&v| {
                if v > 0.0 {
                    1.0
                } else if v < 0.0 {
                    -1.0
                } else {
                    0.0
                }
            })
            .collect();
        Tensor {
            shape: self.shape,
            data,
        }
    }

    /// `self + scale * other`.
    pub fn scaled_add(&self, other: &Tensor, scale: f32) -> Result<Tensor> {
        other.ensure_shape(self.shape)?;
        let data = self
            .data
            .iter()
            .zip(&other.data)
            .map(|(a, b)| a + scale * b)
            .collect();
        Ok(Tensor {
            shape: self.shape,
            data,
        })
    }

    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|v| v.is_finite())
    }
}

/// Source indices and blend weight for output index `dst`.
fn source_index(dst: usize, in_len: usize, out_len: usize) -> (usize, usize, f32) {
    let scale = in_len as f32 / out_len as f32;
    let src = ((dst as f32 + 0.5) * scale - 0.5).max(0.0);
    let i0 = (src.floor() as usize).min(in_len - 1);
    let i1 = if i0 + 1 < in_len { i0 + 1 } else { i0 };
    (i0, i1, src - i0 as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_pixels_is_channel_major() {
        let image = PixelBuffer::new(2, 1, vec![255, 0, 0, 0, 255, 0]).unwrap();
        let tensor = Tensor::from_pixels(&image);
        assert_eq!(tensor.shape(), [3, 1, 2]);
        assert_eq!(tensor.data(), &[1.0, 0.0, 0.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn test_pixel_roundtrip_is_exact() {
        let samples: Vec<u8> = (0..48).map(|i| (i * 5) as u8).collect();
        let image = PixelBuffer::new(4, 4, samples).unwrap();
        assert_eq!(Tensor::from_pixels(&image).to_pixels().unwrap(), image);
    }

    #[test]
    fn test_to_pixels_clamps() {
        let tensor = Tensor::from_vec([3, 1, 1], vec![-0.5, 0.5, 1.5]).unwrap();
        let image = tensor.to_pixels().unwrap();
        assert_eq!(image.samples(), &[0, 128, 255]);
    }

    #[test]
    fn test_from_vec_validates_length() {
        assert!(Tensor::from_vec([3, 2, 2], vec![0.0; 11]).is_err());
    }

    #[test]
    fn test_resize_constant_stays_constant() {
        let tensor = Tensor::from_vec([1, 2, 2], vec![0.25; 4]).unwrap();
        let up = tensor.resize_bilinear(5, 7);
        assert_eq!(up.shape(), [1, 5, 7]);
        assert!(up.data().iter().all(|&v| (v - 0.25).abs() < 1e-6));
    }

    #[test]
    fn test_resize_half_pixel_upsample() {
        // 1x2 -> 1x4 with align_corners=false gives [0, 0.25, 0.75, 1].
        let tensor = Tensor::from_vec([1, 1, 2], vec![0.0, 1.0]).unwrap();
        let up = tensor.resize_bilinear(1, 4);
        let expected = [0.0, 0.25, 0.75, 1.0];
        for (a, b) in up.data().iter().zip(expected) {
            assert!((a - b).abs() < 1e-6, "{a} vs {b}");
        }
    }

    #[test]
    fn test_normalize() {
        let mut tensor = Tensor::from_vec([3, 1, 1], vec![0.5, 0.5, 0.5]).unwrap();
        tensor.normalize(&[0.5, 0.0, 0.25], &[1.0, 0.5, 0.25]);
        assert_eq!(tensor.data(), &[0.0, 1.0, 1.0]);
    }

    #[test]
    fn test_sign_and_scaled_add() {
        let a = Tensor::from_vec([1, 1, 3], vec![0.5, 0.5, 0.5]).unwrap();
        let g = Tensor::from_vec([1, 1, 3], vec![-3.0, 0.0, 2.0]).unwrap();
        let out = a.scaled_add(&g.sign(), 0.1).unwrap();
        for (a, b) in out.data().iter().zip([0.4, 0.5, 0.6]) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn test_scaled_add_shape_mismatch() {
        let a = Tensor::zeros([3, 2, 2]);
        let b = Tensor::zeros([3, 2, 3]);
        assert!(matches!(
            a.scaled_add(&b, 1.0),
            Err(PixelGuardError::ShapeMismatch { .. })
        ));
    }
}
