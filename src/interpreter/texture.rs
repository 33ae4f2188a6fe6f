//! Texture sampling interface of the [Interpreter](super::Interpreter).

use crate::instruction::{TextureTarget, Vec4};

/// Interface to the texture units.
pub trait TextureSampler {
    /// Called when a `TEX`, `TXB`, `TXD` or `TXP` instruction is executed.
    ///
    /// # Parameters
    /// - `unit`: The texture image unit named in the instruction.
    /// - `target`: The texture target the unit is used with.
    /// - `coord`: The texture coordinates, divided by `w` for `TXP`.
    /// - `lambda`: The level of detail.
    fn sample(&mut self, unit: usize, target: TextureTarget, coord: Vec4, lambda: f32) -> Vec4;

    /// Width and height in texels of the base image bound to `unit`.
    ///
    /// Used to compute the level of detail of `TXD`.
    fn image_size(&self, _unit: usize) -> (f32, f32) {
        (1.0, 1.0)
    }
}

/// Level of detail from explicit texture coordinate derivatives.
pub fn compute_lambda(ddx: Vec4, ddy: Vec4, width: f32, height: f32) -> f32 {
    let dudx = ddx[0] * width;
    let dvdx = ddx[1] * height;
    let dudy = ddy[0] * width;
    let dvdy = ddy[1] * height;

    let x = (dudx * dudx + dvdx * dvdx).sqrt();
    let y = (dudy * dudy + dvdy * dvdy).sqrt();

    x.max(y).log2()
}

/// A sampler that returns the same color for every lookup.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SolidColor(pub Vec4);

impl TextureSampler for SolidColor {
    fn sample(&mut self, _unit: usize, _target: TextureTarget, _coord: Vec4, _lambda: f32) -> Vec4 {
        self.0
    }
}

/// A texture lookup recorded by [TestSampler].
#[derive(Clone, Debug, PartialEq)]
pub struct SampleRequest {
    pub unit: usize,
    pub target: TextureTarget,
    pub coord: Vec4,
    pub lambda: f32,
}

/// A sampler for testing purposes.
///
/// Returns the texture coordinates as the sampled color, or a fixed color if one is set, and
/// records every lookup.
pub struct TestSampler {
    color: Option<Vec4>,
    size: (f32, f32),
    requests: Vec<SampleRequest>,
}

impl TestSampler {
    pub fn new() -> TestSampler {
        TestSampler {
            color: None,
            size: (1.0, 1.0),
            requests: Vec::new(),
        }
    }

    pub fn with_color(color: Vec4) -> TestSampler {
        TestSampler {
            color: Some(color),
            ..TestSampler::new()
        }
    }

    pub fn with_size(mut self, width: f32, height: f32) -> TestSampler {
        self.size = (width, height);
        self
    }

    pub fn requests(&self) -> &[SampleRequest] {
        &self.requests[..]
    }

    pub fn into_requests(self) -> Vec<SampleRequest> {
        self.requests
    }

    fn record(&mut self, unit: usize, target: TextureTarget, coord: Vec4, lambda: f32) -> Vec4 {
        self.requests.push(SampleRequest { unit, target, coord, lambda });
        self.color.unwrap_or(coord)
    }
}

impl Default for TestSampler {
    fn default() -> TestSampler {
        TestSampler::new()
    }
}

impl TextureSampler for TestSampler {
    fn sample(&mut self, unit: usize, target: TextureTarget, coord: Vec4, lambda: f32) -> Vec4 {
        self.record(unit, target, coord, lambda)
    }

    fn image_size(&self, _unit: usize) -> (f32, f32) {
        self.size
    }
}

impl TextureSampler for &mut TestSampler {
    fn sample(&mut self, unit: usize, target: TextureTarget, coord: Vec4, lambda: f32) -> Vec4 {
        self.record(unit, target, coord, lambda)
    }

    fn image_size(&self, _unit: usize) -> (f32, f32) {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lambda() {
        let lambda = compute_lambda([1.0 / 64.0, 0.0, 0.0, 0.0], [0.0, 1.0 / 64.0, 0.0, 0.0], 256.0, 256.0);
        assert_eq!(lambda, 2.0);

        let lambda = compute_lambda([0.0, 0.0, 0.0, 0.0], [0.0, 0.5, 0.0, 0.0], 16.0, 2.0);
        assert_eq!(lambda, 0.0);
    }

    #[test]
    fn test_sampler_records() {
        let mut sampler = TestSampler::new();

        let color = sampler.sample(3, TextureTarget::Cube, [1.0, 2.0, 3.0, 4.0], 0.5);
        assert_eq!(color, [1.0, 2.0, 3.0, 4.0]);

        assert_eq!(sampler.requests().len(), 1);
        assert_eq!(sampler.requests()[0].unit, 3);
        assert_eq!(sampler.requests()[0].lambda, 0.5);
    }
}
