//! Per-pixel data handed to the interpreter by the rasterizer.
//!
//! A [Span] is a run of fragments on one scanline. Each fragment carries its interpolated
//! attributes, and the span carries the screen space step of every attribute along the x and
//! y axes, from which `DDX` and `DDY` of fragment inputs are computed without running the
//! program again.

use crate::instruction::{Vec4, MAX_INPUTS, MAX_TEXTURE_IMAGE_UNITS};

/// A single fragment of a [Span].
#[derive(Clone, Debug, PartialEq)]
pub struct Fragment {
    /// Interpolated attributes, indexed like the `f[...]` registers.
    pub inputs: [Vec4; MAX_INPUTS],
    /// Level of detail for each texture image unit.
    pub lambda: [f32; MAX_TEXTURE_IMAGE_UNITS],
    /// False once the fragment has been discarded.
    pub live: bool,
    /// Color result, written back after the program completes.
    pub color: Vec4,
    /// Depth result, written back if the program writes `o[DEPR]`.
    pub depth: f32,
}

impl Fragment {
    pub fn new(inputs: [Vec4; MAX_INPUTS]) -> Fragment {
        Fragment {
            inputs,
            lambda: [0.0; MAX_TEXTURE_IMAGE_UNITS],
            live: true,
            color: [0.0; 4],
            depth: 0.0,
        }
    }
}

impl Default for Fragment {
    fn default() -> Fragment {
        Fragment::new([[0.0; 4]; MAX_INPUTS])
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Span {
    pub fragments: Vec<Fragment>,
    /// Change of each input from one fragment to the next along x.
    pub step_x: [Vec4; MAX_INPUTS],
    /// Change of each input from one scanline to the next along y.
    pub step_y: [Vec4; MAX_INPUTS],
}

impl Span {
    pub fn new(fragments: Vec<Fragment>) -> Span {
        Span {
            fragments,
            step_x: [[0.0; 4]; MAX_INPUTS],
            step_y: [[0.0; 4]; MAX_INPUTS],
        }
    }

    /// A span holding one fragment.
    pub fn single(fragment: Fragment) -> Span {
        Span::new(vec![fragment])
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// Number of fragments not discarded.
    pub fn live_count(&self) -> usize {
        self.fragments.iter().filter(|fragment| fragment.live).count()
    }
}
