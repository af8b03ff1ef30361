use std::{fmt, str::FromStr};

use bytemuck::{Pod, Zeroable};

use crate::{error::RendererError, screen};

#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq)]
pub struct Complex {
    pub real: f32,
    pub imaginary: f32,
}

impl Complex {
    pub const ZERO: Self = Complex {
        real: 0.0,
        imaginary: 0.0,
    };

    pub fn new(real: f32, imaginary: f32) -> Self {
        Complex { real, imaginary }
    }

    pub fn norm_sqr(&self) -> f32 {
        self.real * self.real + self.imaginary * self.imaginary
    }

    pub fn is_finite(&self) -> bool {
        self.real.is_finite() && self.imaginary.is_finite()
    }

    /// Equality on the bit patterns of both components, so `-0.0 != 0.0`
    /// and a NaN equals itself.
    pub fn bitwise_eq(&self, other: &Complex) -> bool {
        self.real.to_bits() == other.real.to_bits()
            && self.imaginary.to_bits() == other.imaginary.to_bits()
    }
}

impl fmt::Display for Complex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{},{}", self.real, self.imaginary)
    }
}

/// Parses `"re,im"`.
impl FromStr for Complex {
    type Err = RendererError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (real, imaginary) = s
            .split_once(',')
            .ok_or_else(|| RendererError::invalid(format!("expected re,im, got {:?}", s)))?;
        let parse = |part: &str| {
            part.trim()
                .parse::<f32>()
                .map_err(|err| RendererError::invalid(format!("{:?}: {}", part, err)))
        };
        Ok(Complex::new(parse(real)?, parse(imaginary)?))
    }
}

/// Per-pixel escape state, stored as two parallel arrays in row-major order.
///
/// `iteration_counts[i]` is the number of iterations pixel `i` has been
/// through, and `last_values[i]` is the value of `z` it reached. A pixel whose
/// count equals the current iteration ceiling has not escaped yet and can be
/// resumed from `last_values[i]`.
#[derive(Debug)]
pub struct PixelState {
    pub iteration_counts: Vec<u16>,
    pub last_values: Vec<Complex>,
}

impl PixelState {
    /// Allocates zeroed state for every pixel of `size`.
    ///
    /// Both arrays are reserved before either is filled, so on failure nothing
    /// is kept.
    pub fn allocate(size: screen::Size) -> Result<Self, RendererError> {
        let pixels = size.pixel_count();
        let allocation_error = |_| RendererError::Allocation { len: pixels };

        let mut iteration_counts: Vec<u16> = Vec::new();
        iteration_counts
            .try_reserve_exact(pixels)
            .map_err(allocation_error)?;
        let mut last_values: Vec<Complex> = Vec::new();
        last_values
            .try_reserve_exact(pixels)
            .map_err(allocation_error)?;

        iteration_counts.resize(pixels, 0);
        last_values.resize(pixels, Complex::ZERO);

        Ok(PixelState {
            iteration_counts,
            last_values,
        })
    }

    pub fn len(&self) -> usize {
        self.iteration_counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.iteration_counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_complex_pairs() {
        let c: Complex = "-0.75, 0.1".parse().unwrap();
        assert_eq!(c, Complex::new(-0.75, 0.1));
        assert_eq!(c.to_string().parse::<Complex>().unwrap(), c);
        assert!("1.0".parse::<Complex>().is_err());
        assert!("a,b".parse::<Complex>().is_err());
    }

    #[test]
    fn bitwise_equality_distinguishes_signed_zero() {
        let positive = Complex::new(0.0, 0.0);
        let negative = Complex::new(-0.0, 0.0);
        assert_eq!(positive, negative);
        assert!(!positive.bitwise_eq(&negative));
        assert!(positive.bitwise_eq(&Complex::ZERO));
    }

    #[test]
    fn allocates_zeroed_state() {
        let state = PixelState::allocate(screen::Size::new(3, 2).unwrap()).unwrap();
        assert_eq!(state.len(), 6);
        assert!(state.iteration_counts.iter().all(|&count| count == 0));
        assert!(state.last_values.iter().all(|z| *z == Complex::ZERO));
    }
}
