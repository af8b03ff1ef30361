use std::{fmt, str::FromStr};

use clap::ValueEnum;

use crate::{error::RendererError, pixel::Complex, screen};

/// The escape map iterated for each pixel.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Function {
    /// `z ← z² + c`
    #[default]
    #[value(name = "mandelbrot", aliases = ["mandelbrot2", "2"])]
    Mandelbrot2,
    /// `z ← z³ + c`
    #[value(alias = "3")]
    Mandelbrot3,
    /// `z ← z⁴ + c`
    #[value(alias = "4")]
    Mandelbrot4,
}

impl Function {
    pub const ALL: [Function; 3] = [
        Function::Mandelbrot2,
        Function::Mandelbrot3,
        Function::Mandelbrot4,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Function::Mandelbrot2 => "mandelbrot",
            Function::Mandelbrot3 => "mandelbrot3",
            Function::Mandelbrot4 => "mandelbrot4",
        }
    }

    pub fn degree(&self) -> u32 {
        match self {
            Function::Mandelbrot2 => 2,
            Function::Mandelbrot3 => 3,
            Function::Mandelbrot4 => 4,
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Function {
    type Err = RendererError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "mandelbrot" | "mandelbrot2" | "2" => Ok(Function::Mandelbrot2),
            "mandelbrot3" | "3" => Ok(Function::Mandelbrot3),
            "mandelbrot4" | "4" => Ok(Function::Mandelbrot4),
            _ => Err(RendererError::invalid(format!("unknown function {:?}", s))),
        }
    }
}

/// What to render: the escape map plus the mapping from screen to plane.
#[derive(Clone, Copy, Debug)]
pub struct RenderParams {
    pub function: Function,
    /// Plane coordinate of the screen centre.
    pub offset: Complex,
    /// Screen pixels per unit of plane distance.
    pub zoom: f32,
}

impl RenderParams {
    /// Degree 2, centred on the origin, with the plane interval `[-1, 1]`
    /// spanning the screen width.
    pub fn default_for(size: screen::Size) -> Self {
        RenderParams {
            function: Function::Mandelbrot2,
            offset: Complex::ZERO,
            zoom: default_zoom(size),
        }
    }
}

/// Cached results are only reused when the parameters match bit for bit.
impl PartialEq for RenderParams {
    fn eq(&self, other: &Self) -> bool {
        self.function == other.function
            && self.offset.bitwise_eq(&other.offset)
            && self.zoom.to_bits() == other.zoom.to_bits()
    }
}

impl Eq for RenderParams {}

pub fn default_zoom(size: screen::Size) -> f32 {
    size.half_width() as f32
}

pub(crate) fn validate_zoom(zoom: f32) -> Result<f32, RendererError> {
    if zoom.is_finite() && zoom > 0.0 {
        Ok(zoom)
    } else {
        Err(RendererError::invalid(format!(
            "zoom must be finite and positive, got {}",
            zoom
        )))
    }
}

pub(crate) fn validate_offset(offset: Complex) -> Result<Complex, RendererError> {
    if offset.is_finite() {
        Ok(offset)
    } else {
        Err(RendererError::invalid(format!(
            "offset must be finite, got {}",
            offset
        )))
    }
}
