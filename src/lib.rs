/*!
An incremental escape-time fractal renderer.

A [`Renderer`] computes Mandelbrot-family fractals (`z ← zⁿ + c` for
`n ∈ {2, 3, 4}`) over a viewport, refining the image a few iterations per frame
and reusing every pixel that has already escaped. Frames are coloured through
a palette under one of several [`Mapping`] policies and written into a
caller-owned 4-byte-per-pixel buffer.
*/

pub mod colour;
pub mod config;
pub mod error;
pub mod iterate;
pub mod palette;
pub mod params;
pub mod pixel;
pub mod renderer;
pub mod screen;
pub mod stats;

pub use colour::{Histogram, Mapping};
pub use error::RendererError;
pub use palette::{Anchor, ChannelOrder, Colour, Palette, Preset};
pub use params::{Function, RenderParams};
pub use pixel::Complex;
pub use renderer::Renderer;
pub use screen::Size;
