//! Colouring algorithms.
//!
//! Iteration counts are turned into pixels in two passes. First a [`Mapping`]
//! builds a table from every iteration count in `0..=max_iterations` to a
//! palette index, consulting a [`Histogram`] of the frame when the policy
//! depends on the distribution of counts. Then each pixel is written from the
//! table, or with the palette's set colour if it reached `max_iterations`.

use std::{fmt, str::FromStr};

use clap::ValueEnum;
use log::trace;

use crate::{
    config,
    error::RendererError,
    palette::{ChannelOrder, Palette},
    screen,
};

/// How iteration counts map to palette indices.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Mapping {
    /// `i mod S`: the palette tiles.
    #[default]
    Repeat,
    /// `(i + frame) mod S`: tiles, shifted by one more slot every frame.
    #[value(name = "repeat_cycle", alias = "repeat-cycle")]
    RepeatCycle,
    /// `min(i, S - 1)`
    Clamp,
    /// Stretches `0..max_iterations` over the palette.
    #[value(name = "scale_global", alias = "scale-global")]
    ScaleGlobal,
    /// Stretches the observed range of escape counts over the palette,
    /// ignoring the slowest-escaping outliers.
    #[value(name = "scale_auto", aliases = ["scale-auto", "scale_local", "scale-local"])]
    ScaleAuto,
    /// Histogram equalization ([Wikipedia](https://en.wikipedia.org/wiki/Plotting_algorithms_for_the_Mandelbrot_set#Histogram_coloring)).
    Histogram,
}

impl Mapping {
    pub const ALL: [Mapping; 6] = [
        Mapping::Repeat,
        Mapping::RepeatCycle,
        Mapping::Clamp,
        Mapping::ScaleGlobal,
        Mapping::ScaleAuto,
        Mapping::Histogram,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Mapping::Repeat => "repeat",
            Mapping::RepeatCycle => "repeat_cycle",
            Mapping::Clamp => "clamp",
            Mapping::ScaleGlobal => "scale_global",
            Mapping::ScaleAuto => "scale_auto",
            Mapping::Histogram => "histogram",
        }
    }

    fn needs_histogram(&self) -> bool {
        matches!(self, Mapping::ScaleAuto | Mapping::Histogram)
    }
}

impl fmt::Display for Mapping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mapping {
    type Err = RendererError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().replace('-', "_");
        Mapping::ALL
            .into_iter()
            .find(|mapping| mapping.name().eq_ignore_ascii_case(&s))
            .or_else(|| (s.eq_ignore_ascii_case("scale_local")).then_some(Mapping::ScaleAuto))
            .ok_or_else(|| RendererError::invalid(format!("unknown mapping {:?}", s)))
    }
}

/// Number of pixels holding each iteration count.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Histogram {
    counts: Vec<usize>,
    /// Pixels that escaped, i.e. every bucket except `max_iterations`.
    total: usize,
}

impl Histogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Recounts `iteration_counts`, reusing this histogram's storage.
    pub fn update(&mut self, iteration_counts: &[u16], max_iterations: u16) {
        trace!("begin histogram update");

        self.counts.clear();
        self.counts.resize(max_iterations as usize + 1, 0);
        for &count in iteration_counts {
            self.counts[count.min(max_iterations) as usize] += 1;
        }
        self.total = iteration_counts.len() - self.counts[max_iterations as usize];

        debug_assert_eq!(
            self.total + self.in_set(),
            self.counts.iter().sum::<usize>()
        );

        trace!("end histogram update");
    }

    pub fn from_counts(iteration_counts: &[u16], max_iterations: u16) -> Self {
        let mut histogram = Histogram::new();
        histogram.update(iteration_counts, max_iterations);
        histogram
    }

    /// Pixels with exactly `iterations` iterations.
    pub fn count(&self, iterations: u16) -> usize {
        self.counts.get(iterations as usize).copied().unwrap_or(0)
    }

    pub fn buckets(&self) -> &[usize] {
        &self.counts
    }

    pub fn max_iterations(&self) -> u16 {
        self.counts.len().saturating_sub(1) as u16
    }

    /// Pixels that escaped.
    pub fn total(&self) -> usize {
        self.total
    }

    /// Pixels that have not escaped.
    pub fn in_set(&self) -> usize {
        self.counts.last().copied().unwrap_or(0)
    }

    /// Smallest iteration count of an escaped pixel.
    pub fn min_escaped(&self) -> Option<u16> {
        self.escaped_buckets()
            .iter()
            .position(|&count| count > 0)
            .map(|i| i as u16)
    }

    /// Largest iteration count of an escaped pixel, after dropping the
    /// `outlier_fraction` of escaped pixels with the highest counts.
    pub fn max_escaped(&self, outlier_fraction: f64) -> Option<u16> {
        let cutoff = (self.total as f64 * outlier_fraction).floor() as usize;
        let mut accumulated = 0;
        self.escaped_buckets()
            .iter()
            .rposition(|&count| {
                accumulated += count;
                accumulated > cutoff
            })
            .map(|i| i as u16)
    }

    fn escaped_buckets(&self) -> &[usize] {
        match self.counts.split_last() {
            Some((_, escaped)) => escaped,
            None => &[],
        }
    }
}

/// Scratch space for turning iteration counts into pixels, kept between frames
/// to avoid reallocating.
#[derive(Debug, Default)]
pub struct PaletteMapper {
    histogram: Histogram,
    index_table: Vec<usize>,
    colour_table: Vec<[u8; 4]>,
}

impl PaletteMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fills the palette index for every iteration count in
    /// `0..=max_iterations` and returns the table.
    ///
    /// Every index is below `palette_len`. The entry for `max_iterations`
    /// itself is 0 and unused, those pixels take the set colour. `frame` only
    /// affects [`Mapping::RepeatCycle`].
    pub fn map_indices(
        &mut self,
        iteration_counts: &[u16],
        max_iterations: u16,
        palette_len: usize,
        mapping: Mapping,
        frame: u32,
    ) -> &[usize] {
        debug_assert!(palette_len > 0);
        debug_assert!(max_iterations > 0);

        if mapping.needs_histogram() {
            self.histogram.update(iteration_counts, max_iterations);
        }

        let size = palette_len;
        let last = size - 1;
        let max = max_iterations as usize;

        self.index_table.clear();
        self.index_table.resize(max + 1, 0);
        let escaped = &mut self.index_table[..max];

        match mapping {
            Mapping::Repeat => {
                for (i, index) in escaped.iter_mut().enumerate() {
                    *index = i % size;
                }
            }
            Mapping::RepeatCycle => {
                let shift = frame as usize % size;
                for (i, index) in escaped.iter_mut().enumerate() {
                    *index = (i + shift) % size;
                }
            }
            Mapping::Clamp => {
                for (i, index) in escaped.iter_mut().enumerate() {
                    *index = i.min(last);
                }
            }
            Mapping::ScaleGlobal => {
                for (i, index) in escaped.iter_mut().enumerate() {
                    *index = (size * i / max).min(last);
                }
            }
            Mapping::ScaleAuto => {
                let histogram = &self.histogram;
                if let (Some(low), Some(high)) = (
                    histogram.min_escaped(),
                    histogram.max_escaped(config::AUTO_SCALE_OUTLIER_FRACTION),
                ) {
                    let (low, high) = (low as usize, high as usize);
                    for (i, index) in escaped.iter_mut().enumerate().skip(low) {
                        *index = if high <= low {
                            if i > low {
                                last
                            } else {
                                0
                            }
                        } else {
                            (size * (i - low) / (high - low)).min(last)
                        };
                    }
                }
            }
            Mapping::Histogram => {
                let total = self.histogram.total();
                if total > 0 {
                    let mut cumulative = 0;
                    for (index, &count) in escaped.iter_mut().zip(self.histogram.buckets()) {
                        cumulative += count;
                        *index = (cumulative * size / total).min(last);
                    }
                }
            }
        }

        &self.index_table
    }

    /// The histogram from the last mapping that needed one.
    pub fn histogram(&self) -> &Histogram {
        &self.histogram
    }

    /// Writes the colour of every pixel into `pixels`, `stride` bytes per row.
    ///
    /// The target must already have been checked with [`check_target`]. Bytes
    /// between the end of a row and the next stride are left untouched.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        size: screen::Size,
        iteration_counts: &[u16],
        max_iterations: u16,
        palette: &Palette,
        order: ChannelOrder,
        mapping: Mapping,
        frame: u32,
        pixels: &mut [u8],
        stride: usize,
    ) {
        trace!("begin render {:?}", mapping);
        debug_assert_eq!(iteration_counts.len(), size.pixel_count());

        self.map_indices(
            iteration_counts,
            max_iterations,
            palette.len(),
            mapping,
            frame,
        );

        let colours = palette.colours();
        self.colour_table.clear();
        self.colour_table.extend(
            self.index_table
                .iter()
                .map(|&index| colours[index].to_bytes(order)),
        );
        self.colour_table[max_iterations as usize] = palette.set_colour().to_bytes(order);

        let width = size.width as usize;
        for (y, counts) in iteration_counts.chunks_exact(width).enumerate() {
            let start = y * stride;
            let row: &mut [[u8; 4]] =
                bytemuck::cast_slice_mut(&mut pixels[start..start + size.row_bytes()]);
            for (pixel, &count) in row.iter_mut().zip(counts) {
                *pixel = self.colour_table[count.min(max_iterations) as usize];
            }
        }

        trace!("end render");
    }
}

/// Checks that a `stride`-byte-per-row buffer of `len` bytes holds a frame of
/// `size`.
pub fn check_target(size: screen::Size, len: usize, stride: usize) -> Result<(), RendererError> {
    let row_bytes = size.row_bytes();
    if stride < row_bytes {
        return Err(RendererError::invalid(format!(
            "stride {} is smaller than a row of {} bytes",
            stride, row_bytes
        )));
    }
    let required = (size.height as usize - 1)
        .checked_mul(stride)
        .and_then(|bytes| bytes.checked_add(row_bytes));
    match required {
        Some(required) if required <= len => Ok(()),
        _ => Err(RendererError::invalid(format!(
            "pixel buffer of {} bytes is too small for {}x{} at stride {}",
            len, size.width, size.height, stride
        ))),
    }
}
