//! Colour lookup tables.

use std::{fmt, str::FromStr};

use bytemuck::{Pod, Zeroable};
use clap::ValueEnum;

use crate::{config, error::RendererError};

/// An 8-bit-per-channel colour.
#[repr(C)]
#[derive(Pod, Zeroable, Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Colour {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Colour {
    pub const BLACK: Self = Colour::rgb(0, 0, 0);
    pub const WHITE: Self = Colour::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Colour { r, g, b, a: 255 }
    }

    /// Opaque colour from `0xRRGGBB`. Bits above the low 24 are ignored.
    pub const fn from_hex(rgb: u32) -> Self {
        Colour::rgb((rgb >> 16) as u8, (rgb >> 8) as u8, rgb as u8)
    }

    /// The 4 bytes of this colour in `order`.
    pub fn to_bytes(self, order: ChannelOrder) -> [u8; 4] {
        let Colour { r, g, b, a } = self;
        match order {
            ChannelOrder::Rgba => [r, g, b, a],
            ChannelOrder::Bgra => [b, g, r, a],
            ChannelOrder::Argb => [a, r, g, b],
            ChannelOrder::Abgr => [a, b, g, r],
        }
    }

    fn lerp(self, other: Colour, weight: f32) -> Colour {
        let channel = |from: u8, to: u8| {
            ((1.0 - weight) * from as f32 + weight * to as f32)
                .round()
                .clamp(0.0, 255.0) as u8
        };
        Colour::rgb(
            channel(self.r, other.r),
            channel(self.g, other.g),
            channel(self.b, other.b),
        )
    }
}

/// Parses `#RRGGBB` or `RRGGBB`.
impl FromStr for Colour {
    type Err = RendererError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s.trim().trim_start_matches('#');
        if hex.len() != 6 {
            return Err(RendererError::invalid(format!("expected RRGGBB, got {:?}", s)));
        }
        u32::from_str_radix(hex, 16)
            .map(Colour::from_hex)
            .map_err(|err| RendererError::invalid(format!("{:?}: {}", s, err)))
    }
}

/// Byte order of a 4-byte pixel in the destination buffer.
///
/// Named by the order of the channels in memory, so [`ChannelOrder::Rgba`]
/// writes red at the lowest address. This is the layout of a little-endian
/// `ABGR` packed pixel, as used by Android `ARGB_8888` bitmaps.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ChannelOrder {
    #[default]
    Rgba,
    Bgra,
    Argb,
    Abgr,
}

impl ChannelOrder {
    pub const ALL: [ChannelOrder; 4] = [
        ChannelOrder::Rgba,
        ChannelOrder::Bgra,
        ChannelOrder::Argb,
        ChannelOrder::Abgr,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ChannelOrder::Rgba => "rgba",
            ChannelOrder::Bgra => "bgra",
            ChannelOrder::Argb => "argb",
            ChannelOrder::Abgr => "abgr",
        }
    }
}

impl fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ChannelOrder {
    type Err = RendererError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ChannelOrder::ALL
            .into_iter()
            .find(|order| order.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RendererError::invalid(format!("unknown channel order {:?}", s)))
    }
}

/// A colour pinned to a position in `[0, 1]` along the palette.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Anchor {
    pub colour: Colour,
    pub position: f32,
}

impl Anchor {
    pub const fn new(colour: Colour, position: f32) -> Self {
        Anchor { colour, position }
    }
}

/// A lookup table of colours, plus the colour of points in the set.
#[derive(Clone, Debug, PartialEq)]
pub struct Palette {
    colours: Vec<Colour>,
    set_colour: Colour,
}

impl Palette {
    /// Builds a palette of `size` colours by interpolating linearly between
    /// `anchors`.
    ///
    /// Slot `i` sits at position `i / (size - 1)`. Slots before the first
    /// anchor take its colour, slots after the last take the last colour.
    /// Anchor positions must be in `[0, 1]` and non-decreasing.
    pub fn build(
        anchors: &[Anchor],
        size: usize,
        set_colour: Colour,
    ) -> Result<Self, RendererError> {
        validate(anchors, size)?;

        let mut colours = Vec::new();
        colours
            .try_reserve_exact(size)
            .map_err(|_| RendererError::Allocation { len: size })?;

        // Index of the anchor that starts the current segment, or `None`
        // while before the first anchor.
        let mut segment: Option<usize> = None;
        let last = anchors.len() - 1;

        for i in 0..size {
            let position = i as f32 / (size - 1) as f32;

            loop {
                let next = segment.map_or(0, |k| k + 1);
                if next <= last && position > anchors[next].position {
                    segment = Some(next);
                } else {
                    break;
                }
            }

            let colour = match segment {
                None => anchors[0].colour,
                Some(k) if k >= last => anchors[last].colour,
                Some(k) => {
                    let (start, end) = (anchors[k], anchors[k + 1]);
                    let weight = (position - start.position) / (end.position - start.position);
                    start.colour.lerp(end.colour, weight)
                }
            };
            colours.push(colour);
        }

        Ok(Palette {
            colours,
            set_colour,
        })
    }

    pub fn preset(preset: Preset, size: usize) -> Result<Self, RendererError> {
        Palette::build(preset.anchors(), size, config::DEFAULT_SET_COLOUR)
    }

    pub fn colours(&self) -> &[Colour] {
        &self.colours
    }

    pub fn set_colour(&self) -> Colour {
        self.set_colour
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }
}

fn validate(anchors: &[Anchor], size: usize) -> Result<(), RendererError> {
    if anchors.is_empty() {
        return Err(RendererError::invalid("palette needs at least one anchor"));
    }
    if size < 2 {
        return Err(RendererError::invalid(format!(
            "palette size must be at least 2, got {}",
            size
        )));
    }
    if let Some(anchor) = anchors
        .iter()
        .find(|anchor| !(0.0..=1.0).contains(&anchor.position))
    {
        return Err(RendererError::invalid(format!(
            "anchor position {} is outside [0, 1]",
            anchor.position
        )));
    }
    if anchors
        .windows(2)
        .any(|pair| pair[1].position < pair[0].position)
    {
        return Err(RendererError::invalid(
            "anchor positions must be non-decreasing",
        ));
    }
    Ok(())
}

/// Built-in anchor lists.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum Preset {
    #[default]
    Sunset,
    Grayscale,
    Fire,
}

const SUNSET: [Anchor; 3] = [
    Anchor::new(Colour::from_hex(0x320064), 0.0),
    Anchor::new(Colour::from_hex(0x0000FF), 0.3),
    Anchor::new(Colour::from_hex(0x00FFFF), 1.0),
];

const GRAYSCALE: [Anchor; 2] = [
    Anchor::new(Colour::BLACK, 0.0),
    Anchor::new(Colour::WHITE, 1.0),
];

const FIRE: [Anchor; 4] = [
    Anchor::new(Colour::from_hex(0x200000), 0.0),
    Anchor::new(Colour::from_hex(0xC00000), 0.35),
    Anchor::new(Colour::from_hex(0xFFA000), 0.7),
    Anchor::new(Colour::from_hex(0xFFFFC0), 1.0),
];

impl Preset {
    pub const ALL: [Preset; 3] = [Preset::Sunset, Preset::Grayscale, Preset::Fire];

    pub fn name(&self) -> &'static str {
        match self {
            Preset::Sunset => "sunset",
            Preset::Grayscale => "grayscale",
            Preset::Fire => "fire",
        }
    }

    pub fn anchors(&self) -> &'static [Anchor] {
        match self {
            Preset::Sunset => &SUNSET,
            Preset::Grayscale => &GRAYSCALE,
            Preset::Fire => &FIRE,
        }
    }
}

impl fmt::Display for Preset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Preset {
    type Err = RendererError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Preset::ALL
            .into_iter()
            .find(|preset| preset.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| RendererError::invalid(format!("unknown palette preset {:?}", s)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RED: Colour = Colour::rgb(255, 0, 0);
    const BLUE: Colour = Colour::rgb(0, 0, 255);

    fn red_to_blue() -> [Anchor; 2] {
        [Anchor::new(RED, 0.0), Anchor::new(BLUE, 1.0)]
    }

    #[test]
    fn two_anchor_palette_spans_endpoints() {
        let palette = Palette::build(&red_to_blue(), 4, Colour::BLACK).unwrap();
        assert_eq!(
            palette.colours(),
            &[
                RED,
                Colour::rgb(170, 0, 85),
                Colour::rgb(85, 0, 170),
                BLUE
            ]
        );
    }

    #[test]
    fn channels_interpolate_monotonically() {
        let palette = Palette::build(&red_to_blue(), 64, Colour::BLACK).unwrap();
        let colours = palette.colours();
        assert_eq!(colours[0], RED);
        assert_eq!(colours[63], BLUE);
        for pair in colours.windows(2) {
            assert!(pair[1].r <= pair[0].r);
            assert!(pair[1].b >= pair[0].b);
            assert_eq!(pair[1].g, 0);
            assert_eq!(pair[1].a, 255);
        }
    }

    #[test]
    fn slots_outside_anchors_take_end_colours() {
        let anchors = [Anchor::new(RED, 0.25), Anchor::new(BLUE, 0.75)];
        let palette = Palette::build(&anchors, 9, Colour::BLACK).unwrap();
        let colours = palette.colours();
        assert_eq!(&colours[..3], &[RED, RED, RED]);
        assert_eq!(colours[4], Colour::rgb(128, 0, 128));
        assert_eq!(&colours[6..], &[BLUE, BLUE, BLUE]);
    }

    #[test]
    fn single_anchor_fills_palette() {
        let palette = Palette::build(&[Anchor::new(RED, 0.5)], 5, Colour::WHITE).unwrap();
        assert!(palette.colours().iter().all(|&colour| colour == RED));
        assert_eq!(palette.set_colour(), Colour::WHITE);
    }

    #[test]
    fn coincident_anchors_make_a_hard_edge() {
        let anchors = [
            Anchor::new(RED, 0.0),
            Anchor::new(RED, 0.5),
            Anchor::new(BLUE, 0.5),
            Anchor::new(BLUE, 1.0),
        ];
        let palette = Palette::build(&anchors, 5, Colour::BLACK).unwrap();
        assert_eq!(palette.colours(), &[RED, RED, RED, BLUE, BLUE]);
    }

    #[test]
    fn dense_anchors_are_not_skipped() {
        // More anchors than slots: every slot still lands in its own segment.
        let anchors: Vec<Anchor> = (0..=10)
            .map(|i| {
                let colour = if i < 5 { RED } else { BLUE };
                Anchor::new(colour, i as f32 / 10.0)
            })
            .collect();
        let palette = Palette::build(&anchors, 3, Colour::BLACK).unwrap();
        assert_eq!(palette.colours()[0], RED);
        assert_eq!(palette.colours()[2], BLUE);
    }

    #[test]
    fn rejects_malformed_definitions() {
        assert!(Palette::build(&[], 8, Colour::BLACK).is_err());
        assert!(Palette::build(&red_to_blue(), 1, Colour::BLACK).is_err());
        assert!(Palette::build(&red_to_blue(), 0, Colour::BLACK).is_err());

        let decreasing = [Anchor::new(RED, 0.6), Anchor::new(BLUE, 0.4)];
        assert!(Palette::build(&decreasing, 8, Colour::BLACK).is_err());

        let outside = [Anchor::new(RED, -0.1), Anchor::new(BLUE, 1.0)];
        assert!(Palette::build(&outside, 8, Colour::BLACK).is_err());

        let nan = [Anchor::new(RED, f32::NAN)];
        assert!(Palette::build(&nan, 8, Colour::BLACK).is_err());
    }

    #[test]
    fn channel_orders_permute_bytes() {
        let colour = Colour {
            r: 1,
            g: 2,
            b: 3,
            a: 4,
        };
        assert_eq!(colour.to_bytes(ChannelOrder::Rgba), [1, 2, 3, 4]);
        assert_eq!(colour.to_bytes(ChannelOrder::Bgra), [3, 2, 1, 4]);
        assert_eq!(colour.to_bytes(ChannelOrder::Argb), [4, 1, 2, 3]);
        assert_eq!(colour.to_bytes(ChannelOrder::Abgr), [4, 3, 2, 1]);
    }

    #[test]
    fn parses_hex_colours_and_names() {
        assert_eq!("#320064".parse::<Colour>().unwrap(), Colour::rgb(0x32, 0, 0x64));
        assert_eq!("00ffff".parse::<Colour>().unwrap(), Colour::rgb(0, 255, 255));
        assert!("#fff".parse::<Colour>().is_err());
        assert_eq!("BGRA".parse::<ChannelOrder>().unwrap(), ChannelOrder::Bgra);
        assert_eq!("Fire".parse::<Preset>().unwrap(), Preset::Fire);
    }

    #[test]
    fn presets_build() {
        for preset in Preset::ALL {
            let palette = Palette::preset(preset, 32).unwrap();
            assert_eq!(palette.len(), 32);
            assert_eq!(palette.colours()[0], preset.anchors()[0].colour);
        }
    }
}
