//! Defaults, and the command line of the driver binary.

use clap::Parser;

use crate::{
    colour::Mapping,
    palette::{ChannelOrder, Colour, Preset},
    params::Function,
    pixel::Complex,
};

/// Entries in a palette built from a preset.
pub const DEFAULT_PALETTE_SIZE: usize = 128;

/// Colour of points that have not escaped.
pub const DEFAULT_SET_COLOUR: Colour = Colour::BLACK;

/// Iterations added to each frame of an interactive session.
pub const DEFAULT_ITERATIONS_PER_FRAME: u16 = 5;

/// Iteration counts are stored as `u16`, so no pixel can be iterated further.
pub const ITERATION_CEILING: u16 = u16::MAX;

/// Fraction of escaped pixels with the highest counts that
/// [`Mapping::ScaleAuto`] leaves out of its range.
pub const AUTO_SCALE_OUTLIER_FRACTION: f64 = 0.005;

/// Frames averaged by [`crate::stats::FrameStats::smoothed`].
pub const STAT_FRAMES: usize = 10;

/// Runs an incremental render session without a display and logs how each
/// frame refines.
#[derive(Parser, Debug, Clone)]
#[command(version)]
pub struct Config {
    /// Viewport width in pixels
    #[arg(long, default_value_t = 640)]
    pub width: u32,
    /// Viewport height in pixels
    #[arg(long, default_value_t = 480)]
    pub height: u32,
    /// Escape map
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = Function::Mandelbrot2)]
    pub function: Function,
    /// Plane coordinate of the screen centre, as re,im
    #[arg(long, default_value_t = Complex::ZERO, allow_hyphen_values = true)]
    pub offset: Complex,
    /// Pixels per unit of plane distance [default: width / 2]
    #[arg(short, long)]
    pub zoom: Option<f32>,
    /// Multiplies the zoom after every frame, simulating a pinch gesture
    #[arg(long)]
    pub zoom_factor: Option<f32>,
    /// Iterations added per frame
    #[arg(short, long, default_value_t = DEFAULT_ITERATIONS_PER_FRAME)]
    pub iterations: u16,
    /// Frames to render
    #[arg(long, default_value_t = 20)]
    pub frames: u32,
    /// Palette mapping
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = Mapping::Repeat)]
    pub mapping: Mapping,
    /// Palette preset
    #[arg(short, long, value_enum, ignore_case = true, default_value_t = Preset::Sunset)]
    pub palette: Preset,
    /// Entries in the palette
    #[arg(long, default_value_t = DEFAULT_PALETTE_SIZE)]
    pub palette_size: usize,
    /// Colour of points in the set, as RRGGBB
    #[arg(long, default_value = "000000")]
    pub set_colour: Colour,
    /// Byte order of output pixels
    #[arg(long, value_enum, ignore_case = true, default_value_t = ChannelOrder::Rgba)]
    pub channel_order: ChannelOrder,
}

#[cfg(test)]
mod tests {
    use clap::ValueEnum;

    use super::*;

    #[test]
    fn defaults_parse() {
        let config = Config::try_parse_from(["mandelbrot-refine"]).unwrap();
        assert_eq!(config.width, 640);
        assert_eq!(config.function, Function::Mandelbrot2);
        assert_eq!(config.offset, Complex::ZERO);
        assert_eq!(config.zoom, None);
        assert_eq!(config.mapping, Mapping::Repeat);
        assert_eq!(config.palette, Preset::Sunset);
        assert_eq!(config.set_colour, Colour::BLACK);
    }

    #[test]
    fn parses_every_option() {
        let config = Config::try_parse_from([
            "mandelbrot-refine",
            "--width",
            "320",
            "--height",
            "200",
            "--function",
            "mandelbrot3",
            "--offset",
            "-0.75,0.1",
            "--zoom",
            "400",
            "--zoom-factor",
            "1.1",
            "--iterations",
            "20",
            "--mapping",
            "histogram",
            "--palette",
            "fire",
            "--palette-size",
            "64",
            "--set-colour",
            "#102030",
            "--channel-order",
            "bgra",
        ])
        .unwrap();
        assert_eq!(config.function, Function::Mandelbrot3);
        assert_eq!(config.offset, Complex::new(-0.75, 0.1));
        assert_eq!(config.zoom, Some(400.0));
        assert_eq!(config.zoom_factor, Some(1.1));
        assert_eq!(config.iterations, 20);
        assert_eq!(config.mapping, Mapping::Histogram);
        assert_eq!(config.palette, Preset::Fire);
        assert_eq!(config.palette_size, 64);
        assert_eq!(config.set_colour, Colour::rgb(0x10, 0x20, 0x30));
        assert_eq!(config.channel_order, ChannelOrder::Bgra);
    }

    #[test]
    fn enum_options_ignore_case_and_accept_aliases() {
        let config = Config::try_parse_from([
            "mandelbrot-refine",
            "--function",
            "Mandelbrot2",
            "--mapping",
            "Scale-Local",
            "--palette",
            "GRAYSCALE",
            "--channel-order",
            "ABGR",
        ])
        .unwrap();
        assert_eq!(config.function, Function::Mandelbrot2);
        assert_eq!(config.mapping, Mapping::ScaleAuto);
        assert_eq!(config.palette, Preset::Grayscale);
        assert_eq!(config.channel_order, ChannelOrder::Abgr);

        let config = Config::try_parse_from(["mandelbrot-refine", "-f", "4"]).unwrap();
        assert_eq!(config.function, Function::Mandelbrot4);
    }

    #[test]
    fn option_names_match_library_names() {
        for function in Function::ALL {
            let value = function.to_possible_value().unwrap();
            assert_eq!(value.get_name(), function.name());
            assert_eq!(value.get_name().parse::<Function>().unwrap(), function);
        }
        for mapping in Mapping::ALL {
            let value = mapping.to_possible_value().unwrap();
            assert_eq!(value.get_name(), mapping.name());
            assert_eq!(value.get_name().parse::<Mapping>().unwrap(), mapping);
        }
        for order in ChannelOrder::ALL {
            assert_eq!(order.to_possible_value().unwrap().get_name(), order.name());
        }
        for preset in Preset::ALL {
            assert_eq!(preset.to_possible_value().unwrap().get_name(), preset.name());
        }
    }

    #[test]
    fn rejects_unknown_function() {
        assert!(Config::try_parse_from(["mandelbrot-refine", "--function", "julia"]).is_err());
    }
}
