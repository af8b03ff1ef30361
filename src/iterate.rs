/*!
Escape-time iteration.

Every pixel of the screen corresponds to a point `c` of the complex plane. A
pixel is iterated by repeatedly applying `z ← zⁿ + c`, starting from `z = c`,
until `|z|² ≥ 4` (the pixel has *escaped*) or the iteration ceiling is reached.

Iteration is resumable. [`refine`] stores each pixel's final `z` and
iteration count in a [`PixelState`], and when the next call raises the ceiling
under the same parameters only the pixels that were stopped *by the ceiling*
are touched again, continuing from their stored `z`. Pixels that escaped
already have their final count. Resuming `k1` iterations with `k2` more is
bit-identical to a single run of `k1 + k2` iterations, because the same
sequence of floating point operations is applied to the same values.
*/

use crate::{
    params::{Function, RenderParams},
    pixel::{Complex, PixelState},
    screen,
};

/// `|z|²` at or beyond which a point has escaped.
pub const ESCAPE_RADIUS_SQR: f32 = 4.0;

/// One application of an escape map.
///
/// Takes the current `z` along with its precomputed squared components.
pub trait EscapeMap {
    fn step(zr: f32, zi: f32, zr_2: f32, zi_2: f32, c: Complex) -> Complex;
}

/// `z ← z² + c`
pub struct Quadratic;

/// `z ← z³ + c`
pub struct Cubic;

/// `z ← z⁴ + c`
pub struct Quartic;

impl EscapeMap for Quadratic {
    #[inline(always)]
    fn step(zr: f32, zi: f32, zr_2: f32, zi_2: f32, c: Complex) -> Complex {
        Complex {
            real: zr_2 - zi_2 + c.real,
            imaginary: 2.0 * zr * zi + c.imaginary,
        }
    }
}

impl EscapeMap for Cubic {
    #[inline(always)]
    fn step(zr: f32, zi: f32, zr_2: f32, zi_2: f32, c: Complex) -> Complex {
        Complex {
            real: zr * (zr_2 - 3.0 * zi_2) + c.real,
            imaginary: zi * (3.0 * zr_2 - zi_2) + c.imaginary,
        }
    }
}

impl EscapeMap for Quartic {
    #[inline(always)]
    fn step(zr: f32, zi: f32, zr_2: f32, zi_2: f32, c: Complex) -> Complex {
        Complex {
            real: zr_2 * zr_2 - 6.0 * zr_2 * zi_2 + zi_2 * zi_2 + c.real,
            imaginary: 4.0 * zr * zi * (zr_2 - zi_2) + c.imaginary,
        }
    }
}

/// Iterates a single point from `(z, iterations)` until it escapes or
/// `iterations == max_iterations`.
#[inline]
pub fn iterate_point<M: EscapeMap>(
    mut z: Complex,
    c: Complex,
    mut iterations: u16,
    max_iterations: u16,
) -> (Complex, u16) {
    let mut zr_2 = z.real * z.real;
    let mut zi_2 = z.imaginary * z.imaginary;

    while zr_2 + zi_2 < ESCAPE_RADIUS_SQR && iterations < max_iterations {
        z = M::step(z.real, z.imaginary, zr_2, zi_2, c);
        zr_2 = z.real * z.real;
        zi_2 = z.imaginary * z.imaginary;
        iterations += 1;
    }

    (z, iterations)
}

/// Maps screen pixels to points of the complex plane.
///
/// The imaginary axis points up the screen.
#[derive(Clone, Copy, Debug)]
pub struct PlaneMapping {
    half_width: f32,
    half_height: f32,
    zoom: f32,
    offset: Complex,
}

impl PlaneMapping {
    pub fn new(size: screen::Size, params: &RenderParams) -> Self {
        PlaneMapping {
            half_width: size.half_width() as f32,
            half_height: size.half_height() as f32,
            zoom: params.zoom,
            offset: params.offset,
        }
    }

    #[inline]
    pub fn point(&self, x: u32, y: u32) -> Complex {
        Complex {
            real: (x as f32 - self.half_width) / self.zoom + self.offset.real,
            imaginary: (self.half_height - y as f32) / self.zoom + self.offset.imaginary,
        }
    }
}

/// Brings every pixel of `state` up to `max_iterations`.
///
/// With `resume_from: Some(previous)`, `state` must hold the results of
/// iterating the same `params` up to `previous`; only pixels whose count is
/// exactly `previous` are continued. With `None` every pixel starts again from
/// `z = c`.
///
/// Returns the number of pixels that were iterated.
pub fn refine(
    size: screen::Size,
    params: &RenderParams,
    state: &mut PixelState,
    max_iterations: u16,
    resume_from: Option<u16>,
) -> usize {
    match params.function {
        Function::Mandelbrot2 => {
            refine_with::<Quadratic>(size, params, state, max_iterations, resume_from)
        }
        Function::Mandelbrot3 => {
            refine_with::<Cubic>(size, params, state, max_iterations, resume_from)
        }
        Function::Mandelbrot4 => {
            refine_with::<Quartic>(size, params, state, max_iterations, resume_from)
        }
    }
}

fn refine_with<M: EscapeMap>(
    size: screen::Size,
    params: &RenderParams,
    state: &mut PixelState,
    max_iterations: u16,
    resume_from: Option<u16>,
) -> usize {
    debug_assert_eq!(state.len(), size.pixel_count());

    let mapping = PlaneMapping::new(size, params);
    let width = size.width as usize;
    let mut iterated = 0;

    for (index, (count, last_value)) in state
        .iteration_counts
        .iter_mut()
        .zip(state.last_values.iter_mut())
        .enumerate()
    {
        // Pixels below the previous ceiling escaped already.
        if matches!(resume_from, Some(previous) if *count != previous) {
            continue;
        }

        let c = mapping.point((index % width) as u32, (index / width) as u32);
        let (z, iterations) = match resume_from {
            Some(_) => (*last_value, *count),
            None => (c, 0),
        };

        let (z, iterations) = iterate_point::<M>(z, c, iterations, max_iterations);
        *last_value = z;
        *count = iterations;
        iterated += 1;
    }

    iterated
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(function: Function, zoom: f32) -> RenderParams {
        RenderParams {
            function,
            offset: Complex::ZERO,
            zoom,
        }
    }

    #[test]
    fn origin_never_escapes() {
        for max in [1, 50, 1000] {
            let (z, iterations) = iterate_point::<Quadratic>(Complex::ZERO, Complex::ZERO, 0, max);
            assert_eq!(iterations, max);
            assert_eq!(z, Complex::ZERO);
        }
    }

    #[test]
    fn points_outside_radius_do_not_iterate() {
        let c = Complex::new(3.0, 0.0);
        let (z, iterations) = iterate_point::<Cubic>(c, c, 0, 100);
        assert_eq!(iterations, 0);
        assert_eq!(z, c);
    }

    #[test]
    fn quadratic_step_matches_hand_computation() {
        // c = -1 + i: z1 = -1 - i, z2 = -1 + 3i
        let c = Complex::new(-1.0, 1.0);
        let (z, iterations) = iterate_point::<Quadratic>(c, c, 0, 100);
        assert_eq!(iterations, 2);
        assert_eq!(z, Complex::new(-1.0, 3.0));
    }

    #[test]
    fn cubic_and_quartic_steps_match_complex_powers() {
        let z = Complex::new(0.5, -0.25);
        let c = Complex::new(0.1, 0.2);
        let (zr_2, zi_2) = (z.real * z.real, z.imaginary * z.imaginary);

        // (0.5 - 0.25i)³ = 0.03125 - 0.171875i
        let cubed = Cubic::step(z.real, z.imaginary, zr_2, zi_2, Complex::ZERO);
        assert!((cubed.real - 0.03125).abs() < 1e-6);
        assert!((cubed.imaginary + 0.171875).abs() < 1e-6);

        // (0.5 - 0.25i)⁴ = -0.02734375 - 0.09375i
        let fourth = Quartic::step(z.real, z.imaginary, zr_2, zi_2, c);
        assert!((fourth.real - (-0.02734375 + 0.1)).abs() < 1e-6);
        assert!((fourth.imaginary - (-0.09375 + 0.2)).abs() < 1e-6);
    }

    #[test]
    fn split_iteration_is_bit_identical() {
        let c = Complex::new(-0.7435, 0.1314);
        for (first, second) in [(10, 10), (1, 99), (37, 0), (250, 250)] {
            let (z_once, n_once) = iterate_point::<Quadratic>(c, c, 0, first + second);
            let (z_half, n_half) = iterate_point::<Quadratic>(c, c, 0, first);
            let (z_split, n_split) = iterate_point::<Quadratic>(z_half, c, n_half, first + second);
            assert_eq!(n_once, n_split);
            assert!(z_once.bitwise_eq(&z_split));
        }
    }

    #[test]
    fn plane_mapping_inverts_imaginary_axis() {
        let size = screen::Size::new(4, 4).unwrap();
        let mapping = PlaneMapping::new(size, &params(Function::Mandelbrot2, 2.0));
        assert_eq!(mapping.point(2, 2), Complex::ZERO);
        assert_eq!(mapping.point(0, 0), Complex::new(-1.0, 1.0));
        assert_eq!(mapping.point(3, 3), Complex::new(0.5, -0.5));
    }

    #[test]
    fn plane_mapping_applies_offset() {
        let size = screen::Size::new(10, 10).unwrap();
        let params = RenderParams {
            function: Function::Mandelbrot2,
            offset: Complex::new(-0.5, 0.25),
            zoom: 5.0,
        };
        let mapping = PlaneMapping::new(size, &params);
        assert_eq!(mapping.point(5, 5), Complex::new(-0.5, 0.25));
        assert_eq!(mapping.point(10, 5), Complex::new(0.5, 0.25));
    }

    #[test]
    fn refine_resumes_only_ceiling_pixels() {
        let size = screen::Size::new(8, 6).unwrap();
        let params = params(Function::Mandelbrot2, 3.0);
        let mut state = PixelState::allocate(size).unwrap();

        let all = refine(size, &params, &mut state, 20, None);
        assert_eq!(all, size.pixel_count());

        let unresolved = state
            .iteration_counts
            .iter()
            .filter(|&&count| count == 20)
            .count();
        let resumed = refine(size, &params, &mut state, 40, Some(20));
        assert_eq!(resumed, unresolved);
        assert!(resumed < size.pixel_count());
    }

    #[test]
    fn refine_matches_fresh_run_for_every_variant() {
        let size = screen::Size::new(16, 12).unwrap();
        for function in Function::ALL {
            let params = params(function, 5.0);

            let mut fresh = PixelState::allocate(size).unwrap();
            refine(size, &params, &mut fresh, 60, None);

            let mut stepped = PixelState::allocate(size).unwrap();
            refine(size, &params, &mut stepped, 25, None);
            refine(size, &params, &mut stepped, 60, Some(25));

            assert_eq!(fresh.iteration_counts, stepped.iteration_counts);
            for (a, b) in fresh.last_values.iter().zip(&stepped.last_values) {
                assert!(a.bitwise_eq(b), "{:?} != {:?} for {}", a, b, function);
            }
        }
    }
}
