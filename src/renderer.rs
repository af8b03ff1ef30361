/*!
The incremental rendering engine.

A [`Renderer`] owns the per-pixel escape state for one viewport and turns it
into frames. A typical interactive loop looks like

```no_run
# use mandelbrot_refine::{Mapping, Renderer};
# fn main() -> Result<(), mandelbrot_refine::RendererError> {
let renderer = Renderer::new(640, 480)?;
let mut frame = vec![0u8; 640 * 480 * 4];
loop {
    // Parameter changes from the UI thread land here at any time.
    let max_iterations = renderer.iterate(5)?;
    renderer.render(&mut frame, 640 * 4, Mapping::Histogram)?;
    # if max_iterations > 100 { break; }
}
# Ok(())
# }
```

While the parameters stay the same, every [`Renderer::iterate`] raises the
iteration ceiling and continues only the pixels that have not escaped yet, so
the image sharpens frame by frame at little cost. Any parameter change
invalidates the cache and the next `iterate` starts again from scratch.

Two locks split the state. The *params* lock guards the [`RenderParams`] and
the cache-valid flag and is only held for a few instructions, so setters called
from a UI thread never wait for a frame. The *buffers* lock guards the pixel
state, palette and colouring scratch space and is held for the whole of
`iterate`, `render`, `resize` and `free`. No code path holds both.
*/

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, trace};

use crate::{
    colour::{self, Histogram, Mapping, PaletteMapper},
    config,
    error::RendererError,
    iterate,
    palette::{Anchor, ChannelOrder, Colour, Palette, Preset},
    params::{self, Function, RenderParams},
    pixel::{Complex, PixelState},
    screen,
};

#[derive(Debug)]
struct ParamsState {
    params: RenderParams,
    cache_valid: bool,
}

#[derive(Debug)]
struct Buffers {
    size: screen::Size,
    /// `None` after a failed resize, until the next successful one.
    pixels: Option<PixelState>,
    /// Ceiling the pixel state was last iterated to; 0 if never.
    max_iterations: u16,
    /// Parameters the pixel state was last iterated with.
    iterated_params: Option<RenderParams>,
    palette: Palette,
    mapper: PaletteMapper,
    channel_order: ChannelOrder,
    /// Advances once per rendered frame, for [`Mapping::RepeatCycle`].
    frame: u32,
}

impl Buffers {
    fn iterated_pixels(&self) -> Result<&PixelState, RendererError> {
        iterated(&self.pixels, self.size, self.max_iterations)
    }
}

/// The pixel state, if it has been allocated and iterated.
fn iterated(
    pixels: &Option<PixelState>,
    size: screen::Size,
    max_iterations: u16,
) -> Result<&PixelState, RendererError> {
    let pixels = pixels.as_ref().ok_or(RendererError::Allocation {
        len: size.pixel_count(),
    })?;
    if max_iterations == 0 {
        return Err(RendererError::NotYetIterated);
    }
    Ok(pixels)
}

/// Incremental escape-time renderer for one viewport.
///
/// All methods take `&self`; share a renderer between threads with an `Arc`.
#[derive(Debug)]
pub struct Renderer {
    params: Mutex<ParamsState>,
    /// `None` once freed.
    buffers: Mutex<Option<Buffers>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Renderer {
    /// Allocates a renderer for a `width` x `height` viewport, showing the
    /// degree 2 set centred on the origin with the `sunset` palette.
    pub fn new(width: u32, height: u32) -> Result<Self, RendererError> {
        let size = screen::Size::new(width, height)?;
        let pixels = PixelState::allocate(size)?;
        let palette = Palette::preset(Preset::default(), config::DEFAULT_PALETTE_SIZE)?;

        debug!("created renderer for {}x{}", width, height);

        Ok(Renderer {
            params: Mutex::new(ParamsState {
                params: RenderParams::default_for(size),
                cache_valid: false,
            }),
            buffers: Mutex::new(Some(Buffers {
                size,
                pixels: Some(pixels),
                max_iterations: 0,
                iterated_params: None,
                palette,
                mapper: PaletteMapper::new(),
                channel_order: ChannelOrder::default(),
                frame: 0,
            })),
        })
    }

    fn with_buffers<A>(
        &self,
        function: impl FnOnce(&mut Buffers) -> Result<A, RendererError>,
    ) -> Result<A, RendererError> {
        let mut buffers = lock(&self.buffers);
        match buffers.as_mut() {
            Some(buffers) => function(buffers),
            None => Err(RendererError::Freed),
        }
    }

    /// Changes the parameters and invalidates the cache.
    fn update_params(
        &self,
        function: impl FnOnce(&RenderParams) -> Result<RenderParams, RendererError>,
    ) -> Result<(), RendererError> {
        let mut state = lock(&self.params);
        let params = function(&state.params)?;
        state.params = params;
        state.cache_valid = false;
        Ok(())
    }

    /// Reallocates the pixel state for a new viewport.
    ///
    /// Previous results are discarded: `render` fails with
    /// [`RendererError::NotYetIterated`] and the next `iterate` starts from
    /// scratch. If allocation fails the renderer stays unusable until a resize
    /// succeeds.
    pub fn resize(&self, width: u32, height: u32) -> Result<(), RendererError> {
        let size = screen::Size::new(width, height)?;
        self.with_buffers(|buffers| {
            debug!("resizing from {:?} to {:?}", buffers.size, size);

            buffers.pixels = None;
            buffers.max_iterations = 0;
            buffers.iterated_params = None;
            buffers.size = size;
            buffers.pixels = Some(PixelState::allocate(size)?);
            Ok(())
        })?;
        lock(&self.params).cache_valid = false;
        Ok(())
    }

    pub fn set_function(&self, function: Function) {
        let mut state = lock(&self.params);
        state.params.function = function;
        state.cache_valid = false;
    }

    pub fn set_offset(&self, offset: Complex) -> Result<(), RendererError> {
        let offset = params::validate_offset(offset)?;
        self.update_params(|params| Ok(RenderParams { offset, ..*params }))
    }

    pub fn set_zoom(&self, zoom: f32) -> Result<(), RendererError> {
        let zoom = params::validate_zoom(zoom)?;
        self.update_params(|params| Ok(RenderParams { zoom, ..*params }))
    }

    /// Moves the view by a distance in screen pixels, positive `dy` being down
    /// the screen.
    pub fn pan(&self, dx: f32, dy: f32) -> Result<(), RendererError> {
        self.update_params(|params| {
            let offset = Complex {
                real: params.offset.real + dx / params.zoom,
                imaginary: params.offset.imaginary - dy / params.zoom,
            };
            Ok(RenderParams {
                offset: params::validate_offset(offset)?,
                ..*params
            })
        })
    }

    /// Multiplies the zoom by `factor`.
    pub fn scale_zoom(&self, factor: f32) -> Result<(), RendererError> {
        let factor = params::validate_zoom(factor)?;
        self.update_params(|params| {
            Ok(RenderParams {
                zoom: params::validate_zoom(params.zoom * factor)?,
                ..*params
            })
        })
    }

    /// Centres the view on the origin at the default zoom, keeping the
    /// function.
    pub fn reset_view(&self) -> Result<(), RendererError> {
        let size = self.size()?;
        self.update_params(|params| {
            Ok(RenderParams {
                offset: Complex::ZERO,
                zoom: params::default_zoom(size),
                ..*params
            })
        })
    }

    /// Replaces the palette with one built from `anchors`.
    pub fn set_palette(
        &self,
        anchors: &[Anchor],
        size: usize,
        set_colour: Colour,
    ) -> Result<(), RendererError> {
        let palette = Palette::build(anchors, size, set_colour)?;
        self.with_buffers(|buffers| {
            debug!("replacing palette of {} with {}", buffers.palette.len(), size);
            buffers.palette = palette;
            Ok(())
        })
    }

    pub fn set_channel_order(&self, order: ChannelOrder) -> Result<(), RendererError> {
        self.with_buffers(|buffers| {
            buffers.channel_order = order;
            Ok(())
        })
    }

    /// Raises the iteration ceiling by `additional` and returns the new
    /// ceiling.
    ///
    /// If the parameters have not changed since the last call, only pixels
    /// that reached the old ceiling are iterated further. Otherwise every pixel
    /// is iterated from scratch and the ceiling becomes `additional`.
    ///
    /// Fails with [`RendererError::IterationCeilingReached`] when the new
    /// ceiling would not fit in an iteration count, leaving the previous
    /// results in place.
    pub fn iterate(&self, additional: u32) -> Result<u16, RendererError> {
        if additional == 0 {
            return Err(RendererError::invalid("must iterate at least once"));
        }

        // Claim the current parameters: a change after this point invalidates
        // the cache again for the next call.
        let (params, cache_valid) = {
            let mut state = lock(&self.params);
            let snapshot = (state.params, state.cache_valid);
            state.cache_valid = true;
            snapshot
        };

        // Whether the buffers hold results for `params`, even if this call
        // fails.
        let mut reused = false;
        let result = self.with_buffers(|buffers| {
            let use_cache = cache_valid
                && buffers.max_iterations > 0
                && buffers.iterated_params == Some(params);
            reused = use_cache;

            let requested = if use_cache {
                (buffers.max_iterations as u32).saturating_add(additional)
            } else {
                additional
            };
            if requested > config::ITERATION_CEILING as u32 {
                return Err(RendererError::IterationCeilingReached {
                    requested,
                    ceiling: config::ITERATION_CEILING,
                });
            }
            let max_iterations = requested as u16;

            let size = buffers.size;
            let resume_from = use_cache.then_some(buffers.max_iterations);
            let pixels = buffers.pixels.as_mut().ok_or(RendererError::Allocation {
                len: size.pixel_count(),
            })?;

            trace!("begin iterate to {} (resume: {:?})", max_iterations, resume_from);
            let iterated = iterate::refine(size, &params, pixels, max_iterations, resume_from);
            trace!("end iterate, {} of {} pixels", iterated, pixels.len());

            buffers.max_iterations = max_iterations;
            buffers.iterated_params = Some(params);
            Ok(max_iterations)
        });

        if result.is_err() && !reused {
            lock(&self.params).cache_valid = false;
        }
        result
    }

    /// Colours the last iterated frame into `pixels`, 4 bytes per pixel in
    /// the renderer's [`ChannelOrder`], `stride` bytes per row.
    ///
    /// On failure `pixels` is not written to.
    pub fn render(
        &self,
        pixels: &mut [u8],
        stride: usize,
        mapping: Mapping,
    ) -> Result<(), RendererError> {
        self.with_buffers(|buffers| {
            let state = iterated(&buffers.pixels, buffers.size, buffers.max_iterations)?;
            colour::check_target(buffers.size, pixels.len(), stride)?;

            buffers.mapper.render(
                buffers.size,
                &state.iteration_counts,
                buffers.max_iterations,
                &buffers.palette,
                buffers.channel_order,
                mapping,
                buffers.frame,
                pixels,
                stride,
            );
            buffers.frame = buffers.frame.wrapping_add(1);
            Ok(())
        })
    }

    /// Releases all buffers. Every later `iterate`, `render`, `resize` or
    /// palette change fails with [`RendererError::Freed`]. Freeing twice is
    /// harmless.
    pub fn free(&self) {
        if lock(&self.buffers).take().is_some() {
            debug!("freed renderer");
        }
    }

    pub fn is_freed(&self) -> bool {
        lock(&self.buffers).is_none()
    }

    pub fn size(&self) -> Result<screen::Size, RendererError> {
        self.with_buffers(|buffers| Ok(buffers.size))
    }

    pub fn params(&self) -> RenderParams {
        lock(&self.params).params
    }

    /// Whether the pixel state holds results for the current parameters, so
    /// the next `iterate` continues from it.
    pub fn is_cache_valid(&self) -> bool {
        lock(&self.params).cache_valid
    }

    /// Current iteration ceiling; 0 before the first `iterate`.
    pub fn max_iterations(&self) -> Result<u16, RendererError> {
        self.with_buffers(|buffers| Ok(buffers.max_iterations))
    }

    /// Counts of the last iterated frame.
    pub fn histogram(&self) -> Result<Histogram, RendererError> {
        self.with_buffers(|buffers| {
            let state = buffers.iterated_pixels()?;
            Ok(Histogram::from_counts(
                &state.iteration_counts,
                buffers.max_iterations,
            ))
        })
    }

    /// Copy of the per-pixel iteration counts of the last iterated frame.
    pub fn iteration_counts(&self) -> Result<Vec<u16>, RendererError> {
        self.with_buffers(|buffers| Ok(buffers.iterated_pixels()?.iteration_counts.clone()))
    }
}
