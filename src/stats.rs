use std::time::{Duration, Instant};

use crate::config::STAT_FRAMES;

/// Frame timing for a render loop.
#[derive(Debug, Clone)]
pub struct FrameStats {
    begin: Instant,
    last_update: Instant,
    recent: [Duration; STAT_FRAMES],
    frames: usize,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(begin: Instant) -> Self {
        FrameStats {
            begin,
            last_update: begin,
            recent: [Duration::ZERO; STAT_FRAMES],
            frames: 0,
        }
    }

    /// Records a frame that finished at `now` and returns how long it took.
    pub fn record(&mut self, now: Instant) -> Duration {
        let frame_time = now.saturating_duration_since(self.last_update);
        self.recent[self.frames % STAT_FRAMES] = frame_time;
        self.last_update = now;
        self.frames += 1;
        frame_time
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn last(&self) -> Duration {
        match self.frames {
            0 => Duration::ZERO,
            n => self.recent[(n - 1) % STAT_FRAMES],
        }
    }

    /// Mean of the last few frame times.
    pub fn smoothed(&self) -> Duration {
        let frames = self.frames.min(STAT_FRAMES);
        if frames == 0 {
            return Duration::ZERO;
        }
        self.recent.iter().sum::<Duration>() / frames as u32
    }

    /// Mean frame time since the stats began.
    pub fn average(&self) -> Duration {
        if self.frames == 0 {
            return Duration::ZERO;
        }
        self.last_update.saturating_duration_since(self.begin) / self.frames as u32
    }
}

impl Default for FrameStats {
    fn default() -> Self {
        Self::new()
    }
}
