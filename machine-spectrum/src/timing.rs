//! Emulation pacing: wall-clock frame synchronisation and scanline-level
//! frame timing.

use std::thread;
use std::time::{Duration, Instant};

/// Manages emulation speed to match the target hardware.
pub struct TimingController {
    target_hz: f64,
    cycles_per_frame: u64,

    // Timing state
    frame_cycles: u64,
    frame_start: Instant,
    target_frame_time: Duration,

    // Statistics
    actual_hz: f64,
    frame_count: u64,
    total_cycles: u64,
    start_time: Instant,

    // Speed control
    speed_multiplier: f64,
    unlimited: bool,
}

impl TimingController {
    #[must_use]
    pub fn new(cpu_hz: f64, frame_rate: f64) -> Self {
        let now = Instant::now();
        Self {
            target_hz: cpu_hz,
            cycles_per_frame: (cpu_hz / frame_rate) as u64,
            frame_cycles: 0,
            frame_start: now,
            target_frame_time: Duration::from_secs_f64(1.0 / frame_rate),
            actual_hz: 0.0,
            frame_count: 0,
            total_cycles: 0,
            start_time: now,
            speed_multiplier: 1.0,
            unlimited: false,
        }
    }

    /// Timing for a ZX Spectrum: 3.5 MHz CPU, 50 Hz PAL frames.
    #[must_use]
    pub fn spectrum() -> Self {
        Self::new(3_500_000.0, 50.0)
    }

    /// Account executed cycles. Returns true on a frame-cycle boundary.
    pub fn add_cycles(&mut self, cycles: u32) -> bool {
        self.frame_cycles += u64::from(cycles);
        self.total_cycles += u64::from(cycles);

        if self.frame_cycles >= self.cycles_per_frame {
            self.frame_cycles -= self.cycles_per_frame;
            true
        } else {
            false
        }
    }

    /// Sleep until the frame's wall-clock deadline to hold the target speed.
    pub fn sync_frame(&mut self) {
        self.frame_count += 1;

        if self.unlimited {
            self.frame_start = Instant::now();
            return;
        }

        let adjusted = Duration::from_secs_f64(
            self.target_frame_time.as_secs_f64() / self.speed_multiplier,
        );
        let deadline = self.frame_start + adjusted;

        let now = Instant::now();
        if now < deadline {
            thread::sleep(deadline - now);
        }

        let elapsed = now.duration_since(self.start_time);
        if elapsed > Duration::from_secs(1) {
            self.actual_hz = self.total_cycles as f64 / elapsed.as_secs_f64();
        }

        self.frame_start = Instant::now();
    }

    /// Set the emulation speed (1.0 = real time).
    pub fn set_speed_multiplier(&mut self, speed: f64) {
        self.speed_multiplier = speed;
    }

    /// Run as fast as the host allows.
    pub fn set_unlimited(&mut self, unlimited: bool) {
        self.unlimited = unlimited;
    }

    #[must_use]
    pub fn stats(&self) -> TimingStats {
        let elapsed = self.start_time.elapsed().as_secs_f64();
        TimingStats {
            target_hz: self.target_hz,
            actual_hz: self.actual_hz,
            frame_count: self.frame_count,
            total_cycles: self.total_cycles,
            uptime: elapsed,
            frame_rate: self.frame_count as f64 / elapsed,
        }
    }
}

/// Emulation timing statistics.
#[derive(Debug, Clone, Copy)]
pub struct TimingStats {
    pub target_hz: f64,
    pub actual_hz: f64,
    pub frame_count: u64,
    pub total_cycles: u64,
    pub uptime: f64,
    pub frame_rate: f64,
}

/// Scanline-level timing for video emulation.
pub struct FrameTimer {
    cycles_per_line: u32,
    lines_per_frame: u32,
    current_line: u32,
    line_cycles: u32,
}

impl FrameTimer {
    /// Frame geometry for a ZX Spectrum: 224 T-states per scanline, 312
    /// lines per frame (192 visible plus border and retrace).
    #[must_use]
    pub fn spectrum() -> Self {
        Self {
            cycles_per_line: 224,
            lines_per_frame: 312,
            current_line: 0,
            line_cycles: 0,
        }
    }

    /// Account executed cycles and report any frame events crossed.
    pub fn add_cycles(&mut self, cycles: u32) -> FrameEvent {
        self.line_cycles += cycles;
        let mut event = FrameEvent::default();

        while self.line_cycles >= self.cycles_per_line {
            self.line_cycles -= self.cycles_per_line;
            self.current_line += 1;

            if self.current_line >= self.lines_per_frame {
                self.current_line = 0;
                event.frame_complete = true;
            }

            if self.current_line < 192 {
                event.visible_line = true;
                event.line_number = self.current_line;
            } else if self.current_line == 192 {
                event.vblank_start = true;
            }
        }

        event
    }

    /// Current beam position (line, approximate column).
    #[must_use]
    pub fn beam_position(&self) -> (u32, u32) {
        let column = self.line_cycles * 256 / self.cycles_per_line;
        (self.current_line, column)
    }
}

/// Video timing events produced while accounting cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameEvent {
    pub frame_complete: bool,
    pub vblank_start: bool,
    pub visible_line: bool,
    pub line_number: u32,
}
