//! Player movement and walk-cycle animation on a fixed timestep.
//!
//! The host calls [`MovementLoop::frame`] from its per-video-frame callback.
//! The loop converts wall-clock time into whole ticks (30 per second by
//! default) and runs one [`MovementLoop::tick`] per due tick. A tick reads a
//! single snapshot of the held keys, moves the player, clamps to the world,
//! and advances the walk cycle. A new [`PlayerState`] is reported only when
//! something observable changed.

use std::time::{Duration, Instant};

use glam::Vec2;
use serde::Deserialize;

use crate::direction::Direction;
use crate::input::{direction_held, HeldKeys};
use crate::time::FixedStepClock;

pub const WALK_CYCLE_FRAMES: u8 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct MovementConfig {
    /// Pixels moved per tick along each held axis.
    pub speed: f32,
    /// Inset from every world edge.
    pub padding: f32,
    pub sprite_width: f32,
    pub sprite_height: f32,
    /// Ticks between walk-cycle frame advances.
    pub ticks_per_frame: u32,
    pub tick_rate: u32,
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            speed: 7.0,
            padding: 20.0,
            sprite_width: 64.0,
            sprite_height: 64.0,
            ticks_per_frame: 6,
            tick_rate: FixedStepClock::DEFAULT_TICK_RATE,
        }
    }
}

/// World size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct WorldBounds {
    pub width: f32,
    pub height: f32,
}

impl WorldBounds {
    pub fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Allowed top-left range for a sprite on one axis. Collapses to the
    /// lower bound when the world is smaller than sprite plus padding.
    fn axis_range(extent: f32, sprite: f32, padding: f32) -> (f32, f32) {
        let min = padding;
        let max = (extent - sprite - padding).max(min);
        (min, max)
    }

    pub fn clamp(&self, position: Vec2, config: &MovementConfig) -> Vec2 {
        let (min_x, max_x) = Self::axis_range(self.width, config.sprite_width, config.padding);
        let (min_y, max_y) = Self::axis_range(self.height, config.sprite_height, config.padding);
        Vec2::new(position.x.clamp(min_x, max_x), position.y.clamp(min_y, max_y))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerState {
    pub position: Vec2,
    pub direction: Direction,
    pub animation: &'static str,
    pub frame: u8,
    pub moving: bool,
}

impl PlayerState {
    pub fn idle_at(position: Vec2, direction: Direction) -> Self {
        Self {
            position,
            direction,
            animation: direction.animation_name(),
            frame: 0,
            moving: false,
        }
    }
}

pub struct MovementLoop {
    config: MovementConfig,
    bounds: WorldBounds,
    held: HeldKeys,
    clock: FixedStepClock,
    state: PlayerState,
    frame_ticks: u32,
    enabled: bool,
    cancelled: bool,
}

impl MovementLoop {
    pub fn new(config: MovementConfig, bounds: WorldBounds, held: HeldKeys, spawn: Vec2) -> Self {
        let position = bounds.clamp(spawn, &config);
        Self {
            config,
            bounds,
            held,
            clock: FixedStepClock::new(config.tick_rate),
            state: PlayerState::idle_at(position, Direction::Down),
            frame_ticks: 0,
            enabled: true,
            cancelled: false,
        }
    }

    pub fn state(&self) -> &PlayerState {
        &self.state
    }

    /// Settings fixed at construction; the tick rate is baked into the clock.
    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    pub fn bounds(&self) -> WorldBounds {
        self.bounds
    }

    pub fn clock(&self) -> &FixedStepClock {
        &self.clock
    }

    /// While disabled the loop keeps consuming ticks but leaves the player
    /// untouched, so re-enabling resumes without a burst of catch-up ticks.
    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!("Movement loop {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn cancel(&mut self) {
        if !self.cancelled {
            log::info!(
                "Movement loop cancelled after {} ticks",
                self.clock.fixed_step_count
            );
        }
        self.cancelled = true;
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Per-video-frame entry point. Returns the last state emitted by the
    /// ticks that ran this frame.
    pub fn frame(&mut self, now: Instant) -> Option<PlayerState> {
        if self.cancelled {
            return None;
        }
        self.clock.begin_frame(now);
        self.run_due_ticks()
    }

    /// Like [`frame`](Self::frame) with an explicit elapsed time.
    pub fn advance(&mut self, elapsed: Duration) -> Option<PlayerState> {
        if self.cancelled {
            return None;
        }
        self.clock.advance(elapsed);
        self.run_due_ticks()
    }

    fn run_due_ticks(&mut self) -> Option<PlayerState> {
        let mut latest = None;
        while self.clock.should_step() {
            if let Some(state) = self.tick() {
                latest = Some(state);
            }
        }
        latest
    }

    /// One logical update. Returns the new state if anything observable
    /// changed.
    pub fn tick(&mut self) -> Option<PlayerState> {
        if self.cancelled || !self.enabled {
            return None;
        }

        let held = self.held.snapshot();
        let mut delta = Vec2::ZERO;
        let mut direction = self.state.direction;
        let mut moving = false;
        for candidate in Direction::APPLY_ORDER {
            if direction_held(&held, candidate) {
                let (dx, dy) = candidate.delta();
                delta += Vec2::new(dx, dy) * self.config.speed;
                direction = candidate;
                moving = true;
            }
        }

        let position = self.bounds.clamp(self.state.position + delta, &self.config);

        let mut frame = self.state.frame;
        if moving {
            self.frame_ticks += 1;
            if self.frame_ticks >= self.config.ticks_per_frame.max(1) {
                self.frame_ticks = 0;
                frame = (frame + 1) % WALK_CYCLE_FRAMES;
            }
        } else {
            self.frame_ticks = 0;
            frame = 0;
        }

        let next = PlayerState {
            position,
            direction,
            animation: direction.animation_name(),
            frame,
            moving,
        };
        if next == self.state {
            return None;
        }
        log::trace!(
            "Player at ({:.1}, {:.1}) facing {} frame {}",
            next.position.x,
            next.position.y,
            next.direction,
            next.frame
        );
        self.state = next.clone();
        Some(next)
    }
}
