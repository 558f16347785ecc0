//! Timing bar geometry and catch probability.
//!
//! Positions are in bar pixels, measured at the cursor's centre. The green
//! zone sits in the middle of the bar.

use rand::Rng;
use serde::Serialize;

use crate::storage::GameConfig;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingBar {
    pub width: u32,
    pub green_width: u32,
    pub cursor_width: u32,
    pub cursor_speed: u32,
    pub chance_green: f64,
    pub chance_green_edge: f64,
    pub chance_miss: f64,
}

impl TimingBar {
    pub fn from_config(game: &GameConfig) -> Self {
        Self {
            width: game.timing_bar_width,
            green_width: game.timing_green_width.min(game.timing_bar_width),
            cursor_width: game.timing_cursor_width.min(game.timing_bar_width),
            cursor_speed: game.timing_cursor_speed.max(1),
            chance_green: game.catch_chance_green,
            chance_green_edge: game.catch_chance_green_edge,
            chance_miss: game.catch_chance_miss,
        }
    }

    pub fn green_start(&self) -> f64 {
        f64::from(self.width - self.green_width) / 2.0
    }

    pub fn green_center(&self) -> f64 {
        f64::from(self.width) / 2.0
    }

    fn half_green(&self) -> f64 {
        f64::from(self.green_width) / 2.0
    }

    /// Strictly inside the green zone.
    pub fn in_green_zone(&self, position: f64) -> bool {
        (position - self.green_center()).abs() < self.half_green()
    }

    /// Catch probability for a cursor stopped at `position`.
    ///
    /// Inside the zone the chance falls linearly from the centre value to the
    /// edge value. Anywhere else it is the flat miss chance.
    pub fn catch_chance(&self, position: f64) -> f64 {
        if !self.in_green_zone(position) {
            return self.chance_miss;
        }
        let distance = (position - self.green_center()).abs();
        let proximity = 1.0 - distance / self.half_green();
        self.chance_green_edge + (self.chance_green - self.chance_green_edge) * proximity
    }

    /// Lowest and highest reachable cursor centre.
    pub fn cursor_range(&self) -> (f64, f64) {
        let half = f64::from(self.cursor_width) / 2.0;
        (half, f64::from(self.width) - half)
    }

    /// A stop position drawn uniformly over the cursor's travel.
    pub fn random_stop<R: Rng>(&self, rng: &mut R) -> f64 {
        let (low, high) = self.cursor_range();
        if high <= low {
            return low;
        }
        rng.gen_range(low..high)
    }
}

/// The cursor bouncing between the bar ends, one step per frame.
#[derive(Debug, Clone, PartialEq)]
pub struct TimingCursor {
    /// Left edge of the cursor.
    x: u32,
    forward: bool,
    max_x: u32,
    speed: u32,
    width: u32,
}

impl TimingCursor {
    pub fn new(bar: &TimingBar) -> Self {
        Self {
            x: 0,
            forward: true,
            max_x: bar.width - bar.cursor_width,
            speed: bar.cursor_speed,
            width: bar.cursor_width,
        }
    }

    pub fn step(&mut self) {
        if self.forward {
            self.x = (self.x + self.speed).min(self.max_x);
            if self.x == self.max_x {
                self.forward = false;
            }
        } else {
            self.x = self.x.saturating_sub(self.speed);
            if self.x == 0 {
                self.forward = true;
            }
        }
    }

    pub fn left(&self) -> u32 {
        self.x
    }

    pub fn center(&self) -> f64 {
        f64::from(self.x) + f64::from(self.width) / 2.0
    }
}

/// Shiny odds for an encounter earned by `focus_seconds` of focus.
///
/// Grows linearly from the base chance and is capped at the maximum.
pub fn shiny_chance(focus_seconds: u64, game: &GameConfig) -> f64 {
    let grown = game.shiny_base + (focus_seconds as f64 / 100.0) * game.shiny_max;
    grown.min(game.shiny_max)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bar() -> TimingBar {
        TimingBar::from_config(&GameConfig::default())
    }

    #[test]
    fn centre_gets_full_green_chance() {
        let bar = bar();
        assert_eq!(bar.green_center(), 160.0);
        assert!((bar.catch_chance(160.0) - 0.9).abs() < 1e-12);
    }

    #[test]
    fn chance_falls_toward_zone_edge() {
        let bar = bar();
        let mid = bar.catch_chance(180.0);
        assert!((mid - 0.8).abs() < 1e-12);
        let near_edge = bar.catch_chance(199.9);
        assert!(near_edge > 0.7 && near_edge < 0.701);
    }

    #[test]
    fn outside_zone_is_flat_miss() {
        let bar = bar();
        assert_eq!(bar.green_start(), 120.0);
        for position in [0.0, 119.0, 120.0, 200.0, 260.0, 320.0] {
            assert_eq!(bar.catch_chance(position), 0.3);
        }
    }

    #[test]
    fn cursor_bounces_between_ends() {
        let bar = bar();
        let mut cursor = TimingCursor::new(&bar);
        let max = bar.width - bar.cursor_width;
        let mut reached_end = false;
        for _ in 0..200 {
            cursor.step();
            assert!(cursor.left() <= max);
            if cursor.left() == max {
                reached_end = true;
            }
        }
        assert!(reached_end);
        for _ in 0..2000 {
            cursor.step();
            if cursor.left() == 0 {
                return;
            }
        }
        panic!("cursor never came back");
    }

    #[test]
    fn shiny_chance_is_capped() {
        let game = GameConfig::default();
        assert!((shiny_chance(0, &game) - 0.01).abs() < 1e-12);
        assert!((shiny_chance(50, &game) - 0.135).abs() < 1e-12);
        assert_eq!(shiny_chance(100, &game), 0.25);
        assert_eq!(shiny_chance(86_400, &game), 0.25);
    }
}
