// MIT License - Copyright (c) 2026 Peter Wright
// ESP32 LED link

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::constants::MUSIC_INTENSITY_MAX;
use crate::protocol::Command;

/// Something that produces beat intensities (0-100) for the music stream.
pub trait BeatSource: Send + 'static {
    fn next_intensity(&mut self) -> u8;
}

impl<F> BeatSource for F
where
    F: FnMut() -> u8 + Send + 'static,
{
    fn next_intensity(&mut self) -> u8 {
        self()
    }
}

/// Uniformly random beats in `0..100`. Stands in for real audio analysis.
pub struct RandomBeats {
    rng: StdRng,
}

impl RandomBeats {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic sequence, for tests and demos.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for RandomBeats {
    fn default() -> Self {
        Self::new()
    }
}

impl BeatSource for RandomBeats {
    fn next_intensity(&mut self) -> u8 {
        self.rng.gen_range(0..MUSIC_INTENSITY_MAX as u8)
    }
}

/// The command for one sample, saturating at the top of the range.
pub fn beat_command(intensity: u8) -> Command {
    Command::MusicSample(intensity.min(MUSIC_INTENSITY_MAX as u8))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_beats_in_range() {
        let mut beats = RandomBeats::seeded(7);
        for _ in 0..1000 {
            assert!(beats.next_intensity() < 100);
        }
    }

    #[test]
    fn test_seeded_is_repeatable() {
        let mut a = RandomBeats::seeded(42);
        let mut b = RandomBeats::seeded(42);
        let xs: Vec<u8> = (0..16).map(|_| a.next_intensity()).collect();
        let ys: Vec<u8> = (0..16).map(|_| b.next_intensity()).collect();
        assert_eq!(xs, ys);
    }

    #[test]
    fn test_closure_source() {
        let mut n = 0u8;
        let mut source = move || {
            n += 10;
            n
        };
        assert_eq!(source.next_intensity(), 10);
        assert_eq!(source.next_intensity(), 20);
    }

    #[test]
    fn test_beat_command_saturates() {
        assert_eq!(beat_command(55), Command::MusicSample(55));
        assert_eq!(beat_command(250), Command::MusicSample(100));
    }
}
