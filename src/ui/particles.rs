use crate::theme::tint;
use eframe::egui::{self, pos2, Color32, Rect};
use rand::Rng;

pub const PARTICLE_COUNT: usize = 20;

/// One floating dot. `left` is a fraction of the field width.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Particle {
    pub size: f32,
    pub left: f32,
    pub delay: f32,
    pub duration: f32,
}

impl Particle {
    pub fn random(rng: &mut impl Rng) -> Self {
        Self {
            size: rng.gen_range(2.0..=6.0),
            left: rng.gen_range(0.0..=1.0),
            delay: rng.gen_range(0.0..=20.0),
            duration: rng.gen_range(20.0..=40.0),
        }
    }

    /// Fraction of the current rise completed, or `None` before the first one starts.
    pub fn progress(&self, elapsed: f32) -> Option<f32> {
        if elapsed < self.delay {
            return None;
        }
        Some(((elapsed - self.delay) / self.duration).fract())
    }
}

#[derive(Debug, Clone)]
pub struct ParticleField {
    particles: Vec<Particle>,
    started_at: f64,
}

impl ParticleField {
    pub fn spawn(count: usize, rng: &mut impl Rng, now: f64) -> Self {
        Self {
            particles: (0..count).map(|_| Particle::random(rng)).collect(),
            started_at: now,
        }
    }

    #[cfg(test)]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn paint(&self, painter: &egui::Painter, rect: Rect, now: f64, color: Color32) {
        let elapsed = (now - self.started_at).max(0.0) as f32;
        for particle in &self.particles {
            let Some(progress) = particle.progress(elapsed) else {
                continue;
            };
            // Rise from below the bottom edge to above the top, fading at both ends.
            let travel = rect.height() + particle.size * 2.0;
            let y = rect.bottom() + particle.size - travel * progress;
            let x = rect.left() + rect.width() * particle.left;
            let fade = (progress.min(1.0 - progress) * 10.0).min(1.0);
            let alpha = (fade * 110.0) as u8;
            painter.circle_filled(pos2(x, y), particle.size / 2.0, tint(color, alpha));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn spawned_particles_stay_within_their_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        let field = ParticleField::spawn(PARTICLE_COUNT, &mut rng, 0.0);
        assert_eq!(field.particles().len(), 20);
        for particle in field.particles() {
            assert!((2.0..=6.0).contains(&particle.size));
            assert!((0.0..=1.0).contains(&particle.left));
            assert!((0.0..=20.0).contains(&particle.delay));
            assert!((20.0..=40.0).contains(&particle.duration));
        }
    }

    #[test]
    fn same_seed_spawns_the_same_field() {
        let first = ParticleField::spawn(5, &mut StdRng::seed_from_u64(42), 0.0);
        let second = ParticleField::spawn(5, &mut StdRng::seed_from_u64(42), 10.0);
        assert_eq!(first.particles(), second.particles());
    }

    #[test]
    fn progress_waits_for_the_delay_then_cycles() {
        let particle = Particle {
            size: 4.0,
            left: 0.5,
            delay: 5.0,
            duration: 20.0,
        };
        assert_eq!(particle.progress(4.9), None);
        assert_eq!(particle.progress(5.0), Some(0.0));
        assert_eq!(particle.progress(15.0), Some(0.5));
        assert_eq!(particle.progress(35.0), Some(0.5));
    }
}
