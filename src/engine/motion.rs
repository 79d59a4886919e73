use crate::config::Direction;

/// Pan velocity in pixels per second for `direction` at engine time `t`.
pub fn velocity(direction: Direction, speed: f64, t: f64) -> (f64, f64) {
    match direction {
        Direction::Static => (0.0, 0.0),
        Direction::Left => (-speed, 0.0),
        Direction::Right => (speed, 0.0),
        Direction::Up => (0.0, -speed),
        Direction::Down => (0.0, speed),
        Direction::OscillateHorizontal => (speed * t.sin(), 0.0),
        Direction::OscillateVertical => (0.0, speed * t.cos()),
        Direction::Orbit => (speed * t.cos(), speed * t.sin()),
    }
}

/// Unit axis a slide transition travels along; content moves toward `-axis`.
pub fn slide_axis(direction: Direction) -> (f64, f64) {
    match direction {
        Direction::Right => (-1.0, 0.0),
        Direction::Up => (0.0, 1.0),
        Direction::Down => (0.0, -1.0),
        _ => (1.0, 0.0),
    }
}

/// Unbounded virtual pan position. Wrapping into legal offsets happens at draw time.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PanState {
    x: f64,
    y: f64,
}

impl PanState {
    pub fn integrate(&mut self, dt: f64, direction: Direction, speed: f64, t: f64) {
        let (vx, vy) = velocity(direction, speed, t);
        self.x += vx * dt;
        self.y += vy * dt;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn position(&self) -> (f64, f64) {
        (self.x, self.y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::layout::wrap_offset;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn cardinal_velocities() {
        assert_eq!(velocity(Direction::Static, 10.0, 3.0), (0.0, 0.0));
        assert_eq!(velocity(Direction::Left, 10.0, 3.0), (-10.0, 0.0));
        assert_eq!(velocity(Direction::Down, 10.0, 3.0), (0.0, 10.0));
    }

    #[test]
    fn periodic_velocities_follow_sin_and_cos() {
        let (vx, vy) = velocity(Direction::Orbit, 2.0, FRAC_PI_2);
        assert!(vx.abs() < 1e-12 && (vy - 2.0).abs() < 1e-12);
        let (vx, _) = velocity(Direction::OscillateHorizontal, 2.0, FRAC_PI_2);
        assert!((vx - 2.0).abs() < 1e-12);
        let (_, vy) = velocity(Direction::OscillateVertical, 2.0, 0.0);
        assert!((vy - 2.0).abs() < 1e-12);
    }

    #[test]
    fn position_is_never_clamped() {
        let mut pan = PanState::default();
        for _ in 0..10_000 {
            pan.integrate(0.05, Direction::Right, 100.0, 0.0);
        }
        assert!((pan.position().0 - 50_000.0).abs() < 1e-6);
        pan.reset();
        assert_eq!(pan.position(), (0.0, 0.0));
    }

    #[test]
    fn wrapped_offset_never_sticks_at_a_boundary() {
        for speed in [1.0, 37.5, 250.0, 3999.0] {
            let mut pan = PanState::default();
            let max = 40.0;
            let mut previous: Option<f64> = None;
            for frame in 0..20_000 {
                pan.integrate(1.0 / 60.0, Direction::Left, speed, f64::from(frame) / 60.0);
                let offset = wrap_offset(pan.position().0, max);
                assert!((-max..max).contains(&offset));
                let pinned = offset <= -max + 1e-9 || offset >= max - 1e-9;
                if let Some(prev) = previous {
                    assert!(
                        !(pinned && prev == offset),
                        "speed {speed}: offset stuck at {offset} on frame {frame}"
                    );
                }
                previous = Some(offset);
            }
        }
    }
}
