use crate::events::Phase;

/// Hold and transition lengths in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timing {
    pub hold: f64,
    pub transition: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseEvent {
    /// Hold ended; blending toward the upcoming asset started.
    Began,
    /// Blend finished; the caller commits the advance.
    Completed,
}

/// Hold/transition state machine with a phase-local elapsed counter.
#[derive(Debug, Clone, Default)]
pub struct TransitionClock {
    phase: Phase,
    elapsed: f64,
}

impl TransitionClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn elapsed(&self) -> f64 {
        self.elapsed
    }

    /// Blend factor toward the upcoming asset; zero while holding.
    pub fn blend(&self, timing: Timing) -> f32 {
        match self.phase {
            Phase::Hold => 0.0,
            Phase::Transitioning => {
                (self.elapsed / timing.transition.max(f64::EPSILON)).clamp(0.0, 1.0) as f32
            }
        }
    }

    /// Fraction of the whole hold+transition cycle already shown.
    pub fn cycle_progress(&self, timing: Timing) -> f64 {
        let total = timing.hold + timing.transition;
        if !(total > 0.0) {
            return 0.0;
        }
        let done = match self.phase {
            Phase::Hold => self.elapsed.min(timing.hold),
            Phase::Transitioning => timing.hold + self.elapsed,
        };
        (done / total).clamp(0.0, 1.0)
    }

    /// Advances by `dt` seconds. `can_advance` gates only the start of a transition;
    /// a transition already under way always runs to completion.
    pub fn on_tick(&mut self, dt: f64, timing: Timing, can_advance: bool) -> Option<PhaseEvent> {
        self.elapsed += dt.max(0.0);
        match self.phase {
            Phase::Hold if can_advance && self.elapsed >= timing.hold => {
                self.goto(Phase::Transitioning);
                Some(PhaseEvent::Began)
            }
            Phase::Transitioning if self.elapsed >= timing.transition => {
                self.goto(Phase::Hold);
                Some(PhaseEvent::Completed)
            }
            _ => None,
        }
    }

    /// Returns to the start of a hold, abandoning any transition.
    pub fn reset(&mut self) {
        self.goto(Phase::Hold);
    }

    fn goto(&mut self, to: Phase) {
        self.phase = to;
        self.elapsed = 0.0;
    }
}
