use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepDirection {
    #[default]
    Forward,
    Backward,
}

impl StepDirection {
    pub fn delta(&self) -> isize {
        match self {
            Self::Forward => 1,
            Self::Backward => -1,
        }
    }
}

/// Discrete transport signals diffed by the sync bridge on every delivery.
///
/// `reset_seq` and `step_seq` are counters: the host bumps them to request a
/// restart or a manual step. Only changes matter, never the absolute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transport {
    pub reset_seq: u64,
    pub step_seq: u64,
    /// Direction applied when `step_seq` changes.
    pub step: StepDirection,
    pub running: bool,
    pub auto_advance: bool,
}

impl Default for Transport {
    fn default() -> Self {
        Self {
            reset_seq: 0,
            step_seq: 0,
            step: StepDirection::Forward,
            running: true,
            auto_advance: true,
        }
    }
}

impl Transport {
    /// Folds a control command into the signal set; returns true for `Shuffle`,
    /// which lives in the scene settings rather than the transport.
    pub fn apply(&mut self, cmd: ControlCommand) -> bool {
        match cmd {
            ControlCommand::Next => self.bump_step(StepDirection::Forward),
            ControlCommand::Previous => self.bump_step(StepDirection::Backward),
            ControlCommand::Reset => self.reset_seq = self.reset_seq.wrapping_add(1),
            ControlCommand::Pause => self.running = false,
            ControlCommand::Resume => self.running = true,
            ControlCommand::TogglePause => self.running = !self.running,
            ControlCommand::AutoAdvance(on) => self.auto_advance = on,
            ControlCommand::Shuffle => return true,
        }
        false
    }

    fn bump_step(&mut self, direction: StepDirection) {
        self.step = direction;
        self.step_seq = self.step_seq.wrapping_add(1);
    }
}

/// Commands accepted by the host control channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlCommand {
    Next,
    Previous,
    Reset,
    Pause,
    Resume,
    TogglePause,
    AutoAdvance(bool),
    Shuffle,
}

impl ControlCommand {
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let cmd = match words.next()?.to_ascii_lowercase().as_str() {
            "next" | "n" => Self::Next,
            "prev" | "previous" | "p" => Self::Previous,
            "reset" => Self::Reset,
            "pause" => Self::Pause,
            "play" | "resume" => Self::Resume,
            "toggle" => Self::TogglePause,
            "shuffle" => Self::Shuffle,
            "auto" => match words.next()?.to_ascii_lowercase().as_str() {
                "on" | "true" => Self::AutoAdvance(true),
                "off" | "false" => Self::AutoAdvance(false),
                _ => return None,
            },
            _ => return None,
        };
        if words.next().is_some() {
            return None;
        }
        Some(cmd)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    #[default]
    Hold,
    Transitioning,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Hold => "hold",
            Self::Transitioning => "transitioning",
        })
    }
}

/// Snapshot reported to the host for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineStatus {
    pub ready: bool,
    pub generation: u64,
    pub slots: usize,
    pub loaded: usize,
    pub failed: usize,
    pub pending: usize,
    pub phase: Phase,
    pub blend: f32,
    pub current_slot: Option<usize>,
    pub upcoming_slot: Option<usize>,
    pub running: bool,
    pub auto_advance: bool,
}

impl fmt::Display for EngineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "ready={} gen={} slots={} loaded={} failed={} pending={} phase={}",
            self.ready,
            self.generation,
            self.slots,
            self.loaded,
            self.failed,
            self.pending,
            self.phase
        )?;
        if let Some(slot) = self.current_slot {
            write!(f, " current={slot}")?;
        }
        if !self.running {
            f.write_str(" paused")?;
        }
        Ok(())
    }
}
