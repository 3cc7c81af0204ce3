use std::fmt;

/// Coordinator lifecycle.
///
/// `Initialized -> Running -> (Stopped) -> Finished`; `Finished` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoordinatorState {
    Initialized,
    Running,
    /// No new admissions; admitted sessions drain.
    Stopped,
    Finished,
}

impl CoordinatorState {
    pub fn is_finished(self) -> bool {
        self == CoordinatorState::Finished
    }
}

impl fmt::Display for CoordinatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CoordinatorState::Initialized => "initialized",
            CoordinatorState::Running => "running",
            CoordinatorState::Stopped => "stopped",
            CoordinatorState::Finished => "finished",
        };
        f.write_str(s)
    }
}
