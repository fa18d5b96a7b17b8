/// Phases of the two-phase shutdown. Strictly forward: once a phase has
/// been entered it is never left except for the next one, and duplicate
/// shutdown triggers (window close + tray quit + OS exit request) collapse
/// into whichever handshake is already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub(crate) enum ExitPhase {
    #[default]
    Running,
    DrainPending,
    DrainComplete,
    StoreClosed,
    Exited,
}

#[derive(Debug, Default)]
pub(crate) struct ExitStateMachine {
    phase: ExitPhase,
}

impl ExitStateMachine {
    pub(crate) fn phase(&self) -> ExitPhase {
        self.phase
    }

    /// Returns true if the caller won the race and owns the drain handshake.
    pub(crate) fn begin_drain(&mut self) -> bool {
        if self.phase != ExitPhase::Running {
            return false;
        }
        self.phase = ExitPhase::DrainPending;
        true
    }

    pub(crate) fn complete_drain(&mut self) -> bool {
        self.advance(ExitPhase::DrainPending, ExitPhase::DrainComplete)
    }

    pub(crate) fn mark_store_closed(&mut self) -> bool {
        self.advance(ExitPhase::DrainComplete, ExitPhase::StoreClosed)
    }

    pub(crate) fn mark_exited(&mut self) -> bool {
        self.advance(ExitPhase::StoreClosed, ExitPhase::Exited)
    }

    /// Jumps straight to `Exited` from any phase. Used by terminal failure
    /// paths that close the store without a drain handshake; the exit
    /// request they raise must not be routed back into one.
    pub(crate) fn mark_failed_exit(&mut self) {
        self.phase = ExitPhase::Exited;
    }

    fn advance(&mut self, from: ExitPhase, to: ExitPhase) -> bool {
        if self.phase != from {
            return false;
        }
        self.phase = to;
        true
    }
}
