//! The orchestrator's stage machine.
//!
//! Stages are an explicit tagged value with a pure transition function, so
//! the sequencing contract is testable without running any pipeline work.

use serde::Serialize;

/// Pipeline stage of an assembly run.
///
/// The success path advances strictly in declaration order and ends at
/// [`Stage::Packaged`]; any fatal stage failure moves the run to
/// [`Stage::Failed`], which has no outgoing transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    /// Request received, nothing derived yet.
    Initialized,
    /// Coordinate frame established from the region of interest.
    FrameEstablished,
    /// Elevation grid produced on the frame.
    ElevationReady,
    /// Land-cover grid produced on the same frame.
    LandCoverReady,
    /// Forcing stations selected and materialized.
    StationsReady,
    /// Package validated and written; terminal success state.
    Packaged,
    /// A fatal error aborted the run; terminal failure state.
    Failed,
}

impl Stage {
    /// Next stage on the success path, `None` from a terminal stage.
    pub fn advance(&self) -> Option<Stage> {
        match self {
            Stage::Initialized => Some(Stage::FrameEstablished),
            Stage::FrameEstablished => Some(Stage::ElevationReady),
            Stage::ElevationReady => Some(Stage::LandCoverReady),
            Stage::LandCoverReady => Some(Stage::StationsReady),
            Stage::StationsReady => Some(Stage::Packaged),
            Stage::Packaged | Stage::Failed => None,
        }
    }

    /// Whether the stage is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Packaged | Stage::Failed)
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Stage::Initialized => "initialized",
            Stage::FrameEstablished => "frame-established",
            Stage::ElevationReady => "elevation-ready",
            Stage::LandCoverReady => "land-cover-ready",
            Stage::StationsReady => "stations-ready",
            Stage::Packaged => "packaged",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_path_visits_every_stage_once() {
        let mut stage = Stage::Initialized;
        let mut visited = vec![stage];
        while let Some(next) = stage.advance() {
            stage = next;
            visited.push(stage);
        }
        assert_eq!(
            visited,
            vec![
                Stage::Initialized,
                Stage::FrameEstablished,
                Stage::ElevationReady,
                Stage::LandCoverReady,
                Stage::StationsReady,
                Stage::Packaged,
            ]
        );
    }

    #[test]
    fn terminal_stages_do_not_advance() {
        assert_eq!(Stage::Packaged.advance(), None);
        assert_eq!(Stage::Failed.advance(), None);
        assert!(Stage::Packaged.is_terminal());
        assert!(Stage::Failed.is_terminal());
        assert!(!Stage::ElevationReady.is_terminal());
    }
}
