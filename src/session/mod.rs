pub mod clock;
pub mod events;
pub mod orchestrator;
pub mod state;

pub use clock::{ControlState, ReplayClock, TickOutcome};
pub use events::{BaselineSummary, GameInfo, SessionEvent, SessionSummary, WindowRef};
pub use orchestrator::{Orchestrator, SessionHandle, SessionOptions};
pub use state::{SessionPhase, SessionState};
