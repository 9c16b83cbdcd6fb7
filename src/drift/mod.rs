pub mod detector;
pub mod redistribute;

pub use detector::{
    classify_status, DriftDetector, DriftDimension, DriftRecord, DriftSignal, DriftStats,
    Severity, WindowDrift,
};
pub use redistribute::{suggest_for_stand, RedistributionSuggestion};
