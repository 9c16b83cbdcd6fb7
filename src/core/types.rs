//! Core type definitions used throughout the codebase

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a game
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameId(pub Uuid);

impl GameId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Fold the id into a u64 for seeding deterministic noise streams.
    pub fn seed(&self) -> u64 {
        let bytes = self.0.as_bytes();
        let mut out = 0u64;
        for chunk in bytes.chunks(8) {
            let mut word = [0u8; 8];
            word[..chunk.len()].copy_from_slice(chunk);
            out ^= u64::from_le_bytes(word);
        }
        out
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

/// Unique identifier for a replay session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Crowd-behavior classification used to select baseline demand curves
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Archetype {
    BeerCrowd,
    Family,
    Mixed,
}

impl Archetype {
    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::BeerCrowd => "beer_crowd",
            Archetype::Family => "family",
            Archetype::Mixed => "mixed",
        }
    }
}

/// Day of week for a game date
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DayOfWeek {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl DayOfWeek {
    pub fn is_weekend_night(&self) -> bool {
        matches!(self, DayOfWeek::Fri | DayOfWeek::Sat)
    }
}

/// Final result of a game, when known
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Win,
    Loss,
    OvertimeLoss,
}

/// A game descriptor. Immutable once a session starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub opponent: String,
    /// ISO date of the game (YYYY-MM-DD)
    pub date: String,
    pub day_of_week: DayOfWeek,
    /// Local hour of puck drop (24h)
    pub puck_drop_hour: u8,
    pub attendance: u32,
    pub archetype: Archetype,
    pub is_playoff: bool,
    /// Mean outdoor temperature on game day, Celsius
    pub temp_mean_c: f32,
    pub outcome: Option<Outcome>,
}

/// Phase of the game clock a window falls in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamePhase {
    PreGame,
    P1,
    Int1,
    P2,
    Int2,
    P3,
    PostGame,
}

// Typical WHL game timeline, minutes from puck drop.
const P1_END: i32 = 20;
const INT1_END: i32 = 38;
const P2_END: i32 = 58;
const INT2_END: i32 = 76;
const P3_END: i32 = 96;

impl GamePhase {
    /// Classify a minute offset from puck drop into a game phase.
    pub fn from_offset(offset_min: i32) -> Self {
        match offset_min {
            m if m < 0 => GamePhase::PreGame,
            m if m < P1_END => GamePhase::P1,
            m if m < INT1_END => GamePhase::Int1,
            m if m < P2_END => GamePhase::P2,
            m if m < INT2_END => GamePhase::Int2,
            m if m < P3_END => GamePhase::P3,
            _ => GamePhase::PostGame,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            GamePhase::PreGame => "pre-game",
            GamePhase::P1 => "P1",
            GamePhase::Int1 => "INT1",
            GamePhase::P2 => "P2",
            GamePhase::Int2 => "INT2",
            GamePhase::P3 => "P3",
            GamePhase::PostGame => "post-game",
        }
    }
}

/// A discrete time slice of the game, identified by its position on the axis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    /// Position in the window sequence (0-based, strictly increasing)
    pub index: usize,
    /// Signed minutes from puck drop at the start of this window
    pub offset_min: i32,
}

impl TimeWindow {
    pub fn phase(&self) -> GamePhase {
        GamePhase::from_offset(self.offset_min)
    }

    /// Display label like "P1 T+10" or "pre-game T-20"
    pub fn label(&self) -> String {
        format!("{} T{:+}", self.phase().label(), self.offset_min)
    }
}

/// The fixed, finite window sequence for one game.
///
/// Windows run from `start_min` (inclusive) to `end_min` (exclusive) in
/// `step_min` slices. The default covers T-30 through T+110 in 10-minute
/// windows: doors open half an hour before puck drop, and sales tail off
/// shortly after the final horn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowAxis {
    pub start_min: i32,
    pub end_min: i32,
    pub step_min: u32,
}

impl Default for WindowAxis {
    fn default() -> Self {
        Self {
            start_min: -30,
            end_min: 120,
            step_min: 10,
        }
    }
}

impl WindowAxis {
    pub fn len(&self) -> usize {
        if self.end_min <= self.start_min || self.step_min == 0 {
            return 0;
        }
        let span = (self.end_min - self.start_min) as usize;
        let step = self.step_min as usize;
        (span + step - 1) / step
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn window(&self, index: usize) -> Option<TimeWindow> {
        if index >= self.len() {
            return None;
        }
        Some(TimeWindow {
            index,
            offset_min: self.start_min + (index as u32 * self.step_min) as i32,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = TimeWindow> + '_ {
        (0..self.len()).map(move |i| {
            TimeWindow {
                index: i,
                offset_min: self.start_min + (i as u32 * self.step_min) as i32,
            }
        })
    }

    /// Index of the window containing the given minute offset, clamped to the axis.
    pub fn index_of_offset(&self, offset_min: i32) -> usize {
        if offset_min <= self.start_min {
            return 0;
        }
        let idx = ((offset_min - self.start_min) as u32 / self.step_min) as usize;
        idx.min(self.len().saturating_sub(1))
    }
}

/// Traffic-light status derived from cumulative drift magnitude
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Green,
    Yellow,
    Red,
}

impl Status {
    /// Severity rank for worst-of aggregation (higher is worse)
    pub fn severity(&self) -> u8 {
        match self {
            Status::Green => 0,
            Status::Yellow => 1,
            Status::Red => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Status::Green => "ON TRACK",
            Status::Yellow => "WATCH",
            Status::Red => "ACTION",
        }
    }
}

/// Direction of a stand's cumulative drift over the recent lookback
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Improving,
    Stable,
    Worsening,
}

/// Normalised item category for mix-drift comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Beer,
    WineCider,
    Liquor,
    Food,
    Snacks,
    Sweets,
    NaBev,
    Extras,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Beer,
        Category::WineCider,
        Category::Liquor,
        Category::Food,
        Category::Snacks,
        Category::Sweets,
        Category::NaBev,
        Category::Extras,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Beer => "Beer",
            Category::WineCider => "Wine/Cider",
            Category::Liquor => "Liquor",
            Category::Food => "Food",
            Category::Snacks => "Snacks",
            Category::Sweets => "Sweets",
            Category::NaBev => "NA Bev",
            Category::Extras => "Extras",
        }
    }

    pub fn is_alcohol(&self) -> bool {
        matches!(self, Category::Beer | Category::WineCider | Category::Liquor)
    }
}
