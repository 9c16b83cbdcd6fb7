pub mod prep;
pub mod profiles;
pub mod provider;

pub use prep::{generate_prep_plan, PerishabilityTier, PrepAction};
pub use profiles::derive_archetype;
pub use provider::{BaselineForecastProvider, ForecastProvider, ForecastTable, ItemForecast};
