//! Rinkside - Real-time concession demand drift monitoring for arena games

pub mod core;
pub mod drift;
pub mod forecast;
pub mod reasoning;
pub mod scenario;
pub mod session;
pub mod traffic;
