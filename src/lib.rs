pub mod attack;
pub mod config;
pub mod distinguishers;
pub mod error;
pub mod io;
pub mod leakage_model;
pub mod preprocessors;
pub mod rank;
pub mod report;
pub mod trace;
pub mod util;

pub use error::Error;
