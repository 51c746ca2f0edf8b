pub mod config;
pub mod errors;
pub mod params;
pub mod record;

pub use config::*;
pub use errors::*;
pub use params::*;
pub use record::*;
