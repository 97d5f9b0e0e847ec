pub mod allocation;
pub mod constants;
pub mod error;
pub mod params;
pub mod types;

pub use allocation::*;
pub use constants::*;
pub use error::MintError;
pub use params::*;
pub use types::*;
