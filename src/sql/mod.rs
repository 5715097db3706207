//! Safe SQL scopes: identifiers are checked and quoted, values are bound as parameters.

mod builder;
mod exec;
pub mod params;
pub use builder::*;
pub use exec::*;
pub use params::*;
