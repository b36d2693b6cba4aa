// DXCC Prefix Table and Callsign Resolution
// Loads cty.dat and maps callsigns to entities, plus WPX prefix derivation.

pub mod error;
pub mod resolve;
pub mod table;
pub mod wpx;

pub use error::{LookupError, TableError};
pub use resolve::matchable_call;
pub use table::{Alias, Catalogue, Entity, Overrides};
pub use wpx::wpx_prefix;
