// GeoLog Library
// ADIF log reading, DXCC prefix resolution and map placement.

pub mod adif;
pub mod cty;
pub mod locate;
