// Location Layer
// Turns logged contacts into map placements.
//
// A `LocationSource` answers "where is this callsign?". The prefix catalogue
// is one source; `Fallback` chains two, so a precise per-station source can
// sit in front of the catalogue's entity centroid.
//
// Placements carry GeoJSON-order coordinates `[lon, lat]` with east-positive
// longitude. cty.dat stores west-positive longitude, so the catalogue source
// negates it.

use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::adif::Record;
use crate::cty::{Catalogue, LookupError};

#[derive(Debug, Error)]
pub enum LocateError {
    #[error("no location for {0}")]
    NotFound(String),

    #[error(transparent)]
    Lookup(#[from] LookupError),

    #[error("record has no call field")]
    MissingCall,
}

/// Where a station is, as far as a source knows
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub latitude: f64,
    /// East-positive
    pub longitude: f64,
    /// DXCC main prefix, when the source knows it
    pub dxcc: Option<String>,
    pub country: Option<String>,
}

pub trait LocationSource {
    fn locate(&self, call: &str) -> Result<Location, LocateError>;
}

impl<S: LocationSource + ?Sized> LocationSource for &S {
    fn locate(&self, call: &str) -> Result<Location, LocateError> {
        (**self).locate(call)
    }
}

impl LocationSource for Catalogue {
    fn locate(&self, call: &str) -> Result<Location, LocateError> {
        let entity = self.resolve(call)?;
        Ok(Location {
            latitude: entity.latitude,
            longitude: -entity.longitude,
            dxcc: Some(entity.main_prefix),
            country: Some(entity.name),
        })
    }
}

/// Ask `primary` first and `secondary` when it has no answer
#[derive(Debug, Clone)]
pub struct Fallback<A, B> {
    pub primary: A,
    pub secondary: B,
}

impl<A, B> Fallback<A, B> {
    pub fn new(primary: A, secondary: B) -> Self {
        Self { primary, secondary }
    }
}

impl<A: LocationSource, B: LocationSource> LocationSource for Fallback<A, B> {
    fn locate(&self, call: &str) -> Result<Location, LocateError> {
        match self.primary.locate(call) {
            Ok(location) => Ok(location),
            Err(e) => {
                log::debug!("Primary lookup failed for {}: {}", call, e);
                self.secondary.locate(call)
            }
        }
    }
}

/// A point plus ordered attributes, ready for a geometry serializer
#[derive(Debug, Clone, PartialEq)]
pub struct Placement {
    /// `[longitude, latitude]`
    pub coordinates: [f64; 2],
    pub properties: Vec<(String, String)>,
}

impl Placement {
    /// Append an attribute, replacing an existing one of the same name
    pub fn set_property(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.properties.iter_mut().find(|(k, _)| k == name) {
            Some(slot) => slot.1 = value,
            None => self.properties.push((name.to_string(), value)),
        }
    }

    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }
}

struct Properties<'a>(&'a [(String, String)]);

impl Serialize for Properties<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (k, v) in self.0 {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

impl Serialize for Placement {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Placement", 2)?;
        s.serialize_field("coordinates", &self.coordinates)?;
        s.serialize_field("properties", &Properties(&self.properties))?;
        s.end()
    }
}

/// Locate a record's station and attach the record's fields
pub fn place<S: LocationSource>(record: &Record, source: &S) -> Result<Placement, LocateError> {
    let call = record.call().ok_or(LocateError::MissingCall)?;
    let location = source.locate(call)?;

    let mut placement = Placement {
        coordinates: [location.longitude, location.latitude],
        properties: record
            .fields()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    };
    if let Some(dxcc) = location.dxcc {
        placement.set_property("dxcc", dxcc);
    }
    if let Some(country) = location.country {
        placement.set_property("country", country);
    }
    Ok(placement)
}
