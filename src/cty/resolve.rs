// DXCC resolution
// Callsign -> entity by longest alias match over the prefix table.
//
// Ties between equal-length matches go to the alias that comes later in the
// table. Lookups never write to the catalogue: overrides are applied to a
// clone of the matched entity.

use std::sync::OnceLock;

use regex::Regex;

use super::error::LookupError;
use super::table::{Alias, Catalogue, Entity};
use super::wpx;

/// Used when a portable call has no derivable prefix
const UNKNOWN_PREFIX: &str = "QQ";

/// Appended to a derived prefix to make it look like a call
const FILLER: &str = "AA";

/// Combined-entity prefixes and the DXCC prefix they stand for
const AMBIGUOUS_PREFIXES: &[(&str, &str)] = &[
    ("*TA1", "TA"),  // Turkey
    ("*4U1V", "OE"), // 4U1VIC is in OE
    ("*GM/s", "GM"), // Shetlands
    ("*IG9", "I"),   // African Italy
    ("*IT9", "I"),   // Sicily
    ("*JW/b", "JW"), // Bear Island
];

struct SpecialCalls {
    finland: Regex,
    rotuma: Regex,
    conway_reef: Regex,
}

static SPECIAL_CALLS: OnceLock<SpecialCalls> = OnceLock::new();

fn special_calls() -> &'static SpecialCalls {
    SPECIAL_CALLS.get_or_init(|| SpecialCalls {
        finland: Regex::new(r"(^OH/)|(/OH[1-9]?$)").expect("valid regex"),
        rotuma: Regex::new(r"(^3D2R)|(^3D2.+/R)").expect("valid regex"),
        conway_reef: Regex::new(r"^3D2C").expect("valid regex"),
    })
}

/// Rewrite a callsign into the form matched against the alias index
pub fn matchable_call(call: &str) -> Result<String, LookupError> {
    let call = call.trim();
    if call.is_empty() {
        return Err(LookupError::InvalidCallsign(call.to_string()));
    }

    let special = special_calls();
    if special.finland.is_match(call) {
        return Ok("OH".to_string());
    }
    if special.rotuma.is_match(call) {
        return Ok("3D2RR".to_string());
    }
    if special.conway_reef.is_match(call) {
        return Ok("3D2CR".to_string());
    }
    if call.contains('/') {
        let prefix = wpx::derive(call)?.unwrap_or_else(|| UNKNOWN_PREFIX.to_string());
        return Ok(format!("{}{}", prefix, FILLER));
    }
    Ok(call.to_string())
}

impl Catalogue {
    /// Resolve a callsign to an owned copy of its entity
    pub fn resolve(&self, call: &str) -> Result<Entity, LookupError> {
        let call = matchable_call(call)?;
        let alias = self
            .best_alias(&call)
            .ok_or_else(|| LookupError::InvalidDxcc {
                call: call.clone(),
                main_prefix: None,
            })?;

        let mut entity = self
            .entity(&alias.main_prefix)
            .cloned()
            .ok_or_else(|| LookupError::InvalidDxcc {
                call: call.clone(),
                main_prefix: Some(alias.main_prefix.clone()),
            })?;

        alias.overrides.apply(&mut entity);

        if entity.main_prefix.starts_with('*') {
            if let Some((_, real)) = AMBIGUOUS_PREFIXES
                .iter()
                .find(|(marked, _)| *marked == entity.main_prefix)
            {
                entity.main_prefix = real.to_string();
            }
        }

        Ok(entity)
    }

    /// Alias that wins for an already rewritten call
    ///
    /// Linear scan of the aliases sharing the call's first character,
    /// keeping the longest match; `>=` lets a later alias take a tie.
    pub fn best_alias(&self, call: &str) -> Option<&Alias> {
        let first = call.chars().next()?;
        let mut best: Option<&Alias> = None;
        let mut best_len = 0;

        for alias in self.candidates(first) {
            let len = alias.prefix.len();
            let hit = if alias.exact {
                call == alias.prefix
            } else {
                call.starts_with(alias.prefix.as_str())
            };
            if hit && len >= best_len {
                best = Some(alias);
                best_len = len;
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const TABLE: &str = "\
Finland:                  15:  18:  EU:   63.78:   -27.08:    -2.0:  OH:
    OF,OG,OH,OI,
    =OH2BH(16)[19];
Aland Islands:            15:  18:  EU:   60.13:   -20.37:    -2.0:  OH0:
    OF0,OG0,OH0,OI0;
Market Reef:              15:  18:  EU:   60.30:   -19.13:    -2.0:  OJ0:
    OJ0;
Fed. Rep. of Germany:     14:  28:  EU:   51.00:   -10.00:    -1.0:  DL:
    DA,DB,DC,DD,DF,DG,DJ,DK,DL,DM,DN,DO;
United States:            05:  08:  NA:   37.53:    91.67:     5.0:  K:
    AA,AB,K,N,W,
    W6(3)[6],W7(3)[6],KH6X<21.0/158.0>;
Hawaii:                   31:  61:  OC:   21.12:   157.48:   10.0:  KH6:
    AH6,AH7,KH6,KH7,NH6,NH7,WH6,WH7;
Fiji:                     32:  56:  OC:  -17.78:  -177.92:  -12.0:  3D2:
    3D2;
Conway Reef:              32:  56:  OC:  -22.00:  -175.68:  -12.0:  3D2/c:
    3D2CR;
Rotuma Island:            32:  56:  OC:  -12.48:  -177.08:  -12.0:  3D2/r:
    3D2RR;
Asiatic Turkey:           20:  39:  AS:   39.18:   -35.65:    -2.0:  TA:
    TA,TB,TC,YM;
European Turkey:          20:  39:  EU:   41.02:   -28.97:    -2.0:  *TA1:
    TA1;
Ghost Entity:              1:   1:  NA:    0.00:     0.00:     0.0:  QX:
    QX;
";

    fn catalogue() -> Catalogue {
        Catalogue::parse(TABLE).unwrap()
    }

    fn prefix_of(call: &str) -> String {
        catalogue().resolve(call).unwrap().main_prefix
    }

    #[test]
    fn test_plain_calls() {
        assert_eq!(prefix_of("W1AW"), "K");
        assert_eq!(prefix_of("DL1ABC"), "DL");
        assert_eq!(prefix_of("KH6ABC"), "KH6");
        assert_eq!(prefix_of("OH2ABC"), "OH");
        assert_eq!(prefix_of("OH0XX"), "OH0");
        assert_eq!(prefix_of("OJ0B"), "OJ0");
        assert_eq!(prefix_of("3D2AG"), "3D2");
    }

    #[test]
    fn test_resolved_entity_fields() {
        let hawaii = catalogue().resolve("KH6ABC").unwrap();
        assert_eq!(hawaii.name, "Hawaii");
        assert_eq!(hawaii.cq_zone, 31);
        assert_eq!(hawaii.itu_zone, 61);
        assert_eq!(hawaii.continent, "OC");
        assert_eq!(hawaii.latitude, 21.12);
        assert_eq!(hawaii.longitude, 157.48);
    }

    #[test]
    fn test_finland_portable_rule() {
        assert_eq!(prefix_of("OH/DL1ABC/P"), "OH");
        assert_eq!(prefix_of("OH/DL1ABC"), "OH");
        assert_eq!(prefix_of("DL1ABC/OH"), "OH");
        assert_eq!(prefix_of("DL1ABC/OH2"), "OH");
        // OH0 is Aland, not covered by the Finland rewrite
        assert_eq!(prefix_of("DL1ABC/OH0"), "OH0");
    }

    #[test]
    fn test_fiji_sub_entities() {
        assert_eq!(prefix_of("3D2RW"), "3D2/r");
        assert_eq!(prefix_of("3D2AG/R"), "3D2/r");
        assert_eq!(prefix_of("3D2CI"), "3D2/c");
        assert_eq!(catalogue().resolve("3D2CR").unwrap().name, "Conway Reef");
    }

    #[test]
    fn test_portable_calls_use_wpx_prefix() {
        assert_eq!(prefix_of("W1AW/KH6"), "KH6");
        assert_eq!(prefix_of("DL1ABC/P"), "DL");
        assert_eq!(matchable_call("DL/W1AW").unwrap(), "W1AW0AA");
        assert_eq!(prefix_of("DL/W1AW"), "K");
        assert_eq!(matchable_call("W1AW/KH6/4").unwrap(), "KH4AA");
        assert_eq!(prefix_of("DL1ABC/KH6/P"), "KH6");
        assert_eq!(prefix_of("DL1ABC/P/KH6"), "KH6");
    }

    #[test]
    fn test_underivable_portable_call_uses_sentinel() {
        assert_eq!(matchable_call("ABC/DEF/P").unwrap(), "QQAA");
        assert!(matches!(
            catalogue().resolve("ABC/DEF/P"),
            Err(LookupError::InvalidDxcc { main_prefix: None, .. })
        ));
    }

    #[test]
    fn test_invalid_callsigns() {
        let cat = catalogue();
        assert!(matches!(cat.resolve(""), Err(LookupError::InvalidCallsign(_))));
        assert!(matches!(cat.resolve("W1AW/4"), Err(LookupError::InvalidCallsign(_))));
        assert!(matches!(cat.resolve("A/B/C/D"), Err(LookupError::InvalidCallsign(_))));
    }

    #[test]
    fn test_no_match_and_dangling_prefix() {
        let cat = catalogue();
        assert_eq!(
            cat.resolve("ZZ9ZZ"),
            Err(LookupError::InvalidDxcc {
                call: "ZZ9ZZ".to_string(),
                main_prefix: None,
            })
        );

        // Alias whose owner is not in the entity map
        let mut broken = catalogue();
        broken.push_alias(Alias::parse("ZD8", "ZD8").unwrap());
        assert_eq!(
            broken.resolve("ZD8Z"),
            Err(LookupError::InvalidDxcc {
                call: "ZD8Z".to_string(),
                main_prefix: Some("ZD8".to_string()),
            })
        );
    }

    #[test]
    fn test_longer_match_beats_later_shorter() {
        let table = "\
Alpha: 1: 1: NA: 10.0: 10.0: 0.0: AX:
    AX,AX12;
Bravo: 2: 2: NA: 20.0: 20.0: 0.0: BX:
    AX1;
";
        let cat = Catalogue::parse(table).unwrap();
        assert_eq!(cat.resolve("AX123").unwrap().main_prefix, "AX");
        assert_eq!(cat.resolve("AX13").unwrap().main_prefix, "BX");
    }

    #[test]
    fn test_equal_length_later_alias_wins() {
        let table = "\
Alpha: 1: 1: NA: 10.0: 10.0: 0.0: AX:
    AX1;
Bravo: 2: 2: NA: 20.0: 20.0: 0.0: BX:
    AX1;
";
        let cat = Catalogue::parse(table).unwrap();
        assert_eq!(cat.resolve("AX1ABC").unwrap().main_prefix, "BX");
        assert_eq!(cat.best_alias("AX1ABC").unwrap().main_prefix, "BX");
    }

    #[test]
    fn test_exact_alias_matches_whole_call_only() {
        let cat = catalogue();
        let bh = cat.resolve("OH2BH").unwrap();
        assert_eq!(bh.cq_zone, 16);
        assert_eq!(bh.itu_zone, 19);

        let other = cat.resolve("OH2BHX").unwrap();
        assert_eq!(other.cq_zone, 15);
        assert_eq!(other.itu_zone, 18);
    }

    #[test]
    fn test_zone_override_does_not_leak() {
        let cat = catalogue();

        let west = cat.resolve("W6ABC").unwrap();
        assert_eq!((west.cq_zone, west.itu_zone), (3, 6));

        let east = cat.resolve("W1AW").unwrap();
        assert_eq!((east.cq_zone, east.itu_zone), (5, 8));

        let stored = cat.entity("K").unwrap();
        assert_eq!((stored.cq_zone, stored.itu_zone), (5, 8));

        let again = cat.resolve("W6ABC").unwrap();
        assert_eq!(again, west);
    }

    #[test]
    fn test_coordinate_override() {
        let cat = catalogue();
        let odd = cat.resolve("KH6XYZ").unwrap();
        assert_eq!(odd.main_prefix, "K");
        assert_eq!((odd.latitude, odd.longitude), (21.0, 158.0));
        assert_eq!(cat.entity("K").unwrap().latitude, 37.53);
    }

    #[test]
    fn test_ambiguous_prefix_remap() {
        let cat = catalogue();
        let turkey = cat.resolve("TA1ABC").unwrap();
        assert_eq!(turkey.main_prefix, "TA");
        assert_eq!(turkey.name, "European Turkey");
        assert_eq!(turkey.continent, "EU");
        assert_eq!(cat.entity("*TA1").unwrap().main_prefix, "*TA1");

        assert_eq!(prefix_of("TA2ABC"), "TA");
        assert_eq!(cat.resolve("TA2ABC").unwrap().name, "Asiatic Turkey");
    }

    #[test]
    fn test_catalogue_is_shareable() {
        let cat = std::sync::Arc::new(catalogue());
        let handles: Vec<_> = ["W6ABC", "W1AW", "KH6ABC", "OH/DL1ABC/P"]
            .into_iter()
            .map(|call| {
                let cat = std::sync::Arc::clone(&cat);
                std::thread::spawn(move || cat.resolve(call).unwrap().main_prefix)
            })
            .collect();
        let prefixes: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(prefixes, vec!["K", "K", "KH6", "OH"]);
        assert_eq!(cat.entity("K").unwrap().cq_zone, 5);
    }
}
