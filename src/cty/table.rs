// cty.dat Prefix Table
// Source: Country Files (https://www.country-files.com/)
//
// Entity line:   name: cq: itu: continent: lat: lon: utc offset: main prefix:
// Alias lines:   indented, comma separated, last one ends with ';'
//
// Alias annotations: =CALL exact match, (n) CQ zone, [n] ITU zone,
// <lat/lon> coordinates, {XX} continent, ~n~ UTC offset.
// Longitudes are positive west, as in the file.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use super::error::TableError;

/// One DXCC entity row
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub name: String,
    pub cq_zone: u8,
    pub itu_zone: u8,
    pub continent: String,
    pub latitude: f64,
    pub longitude: f64,
    pub utc_offset: f64,
    pub main_prefix: String,
}

/// Values an alias substitutes for its entity's defaults
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub cq_zone: Option<u8>,
    pub itu_zone: Option<u8>,
    pub coordinates: Option<(f64, f64)>,
    pub continent: Option<String>,
    pub utc_offset: Option<f64>,
}

impl Overrides {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Apply to an owned copy of an entity
    pub fn apply(&self, entity: &mut Entity) {
        if let Some(cq) = self.cq_zone {
            entity.cq_zone = cq;
        }
        if let Some(itu) = self.itu_zone {
            entity.itu_zone = itu;
        }
        if let Some((lat, lon)) = self.coordinates {
            entity.latitude = lat;
            entity.longitude = lon;
        }
        if let Some(cont) = &self.continent {
            entity.continent = cont.clone();
        }
        if let Some(utc) = self.utc_offset {
            entity.utc_offset = utc;
        }
    }
}

/// A prefix (or exact call) claimed by an entity
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    /// Token as written in the table
    pub raw: String,
    /// Matchable part, annotations stripped
    pub prefix: String,
    /// `=` marker: matches the whole call only
    pub exact: bool,
    pub main_prefix: String,
    pub overrides: Overrides,
}

impl Alias {
    /// Parse one alias token
    pub fn parse(raw: &str, main_prefix: &str) -> Result<Self, String> {
        let token = raw.trim();
        let (exact, rest) = match token.strip_prefix('=') {
            Some(rest) => (true, rest),
            None => (false, token),
        };

        let split = rest
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '/'))
            .unwrap_or(rest.len());
        let (prefix, mut annotations) = rest.split_at(split);
        if prefix.is_empty() {
            return Err("empty prefix".to_string());
        }

        let mut overrides = Overrides::default();
        while let Some(open) = annotations.chars().next() {
            let close = match open {
                '(' => ')',
                '[' => ']',
                '<' => '>',
                '{' => '}',
                '~' => '~',
                other => return Err(format!("unexpected '{}'", other)),
            };
            let body_end = annotations[1..]
                .find(close)
                .ok_or_else(|| format!("unclosed '{}'", open))?;
            let body = &annotations[1..1 + body_end];
            annotations = &annotations[body_end + 2..];

            match open {
                '(' => overrides.cq_zone = Some(parse_zone(body)?),
                '[' => overrides.itu_zone = Some(parse_zone(body)?),
                '<' => overrides.coordinates = Some(parse_coordinates(body)?),
                '{' => {
                    if body.is_empty() {
                        return Err("empty continent".to_string());
                    }
                    overrides.continent = Some(body.to_string());
                }
                _ => {
                    let offset = body
                        .parse()
                        .map_err(|_| format!("bad UTC offset '{}'", body))?;
                    overrides.utc_offset = Some(offset);
                }
            }
        }

        Ok(Self {
            raw: token.to_string(),
            prefix: prefix.to_string(),
            exact,
            main_prefix: main_prefix.to_string(),
            overrides,
        })
    }

    /// First character of the matchable part
    pub fn first_char(&self) -> Option<char> {
        self.prefix.chars().next()
    }
}

fn parse_zone(body: &str) -> Result<u8, String> {
    body.parse().map_err(|_| format!("bad zone '{}'", body))
}

fn parse_coordinates(body: &str) -> Result<(f64, f64), String> {
    let (lat, lon) = body
        .split_once('/')
        .ok_or_else(|| format!("bad coordinates '{}'", body))?;
    let lat = lat
        .trim()
        .parse()
        .map_err(|_| format!("bad latitude '{}'", lat))?;
    let lon = lon
        .trim()
        .parse()
        .map_err(|_| format!("bad longitude '{}'", lon))?;
    Ok((lat, lon))
}

fn parse_entity(line: usize, text: &str) -> Result<Entity, TableError> {
    let malformed = |reason: String| TableError::MalformedEntity { line, reason };

    let fields: Vec<&str> = text.split(':').map(str::trim).collect();
    if fields.len() < 8 {
        return Err(malformed(format!("expected 8 fields, found {}", fields.len())));
    }

    let zone = |i: usize| -> Result<u8, TableError> {
        fields[i]
            .parse()
            .map_err(|_| malformed(format!("bad zone '{}'", fields[i])))
    };
    let number = |i: usize| -> Result<f64, TableError> {
        fields[i]
            .parse()
            .map_err(|_| malformed(format!("bad number '{}'", fields[i])))
    };

    if fields[7].is_empty() {
        return Err(malformed("empty main prefix".to_string()));
    }

    Ok(Entity {
        name: fields[0].to_string(),
        cq_zone: zone(1)?,
        itu_zone: zone(2)?,
        continent: fields[3].to_string(),
        latitude: number(4)?,
        longitude: number(5)?,
        utc_offset: number(6)?,
        main_prefix: fields[7].to_string(),
    })
}

/// Entity under construction while its alias lines are read
struct EntityBuilder {
    entity: Entity,
    aliases: Vec<Alias>,
}

impl EntityBuilder {
    fn add_aliases(&mut self, line: usize, text: &str) -> Result<(), TableError> {
        let text = text.trim().trim_end_matches(';').trim_end_matches(',');
        for token in text.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            let alias = Alias::parse(token, &self.entity.main_prefix).map_err(|reason| {
                TableError::MalformedAlias {
                    line,
                    alias: token.to_string(),
                    reason,
                }
            })?;
            self.aliases.push(alias);
        }
        Ok(())
    }
}

/// Entities plus the alias index, read-only once built
#[derive(Debug, Clone, Default)]
pub struct Catalogue {
    entities: Vec<Entity>,
    by_prefix: HashMap<String, usize>,
    aliases: Vec<Alias>,
    by_first: HashMap<char, Vec<usize>>,
}

impl Catalogue {
    /// Parse a table held in memory
    pub fn parse(text: &str) -> Result<Self, TableError> {
        Self::load(text.lines().map(|l| Ok(l.to_string())))
    }

    /// Parse a table from a buffered reader
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, TableError> {
        Self::load(reader.lines())
    }

    /// Load a table file
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, TableError> {
        let path = path.as_ref();
        log::info!("Loading prefix table: {:?}", path);
        let catalogue = Self::from_reader(BufReader::new(File::open(path)?))?;
        log::info!(
            "Prefix table loaded: {} entities, {} aliases",
            catalogue.entities.len(),
            catalogue.aliases.len()
        );
        Ok(catalogue)
    }

    fn load<I>(lines: I) -> Result<Self, TableError>
    where
        I: Iterator<Item = std::io::Result<String>>,
    {
        let mut catalogue = Self::default();
        let mut current: Option<EntityBuilder> = None;

        for (idx, line) in lines.enumerate() {
            let line = line?;
            let lineno = idx + 1;
            if line.trim().is_empty() {
                continue;
            }

            if line.starts_with(char::is_whitespace) {
                match current.as_mut() {
                    Some(builder) => builder.add_aliases(lineno, &line)?,
                    None => return Err(TableError::OrphanContinuation { line: lineno }),
                }
            } else {
                if let Some(done) = current.take() {
                    catalogue.push(done);
                }
                current = Some(EntityBuilder {
                    entity: parse_entity(lineno, line.trim())?,
                    aliases: Vec::new(),
                });
            }
        }
        if let Some(done) = current.take() {
            catalogue.push(done);
        }

        Ok(catalogue)
    }

    fn push(&mut self, builder: EntityBuilder) {
        let EntityBuilder { entity, aliases } = builder;
        match self.by_prefix.get(&entity.main_prefix) {
            Some(&idx) => self.entities[idx] = entity,
            None => {
                self.by_prefix
                    .insert(entity.main_prefix.clone(), self.entities.len());
                self.entities.push(entity);
            }
        }

        for alias in aliases {
            self.push_alias(alias);
        }
    }

    pub(crate) fn push_alias(&mut self, alias: Alias) {
        if let Some(first) = alias.first_char() {
            self.by_first
                .entry(first)
                .or_default()
                .push(self.aliases.len());
        }
        self.aliases.push(alias);
    }

    /// Look up an entity by main prefix
    pub fn entity(&self, main_prefix: &str) -> Option<&Entity> {
        self.by_prefix.get(main_prefix).map(|&i| &self.entities[i])
    }

    /// Entities in table order
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    /// Aliases in table order
    pub fn aliases(&self) -> &[Alias] {
        &self.aliases
    }

    /// Aliases starting with `first`, in table order
    pub fn candidates(&self, first: char) -> impl Iterator<Item = &Alias> {
        self.by_first
            .get(&first)
            .into_iter()
            .flatten()
            .map(|&i| &self.aliases[i])
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}
