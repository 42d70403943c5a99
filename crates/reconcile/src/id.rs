//! Composite identifiers
//!
//! Remote entities are addressed by several fields joined with `/`. An
//! [`IdLayout`] describes one such shape with a template:
//!
//! ```text
//! {organization}/{project}/{stack}/{tag}      four fixed fields
//! {organization}/{name...}/{tokenId}          free-form middle field
//! {organization}/environment/{project}/{env}  literal segment
//! ```
//!
//! Decoding is strict: the segment count must match the template exactly,
//! except that a single free-form field (`...`) absorbs every extra segment
//! and gets them back joined with `/`.

use crate::error::{Error, Result};

/// Field separator
pub const DELIMITER: char = '/';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part<'a> {
    Literal(&'a str),
    Field(&'a str),
    FreeForm(&'a str),
}

fn parse_part(segment: &str) -> Part<'_> {
    match segment
        .strip_prefix('{')
        .and_then(|s| s.strip_suffix('}'))
    {
        Some(name) => match name.strip_suffix("...") {
            Some(name) => Part::FreeForm(name),
            None => Part::Field(name),
        },
        None => Part::Literal(segment),
    }
}

/// One composite id shape
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdLayout {
    kind: &'static str,
    template: &'static str,
}

impl IdLayout {
    pub const fn new(kind: &'static str, template: &'static str) -> Self {
        Self { kind, template }
    }

    pub const fn kind(&self) -> &'static str {
        self.kind
    }

    fn parts(&self) -> impl Iterator<Item = Part<'static>> + Clone {
        self.template.split(DELIMITER).map(parse_part)
    }

    /// Human-readable form, e.g. `organization/project/stack/tag`
    pub fn format(&self) -> String {
        self.parts()
            .map(|part| match part {
                Part::Literal(s) | Part::Field(s) | Part::FreeForm(s) => s,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Field names in id order, literal segments excluded
    pub fn field_names(&self) -> Vec<&'static str> {
        self.parts()
            .filter_map(|part| match part {
                Part::Literal(_) => None,
                Part::Field(name) | Part::FreeForm(name) => Some(name),
            })
            .collect()
    }

    /// Number of fields (literal segments excluded)
    pub fn arity(&self) -> usize {
        self.parts()
            .filter(|p| !matches!(p, Part::Literal(_)))
            .count()
    }

    fn segment_count(&self) -> usize {
        self.parts().count()
    }

    fn free_form_index(&self) -> Option<usize> {
        self.parts().position(|p| matches!(p, Part::FreeForm(_)))
    }

    /// Whether `id` has the segment count this layout accepts
    pub fn accepts(&self, id: &str) -> bool {
        let count = id.split(DELIMITER).count();
        match self.free_form_index() {
            Some(_) => count >= self.segment_count(),
            None => count == self.segment_count(),
        }
    }

    /// Join fields into an id
    ///
    /// Fixed fields may not contain the delimiter; a free-form field may.
    pub fn encode(&self, fields: &[&str]) -> Result<String> {
        if fields.len() != self.arity() {
            return Err(Error::invalid_id(
                self.kind,
                fields.join("/"),
                format!(
                    "expected {} fields ({}), got {}",
                    self.arity(),
                    self.format(),
                    fields.len()
                ),
            ));
        }

        let mut values = fields.iter();
        let mut segments = Vec::with_capacity(self.segment_count());
        for part in self.parts() {
            match part {
                Part::Literal(s) => segments.push(s),
                Part::Field(name) | Part::FreeForm(name) => {
                    let value = values.next().copied().unwrap_or_default();
                    if matches!(part, Part::Field(_)) && value.contains(DELIMITER) {
                        return Err(Error::invalid_id(
                            self.kind,
                            fields.join("/"),
                            format!("field {name} may not contain '{DELIMITER}'"),
                        ));
                    }
                    segments.push(value);
                }
            }
        }
        Ok(segments.join("/"))
    }

    /// Split an id into its fields, in template order
    pub fn decode(&self, id: &str) -> Result<Vec<String>> {
        let segments: Vec<&str> = id.split(DELIMITER).collect();
        let expected = self.segment_count();

        let assigned: Vec<String> = match self.free_form_index() {
            Some(at) if segments.len() >= expected => {
                let tail = expected - at - 1;
                let end = segments.len() - tail;
                let mut assigned: Vec<String> =
                    segments[..at].iter().map(|s| (*s).to_string()).collect();
                assigned.push(segments[at..end].join("/"));
                assigned.extend(segments[end..].iter().map(|s| (*s).to_string()));
                assigned
            }
            None if segments.len() == expected => {
                segments.iter().map(|s| (*s).to_string()).collect()
            }
            _ => return Err(self.mismatch(id)),
        };

        let mut fields = Vec::with_capacity(self.arity());
        for (part, value) in self.parts().zip(assigned) {
            match part {
                Part::Literal(lit) if lit != value => return Err(self.mismatch(id)),
                Part::Literal(_) => {}
                Part::Field(_) | Part::FreeForm(_) => fields.push(value),
            }
        }
        Ok(fields)
    }

    /// Like [`IdLayout::decode`], into a fixed-size array
    pub fn decode_n<const N: usize>(&self, id: &str) -> Result<[String; N]> {
        let fields = self.decode(id)?;
        <[String; N]>::try_from(fields).map_err(|_| self.mismatch(id))
    }

    fn mismatch(&self, id: &str) -> Error {
        Error::invalid_id(
            self.kind,
            id,
            format!("expected format {}", self.format()),
        )
    }
}

/// Try several layouts in order; the first that decodes wins
///
/// Returns the index of the matching layout and its fields.
pub fn decode_any(layouts: &[IdLayout], id: &str) -> Result<(usize, Vec<String>)> {
    for (i, layout) in layouts.iter().enumerate() {
        if let Ok(fields) = layout.decode(id) {
            return Ok((i, fields));
        }
    }
    let kind = layouts.first().map_or("resource", IdLayout::kind);
    let formats: Vec<String> = layouts.iter().map(IdLayout::format).collect();
    Err(Error::invalid_id(
        kind,
        id,
        format!("expected one of: {}", formats.join(", ")),
    ))
}
