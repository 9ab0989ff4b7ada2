//! Prompt templates.
//!
//! Templates use brace placeholders: `{field}` for a named column, `{}` or
//! `{0}` for the value of a single-column input. `{{` and `}}` produce
//! literal braces.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::record::{Record, display_value};

static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{\{|\}\}|\{([^{}]*)\}|[{}]").expect("placeholder regex is valid"));

/// A placeholder in a template
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Placeholder {
    /// `{name}`
    Named(String),
    /// `{}` or `{N}`
    Positional(usize),
}

impl fmt::Display for Placeholder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Named(name) => write!(f, "{{{}}}", name),
            Self::Positional(index) => write!(f, "{{{}}}", index),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(Placeholder),
}

/// A parsed, immutable prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptTemplate {
    source: String,
    segments: Vec<Segment>,
    /// Distinct placeholders, in order of first appearance
    placeholders: Vec<Placeholder>,
}

impl PromptTemplate {
    /// Parse a template, rejecting unbalanced braces and unsupported fields
    pub fn parse(template: &str) -> Result<Self> {
        let mut segments = Vec::new();
        let mut placeholders = Vec::new();
        let mut text = String::new();
        let mut last = 0;
        // Bare `{}` are numbered left to right and can't be mixed with `{N}`
        let mut next_auto = 0;
        let mut saw_manual = false;

        for caps in TOKEN_RE.captures_iter(template) {
            let whole = caps.get(0).expect("capture 0 is the whole match");
            text.push_str(&template[last..whole.start()]);
            last = whole.end();

            match whole.as_str() {
                "{{" => text.push('{'),
                "}}" => text.push('}'),
                "{" | "}" => {
                    return Err(Error::InvalidTemplate {
                        position: whole.start(),
                        reason: format!("single '{}' (use doubled braces for a literal)", whole.as_str()),
                    });
                }
                _ => {
                    let field = caps.get(1).map_or("", |m| m.as_str());
                    let invalid = |reason: String| Error::InvalidTemplate {
                        position: whole.start(),
                        reason,
                    };
                    let placeholder = if field.is_empty() {
                        if saw_manual {
                            return Err(invalid(MIXED_NUMBERING.to_string()));
                        }
                        next_auto += 1;
                        Placeholder::Positional(next_auto - 1)
                    } else {
                        let placeholder = parse_field(field).map_err(invalid)?;
                        if let Placeholder::Positional(_) = placeholder {
                            if next_auto > 0 {
                                return Err(invalid(MIXED_NUMBERING.to_string()));
                            }
                            saw_manual = true;
                        }
                        placeholder
                    };

                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    if !placeholders.contains(&placeholder) {
                        placeholders.push(placeholder.clone());
                    }
                    segments.push(Segment::Slot(placeholder));
                }
            }
        }

        text.push_str(&template[last..]);
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self {
            source: template.to_string(),
            segments,
            placeholders,
        })
    }

    /// The template as written
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Distinct placeholders, in order of first appearance
    pub fn placeholders(&self) -> &[Placeholder] {
        &self.placeholders
    }

    /// Fill named placeholders from a row's fields
    pub fn render_fields(&self, fields: &Map<String, Value>) -> Result<String> {
        self.fill(|placeholder| match placeholder {
            Placeholder::Named(name) => fields
                .get(name)
                .map(display_value)
                .ok_or_else(|| Error::MissingField(name.clone())),
            Placeholder::Positional(_) => Err(Error::TemplateMismatch(format!(
                "positional placeholder {} needs a single-column input",
                placeholder
            ))),
        })
    }

    /// Fill the template's only placeholder with `value`
    ///
    /// The placeholder may be positional or named; a template without
    /// placeholders renders unchanged.
    pub fn render_scalar(&self, value: &Value) -> Result<String> {
        if self.placeholders.len() > 1 {
            let names: Vec<String> = self.placeholders.iter().map(ToString::to_string).collect();
            return Err(Error::TemplateMismatch(format!(
                "template has {} placeholders ({}) but the input is a single column",
                names.len(),
                names.join(", ")
            )));
        }

        let text = display_value(value);
        self.fill(|placeholder| match placeholder {
            Placeholder::Positional(index) if *index > 0 => Err(Error::TemplateMismatch(format!(
                "placeholder {} is out of range for a single value",
                placeholder
            ))),
            _ => Ok(text.clone()),
        })
    }

    /// Render a normalized record
    pub fn render(&self, record: &Record) -> Result<String> {
        match record {
            Record::Fields(fields) => self.render_fields(fields),
            Record::Scalar(value) => self.render_scalar(value),
        }
    }

    fn fill<F>(&self, mut lookup: F) -> Result<String>
    where
        F: FnMut(&Placeholder) -> Result<String>,
    {
        let mut out = String::with_capacity(self.source.len());
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(placeholder) => out.push_str(&lookup(placeholder)?),
            }
        }
        Ok(out)
    }
}

impl FromStr for PromptTemplate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

const MIXED_NUMBERING: &str = "cannot mix automatic '{}' and manual '{N}' numbering";

fn parse_field(field: &str) -> std::result::Result<Placeholder, String> {
    if field.bytes().all(|b| b.is_ascii_digit()) {
        return field
            .parse()
            .map(Placeholder::Positional)
            .map_err(|_| format!("positional index '{}' is too large", field));
    }
    if let Some(c) = field.chars().find(|c| matches!(c, '.' | '[' | ']' | ':' | '!')) {
        return Err(format!(
            "'{}' in '{{{}}}': attribute access, indexing and format specs are not supported",
            c, field
        ));
    }
    Ok(Placeholder::Named(field.to_string()))
}
