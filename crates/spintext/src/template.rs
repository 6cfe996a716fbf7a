//! Parsed spintext structure.

use std::fmt;
use std::str::FromStr;

use campaign_core::SyntaxError;
use serde::{Deserialize, Serialize};

/// One piece of a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Segment {
    /// Verbatim text.
    Literal(String),
    /// `{{name}}`, resolved per recipient.
    Variable(String),
    /// `{a|b|c}`. Always holds at least one option; options may be empty.
    Variation(Vec<Template>),
}

/// An ordered sequence of segments, as produced by [`crate::parse`].
///
/// Deserializing only accepts the canonical shape `parse` produces, so a
/// stored template always prints back to source that parses to itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTemplate")]
pub struct Template {
    pub segments: Vec<Segment>,
}

#[derive(Deserialize)]
struct RawTemplate {
    segments: Vec<Segment>,
}

impl TryFrom<RawTemplate> for Template {
    type Error = String;

    fn try_from(raw: RawTemplate) -> Result<Self, Self::Error> {
        let template = Template::new(raw.segments);
        let source = template.to_string();
        match crate::parse(&source) {
            Ok(reparsed) if reparsed == template => Ok(template),
            Ok(_) => Err(format!("template is not in canonical form: {source:?}")),
            Err(e) => Err(format!("template is not valid spintext: {e}")),
        }
    }
}

impl Template {
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// A template that renders to `text` unchanged.
    pub fn literal(text: impl Into<String>) -> Self {
        let text = text.into();
        if text.is_empty() {
            return Self::default();
        }
        Self::new(vec![Segment::Literal(text)])
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// True when the template has neither variables nor variation groups.
    pub fn is_static(&self) -> bool {
        self.segments
            .iter()
            .all(|s| matches!(s, Segment::Literal(_)))
    }

    /// Distinct variable names in order of first appearance, across every option.
    pub fn variables(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_variables(&mut names);
        names
    }

    fn collect_variables<'a>(&'a self, names: &mut Vec<&'a str>) {
        for segment in &self.segments {
            match segment {
                Segment::Literal(_) => {}
                Segment::Variable(name) => {
                    if !names.contains(&name.as_str()) {
                        names.push(name);
                    }
                }
                Segment::Variation(options) => {
                    for option in options {
                        option.collect_variables(names);
                    }
                }
            }
        }
    }

    /// Number of distinct option paths through the template, saturating at `u64::MAX`.
    ///
    /// Two paths can still render the same text (`{a|a}` counts as 2).
    pub fn variation_count(&self) -> u64 {
        self.segments.iter().fold(1u64, |acc, segment| {
            let n = match segment {
                Segment::Variation(options) => options
                    .iter()
                    .fold(0u64, |sum, o| sum.saturating_add(o.variation_count())),
                _ => 1,
            };
            acc.saturating_mul(n)
        })
    }
}

/// Re-emits source text. For templates from [`crate::parse`] or serde,
/// `parse(&t.to_string())` yields `t` again. Hand-built segments carry no
/// such guarantee: an empty group, a brace inside a literal, or a group
/// opening with another group print as text that parses differently.
impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => f.write_str(text)?,
                Segment::Variable(name) => write!(f, "{{{{{name}}}}}")?,
                Segment::Variation(options) => {
                    f.write_str("{")?;
                    for (i, option) in options.iter().enumerate() {
                        if i > 0 {
                            f.write_str("|")?;
                        }
                        write!(f, "{option}")?;
                    }
                    f.write_str("}")?;
                }
            }
        }
        Ok(())
    }
}

impl FromStr for Template {
    type Err = SyntaxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        crate::parse(s)
    }
}
