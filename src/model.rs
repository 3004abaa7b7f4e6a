use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub type Rgb = [u8; 3];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FontFace {
    Regular,
    Bold,
}

/// The fixed set of named text styles a report uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextStyle {
    Title,
    Subtitle,
    Label,
    Body,
    Value,
}

/// Resolved style passed explicitly to every draw call.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StyleSpec {
    pub face: FontFace,
    pub font_size: f32,
    pub color: Rgb,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Entry {
    /// Bold label followed by wrapped explanatory text.
    Explained { label: String, explanation: String },
    /// Label followed by a single value line.
    Value { label: String, value: String },
}

impl Entry {
    pub fn explained(label: impl Into<String>, explanation: impl Into<String>) -> Self {
        Entry::Explained {
            label: label.into(),
            explanation: explanation.into(),
        }
    }

    pub fn value(label: impl Into<String>, value: impl Into<String>) -> Self {
        Entry::Value {
            label: label.into(),
            value: value.into(),
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Entry::Explained { label, .. } | Entry::Value { label, .. } => label,
        }
    }
}

/// How a section's entries are distributed over pages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LayoutPolicy {
    /// Start a new page only when vertical space runs out.
    Overflow,
    /// One group of entries per page, with the listed group sizes. Entries past
    /// the listed sizes form one final group. The page count never depends on
    /// text length.
    FixedGroups(Vec<usize>),
    /// Like `Overflow`, but also break after `n` entries on a page.
    Capped(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectionKind {
    Benefits,
    CoreNeeds,
    Demographics,
    Objections,
    TechnicalQuestions,
    Competitors,
    DerivedNeeds,
}

impl SectionKind {
    pub const ALL: [SectionKind; 7] = [
        SectionKind::Benefits,
        SectionKind::CoreNeeds,
        SectionKind::Demographics,
        SectionKind::Objections,
        SectionKind::TechnicalQuestions,
        SectionKind::Competitors,
        SectionKind::DerivedNeeds,
    ];

    pub fn name(self) -> &'static str {
        match self {
            SectionKind::Benefits => "benefits",
            SectionKind::CoreNeeds => "core-needs",
            SectionKind::Demographics => "demographics",
            SectionKind::Objections => "objections",
            SectionKind::TechnicalQuestions => "technical-questions",
            SectionKind::Competitors => "competitors",
            SectionKind::DerivedNeeds => "derived-needs",
        }
    }
}

impl fmt::Display for SectionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SectionKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SectionKind::ALL
            .into_iter()
            .find(|k| k.name() == s)
            .ok_or_else(|| format!("unknown section: {s}"))
    }
}

#[derive(Clone, Debug)]
pub struct Section {
    pub kind: SectionKind,
    pub subtitle: String,
    pub entries: Vec<Entry>,
    pub policy: LayoutPolicy,
}
