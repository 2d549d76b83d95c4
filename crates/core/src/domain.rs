use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Record attributes for which aggregate counts are maintained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackedField {
    Year,
    Month,
    Tags,
    Model,
    Lens,
    Email,
    Nick,
}

impl TrackedField {
    /// All tracked fields, in the order compound changes visit them.
    pub const ALL: [TrackedField; 7] = [
        TrackedField::Year,
        TrackedField::Month,
        TrackedField::Tags,
        TrackedField::Model,
        TrackedField::Lens,
        TrackedField::Email,
        TrackedField::Nick,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TrackedField::Year => "year",
            TrackedField::Month => "month",
            TrackedField::Tags => "tags",
            TrackedField::Model => "model",
            TrackedField::Lens => "lens",
            TrackedField::Email => "email",
            TrackedField::Nick => "nick",
        }
    }

    /// Set-valued fields count every member once per record.
    pub fn is_set_valued(&self) -> bool {
        matches!(self, TrackedField::Tags)
    }
}

impl fmt::Display for TrackedField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TrackedField {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TrackedField::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::UnknownField(s.to_string()))
    }
}

/// A photo record as stored in the catalog.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Photo {
    pub id: String,
    pub size: u64,
    pub email: String,
    pub nick: String,
    pub headline: String,
    /// `YYYY-MM-DD HH:MM`
    pub date: String,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub focal_length: Option<u32>,
    pub aperture: Option<f64>,
    pub shutter: Option<String>,
    pub iso: Option<u32>,
    pub flash: bool,
    pub dim: Option<(u32, u32)>,
    pub loc: Option<String>,
    pub tags: Vec<String>,
    /// Searchable prefix tokens of the headline.
    pub text: Vec<String>,
}

impl Photo {
    /// Values this record contributes to the counters of `field`.
    /// Empty strings and zero year/month contribute nothing.
    pub fn values_for(&self, field: TrackedField) -> Vec<String> {
        match field {
            TrackedField::Year => self
                .year
                .filter(|y| *y != 0)
                .map(|y| y.to_string())
                .into_iter()
                .collect(),
            TrackedField::Month => self
                .month
                .filter(|m| *m != 0)
                .map(|m| m.to_string())
                .into_iter()
                .collect(),
            TrackedField::Tags => {
                let mut seen: Vec<String> = Vec::with_capacity(self.tags.len());
                for tag in self.tags.iter().filter(|t| !t.is_empty()) {
                    if !seen.contains(tag) {
                        seen.push(tag.clone());
                    }
                }
                seen
            }
            TrackedField::Model => non_empty(self.model.as_deref()),
            TrackedField::Lens => non_empty(self.lens.as_deref()),
            TrackedField::Email => non_empty(Some(&self.email)),
            TrackedField::Nick => non_empty(Some(&self.nick)),
        }
    }
}

fn non_empty(value: Option<&str>) -> Vec<String> {
    value
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .into_iter()
        .collect()
}

/// Input for publishing a new photo.
#[derive(Debug, Clone, Default)]
pub struct PhotoDraft {
    pub id: String,
    pub size: u64,
    pub email: String,
    pub headline: Option<String>,
    pub tags: Vec<String>,
    pub exif: crate::exif::ExifFields,
}

/// Field updates for an existing photo. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default)]
pub struct PhotoUpdate {
    pub headline: Option<String>,
    pub email: Option<String>,
    pub date: Option<String>,
    pub model: Option<Option<String>>,
    pub lens: Option<Option<String>>,
    pub tags: Option<Vec<String>>,
}

/// One ledger entry: how many live records exhibit `value` in `field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CounterEntry {
    pub field: TrackedField,
    pub value: String,
    pub count: u64,
}

/// Total storage used by original images.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Bucket {
    pub size: u64,
    pub count: u64,
}

/// Gallery filter. Scalar fields are equality filters; `tags` and `text`
/// match photos containing any of the given values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub day: Option<u32>,
    pub model: Option<String>,
    pub lens: Option<String>,
    pub nick: Option<String>,
    pub tags: Vec<String>,
    pub text: Vec<String>,
}

/// One gallery page, newest first.
#[derive(Debug, Clone)]
pub struct Page {
    pub photos: Vec<Photo>,
    /// Cursor for the next page, `None` on the last page.
    pub next: Option<String>,
}
