//! Session transcript: the ordered, append-only message log.
//!
//! DESIGN
//! ======
//! Messages are immutable once appended. The transcript is the only place
//! messages are created, which lets it stamp ids and keep timestamps
//! non-decreasing even if the wall clock steps backwards.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::attachment::FileDescriptor;

// =============================================================================
// ANALYSIS RESULT
// =============================================================================

/// Which of the four report sections a step belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StepCategory {
    Design,
    Dfm,
    Cost,
    Risk,
}

impl StepCategory {
    /// Report order: design, dfm, cost, risk.
    pub const ALL: [StepCategory; 4] = [Self::Design, Self::Dfm, Self::Cost, Self::Risk];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Design => "design",
            Self::Dfm => "dfm",
            Self::Cost => "cost",
            Self::Risk => "risk",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(raw.trim()))
    }
}

/// Ordered label → value rows shown under a step card.
///
/// Labels are unique. Re-inserting a label replaces its value in place, so
/// the row keeps the position of its first appearance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Details {
    entries: Vec<(String, String)>,
}

impl Details {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((label, value)),
        }
    }

    #[must_use]
    pub fn get(&self, label: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .iter()
            .map(|(l, v)| (l.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<L: Into<String>, V: Into<String>> FromIterator<(L, V)> for Details {
    fn from_iter<I: IntoIterator<Item = (L, V)>>(iter: I) -> Self {
        let mut details = Self::new();
        for (label, value) in iter {
            details.insert(label, value);
        }
        details
    }
}

impl Serialize for Details {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (label, value) in &self.entries {
            map.serialize_entry(label, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Details {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct DetailsVisitor;

        impl<'de> Visitor<'de> for DetailsVisitor {
            type Value = Details;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of detail labels to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Details, A::Error> {
                let mut details = Details::new();
                while let Some((label, value)) = access.next_entry::<String, String>()? {
                    details.insert(label, value);
                }
                Ok(details)
            }
        }

        deserializer.deserialize_map(DetailsVisitor)
    }
}

/// One section of the quotation report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisStep {
    pub title: String,
    pub content: String,
    pub category: StepCategory,
    #[serde(default)]
    pub details: Details,
}

/// Structured report produced for one assistant turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub reasoning: String,
    pub steps: Vec<AnalysisStep>,
}

// =============================================================================
// MESSAGE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Author {
    User,
    Assistant,
}

/// A transcript entry. Only the transcript constructs these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub author: Author,
    pub text: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<FileDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<AnalysisResult>,
    /// Milliseconds since Unix epoch.
    pub created_at: i64,
}

// =============================================================================
// TRANSCRIPT
// =============================================================================

/// Current time as milliseconds since Unix epoch.
pub(crate) fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a user message and return a copy of it.
    pub fn push_user(&mut self, text: impl Into<String>, attachments: Vec<FileDescriptor>) -> Message {
        self.push(Author::User, text.into(), attachments, None)
    }

    /// Append an assistant message whose display text is the reasoning.
    pub fn push_assistant(&mut self, analysis: AnalysisResult) -> Message {
        let text = analysis.reasoning.clone();
        self.push(Author::Assistant, text, Vec::new(), Some(analysis))
    }

    fn push(
        &mut self,
        author: Author,
        text: String,
        attachments: Vec<FileDescriptor>,
        analysis: Option<AnalysisResult>,
    ) -> Message {
        let floor = self.messages.last().map_or(0, |m| m.created_at);
        let message = Message {
            id: Uuid::new_v4().to_string(),
            author,
            text,
            attachments,
            analysis,
            created_at: now_ms().max(floor),
        };
        self.messages.push(message.clone());
        message
    }

    #[must_use]
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[cfg(test)]
#[path = "transcript_test.rs"]
mod tests;
