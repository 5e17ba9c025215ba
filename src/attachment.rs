//! Attachment collector: files picked by the user before a turn is sent.
//!
//! DESIGN
//! ======
//! Raw selections (`name` + byte size) become immutable `FileDescriptor`s the
//! moment they are attached. The category is derived from the filename, never
//! chosen by the user. `drain` hands the pending list to the outgoing message
//! and leaves the collector empty.

use serde::{Deserialize, Serialize};

// =============================================================================
// TYPES
// =============================================================================

/// Coarse file category used for chip icons and the analysis prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    Gerber,
    Bom,
    Other,
}

impl FileCategory {
    /// Infer the category from a filename. Archives are Gerber packages,
    /// everything else is treated as a BOM.
    #[must_use]
    pub fn from_name(name: &str) -> Self {
        let lower = name.to_lowercase();
        if lower.ends_with(".zip") || lower.ends_with(".rar") {
            Self::Gerber
        } else {
            Self::Bom
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Gerber => "gerber",
            Self::Bom => "bom",
            Self::Other => "other",
        }
    }
}

/// A file as reported by the host environment (file picker, upload form).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFile {
    pub name: String,
    pub byte_size: u64,
}

impl RawFile {
    pub fn new(name: impl Into<String>, byte_size: u64) -> Self {
        Self { name: name.into(), byte_size }
    }
}

/// An attached file, frozen at selection time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileDescriptor {
    pub name: String,
    pub category: FileCategory,
    pub size_label: String,
}

impl FileDescriptor {
    #[must_use]
    pub fn from_raw(raw: &RawFile) -> Self {
        Self { name: raw.name.clone(), category: FileCategory::from_name(&raw.name), size_label: size_label(raw.byte_size) }
    }
}

/// Format a byte count as kilobytes with one decimal, e.g. `"12.0KB"`.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn size_label(byte_size: u64) -> String {
    format!("{:.1}KB", byte_size as f64 / 1024.0)
}

// =============================================================================
// COLLECTOR
// =============================================================================

/// Pending attachments for the next outgoing message.
#[derive(Debug, Clone, Default)]
pub struct AttachmentCollector {
    pending: Vec<FileDescriptor>,
}

impl AttachmentCollector {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one descriptor per raw file, in selection order.
    pub fn attach(&mut self, raw_files: &[RawFile]) {
        self.pending
            .extend(raw_files.iter().map(FileDescriptor::from_raw));
    }

    /// Remove the descriptor at `index`. Out-of-range indexes are ignored.
    pub fn remove(&mut self, index: usize) {
        if index < self.pending.len() {
            self.pending.remove(index);
        }
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Take the pending list for an outgoing message, leaving it empty.
    pub fn drain(&mut self) -> Vec<FileDescriptor> {
        std::mem::take(&mut self.pending)
    }

    #[must_use]
    pub fn pending(&self) -> &[FileDescriptor] {
        &self.pending
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[path = "attachment_test.rs"]
mod tests;
