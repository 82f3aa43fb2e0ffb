use std::{collections::HashMap, path::PathBuf};

use serde::Serialize;

/// A spooled file part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileInfo {
    /// The uploaded filename.
    pub name: String,
    /// The form field the file was sent under.
    pub field: String,
    /// Where the bytes were spooled.
    pub path: PathBuf,
    /// The part's own `Content-Type`, if any.
    pub content_type: Option<String>,
    /// Bytes written to `path`.
    pub size: u64,
}

/// Parsed form-data: scalar fields plus spooled files.
///
/// Serializes as `{ "<field>": "<value>", ..., "$files": [...] }`,
/// `$files` is left out when there are no files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Form {
    /// Field values by name, the first occurrence of a name wins.
    #[serde(flatten)]
    pub fields: HashMap<String, String>,
    /// Files in body order.
    #[serde(rename = "$files", skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<FileInfo>,
}

pub(crate) enum Entry {
    Field(String, String),
    File(FileInfo),
}

impl Form {
    /// Gets a field value.
    #[must_use]
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    /// Gets the first file sent under `field`.
    #[must_use]
    pub fn file(&self, field: &str) -> Option<&FileInfo> {
        self.files.iter().find(|f| f.field == field)
    }

    /// No field and no file survived.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.files.is_empty()
    }

    pub(crate) fn assemble(entries: impl IntoIterator<Item = Entry>) -> Self {
        let mut form = Self::default();
        for entry in entries {
            match entry {
                Entry::Field(name, value) => {
                    form.fields.entry(name).or_insert(value);
                }
                Entry::File(info) => form.files.push(info),
            }
        }
        form
    }
}
