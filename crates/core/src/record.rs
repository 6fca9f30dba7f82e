use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use crate::normalize::{clean_name, looks_like_national_id, normalize_national_id};

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn random() -> Self {
        RecordId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

/// One name / national-ID pair read off a document image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractedRecord {
    pub id: RecordId,
    pub name: String,
    pub national_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_image_id: Option<String>,
}

impl ExtractedRecord {
    /// Build a record with a fresh id, cleaning both fields.
    pub fn new(name: &str, national_id: &str, source_image_id: Option<String>) -> Self {
        ExtractedRecord {
            id: RecordId::random(),
            name: clean_name(name),
            national_id: normalize_national_id(national_id),
            source_image_id,
        }
    }
}

/// The working set the user reviews before export.
///
/// Records keep their insertion order and ids are unique within the set.
#[derive(Debug, Clone, Default)]
pub struct RecordSet {
    records: Vec<ExtractedRecord>,
}

impl RecordSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append records, re-keying any whose id is already taken.
    pub fn extend(&mut self, incoming: impl IntoIterator<Item = ExtractedRecord>) {
        let mut taken: HashSet<RecordId> = self.records.iter().map(|r| r.id.clone()).collect();
        for mut record in incoming {
            while taken.contains(&record.id) {
                record.id = RecordId::random();
            }
            taken.insert(record.id.clone());
            self.records.push(record);
        }
    }

    /// Replace name and national ID of the record with `id`. Returns whether
    /// a record matched; an unknown id leaves the set untouched.
    pub fn edit(&mut self, id: &RecordId, name: &str, national_id: &str) -> bool {
        match self.records.iter_mut().find(|r| &r.id == id) {
            Some(record) => {
                record.name = name.trim().to_string();
                record.national_id = normalize_national_id(national_id);
                true
            }
            None => false,
        }
    }

    /// Remove the record with `id`. Returns whether one was removed.
    pub fn delete(&mut self, id: &RecordId) -> bool {
        match self.records.iter().position(|r| &r.id == id) {
            Some(idx) => {
                self.records.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: &RecordId) -> Option<&ExtractedRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExtractedRecord> {
        self.records.iter()
    }

    pub fn as_slice(&self) -> &[ExtractedRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records whose national ID is not 14 ASCII digits.
    pub fn suspicious_count(&self) -> usize {
        self.records
            .iter()
            .filter(|r| !looks_like_national_id(&r.national_id))
            .count()
    }
}

impl From<Vec<ExtractedRecord>> for RecordSet {
    fn from(records: Vec<ExtractedRecord>) -> Self {
        let mut set = RecordSet::new();
        set.extend(records);
        set
    }
}
