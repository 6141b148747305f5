//! FormModel — ordered field descriptors plus their current values.
//!
//! Descriptor order is display and layout order. Values live in a name-keyed map;
//! a field with no entry in the map is "absent". The model enforces two invariants:
//! field names are unique, and a value always matches its field's kind.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::forms::label::humanize;

// ────────────────────────────────────────────────────────────────────────────
// Field types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    Text,
    Date,
    Checkbox,
    Photo,
}

/// Static definition of one field. `kind` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub name: String,
    pub kind: FieldKind,
    /// Display label. Derived from `name` when left empty.
    #[serde(default)]
    pub label: String,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        let name = name.into();
        let label = humanize(&name);
        Self { name, kind, label }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}

/// A field as returned by schema inference: name and kind only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaField {
    pub name: String,
    #[serde(rename = "type", alias = "kind")]
    pub kind: FieldKind,
}

/// Reference to an embedded raster image, held as a `data:` URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageRef(String);

impl ImageRef {
    pub fn new(data_uri: impl Into<String>) -> Self {
        Self(data_uri.into())
    }

    pub fn as_data_uri(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum FieldValue {
    /// Text and date kinds. An empty string means absent.
    Text(String),
    /// Checkbox kind.
    Flag(bool),
    /// Photo kind.
    Image(ImageRef),
}

impl FieldValue {
    /// Whether this value may be stored in a field of `kind`.
    pub fn fits(&self, kind: FieldKind) -> bool {
        matches!(
            (self, kind),
            (FieldValue::Text(_), FieldKind::Text | FieldKind::Date)
                | (FieldValue::Flag(_), FieldKind::Checkbox)
                | (FieldValue::Image(_), FieldKind::Photo)
        )
    }

    /// Text is present when non-blank; images when the URI is non-empty.
    /// Flags always count as present.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Text(s) => !s.trim().is_empty(),
            FieldValue::Flag(_) => true,
            FieldValue::Image(img) => !img.as_data_uri().is_empty(),
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum FormError {
    #[error("field name cannot be empty")]
    EmptyName,

    #[error("duplicate field '{0}'")]
    DuplicateField(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("value does not match kind {kind:?} of field '{field}'")]
    KindMismatch { field: String, kind: FieldKind },
}

/// Names of fields an auto-fill merge changed, in form order.
/// The client highlights these.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergeOutcome {
    pub updated: Vec<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// FormModel
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormModel {
    fields: Vec<FieldDescriptor>,
    #[serde(default)]
    values: BTreeMap<String, FieldValue>,
}

impl FormModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an empty form from an inferred schema. Checkboxes start unchecked;
    /// every other field starts absent. Blank and repeated names are skipped.
    pub fn from_schema(schema: &[SchemaField]) -> Self {
        let mut form = Self::new();
        for field in schema {
            // Schema output is already sanitized; a rejected field is simply left out.
            let _ = form.add_field(FieldDescriptor::new(field.name.trim(), field.kind));
        }
        form
    }

    /// Appends a field. Checkbox fields are initialised to `false`.
    pub fn add_field(&mut self, mut descriptor: FieldDescriptor) -> Result<(), FormError> {
        if descriptor.name.trim().is_empty() {
            return Err(FormError::EmptyName);
        }
        if self.descriptor(&descriptor.name).is_some() {
            return Err(FormError::DuplicateField(descriptor.name));
        }
        if descriptor.label.trim().is_empty() {
            descriptor.label = humanize(&descriptor.name);
        }
        if descriptor.kind == FieldKind::Checkbox {
            self.values
                .insert(descriptor.name.clone(), FieldValue::Flag(false));
        }
        self.fields.push(descriptor);
        Ok(())
    }

    pub fn set_value(&mut self, name: &str, value: FieldValue) -> Result<(), FormError> {
        let kind = self
            .descriptor(name)
            .map(|d| d.kind)
            .ok_or_else(|| FormError::UnknownField(name.to_string()))?;
        if !value.fits(kind) {
            return Err(FormError::KindMismatch {
                field: name.to_string(),
                kind,
            });
        }
        self.values.insert(name.to_string(), value);
        Ok(())
    }

    pub fn descriptor(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|d| d.name == name)
    }

    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Descriptors in order, each paired with its value if one is set.
    pub fn entries(&self) -> impl Iterator<Item = (&FieldDescriptor, Option<&FieldValue>)> {
        self.fields.iter().map(|d| (d, self.value(&d.name)))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Merges gateway output into the form without ever clearing a field.
    ///
    /// A returned value overwrites the current one only if it is non-empty, names
    /// a known non-photo field, and actually differs. Those fields are reported
    /// in `MergeOutcome::updated` in form order.
    pub fn merge_extracted(&mut self, mapped: &BTreeMap<String, String>) -> MergeOutcome {
        let mut outcome = MergeOutcome::default();

        for descriptor in &self.fields {
            let Some(raw) = mapped.get(&descriptor.name) else {
                continue;
            };
            let raw = raw.trim();
            if raw.is_empty() {
                continue;
            }

            let incoming = match descriptor.kind {
                FieldKind::Text | FieldKind::Date => FieldValue::Text(raw.to_string()),
                FieldKind::Checkbox => match parse_flag(raw) {
                    Some(flag) => FieldValue::Flag(flag),
                    None => continue,
                },
                FieldKind::Photo => continue,
            };

            if self.value(&descriptor.name) != Some(&incoming) {
                self.values.insert(descriptor.name.clone(), incoming);
                outcome.updated.push(descriptor.name.clone());
            }
        }

        outcome
    }

    /// Checks a model received from a client: non-empty unique names, no values
    /// for unknown fields, every value matching its kind. Fills empty labels.
    pub fn validated(mut self) -> Result<Self, FormError> {
        let mut seen = HashSet::new();
        for descriptor in &mut self.fields {
            if descriptor.name.trim().is_empty() {
                return Err(FormError::EmptyName);
            }
            if !seen.insert(descriptor.name.clone()) {
                return Err(FormError::DuplicateField(descriptor.name.clone()));
            }
            if descriptor.label.trim().is_empty() {
                descriptor.label = humanize(&descriptor.name);
            }
        }

        for (name, value) in &self.values {
            let descriptor = self
                .descriptor(name)
                .ok_or_else(|| FormError::UnknownField(name.clone()))?;
            if !value.fits(descriptor.kind) {
                return Err(FormError::KindMismatch {
                    field: name.clone(),
                    kind: descriptor.kind,
                });
            }
        }

        Ok(self)
    }
}

/// Reads a checkbox answer out of free text.
pub(crate) fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "1" | "on" | "checked" => Some(true),
        "no" | "n" | "false" | "0" | "off" | "unchecked" => Some(false),
        _ => None,
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
impl FormModel {
    pub fn field_names(&self) -> Vec<String> {
        self.fields.iter().map(|d| d.name.clone()).collect()
    }
}
