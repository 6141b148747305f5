//! The built-in identity-document form and the fields extracted for it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::forms::model::{FieldDescriptor, FieldKind, FormModel, MergeOutcome};

pub const PHOTO: &str = "photo";
pub const NAME: &str = "name";
pub const DOB: &str = "dob";
pub const GENDER: &str = "gender";
pub const ADDRESS: &str = "address";
pub const AADHAAR: &str = "aadhaar";
pub const PAN: &str = "pan";

/// Fields the gateway pulls out of an identity document. Every field is optional;
/// `None` means "not found in the document".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// `YYYY-MM-DD`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dob: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    /// First national ID (Aadhaar number).
    #[serde(default, alias = "aadhaar", skip_serializing_if = "Option::is_none")]
    pub national_id_1: Option<String>,
    /// Second national ID (PAN).
    #[serde(default, alias = "pan", skip_serializing_if = "Option::is_none")]
    pub national_id_2: Option<String>,
}

impl DefaultFields {
    /// Trims every value and turns blanks into `None`.
    pub fn normalized(self) -> Self {
        fn clean(v: Option<String>) -> Option<String> {
            v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
        }
        Self {
            name: clean(self.name),
            dob: clean(self.dob),
            gender: clean(self.gender),
            address: clean(self.address),
            national_id_1: clean(self.national_id_1),
            national_id_2: clean(self.national_id_2),
        }
    }

    /// Present values keyed by their default-form field name.
    pub fn to_field_map(&self) -> BTreeMap<String, String> {
        [
            (NAME, &self.name),
            (DOB, &self.dob),
            (GENDER, &self.gender),
            (ADDRESS, &self.address),
            (AADHAAR, &self.national_id_1),
            (PAN, &self.national_id_2),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())))
        .collect()
    }
}

impl FormModel {
    /// The default identity form: a photo slot followed by the six extracted fields.
    pub fn default_identity() -> Self {
        let mut form = FormModel::new();
        let fields = [
            FieldDescriptor::new(PHOTO, FieldKind::Photo).with_label("Photo"),
            FieldDescriptor::new(NAME, FieldKind::Text).with_label("Name"),
            FieldDescriptor::new(DOB, FieldKind::Date).with_label("Date of Birth"),
            FieldDescriptor::new(GENDER, FieldKind::Text).with_label("Gender"),
            FieldDescriptor::new(ADDRESS, FieldKind::Text).with_label("Address"),
            FieldDescriptor::new(AADHAAR, FieldKind::Text).with_label("Aadhaar Number"),
            FieldDescriptor::new(PAN, FieldKind::Text).with_label("PAN Number"),
        ];
        for field in fields {
            // Names above are distinct constants.
            let _ = form.add_field(field);
        }
        form
    }

    pub fn apply_default_fields(&mut self, extracted: &DefaultFields) -> MergeOutcome {
        self.merge_extracted(&extracted.to_field_map())
    }
}
