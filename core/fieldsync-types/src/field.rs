//! Field descriptors, desired configurations and the field type catalogue.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Open, type-dependent property map of a field (options, ranges, formatting).
pub type Properties = serde_json::Map<String, Value>;

/// Identity of a remote table: the owning app plus the table within it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TableRef {
    pub app_token: String,
    pub table_id: String,
}

impl TableRef {
    /// Creates a table reference.
    pub fn new(app_token: impl Into<String>, table_id: impl Into<String>) -> Self {
        Self {
            app_token: app_token.into(),
            table_id: table_id.into(),
        }
    }
}

impl fmt::Display for TableRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.app_token, self.table_id)
    }
}

/// A live field as reported by the remote service.
///
/// Descriptors are snapshots: every fetch produces fresh values and nothing
/// in the engine mutates one after it is received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    pub id: String,
    pub name: String,
    pub type_code: i32,
    pub ui_type: String,
    #[serde(default)]
    pub is_primary: bool,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldDescriptor {
    /// Returns the catalogue entry for this field's type code.
    pub fn field_type(&self) -> FieldType {
        FieldType::from_code(self.type_code)
    }

    /// Builds the configuration that would reproduce this field exactly.
    pub fn to_configuration(&self) -> FieldConfiguration {
        FieldConfiguration {
            name: self.name.clone(),
            type_code: self.type_code,
            ui_type: self.ui_type.clone(),
            properties: self.properties.clone(),
            description: self.description.clone(),
        }
    }
}

/// The caller's desired definition of a field.
///
/// There is no identifier: fields are matched by name because the id does
/// not exist until the field is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfiguration {
    pub name: String,
    pub type_code: i32,
    /// Empty means "let the service pick"; see [`FieldType::default_ui_type`].
    #[serde(default)]
    pub ui_type: String,
    #[serde(default)]
    pub properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldConfiguration {
    /// Creates a configuration with no properties and no description.
    pub fn new(name: impl Into<String>, type_code: i32, ui_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_code,
            ui_type: ui_type.into(),
            properties: Properties::new(),
            description: None,
        }
    }

    /// Creates a configuration for a catalogue type using its default UI type.
    pub fn of_type(name: impl Into<String>, field_type: FieldType) -> Self {
        Self::new(name, field_type.code(), field_type.default_ui_type())
    }

    /// Shorthand for a plain text field.
    pub fn text(name: impl Into<String>) -> Self {
        Self::of_type(name, FieldType::Text)
    }

    /// Shorthand for a plain number field.
    pub fn number(name: impl Into<String>) -> Self {
        Self::of_type(name, FieldType::Number)
    }

    /// Shorthand for a single select field with the given option names.
    pub fn single_select<I, S>(name: impl Into<String>, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let options: Vec<Value> = options
            .into_iter()
            .map(|o| serde_json::json!({ "name": o.into() }))
            .collect();
        Self::of_type(name, FieldType::SingleSelect).with_property("options", Value::Array(options))
    }

    /// Shorthand for a star rating: a number field rendered as a rating scale.
    pub fn rating(name: impl Into<String>, min: i64, max: i64) -> Self {
        Self::new(name, FieldType::Number.code(), "Rating")
            .with_property("min", Value::from(min))
            .with_property("max", Value::from(max))
            .with_property("rating", serde_json::json!({ "symbol": "star" }))
    }

    /// Sets a single property.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Fills an empty UI type with the catalogue default for the type code.
    pub fn with_default_ui_type(mut self) -> Self {
        if self.ui_type.is_empty() {
            self.ui_type = self.field_type().default_ui_type().to_string();
        }
        self
    }

    /// Returns the catalogue entry for this configuration's type code.
    pub fn field_type(&self) -> FieldType {
        FieldType::from_code(self.type_code)
    }
}

/// Known field type codes of the remote service.
///
/// Unrecognised codes are preserved in [`FieldType::Unknown`] so newer
/// remote types pass through untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Text,
    Number,
    SingleSelect,
    MultiSelect,
    DateTime,
    Checkbox,
    User,
    Phone,
    Url,
    Attachment,
    Link,
    Lookup,
    Formula,
    DuplexLink,
    Location,
    GroupChat,
    CreatedTime,
    ModifiedTime,
    CreatedUser,
    ModifiedUser,
    AutoNumber,
    Unknown(i32),
}

impl FieldType {
    /// Maps a wire type code to a catalogue entry.
    pub fn from_code(code: i32) -> Self {
        match code {
            1 => Self::Text,
            2 => Self::Number,
            3 => Self::SingleSelect,
            4 => Self::MultiSelect,
            5 => Self::DateTime,
            7 => Self::Checkbox,
            11 => Self::User,
            13 => Self::Phone,
            15 => Self::Url,
            17 => Self::Attachment,
            18 => Self::Link,
            19 => Self::Lookup,
            20 => Self::Formula,
            21 => Self::DuplexLink,
            22 => Self::Location,
            23 => Self::GroupChat,
            1001 => Self::CreatedTime,
            1002 => Self::ModifiedTime,
            1003 => Self::CreatedUser,
            1004 => Self::ModifiedUser,
            1005 => Self::AutoNumber,
            other => Self::Unknown(other),
        }
    }

    /// Returns the wire type code.
    pub fn code(self) -> i32 {
        match self {
            Self::Text => 1,
            Self::Number => 2,
            Self::SingleSelect => 3,
            Self::MultiSelect => 4,
            Self::DateTime => 5,
            Self::Checkbox => 7,
            Self::User => 11,
            Self::Phone => 13,
            Self::Url => 15,
            Self::Attachment => 17,
            Self::Link => 18,
            Self::Lookup => 19,
            Self::Formula => 20,
            Self::DuplexLink => 21,
            Self::Location => 22,
            Self::GroupChat => 23,
            Self::CreatedTime => 1001,
            Self::ModifiedTime => 1002,
            Self::CreatedUser => 1003,
            Self::ModifiedUser => 1004,
            Self::AutoNumber => 1005,
            Self::Unknown(code) => code,
        }
    }

    /// The UI type the remote service assigns when none is requested.
    pub fn default_ui_type(self) -> &'static str {
        match self {
            Self::Text => "Text",
            Self::Number => "Number",
            Self::SingleSelect => "SingleSelect",
            Self::MultiSelect => "MultiSelect",
            Self::DateTime => "DateTime",
            Self::Checkbox => "Checkbox",
            Self::User => "User",
            Self::Phone => "Phone",
            Self::Url => "Url",
            Self::Attachment => "Attachment",
            Self::Link => "SingleLink",
            Self::Lookup => "Lookup",
            Self::Formula => "Formula",
            Self::DuplexLink => "DuplexLink",
            Self::Location => "Location",
            Self::GroupChat => "GroupChat",
            Self::CreatedTime => "CreatedTime",
            Self::ModifiedTime => "ModifiedTime",
            Self::CreatedUser => "CreatedUser",
            Self::ModifiedUser => "ModifiedUser",
            Self::AutoNumber => "AutoNumber",
            Self::Unknown(_) => "",
        }
    }

    /// System-maintained types whose values the service fills in itself.
    pub fn is_system(self) -> bool {
        matches!(
            self,
            Self::CreatedTime
                | Self::ModifiedTime
                | Self::CreatedUser
                | Self::ModifiedUser
                | Self::AutoNumber
        )
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown(code) => write!(f, "unknown({code})"),
            other => write!(f, "{}", other.default_ui_type()),
        }
    }
}
