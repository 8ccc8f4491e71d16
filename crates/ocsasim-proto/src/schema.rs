//! System and stream descriptions sent to the hub at registration time.
//!
//! These mirror the SWE Common data components the hub expects: a
//! [`DataRecordSchema`] is a labelled list of [`Component`]s, each carrying a
//! name, label and definition URI.

use serde::Serialize;

/// Definition URI of the standard sampling-time field.
pub const SAMPLING_TIME_DEFINITION: &str = "http://www.opengis.net/def/property/OGC/0/SamplingTime";

/// Unit-of-measure href for ISO-8601 Gregorian timestamps.
pub const ISO8601_UOM_HREF: &str = "http://www.opengis.net/def/uom/ISO-8601/0/Gregorian";

/// A system (sensor) as registered with the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SystemDescription {
    /// Machine name, lowerCamel form of `label`.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Unique resource name, `urn:OCSASim:<kind>:<name>`.
    pub urn: String,
}

impl SystemDescription {
    /// Describe a sim of `kind` labelled `label`.
    pub fn new(kind: &str, label: &str) -> Self {
        let name = to_lower_camel(label);
        let urn = format!("urn:OCSASim:{kind}:{name}");
        Self { name, label: label.to_string(), urn }
    }
}

/// Name, label and definition shared by every component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldMeta {
    /// Field key as it appears in observation results or command parameters.
    pub name: String,
    /// Human-readable label.
    pub label: String,
    /// Semantic definition URI.
    pub definition: String,
    /// Optional longer description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Unit of measure reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Uom {
    /// Unit given by URI.
    Href {
        /// Unit URI.
        href: String,
    },
    /// Unit given by UCUM code.
    Code {
        /// UCUM code, e.g. `deg`.
        code: String,
        /// Human-readable unit label.
        label: String,
    },
}

/// A SWE Common data component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum Component {
    /// Timestamp.
    Time {
        /// Shared metadata.
        #[serde(flatten)]
        meta: FieldMeta,
        /// Time reference.
        uom: Uom,
    },
    /// Integer count.
    Count {
        /// Shared metadata.
        #[serde(flatten)]
        meta: FieldMeta,
    },
    /// Boolean flag.
    Boolean {
        /// Shared metadata.
        #[serde(flatten)]
        meta: FieldMeta,
    },
    /// Real-valued quantity with a unit.
    Quantity {
        /// Shared metadata.
        #[serde(flatten)]
        meta: FieldMeta,
        /// Unit of measure.
        uom: Uom,
    },
    /// Fixed-size vector of quantities in a reference frame.
    Vector {
        /// Shared metadata.
        #[serde(flatten)]
        meta: FieldMeta,
        /// CRS URI.
        #[serde(rename = "referenceFrame")]
        reference_frame: String,
        /// Vector coordinates.
        coordinates: Vec<Component>,
    },
}

impl Component {
    /// The standard `timestamp` field.
    pub fn timestamp() -> Self {
        Self::Time {
            meta: FieldMeta {
                name: "timestamp".to_string(),
                label: "Timestamp".to_string(),
                definition: SAMPLING_TIME_DEFINITION.to_string(),
                description: None,
            },
            uom: Uom::Href { href: ISO8601_UOM_HREF.to_string() },
        }
    }

    /// An integer count field.
    pub fn count(name: &str, label: &str, definition: &str) -> Self {
        Self::Count { meta: meta(name, label, definition) }
    }

    /// A boolean field.
    pub fn boolean(name: &str, label: &str, definition: &str) -> Self {
        Self::Boolean { meta: meta(name, label, definition) }
    }

    /// A quantity measured in UCUM unit `code`.
    pub fn quantity(name: &str, label: &str, definition: &str, code: &str, unit: &str) -> Self {
        Self::Quantity {
            meta: meta(name, label, definition),
            uom: Uom::Code { code: code.to_string(), label: unit.to_string() },
        }
    }

    /// A vector of `coordinates` in `reference_frame`.
    pub fn vector(
        name: &str,
        label: &str,
        definition: &str,
        reference_frame: &str,
        coordinates: Vec<Self>,
    ) -> Self {
        Self::Vector {
            meta: meta(name, label, definition),
            reference_frame: reference_frame.to_string(),
            coordinates,
        }
    }

    /// Field metadata.
    pub fn meta(&self) -> &FieldMeta {
        match self {
            Self::Time { meta, .. }
            | Self::Count { meta }
            | Self::Boolean { meta }
            | Self::Quantity { meta, .. }
            | Self::Vector { meta, .. } => meta,
        }
    }

    /// Field name.
    pub fn name(&self) -> &str {
        &self.meta().name
    }
}

/// Record structure of a datastream or control stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DataRecordSchema {
    /// Human-readable label.
    pub label: String,
    /// Longer description.
    pub description: String,
    /// Semantic definition URI of the record.
    pub definition: String,
    /// Record fields, in order.
    pub fields: Vec<Component>,
}

impl DataRecordSchema {
    /// Create an empty record.
    pub fn new(label: &str, description: &str, definition: &str) -> Self {
        Self {
            label: label.to_string(),
            description: description.to_string(),
            definition: definition.to_string(),
            fields: Vec::new(),
        }
    }

    /// Append a field.
    #[must_use]
    pub fn with_field(mut self, field: Component) -> Self {
        self.fields.push(field);
        self
    }

    /// Names of the top-level fields, in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Component::name)
    }
}

fn meta(name: &str, label: &str, definition: &str) -> FieldMeta {
    FieldMeta {
        name: name.to_string(),
        label: label.to_string(),
        definition: definition.to_string(),
        description: None,
    }
}

/// Convert a label such as `"Sim GPS"` or `"controllable_counter"` to
/// lowerCamel (`"simGPS"`, `"controllableCounter"`).
pub fn to_lower_camel(label: &str) -> String {
    let mut out = String::with_capacity(label.len());
    let words = label.split(|c: char| c.is_whitespace() || c == '_' || c == '-');

    for word in words.filter(|w| !w.is_empty()) {
        let mut chars = word.chars();
        let Some(first) = chars.next() else { continue };
        if out.is_empty() {
            out.extend(first.to_lowercase());
        } else {
            out.extend(first.to_uppercase());
        }
        out.push_str(chars.as_str());
    }

    out
}
