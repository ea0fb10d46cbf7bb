//! Invoice record and partial extraction types
//!
//! `Record` is the accumulating document and also the export wire format
//! consumed downstream: a JSON object with exactly `party`, `lineItems` and
//! `notes`. `PartialResult` is one extraction response; every field in it is
//! optional and deserialization never fails because of a single bad field.
//! A `null` or wrong-typed value is defaulted or dropped on its own so the
//! rest of the response survives.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Identity of the invoiced party (client, store or vendor)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Party {
    /// Full name or business name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// External identifier (tax id, CUIT, customer number)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Postal address
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Party {
    /// True when no field has been populated yet
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.id.is_none() && self.address.is_none()
    }
}

/// A single invoice line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: String,

    /// Defaults to 1 when the extractor omits it or sends something unusable
    #[serde(default = "default_quantity", deserialize_with = "lenient_quantity")]
    pub quantity: f64,

    #[serde(default, deserialize_with = "lenient_amount")]
    pub unit_price: f64,
}

fn default_quantity() -> f64 {
    1.0
}

impl LineItem {
    /// Create a new line item
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
        }
    }

    /// quantity × unitPrice
    pub fn subtotal(&self) -> f64 {
        self.quantity * self.unit_price
    }

    /// `quantity > 0` and `unitPrice >= 0`
    pub fn is_well_formed(&self) -> bool {
        self.quantity > 0.0 && self.unit_price >= 0.0
    }
}

/// The accumulating structured document
///
/// Serializes to the export wire format:
///
/// ```
/// use sdk::types::{LineItem, Record};
///
/// let mut record = Record::default();
/// record.line_items.push(LineItem::new("Bolt", 10.0, 2.0));
/// let json = serde_json::to_value(&record).unwrap();
/// assert_eq!(json["lineItems"][0]["unitPrice"], 2.0);
/// assert_eq!(json["party"], serde_json::json!({}));
/// assert_eq!(json["notes"], "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    #[serde(default)]
    pub party: Party,

    #[serde(default)]
    pub line_items: Vec<LineItem>,

    #[serde(default)]
    pub notes: String,
}

impl Record {
    /// Sum of all line subtotals
    pub fn total(&self) -> f64 {
        self.line_items.iter().map(LineItem::subtotal).sum()
    }

    /// Party name and id are set and at least one line item exists
    pub fn has_required_data(&self) -> bool {
        is_set(&self.party.name) && is_set(&self.party.id) && !self.line_items.is_empty()
    }

    /// True for a freshly created record
    pub fn is_empty(&self) -> bool {
        self.party.is_empty() && self.line_items.is_empty() && self.notes.is_empty()
    }
}

fn is_set(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|v| !v.trim().is_empty())
}

/// Sparse party data from one extraction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartialParty {
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub name: Option<String>,

    /// Numeric ids (e.g. a bare CUIT) are kept as text
    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,

    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub address: Option<String>,
}

/// One extraction response, possibly covering only some record fields
///
/// `null` is treated the same as an absent key, so
/// `{"notes": null}` leaves existing notes untouched while
/// `{"notes": ""}` replaces them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartialResult {
    #[serde(
        default,
        deserialize_with = "lenient_party",
        skip_serializing_if = "Option::is_none"
    )]
    pub party: Option<PartialParty>,

    /// Entries that are not objects are skipped
    #[serde(
        default,
        deserialize_with = "lenient_line_items",
        skip_serializing_if = "Option::is_none"
    )]
    pub line_items: Option<Vec<LineItem>>,

    #[serde(
        default,
        deserialize_with = "lenient_text",
        skip_serializing_if = "Option::is_none"
    )]
    pub notes: Option<String>,

    /// Extractor's own opinion on whether the record is done; only a JSON
    /// `true` counts
    #[serde(default, deserialize_with = "lenient_flag")]
    pub complete: bool,
}

fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(matches!(Value::deserialize(deserializer)?, Value::Bool(true)))
}

/// Strings as-is, numbers as their text, anything else absent
fn scalar_text(value: Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Numbers, or strings that parse as one
fn scalar_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?))
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_quantity<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_number(&Value::deserialize(deserializer)?).unwrap_or_else(default_quantity))
}

fn lenient_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(scalar_number(&Value::deserialize(deserializer)?).unwrap_or_default())
}

fn lenient_party<'de, D>(deserializer: D) -> Result<Option<PartialParty>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        value @ Value::Object(_) => Ok(serde_json::from_value(value).ok()),
        _ => Ok(None),
    }
}

fn lenient_line_items<'de, D>(deserializer: D) -> Result<Option<Vec<LineItem>>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Array(values) = Value::deserialize(deserializer)? else {
        return Ok(None);
    };

    Ok(Some(
        values
            .into_iter()
            .filter(Value::is_object)
            .filter_map(|value| serde_json::from_value(value).ok())
            .collect(),
    ))
}

impl PartialResult {
    /// A result carrying no data at all (the completeness hint is ignored)
    pub fn is_empty(&self) -> bool {
        self.party.is_none()
            && self.line_items.as_ref().map_or(true, Vec::is_empty)
            && self.notes.is_none()
    }

    /// Number of line items this result would append
    pub fn item_count(&self) -> usize {
        self.line_items.as_ref().map_or(0, Vec::len)
    }
}
