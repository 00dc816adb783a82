use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Canonical property listing.
///
/// Every optional field serializes as `null` when absent so consumers can rely
/// on key presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Property {
    pub id: String,
    pub name: Option<String>,
    #[serde(rename = "type")]
    pub property_type: Option<String>,
    #[serde(serialize_with = "whole_numbers")]
    pub bedrooms: Option<f64>,
    #[serde(serialize_with = "whole_numbers")]
    pub bathrooms: Option<f64>,
    #[serde(serialize_with = "whole_numbers")]
    pub reception_rooms: Option<f64>,
    pub parking: Option<String>,
    pub address_street: Option<String>,
    pub address_city: Option<String>,
    pub address_state: Option<String>,
    pub address_country: Option<String>,
    pub address_postal_code: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub listing_url: Option<String>,
    pub status: Option<String>,
}

impl Property {
    /// Decode and normalize one raw CRM record.
    ///
    /// Returns `None` when the record is not an object or has no usable `id`.
    /// Any other field that is missing or of an unexpected shape becomes `None`.
    pub fn from_raw(value: Value) -> Option<Self> {
        let raw: RawRecord = serde_json::from_value(value).ok()?;
        raw.into_property()
    }

    /// Latitude and longitude, when both are known.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }

    pub fn is_mappable(&self) -> bool {
        self.coordinates().is_some()
    }
}

/// A CRM record as it arrives on the wire.
///
/// Every field is decoded leniently: a value of the wrong type decodes to
/// `None` instead of failing the record.
#[derive(Debug, Default, Deserialize)]
struct RawRecord {
    #[serde(default, deserialize_with = "lenient_id")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    name: Option<String>,
    #[serde(rename = "propertyType", default, deserialize_with = "lenient_string")]
    property_type: Option<String>,
    // Already-normalized records carry the type under its canonical key
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    type_fallback: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    bedrooms: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    bathrooms: Option<f64>,
    #[serde(rename = "receptionRooms", default, deserialize_with = "lenient_number")]
    reception_rooms: Option<f64>,
    #[serde(default, deserialize_with = "lenient_string")]
    parking: Option<String>,
    #[serde(rename = "addressStreet", default, deserialize_with = "lenient_string")]
    address_street: Option<String>,
    #[serde(rename = "addressCity", default, deserialize_with = "lenient_string")]
    address_city: Option<String>,
    #[serde(rename = "addressState", default, deserialize_with = "lenient_string")]
    address_state: Option<String>,
    #[serde(rename = "addressCountry", default, deserialize_with = "lenient_string")]
    address_country: Option<String>,
    #[serde(rename = "addressPostalCode", default, deserialize_with = "lenient_string")]
    address_postal_code: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    latitude: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    longitude: Option<f64>,
    #[serde(rename = "listingURL", default, deserialize_with = "lenient_string")]
    listing_url_upper: Option<String>,
    #[serde(rename = "listingUrl", default, deserialize_with = "lenient_string")]
    listing_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    status: Option<String>,
}

impl RawRecord {
    fn into_property(self) -> Option<Property> {
        Some(Property {
            id: self.id?,
            name: self.name,
            property_type: self.property_type.or(self.type_fallback),
            bedrooms: room_count(self.bedrooms),
            bathrooms: room_count(self.bathrooms),
            reception_rooms: room_count(self.reception_rooms),
            parking: self.parking,
            address_street: self.address_street,
            address_city: self.address_city,
            address_state: self.address_state,
            address_country: self.address_country,
            address_postal_code: self.address_postal_code,
            latitude: self.latitude,
            longitude: self.longitude,
            listing_url: self.listing_url_upper.or(self.listing_url),
            status: self.status,
        })
    }
}

fn room_count(value: Option<f64>) -> Option<f64> {
    value.filter(|n| *n >= 0.0)
}

/// Largest magnitude at which every integer is exactly representable in an f64
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

// Counts go out as `2`, not `2.0`; fractional values are kept as-is
fn whole_numbers<S>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match *value {
        Some(n) if n.fract() == 0.0 && n.abs() <= MAX_EXACT_INTEGER => {
            serializer.serialize_some(&(n as i64))
        }
        Some(n) => serializer.serialize_some(&n),
        None => serializer.serialize_none(),
    }
}

// Non-empty strings only; empty strings and other types are "no value"
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

// Finite numbers, or strings that parse as one
fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let number = match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(number.filter(|n| n.is_finite()))
}

// Ids are strings upstream, but numeric ids are accepted and stringified
fn lenient_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) if !s.trim().is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Every cached property plus the time the cache was filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PropertiesResponse {
    pub properties: Vec<Property>,
    pub total: usize,
    #[serde(with = "iso_millis")]
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub last_fetched: DateTime<Utc>,
}

impl PropertiesResponse {
    pub fn new(properties: Vec<Property>, last_fetched: DateTime<Utc>) -> Self {
        Self {
            total: properties.len(),
            properties,
            last_fetched,
        }
    }

    /// Keep only the properties matching `predicate`, keeping `total` in step.
    pub fn retain(mut self, predicate: impl FnMut(&Property) -> bool) -> Self {
        self.properties.retain(predicate);
        self.total = self.properties.len();
        self
    }
}

/// ISO-8601 UTC timestamps with millisecond precision, e.g. `2024-05-01T09:30:00.123Z`
pub(crate) mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        DateTime::parse_from_rfc3339(&s)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(serde::de::Error::custom)
    }
}
