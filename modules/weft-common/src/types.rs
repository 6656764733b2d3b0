use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// --- Geo types ---

/// A resolved latitude/longitude in floating-point degrees.
///
/// Never partially populated: a record either carries a full pair or none.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinatePair {
    pub lat: f64,
    pub lon: f64,
}

impl CoordinatePair {
    /// Build a pair, rejecting NaN/infinite components.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        if lat.is_finite() && lon.is_finite() {
            Some(Self { lat, lon })
        } else {
            None
        }
    }

    /// Parse both components from strings, as returned by the geocoding
    /// provider. Either side failing to parse as a finite float yields None.
    pub fn parse(lat: &str, lon: &str) -> Option<Self> {
        let lat: f64 = lat.trim().parse().ok()?;
        let lon: f64 = lon.trim().parse().ok()?;
        Self::new(lat, lon)
    }

    /// Parse a `Point(lon lat)` literal as used by the external knowledge
    /// base for coordinate statements. Note the lon-first ordering.
    pub fn from_point_literal(text: &str) -> Option<Self> {
        let inner = text
            .trim()
            .strip_prefix("Point(")
            .and_then(|rest| rest.strip_suffix(')'))?;
        let mut parts = inner.split_whitespace();
        let lon: f64 = parts.next()?.parse().ok()?;
        let lat: f64 = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Self::new(lat, lon)
    }
}

/// Normalized cache key derived from (city, country, district).
///
/// Case-insensitive and whitespace-trimmed; absent optional fields contribute
/// an empty segment so equal inputs always produce equal keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressKey(String);

impl AddressKey {
    pub fn new(city: Option<&str>, country: Option<&str>, district: Option<&str>) -> Self {
        let norm = |s: Option<&str>| s.unwrap_or("").trim().to_lowercase();
        Self(format!(
            "{}|{}|{}",
            norm(city),
            norm(country),
            norm(district)
        ))
    }

    /// True when at least one component carried text. Keys built from fully
    /// absent input are not worth caching against.
    pub fn has_content(&self) -> bool {
        self.0.chars().any(|c| c != '|')
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Location attributes attached to a graph node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LocationRecord {
    pub country: Option<String>,
    pub city: Option<String>,
    pub district: Option<String>,
    pub street: Option<String>,
    pub location_name: Option<String>,
    pub coords: Option<CoordinatePair>,
}

impl LocationRecord {
    pub fn is_empty(&self) -> bool {
        self.country.is_none()
            && self.city.is_none()
            && self.district.is_none()
            && self.street.is_none()
            && self.location_name.is_none()
            && self.coords.is_none()
    }

    /// True when there is enough text to attempt a forward geocode.
    pub fn has_address_text(&self) -> bool {
        self.city.is_some() || self.location_name.is_some()
    }

    pub fn address_key(&self) -> AddressKey {
        AddressKey::new(
            self.city.as_deref(),
            self.country.as_deref(),
            self.district.as_deref(),
        )
    }

    /// Fill unset fields from `other`, leaving already-set fields untouched.
    /// Used when merging resolver output into user-edited records.
    pub fn merge_missing(&mut self, other: &LocationRecord) {
        if self.country.is_none() {
            self.country = other.country.clone();
        }
        if self.city.is_none() {
            self.city = other.city.clone();
        }
        if self.district.is_none() {
            self.district = other.district.clone();
        }
        if self.street.is_none() {
            self.street = other.street.clone();
        }
        if self.location_name.is_none() {
            self.location_name = other.location_name.clone();
        }
        if self.coords.is_none() {
            self.coords = other.coords;
        }
    }
}

// --- Property statements ---

/// Value side of a property statement: a plain scalar or a reference to
/// another knowledge-base entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatementValue {
    Entity { id: String, text: String },
    Scalar(String),
}

impl StatementValue {
    pub fn display_text(&self) -> &str {
        match self {
            StatementValue::Scalar(s) => s,
            StatementValue::Entity { text, .. } => text,
        }
    }
}

/// One attribute/value fact attached to a node, sourced from the external
/// knowledge base. `statement_id` is unique within a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyStatement {
    pub statement_id: String,
    pub property_id: Option<String>,
    pub label: String,
    pub value: StatementValue,
}

// --- Graph ---

/// A graph vertex inside a space, optionally linked to an external
/// knowledge-base entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    pub id: Uuid,
    pub space_id: Uuid,
    pub label: String,
    pub entity_id: Option<String>,
    #[serde(default)]
    pub location: LocationRecord,
}

/// A directed, labeled connection between two nodes in a space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
    pub id: Uuid,
    pub space_id: Uuid,
    pub source: Uuid,
    pub target: Uuid,
    pub label: String,
    pub property_ref: Option<String>,
}

// --- Activity feed ---

/// Actor of an activity item: either free text or a structured reference,
/// depending on what the event source emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActorRef {
    Entity { id: String, name: String },
    Name(String),
}

impl ActorRef {
    pub fn display_name(&self) -> &str {
        match self {
            ActorRef::Name(n) => n,
            ActorRef::Entity { name, .. } => name,
        }
    }
}

/// One event record from the cross-space activity feed. Retrieved
/// transiently per query; never persisted by this core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityItem {
    pub id: String,
    pub actor: ActorRef,
    #[serde(default)]
    pub object: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    pub published: DateTime<Utc>,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub payload: serde_json::Value,
}
