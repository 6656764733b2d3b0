use weft_common::{LocationRecord, PropertyStatement};

/// Knowledge-base property id carrying a `Point(lon lat)` coordinate literal.
pub const COORDINATE_PROPERTY: &str = "P625";
/// Property id carrying the country as plain text or an entity reference.
pub const COUNTRY_PROPERTY: &str = "P17";
/// Administrative-area property ids whose text names a locality.
pub const ADMIN_AREA_PROPERTIES: [&str; 3] = ["P131", "P276", "P706"];

/// Derive a partial [`LocationRecord`] from a node's attached property
/// statements. Pure and total: no I/O, malformed values are skipped, and
/// first-match-wins per field — later statements never overwrite a field an
/// earlier statement already set.
pub fn extract_location(statements: &[PropertyStatement]) -> LocationRecord {
    let mut record = LocationRecord::default();

    for statement in statements {
        let Some(property_id) = statement.property_id.as_deref() else {
            continue;
        };
        let text = statement.value.display_text();

        if property_id == COORDINATE_PROPERTY {
            if record.coords.is_none() {
                // Malformed coordinate text is ignored, not an error.
                record.coords = weft_common::CoordinatePair::from_point_literal(text);
            }
        } else if property_id == COUNTRY_PROPERTY {
            if record.country.is_none() {
                let trimmed = text.trim();
                if !trimmed.is_empty() {
                    record.country = Some(trimmed.to_string());
                }
            }
        } else if ADMIN_AREA_PROPERTIES.contains(&property_id) {
            apply_admin_area(&mut record, text);
        }
    }

    // Coordinates with no textual fields at all still deserve a name.
    if record.coords.is_some()
        && record.country.is_none()
        && record.city.is_none()
        && record.district.is_none()
        && record.street.is_none()
        && record.location_name.is_none()
    {
        let coords = record.coords.unwrap();
        record.location_name = Some(format!(
            "Location at {:.4}, {:.4}",
            coords.lat, coords.lon
        ));
    }

    record
}

/// An administrative-area value names the place and, when comma-separated,
/// yields "City, District" segments.
fn apply_admin_area(record: &mut LocationRecord, text: &str) {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return;
    }

    if record.location_name.is_none() {
        record.location_name = Some(trimmed.to_string());
    }

    let mut segments = trimmed.split(',').map(str::trim).filter(|s| !s.is_empty());
    if let Some(first) = segments.next() {
        if record.city.is_none() && trimmed.contains(',') {
            record.city = Some(first.to_string());
        }
        if let Some(second) = segments.next() {
            if record.district.is_none() {
                record.district = Some(second.to_string());
            }
        }
    }
}
