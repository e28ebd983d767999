//! Field extraction from heterogeneous upstream listing records.
//!
//! Upstream payloads vary in shape from record to record, so every field is
//! read through an explicit ordered rule table: the first rule yielding a
//! non-null, non-zero value wins. Rule order is part of the contract and
//! must not be reordered.

use chrono::{DateTime, Utc};
use serde_json::Value;

use super::types::CachedProperty;

const ADDRESS_PATHS: &[&[&str]] = &[
    &["location", "address", "line"],
    &["address", "line"],
    &["address"],
];

const BEDROOM_PATHS: &[&[&str]] = &[
    &["description", "beds"],
    &["beds"],
    &["description", "beds_min"],
];

const BATHS_FULL_PATHS: &[&[&str]] = &[
    &["description", "baths_full"],
    &["baths_full"],
    &["description", "baths"],
];

const BATHS_HALF_PATHS: &[&[&str]] = &[&["description", "baths_half"], &["baths_half"]];

const SQFT_PATHS: &[&[&str]] = &[
    &["description", "sqft"],
    &["sqft"],
    &["description", "lot_sqft"],
];

const LOT_SQFT_PATHS: &[&[&str]] = &[&["description", "lot_sqft"], &["lot_sqft"]];

const GARAGE_PATHS: &[&[&str]] = &[
    &["description", "garage"],
    &["garage"],
    &["description", "garage_spaces"],
    &["garage_spaces"],
];

const YEAR_BUILT_PATHS: &[&[&str]] = &[&["description", "year_built"], &["year_built"]];

const PROPERTY_TYPE_PATHS: &[&[&str]] = &[&["description", "type"], &["prop_type"], &["type"]];

const PRICE_PATHS: &[&[&str]] = &[&["list_price"], &["price"], &["description", "sold_price"]];

/// Build a cache record from one upstream listing.
///
/// Returns `None` when no address can be extracted; such records are
/// uncacheable and the caller is expected to skip and count them.
pub fn extract_property(raw: &Value, zip_code: &str, now: DateTime<Utc>) -> Option<CachedProperty> {
    let address = extract_address(raw)?;
    let address = address.trim().to_lowercase();
    if address.is_empty() {
        return None;
    }

    let baths_full = first_f64(raw, BATHS_FULL_PATHS).unwrap_or(0.0);
    let baths_half = first_f64(raw, BATHS_HALF_PATHS).unwrap_or(0.0);
    let lot_sqft = first_i64(raw, LOT_SQFT_PATHS).unwrap_or(0);
    let lot_acres = if lot_sqft > 0 {
        round2(lot_sqft as f64 / 43_560.0)
    } else {
        0.0
    };

    Some(CachedProperty {
        zip_code: zip_code.to_string(),
        address,
        bedrooms: first_i64(raw, BEDROOM_PATHS).unwrap_or(0),
        bathrooms: baths_full + baths_half * 0.5,
        sqft: first_i64(raw, SQFT_PATHS).unwrap_or(0),
        lot_sqft,
        lot_acres,
        garage_cars: first_i64(raw, GARAGE_PATHS).unwrap_or(0),
        year_built: first_i64(raw, YEAR_BUILT_PATHS),
        property_type: first_str(raw, PROPERTY_TYPE_PATHS)
            .unwrap_or_else(|| "Unknown".to_string()),
        price: first_i64(raw, PRICE_PATHS),
        photo_url: extract_photo(raw),
        last_updated: now,
        raw: raw.clone(),
    })
}

fn at<'a>(raw: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut current = raw;
    for key in path {
        current = current.get(key)?;
    }
    Some(current)
}

fn first_i64(raw: &Value, paths: &[&[&str]]) -> Option<i64> {
    for path in paths {
        if let Some(n) = at(raw, path).and_then(as_number) {
            if n != 0.0 {
                return Some(n as i64);
            }
        }
    }
    None
}

fn first_f64(raw: &Value, paths: &[&[&str]]) -> Option<f64> {
    for path in paths {
        if let Some(n) = at(raw, path).and_then(as_number) {
            if n != 0.0 {
                return Some(n);
            }
        }
    }
    None
}

fn first_str(raw: &Value, paths: &[&[&str]]) -> Option<String> {
    for path in paths {
        if let Some(s) = at(raw, path).and_then(Value::as_str) {
            if !s.is_empty() {
                return Some(s.to_string());
            }
        }
    }
    None
}

fn as_number(v: &Value) -> Option<f64> {
    v.as_f64()
}

/// Address shapes: `location.address.line`, `address.line`, or a bare
/// `address` string.
fn extract_address(raw: &Value) -> Option<String> {
    for path in ADDRESS_PATHS {
        match at(raw, path) {
            Some(Value::String(s)) if !s.is_empty() => return Some(s.clone()),
            Some(Value::Object(_)) | Some(Value::Null) | None => continue,
            _ => continue,
        }
    }
    None
}

/// Photo shapes, in precedence order: `primary_photo` (object with `href` or
/// bare string), first entry of `photos`, then `thumbnail`.
fn extract_photo(raw: &Value) -> Option<String> {
    if let Some(primary) = raw.get("primary_photo") {
        match primary {
            Value::String(s) if !s.is_empty() => return Some(s.clone()),
            Value::Object(_) => {
                if let Some(href) = primary.get("href").and_then(Value::as_str) {
                    return Some(href.to_string());
                }
            }
            _ => {}
        }
    }
    if let Some(first) = raw.get("photos").and_then(Value::as_array).and_then(|a| a.first()) {
        match first {
            Value::String(s) if !s.is_empty() => return Some(s.clone()),
            Value::Object(_) => {
                if let Some(href) = first.get("href").and_then(Value::as_str) {
                    return Some(href.to_string());
                }
            }
            _ => {}
        }
    }
    raw.get("thumbnail")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn round2(x: f64) -> f64 {
    (x * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn test_nested_location_address_wins() {
        let raw = json!({
            "location": { "address": { "line": "123 Main St" } },
            "address": { "line": "999 Wrong St" }
        });
        let prop = extract_property(&raw, "62704", now()).unwrap();
        assert_eq!(prop.address, "123 main st");
    }

    #[test]
    fn test_address_dict_shape() {
        let raw = json!({ "address": { "line": "45 Elm Ave" } });
        let prop = extract_property(&raw, "97205", now()).unwrap();
        assert_eq!(prop.address, "45 elm ave");
    }

    #[test]
    fn test_address_string_shape() {
        let raw = json!({ "address": "789 Oak Dr" });
        let prop = extract_property(&raw, "78701", now()).unwrap();
        assert_eq!(prop.address, "789 oak dr");
    }

    #[test]
    fn test_missing_address_is_uncacheable() {
        let raw = json!({ "list_price": 300000 });
        assert!(extract_property(&raw, "62704", now()).is_none());
        let raw = json!({ "address": "" });
        assert!(extract_property(&raw, "62704", now()).is_none());
    }

    #[test]
    fn test_bedroom_precedence_description_first() {
        let raw = json!({
            "address": "1 A St",
            "description": { "beds": 4 },
            "beds": 2
        });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.bedrooms, 4);
    }

    #[test]
    fn test_zero_values_fall_through() {
        // description.beds of 0 is skipped, top-level beds wins.
        let raw = json!({
            "address": "1 A St",
            "description": { "beds": 0 },
            "beds": 3
        });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.bedrooms, 3);
    }

    #[test]
    fn test_half_baths_count_as_half() {
        let raw = json!({
            "address": "1 A St",
            "description": { "baths_full": 2, "baths_half": 1 }
        });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.bathrooms, 2.5);
    }

    #[test]
    fn test_lot_acres_computed_and_rounded() {
        let raw = json!({
            "address": "1 A St",
            "description": { "lot_sqft": 10890 }
        });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.lot_sqft, 10890);
        assert_eq!(prop.lot_acres, 0.25);
    }

    #[test]
    fn test_price_precedence() {
        let raw = json!({
            "address": "1 A St",
            "list_price": 250000,
            "price": 999999,
            "description": { "sold_price": 111111 }
        });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.price, Some(250000));

        let raw = json!({
            "address": "1 A St",
            "description": { "sold_price": 111111 }
        });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.price, Some(111111));
    }

    #[test]
    fn test_missing_price_is_none() {
        let raw = json!({ "address": "1 A St" });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.price, None);
    }

    #[test]
    fn test_property_type_default() {
        let raw = json!({ "address": "1 A St" });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.property_type, "Unknown");

        let raw = json!({ "address": "1 A St", "prop_type": "single_family" });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.property_type, "single_family");
    }

    #[test]
    fn test_photo_shapes() {
        let raw = json!({ "address": "1 A St", "primary_photo": { "href": "http://p/1.jpg" } });
        assert_eq!(
            extract_property(&raw, "00001", now()).unwrap().photo_url,
            Some("http://p/1.jpg".to_string())
        );

        let raw = json!({ "address": "1 A St", "primary_photo": "http://p/2.jpg" });
        assert_eq!(
            extract_property(&raw, "00001", now()).unwrap().photo_url,
            Some("http://p/2.jpg".to_string())
        );

        let raw = json!({ "address": "1 A St", "photos": [{ "href": "http://p/3.jpg" }] });
        assert_eq!(
            extract_property(&raw, "00001", now()).unwrap().photo_url,
            Some("http://p/3.jpg".to_string())
        );

        let raw = json!({ "address": "1 A St", "thumbnail": "http://p/4.jpg" });
        assert_eq!(
            extract_property(&raw, "00001", now()).unwrap().photo_url,
            Some("http://p/4.jpg".to_string())
        );

        let raw = json!({ "address": "1 A St" });
        assert_eq!(extract_property(&raw, "00001", now()).unwrap().photo_url, None);
    }

    #[test]
    fn test_garage_precedence_includes_spaces_variants() {
        let raw = json!({ "address": "1 A St", "garage_spaces": 2 });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.garage_cars, 2);
    }

    #[test]
    fn test_raw_payload_preserved() {
        let raw = json!({ "address": "1 A St", "some_future_field": { "x": 1 } });
        let prop = extract_property(&raw, "00001", now()).unwrap();
        assert_eq!(prop.raw, raw);
    }
}
