//! Payload normalization for gateway JSON responses
//!
//! The provider does not keep its response shapes stable: the top-level list
//! key, the per-entry identifier key, and the price representation all vary
//! across calls. Normalization resolves each through a fixed, ordered
//! candidate list and produces strictly typed results. Fields that cannot
//! be parsed are omitted and flagged, never coerced.

use crate::client::{ClientError, ItemDetail, PriceTieBreak, SearchPage};
use crate::guard::{CandidateFields, Field, FieldSet};
use crate::units;
use serde_json::Value;

/// Top-level keys the provider has been observed to use for the result
/// list, in resolution order
const LIST_KEYS: [&str; 5] = [
    "results",
    "products",
    "organic_results",
    "search_results",
    "items",
];

/// Per-entry keys that may carry the identifier, in resolution order
const REF_KEYS: [&str; 3] = ["ref", "id", "asin"];

/// Per-entry keys that may carry a link containing the identifier
const LINK_KEYS: [&str; 2] = ["link", "url"];

/// Keys that may hold the specification map in a detail payload
const SPEC_KEYS: [&str; 3] = ["product_information", "specifications", "details"];

/// Normalizes a raw search payload into identifiers and a price map
///
/// The first present, non-empty candidate list key wins. Entries without a
/// resolvable identifier are dropped. Prices are kept only when positive;
/// repeated identifiers are resolved per `tie_break`.
pub fn parse_search_payload(payload: &Value, tie_break: PriceTieBreak) -> SearchPage {
    let mut page = SearchPage::default();

    let Some(entries) = resolve_list(payload) else {
        return page;
    };

    for entry in entries {
        let Some(external_ref) = resolve_ref(entry) else {
            continue;
        };

        let first_seen = !page.prices.contains_key(&external_ref)
            && !page.identifiers.contains(&external_ref);
        if first_seen {
            page.identifiers.push(external_ref.clone());
        }

        if let Some(price) = entry.get("price").and_then(parse_price_value) {
            match tie_break {
                PriceTieBreak::LastWins => {
                    page.prices.insert(external_ref, price);
                }
                PriceTieBreak::FirstWins => {
                    page.prices.entry(external_ref).or_insert(price);
                }
            }
        }
    }

    page
}

/// Normalizes a raw detail payload into parsed specification fields
///
/// The item name is required; everything else is optional and recorded in
/// `missing` when absent or unparseable.
pub fn parse_detail_payload(
    external_ref: &str,
    payload: &Value,
) -> Result<ItemDetail, ClientError> {
    let object = payload.as_object().ok_or_else(|| {
        ClientError::Permanent(format!(
            "detail payload for {} is not a JSON object",
            external_ref
        ))
    })?;

    let name = object
        .get("name")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| {
            ClientError::Permanent(format!("detail payload for {} has no name", external_ref))
        })?;

    let mut fields = CandidateFields {
        name: Some(name.to_string()),
        ..Default::default()
    };
    let mut missing = FieldSet::new();

    match object.get("brand").and_then(Value::as_str) {
        Some(brand) if !brand.trim().is_empty() => fields.brand = Some(brand.trim().to_string()),
        _ => missing.insert(Field::Brand),
    }

    let spec = SPEC_KEYS
        .iter()
        .find_map(|key| object.get(*key))
        .and_then(Value::as_object);

    parse_spec_field(
        spec.and_then(|s| spec_text(s, &["dimension"])),
        &mut missing,
        &[Field::LengthCm, Field::WidthCm],
        |text| {
            units::parse_dimensions(text).map(|(length, width)| {
                fields.length_cm = Some(length);
                fields.width_cm = Some(width);
            })
        },
    );
    parse_spec_field(
        spec.and_then(|s| spec_text(s, &["weight"])),
        &mut missing,
        &[Field::WeightKg],
        |text| units::parse_weight(text).map(|kg| fields.weight_kg = Some(kg)),
    );
    parse_spec_field(
        spec.and_then(|s| spec_text(s, &["wattage", "power"])),
        &mut missing,
        &[Field::PowerW],
        |text| units::parse_power(text).map(|w| fields.power_w = Some(w)),
    );
    parse_spec_field(
        spec.and_then(|s| spec_text(s, &["voltage"])),
        &mut missing,
        &[Field::VoltageV],
        |text| units::parse_voltage(text).map(|v| fields.voltage_v = Some(v)),
    );

    fields.price_usd = detail_price(object);
    if fields.price_usd.is_none() {
        missing.insert(Field::PriceUsd);
    }

    Ok(ItemDetail {
        external_ref: external_ref.to_string(),
        fields,
        missing,
    })
}

/// Runs one field parser, flagging the fields as missing when the text is
/// absent or unparseable
fn parse_spec_field<F>(
    text: Option<&str>,
    missing: &mut FieldSet,
    flagged: &[Field],
    parse: F,
) where
    F: FnOnce(&str) -> Result<(), units::ParseError>,
{
    let parsed = match text {
        Some(text) => parse(text).map_err(|error| {
            tracing::debug!(%error, "specification field failed to parse");
        }),
        None => Err(()),
    };
    if parsed.is_err() {
        for field in flagged {
            missing.insert(*field);
        }
    }
}

/// Finds the first string value in a spec map whose key contains any of the
/// given fragments (case-insensitive)
fn spec_text<'a>(
    spec: &'a serde_json::Map<String, Value>,
    fragments: &[&str],
) -> Option<&'a str> {
    for fragment in fragments {
        let found = spec.iter().find_map(|(key, value)| {
            if key.to_lowercase().contains(fragment) {
                value.as_str()
            } else {
                None
            }
        });
        if found.is_some() {
            return found;
        }
    }
    None
}

/// Resolves the result list via the ordered candidate keys
fn resolve_list(payload: &Value) -> Option<&Vec<Value>> {
    for key in LIST_KEYS {
        if let Some(list) = payload.get(key).and_then(Value::as_array) {
            if !list.is_empty() {
                return Some(list);
            }
        }
    }
    None
}

/// Resolves an entry's identifier: direct keys first, then a `/dp/` capture
/// from its link
fn resolve_ref(entry: &Value) -> Option<String> {
    for key in REF_KEYS {
        if let Some(reference) = entry.get(key).and_then(Value::as_str) {
            let reference = reference.trim();
            if !reference.is_empty() {
                return Some(reference.to_string());
            }
        }
    }
    for key in LINK_KEYS {
        if let Some(link) = entry.get(key).and_then(Value::as_str) {
            if let Some(reference) = ref_from_link(link) {
                return Some(reference);
            }
        }
    }
    None
}

/// Extracts a ten-character identifier from a `/dp/<ref>` link segment
fn ref_from_link(link: &str) -> Option<String> {
    let start = link.find("/dp/")? + 4;
    let candidate: String = link[start..]
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .take(10)
        .collect();
    if candidate.len() == 10 {
        Some(candidate.to_uppercase())
    } else {
        None
    }
}

/// Extracts a usable price from the provider's various representations
///
/// Accepts an object with a numeric `value` (or a `raw` display string), a
/// bare number, or a display string. Zero and negative prices are treated
/// as absent.
fn parse_price_value(value: &Value) -> Option<f64> {
    let price = match value {
        Value::Object(object) => match object.get("value").and_then(Value::as_f64) {
            Some(number) => Some(units::round2(number)),
            None => object
                .get("raw")
                .and_then(Value::as_str)
                .and_then(|raw| units::parse_price(raw).ok()),
        },
        Value::Number(number) => number.as_f64().map(units::round2),
        Value::String(text) => units::parse_price(text).ok(),
        _ => None,
    };
    price.filter(|p| *p > 0.0)
}

/// Detail payloads carry the price at the top level; an explicitly
/// unavailable item reports a zero price so update paths can reject it
fn detail_price(object: &serde_json::Map<String, Value>) -> Option<f64> {
    let unavailable = object
        .get("availability_status")
        .and_then(Value::as_str)
        .map(|s| s.to_lowercase().contains("unavailable"))
        .unwrap_or(false);
    if unavailable {
        return Some(0.0);
    }

    for key in ["pricing", "price"] {
        if let Some(value) = object.get(key) {
            let parsed = match value {
                Value::Object(_) => parse_price_value(value),
                Value::Number(number) => number.as_f64().map(units::round2),
                Value::String(text) => units::parse_price(text).ok(),
                _ => None,
            };
            if parsed.is_some() {
                return parsed;
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_candidate_list_keys_in_order() {
        for key in LIST_KEYS {
            let payload = json!({ key: [{"ref": "REF0000001"}] });
            let page = parse_search_payload(&payload, PriceTieBreak::LastWins);
            assert_eq!(page.identifiers, vec!["REF0000001"], "key {}", key);
        }
    }

    #[test]
    fn test_first_nonempty_list_key_wins() {
        let payload = json!({
            "results": [],
            "products": [{"ref": "REF0000001"}],
            "items": [{"ref": "REF0000009"}]
        });
        let page = parse_search_payload(&payload, PriceTieBreak::LastWins);
        assert_eq!(page.identifiers, vec!["REF0000001"]);
    }

    #[test]
    fn test_no_list_key_yields_empty_page() {
        let payload = json!({ "message": "no results" });
        let page = parse_search_payload(&payload, PriceTieBreak::LastWins);
        assert!(page.identifiers.is_empty());
        assert!(page.prices.is_empty());
    }

    #[test]
    fn test_ref_from_link_fallback() {
        let payload = json!({
            "results": [
                {"link": "https://catalog.example.com/dp/B0TESTREF1?tag=x"},
                {"url": "https://catalog.example.com/dp/b0testref2"}
            ]
        });
        let page = parse_search_payload(&payload, PriceTieBreak::LastWins);
        assert_eq!(page.identifiers, vec!["B0TESTREF1", "B0TESTREF2"]);
    }

    #[test]
    fn test_entry_without_identifier_is_dropped() {
        let payload = json!({
            "results": [
                {"title": "no id here"},
                {"ref": "REF0000001"}
            ]
        });
        let page = parse_search_payload(&payload, PriceTieBreak::LastWins);
        assert_eq!(page.identifiers, vec!["REF0000001"]);
    }

    #[test]
    fn test_price_shapes() {
        let payload = json!({
            "results": [
                {"ref": "REF_VALUE", "price": {"value": 69.99, "currency": "USD"}},
                {"ref": "REF_RAW", "price": {"raw": "$1,299.00"}},
                {"ref": "REF_NUMBER", "price": 49.5},
                {"ref": "REF_STRING", "price": "$19.99"},
                {"ref": "REF_ZERO", "price": 0.0},
                {"ref": "REF_JUNK", "price": "call us"}
            ]
        });
        let page = parse_search_payload(&payload, PriceTieBreak::LastWins);
        assert_eq!(page.prices.get("REF_VALUE"), Some(&69.99));
        assert_eq!(page.prices.get("REF_RAW"), Some(&1299.00));
        assert_eq!(page.prices.get("REF_NUMBER"), Some(&49.5));
        assert_eq!(page.prices.get("REF_STRING"), Some(&19.99));
        assert_eq!(page.prices.get("REF_ZERO"), None);
        assert_eq!(page.prices.get("REF_JUNK"), None);
        // Unpriced identifiers still appear in the list
        assert_eq!(page.identifiers.len(), 6);
    }

    #[test]
    fn test_duplicate_identifier_last_wins() {
        let payload = json!({
            "results": [
                {"ref": "REF0000001", "price": {"value": 59.99}},
                {"ref": "REF0000001", "price": {"value": 69.99}}
            ]
        });
        let page = parse_search_payload(&payload, PriceTieBreak::LastWins);
        assert_eq!(page.identifiers.len(), 1);
        assert_eq!(page.prices.get("REF0000001"), Some(&69.99));
    }

    #[test]
    fn test_duplicate_identifier_first_wins() {
        let payload = json!({
            "results": [
                {"ref": "REF0000001", "price": {"value": 59.99}},
                {"ref": "REF0000001", "price": {"value": 69.99}}
            ]
        });
        let page = parse_search_payload(&payload, PriceTieBreak::FirstWins);
        assert_eq!(page.prices.get("REF0000001"), Some(&59.99));
    }

    #[test]
    fn test_detail_payload_full() {
        let payload = json!({
            "name": "Solar Panel 100W",
            "brand": "SunCo",
            "pricing": "$69.99",
            "product_information": {
                "Product Dimensions": "45.67\"L x 17.71\"W x 1.18\"H",
                "Item Weight": "15.87 pounds",
                "Wattage": "100W",
                "Voltage": "12 Volts"
            }
        });
        let detail = parse_detail_payload("REF0000001", &payload).unwrap();
        assert_eq!(detail.fields.name.as_deref(), Some("Solar Panel 100W"));
        assert_eq!(detail.fields.brand.as_deref(), Some("SunCo"));
        assert_eq!(detail.fields.length_cm, Some(116.00));
        assert_eq!(detail.fields.width_cm, Some(44.98));
        assert_eq!(detail.fields.weight_kg, Some(7.20));
        assert_eq!(detail.fields.power_w, Some(100));
        assert_eq!(detail.fields.voltage_v, Some(12.0));
        assert_eq!(detail.fields.price_usd, Some(69.99));
        assert!(detail.missing.is_empty());
    }

    #[test]
    fn test_detail_payload_missing_name_is_permanent() {
        let payload = json!({ "brand": "SunCo" });
        let result = parse_detail_payload("REF0000001", &payload);
        assert!(matches!(result, Err(ClientError::Permanent(_))));
    }

    #[test]
    fn test_detail_payload_unparseable_fields_are_flagged_not_guessed() {
        let payload = json!({
            "name": "Mystery Panel",
            "product_information": {
                "Product Dimensions": "see manual",
                "Item Weight": "light",
                "Wattage": "9999 W"
            }
        });
        let detail = parse_detail_payload("REF0000001", &payload).unwrap();
        assert_eq!(detail.fields.length_cm, None);
        assert_eq!(detail.fields.weight_kg, None);
        assert_eq!(detail.fields.power_w, None, "out-of-range power is omitted");
        assert!(detail.missing.contains(Field::LengthCm));
        assert!(detail.missing.contains(Field::WidthCm));
        assert!(detail.missing.contains(Field::WeightKg));
        assert!(detail.missing.contains(Field::PowerW));
        assert!(detail.missing.contains(Field::Brand));
    }

    #[test]
    fn test_detail_payload_unavailable_item_reports_zero_price() {
        let payload = json!({
            "name": "Gone Panel",
            "availability_status": "Currently unavailable",
            "pricing": "$69.99"
        });
        let detail = parse_detail_payload("REF0000001", &payload).unwrap();
        assert_eq!(detail.fields.price_usd, Some(0.0));
    }

    #[test]
    fn test_detail_payload_not_an_object() {
        let payload = json!([1, 2, 3]);
        assert!(matches!(
            parse_detail_payload("REF0000001", &payload),
            Err(ClientError::Permanent(_))
        ));
    }

    #[test]
    fn test_ref_from_link_edge_cases() {
        assert_eq!(ref_from_link("https://x/dp/B0TESTREF1"), Some("B0TESTREF1".into()));
        assert_eq!(ref_from_link("https://x/dp/short"), None);
        assert_eq!(ref_from_link("https://x/gp/B0TESTREF1"), None);
    }
}
