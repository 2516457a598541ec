//! RDAP JSON (RFC 7483) into a [`PartialRecord`].
//!
//! Every lookup is optional: a missing or oddly shaped branch leaves the
//! field unset, it never fails the parse.

use crate::types::{fill, PartialRecord};
use serde_json::Value;

/// Extract registration details from an RDAP domain object.
pub fn parse(json: &Value, domain: &str) -> PartialRecord {
    let mut record = PartialRecord::with_raw(json.to_string());

    if let Some(entity) = find_entity(json, "registrar") {
        if let Some(name) = vcard_text(entity, &["fn", "org"]).or_else(|| entity_identifier(entity))
        {
            fill(&mut record.registrar, &name);
        }
    }

    if let Some(entity) = find_entity(json, "registrant") {
        if let Some(name) = vcard_text(entity, &["org", "fn"]).or_else(|| entity_identifier(entity))
        {
            fill(&mut record.registrant, &name);
        }
    }

    if let Some(events) = json.get("events").and_then(|e| e.as_array()) {
        for event in events {
            if let (Some(action), Some(date)) = (
                event.get("eventAction").and_then(|a| a.as_str()),
                event.get("eventDate").and_then(|d| d.as_str()),
            ) {
                match action {
                    "registration" => fill(&mut record.creation_date, date),
                    "expiration" => fill(&mut record.expiry_date, date),
                    _ => {}
                }
            }
        }
    }

    if let Some(statuses) = json.get("status").and_then(|s| s.as_array()) {
        let joined = statuses
            .iter()
            .filter_map(|s| s.as_str())
            .filter(|s| !s.trim().is_empty())
            .collect::<Vec<_>>()
            .join(", ");
        fill(&mut record.status, &joined);
    }

    if let Some(nameservers) = json.get("nameservers").and_then(|ns| ns.as_array()) {
        for nameserver in nameservers {
            if let Some(ldh_name) = nameserver.get("ldhName").and_then(|n| n.as_str()) {
                record.push_name_server(ldh_name);
            }
        }
    }

    let record = record.finish();
    tracing::debug!(
        domain,
        core_missing = record.core_missing,
        name_servers = record.name_servers.len(),
        "Parsed RDAP document"
    );
    record
}

/// Search a jCard item list (`[[tag, params, type, value], ...]`) for `tag`.
///
/// Returns the value element, which may be a string or a structured array.
pub fn find_tagged<'a>(items: &'a Value, tag: &str) -> Option<&'a Value> {
    items.as_array()?.iter().find_map(|item| {
        let item = item.as_array()?;
        if item.len() >= 4 && item.first()?.as_str()? == tag {
            item.get(3)
        } else {
            None
        }
    })
}

/// First entity holding `role`, searching top-level entities and then
/// one level of nested `entities`.
fn find_entity<'a>(json: &'a Value, role: &str) -> Option<&'a Value> {
    let entities = json.get("entities")?.as_array()?;

    entities
        .iter()
        .find(|e| has_role(e, role))
        .or_else(|| {
            entities.iter().find_map(|outer| {
                outer
                    .get("entities")?
                    .as_array()?
                    .iter()
                    .find(|e| has_role(e, role))
            })
        })
}

fn has_role(entity: &Value, role: &str) -> bool {
    entity
        .get("roles")
        .and_then(|r| r.as_array())
        .map(|roles| roles.iter().any(|r| r.as_str() == Some(role)))
        .unwrap_or(false)
}

/// Text of the first of `tags` present in the entity's vCard.
fn vcard_text(entity: &Value, tags: &[&str]) -> Option<String> {
    let items = entity.get("vcardArray")?.as_array()?.get(1)?;

    tags.iter().find_map(|tag| {
        let value = find_tagged(items, tag)?;
        let text = match value {
            Value::String(s) => s.trim().to_string(),
            // Structured values such as org units: first non-empty part
            Value::Array(parts) => parts
                .iter()
                .filter_map(|p| p.as_str())
                .map(str::trim)
                .find(|p| !p.is_empty())?
                .to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    })
}

/// Handle, then `publicIds[0].identifier`, then `name`.
fn entity_identifier(entity: &Value) -> Option<String> {
    if let Some(handle) = entity.get("handle").and_then(|h| h.as_str()) {
        if !handle.trim().is_empty() {
            return Some(handle.to_string());
        }
    }

    if let Some(id) = entity
        .get("publicIds")
        .and_then(|p| p.as_array())
        .and_then(|ids| ids.first())
        .and_then(|id| id.get("identifier"))
        .and_then(|i| i.as_str())
    {
        return Some(id.to_string());
    }

    entity
        .get("name")
        .and_then(|n| n.as_str())
        .map(String::from)
}
