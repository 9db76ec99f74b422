//! Bibliographic field accessors shared by the merger and auditors
//!
//! All helpers read from the loosely typed [`Document`] tree and skip entries
//! of unexpected shape instead of failing.

use super::Document;
use serde_json::Value;

pub const SUMMARY: &str = "instanceOf.summary";
pub const NOTES: &str = "instanceOf.hasNote";
pub const CONTRIBUTIONS: &str = "instanceOf.contribution";
pub const CLASSIFICATIONS: &str = "instanceOf.classification";
pub const GENRE_FORMS: &str = "instanceOf.genreForm";
pub const IDENTIFIERS: &str = "identifiedBy";
pub const PART_OF: &str = "partOf";

pub const PUBLISHED_STATUS: &str = "https://id.kb.se/term/swepub/Published";

/// `@type` of a JSON object entry
pub fn type_of(entry: &Value) -> Option<&str> {
    entry.get("@type").and_then(Value::as_str)
}

/// Entries of `list` whose `@type` is `kind`
pub fn typed<'a>(list: &'a [Value], kind: &'a str) -> impl Iterator<Item = &'a Value> + 'a {
    list.iter().filter(move |entry| type_of(entry) == Some(kind))
}

/// Non-empty `value` strings of `identifiedBy` entries of type `kind`
pub fn identifier_values<'a>(list: &'a [Value], kind: &'a str) -> Vec<&'a str> {
    typed(list, kind)
        .filter_map(|entry| entry.get("value").and_then(Value::as_str))
        .filter(|value| !value.is_empty())
        .collect()
}

/// Label of a note, summary or similar `{label}` entry
///
/// Labels are sometimes lists of strings; those are joined with a space.
pub fn label_of(entry: &Value) -> Option<String> {
    match entry.get("label")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Array(parts) => {
            let joined = parts
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join(" ");
            (!joined.is_empty()).then_some(joined)
        }
        _ => None,
    }
}

/// Display name of a contribution's agent
///
/// `agent.name` wins when present; otherwise `familyName, givenName`.
pub fn agent_name(contribution: &Value) -> Option<String> {
    let agent = contribution.get("agent")?;
    match agent.get("name") {
        Some(Value::String(name)) if !name.is_empty() => return Some(name.clone()),
        Some(Value::Array(names)) if !names.is_empty() => {
            return Some(
                names
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
            )
        }
        _ => {}
    }

    let family = agent.get("familyName").and_then(Value::as_str).unwrap_or("");
    let given = agent.get("givenName").and_then(Value::as_str).unwrap_or("");
    match (family.is_empty(), given.is_empty()) {
        (true, true) => None,
        (false, true) => Some(family.to_string()),
        (true, false) => Some(given.to_string()),
        (false, false) => Some(format!("{}, {}", family, given)),
    }
}

/// Whether a contribution's agent is a person
pub fn is_person(contribution: &Value) -> bool {
    contribution
        .get("agent")
        .and_then(type_of)
        .map_or(false, |kind| kind == "Person")
}

/// Publication status ids from `instanceOf.hasNote`
pub fn publication_statuses(doc: &Document) -> Vec<&str> {
    typed(doc.list_at(NOTES), "PublicationStatus")
        .filter_map(|note| note.get("@id").and_then(Value::as_str))
        .collect()
}

/// Whether any genre form marks the record as an article
pub fn is_article(doc: &Document) -> bool {
    doc.list_at(GENRE_FORMS).iter().any(|genre| {
        genre
            .get("@id")
            .and_then(Value::as_str)
            .map_or(false, |id| id.contains("/publication/") && id.contains("article"))
    })
}

/// Classification codes under `instanceOf.classification`
pub fn classification_codes(doc: &Document) -> Vec<&str> {
    doc.list_at(CLASSIFICATIONS)
        .iter()
        .filter_map(|c| c.get("code").and_then(Value::as_str))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_agent_name_variants() {
        let named = json!({"agent": {"@type": "Organization", "name": "KTH"}});
        let person = json!({"agent": {"@type": "Person", "givenName": "Ada", "familyName": "Lovelace"}});
        let family_only = json!({"agent": {"@type": "Person", "familyName": "Curie"}});
        let anonymous = json!({"agent": {"@type": "Person"}});

        assert_eq!(agent_name(&named).as_deref(), Some("KTH"));
        assert_eq!(agent_name(&person).as_deref(), Some("Lovelace, Ada"));
        assert_eq!(agent_name(&family_only).as_deref(), Some("Curie"));
        assert_eq!(agent_name(&anonymous), None);
        assert!(is_person(&person));
        assert!(!is_person(&named));
    }

    #[test]
    fn test_typed_identifiers_skip_empty() {
        let ids = json!([
            {"@type": "ISSN", "value": "1234-5678"},
            {"@type": "ISSN", "value": ""},
            {"@type": "DOI", "value": "10.1/x"},
            "garbage"
        ]);
        let list = ids.as_array().unwrap();
        assert_eq!(identifier_values(list, "ISSN"), vec!["1234-5678"]);
    }

    #[test]
    fn test_label_joins_lists() {
        assert_eq!(label_of(&json!({"label": ["a", "b"]})).as_deref(), Some("a b"));
        assert_eq!(label_of(&json!({"label": ""})), None);
        assert_eq!(label_of(&json!({})), None);
    }
}
