//! Document Merger
//!
//! Reduces the records of one cluster into a union record.
//!
//! # Strategy
//! 1. **Master**: deep copy of the record with the most `instanceOf` elements
//!    (first record wins ties)
//! 2. **Candidates**: every other record, in input order, is folded into the
//!    master field by field. Records identical to the master are skipped.
//! 3. **Summary**: the longest summary label across all records is kept
//!
//! # Field rules
//! - `instanceOf.contribution`: union keyed by agent name; overlapping
//!   contributions gain the candidate's affiliations; unnamed candidate
//!   contributions are appended unless an equal entry exists
//! - `instanceOf.hasNote`: `Note` labels unioned; `CreatorCount` and
//!   `PublicationStatus` taken from the master, else the first candidate
//!   that has one
//! - `identifiedBy`: union keyed by `(@type, value)`
//! - `electronicLocator`: union by equality

use crate::models::fields::{self, CONTRIBUTIONS, IDENTIFIERS, NOTES, SUMMARY};
use crate::models::{Document, Record, UnionRecord};
use crate::types::{MergeError, MergeFunction};
use serde_json::Value;
use tracing::debug;

const ELECTRONIC_LOCATORS: &str = "electronicLocator";
const AFFILIATIONS: &str = "hasAffiliation";

/// Master-and-candidates merge over record documents
pub struct DocumentMerger;

impl DocumentMerger {
    pub const NAME: &'static str = "DocumentMerger";

    pub fn new() -> Self {
        Self
    }

    /// Index of the record with the most `instanceOf` elements
    fn master_index(records: &[Record]) -> usize {
        let mut best = 0;
        let mut best_size = 0;
        for (i, record) in records.iter().enumerate() {
            let size = record.body.element_count("instanceOf");
            if size > best_size {
                best = i;
                best_size = size;
            }
        }
        best
    }

    fn validate(record: &Record) -> Result<(), MergeError> {
        match record.body.get("instanceOf") {
            None | Some(Value::Object(_)) => Ok(()),
            Some(_) => Err(MergeError::InvalidRecord {
                record_id: record.id.clone(),
                message: "instanceOf is not an object".to_string(),
            }),
        }
    }

    fn merge_contributions(master: &mut Document, candidate: &Document) {
        let incoming = candidate.list_at(CONTRIBUTIONS).to_vec();
        if incoming.is_empty() {
            return;
        }

        let contributions = master.list_at_mut(CONTRIBUTIONS);
        for contribution in incoming {
            let Some(name) = fields::agent_name(&contribution) else {
                if !contributions.contains(&contribution) {
                    contributions.push(contribution);
                }
                continue;
            };

            let existing = contributions
                .iter_mut()
                .find(|c| fields::agent_name(c).as_deref() == Some(name.as_str()));
            match existing {
                Some(existing) => merge_affiliations(existing, &contribution),
                None => contributions.push(contribution),
            }
        }
    }

    fn merge_notes(master: &mut Document, candidate: &Document) {
        let incoming = candidate.list_at(NOTES);
        if incoming.is_empty() {
            return;
        }

        let mut additions: Vec<Value> = Vec::new();
        for kind in ["CreatorCount", "PublicationStatus"] {
            let master_has = fields::typed(master.list_at(NOTES), kind).next().is_some();
            if !master_has {
                if let Some(note) = fields::typed(incoming, kind).next() {
                    additions.push(note.clone());
                }
            }
        }

        let known: Vec<String> = fields::typed(master.list_at(NOTES), "Note")
            .filter_map(fields::label_of)
            .collect();
        for note in fields::typed(incoming, "Note") {
            if let Some(label) = fields::label_of(note) {
                let seen = known.contains(&label)
                    || additions
                        .iter()
                        .any(|added| fields::label_of(added).as_deref() == Some(label.as_str()));
                if !seen {
                    additions.push(note.clone());
                }
            }
        }

        if !additions.is_empty() {
            master.list_at_mut(NOTES).extend(additions);
        }
    }

    fn merge_identifiers(master: &mut Document, candidate: &Document) {
        let key = |id: &Value| {
            (
                fields::type_of(id).map(str::to_string),
                id.get("value").and_then(Value::as_str).map(str::to_string),
            )
        };

        let incoming = candidate.list_at(IDENTIFIERS).to_vec();
        if incoming.is_empty() {
            return;
        }

        let identifiers = master.list_at_mut(IDENTIFIERS);
        for identifier in incoming {
            let k = key(&identifier);
            if k.1.is_none() || identifiers.iter().any(|existing| key(existing) == k) {
                continue;
            }
            identifiers.push(identifier);
        }
    }

    fn merge_locators(master: &mut Document, candidate: &Document) {
        let incoming = candidate.list_at(ELECTRONIC_LOCATORS).to_vec();
        if incoming.is_empty() {
            return;
        }

        let locators = master.list_at_mut(ELECTRONIC_LOCATORS);
        for locator in incoming {
            if !locators.contains(&locator) {
                locators.push(locator);
            }
        }
    }

    /// Summary entry with the longest label across `records`
    fn longest_summary(records: &[Record]) -> Option<Value> {
        let mut best: Option<(usize, &Value)> = None;
        for record in records {
            for summary in record.body.list_at(SUMMARY) {
                let len = fields::label_of(summary).map_or(0, |l| l.chars().count());
                if len > 0 && best.map_or(true, |(best_len, _)| len > best_len) {
                    best = Some((len, summary));
                }
            }
        }
        best.map(|(_, summary)| summary.clone())
    }
}

fn merge_affiliations(existing: &mut Value, candidate: &Value) {
    let Some(incoming) = candidate.get(AFFILIATIONS).and_then(Value::as_array) else {
        return;
    };
    let Some(contribution) = existing.as_object_mut() else {
        return;
    };

    let slot = contribution
        .entry(AFFILIATIONS)
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(affiliations) = slot {
        for affiliation in incoming {
            if !affiliations.contains(affiliation) {
                affiliations.push(affiliation.clone());
            }
        }
    }
}

impl Default for DocumentMerger {
    fn default() -> Self {
        Self::new()
    }
}

impl MergeFunction for DocumentMerger {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn merge(&self, cluster_id: i64, records: &[Record]) -> Result<UnionRecord, MergeError> {
        if records.is_empty() {
            return Err(MergeError::EmptyCluster);
        }
        for record in records {
            Self::validate(record)?;
        }

        let master_idx = Self::master_index(records);
        let original = &records[master_idx].body;
        let mut body = original.clone();

        for candidate in records.iter().map(|r| &r.body) {
            if candidate == original {
                continue;
            }
            Self::merge_contributions(&mut body, candidate);
            Self::merge_notes(&mut body, candidate);
            Self::merge_identifiers(&mut body, candidate);
            Self::merge_locators(&mut body, candidate);
        }

        if let Some(summary) = Self::longest_summary(records) {
            body.set(SUMMARY, Value::Array(vec![summary]));
        }

        debug!(
            cluster_id,
            records = records.len(),
            master = %records[master_idx].id,
            "Merged cluster"
        );

        Ok(UnionRecord::new(
            cluster_id,
            records.iter().map(|r| r.id.clone()).collect(),
            body,
        ))
    }
}
