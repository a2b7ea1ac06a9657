//! Migration of legacy free-text knowledge points into the tag tree.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};
use wrongbook_schemas::{Subject, TagId};

use crate::error::Result;
use crate::resolver::GradeResolver;
use crate::store::{NewTag, TagFilter, TagStore};

/// One legacy error-book record as exported by the previous schema
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LegacyRecord {
    pub id: String,
    #[serde(default)]
    pub subject_name: Option<String>,
    #[serde(default)]
    pub grade_semester: Option<String>,
    #[serde(default)]
    pub knowledge_points: Option<String>,
}

/// Tag ids to link to one record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordTags {
    pub record_id: String,
    pub tag_ids: Vec<TagId>,
}

/// Migration statistics
#[derive(Debug, Clone, Default)]
pub struct MigrationStats {
    pub total_records: usize,
    pub records_migrated: usize,
    pub records_skipped: usize,
    pub tags_created: usize,
    pub tags_linked: usize,
}

/// Read a JSON array of legacy records
pub fn read_legacy_records<P: AsRef<Path>>(path: P) -> Result<Vec<LegacyRecord>> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

const LEGACY_DELIMITERS: [char; 3] = [',', '，', '、'];

/// Knowledge-point names stored in a legacy record.
///
/// Accepts a JSON array of strings or a delimiter-separated string.
/// Anything else yields no names.
pub fn parse_legacy_knowledge_points(raw: &str) -> Vec<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Vec::new();
    }

    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
        Ok(other) => {
            debug!("Ignoring non-array knowledge points: {}", other);
            Vec::new()
        }
        Err(_) => raw
            .split(LEGACY_DELIMITERS)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect(),
    }
}

const SUBJECT_KEYWORDS: &[(Subject, &[&str])] = &[
    (Subject::Math, &["math", "數學", "数学"]),
    (Subject::Physics, &["physics", "物理"]),
    (Subject::Chemistry, &["chemistry", "化學", "化学"]),
    (Subject::Biology, &["biology", "生物"]),
    (Subject::English, &["english", "英語", "英语"]),
    (Subject::Chinese, &["chinese", "國文", "語文", "语文"]),
    (Subject::History, &["history", "歷史", "历史"]),
    (Subject::Geography, &["geography", "地理"]),
    (Subject::Politics, &["politics", "公民", "政治"]),
];

/// Subject named by a notebook title such as "國二數學" or "Physics"
pub fn infer_subject_from_name(name: &str) -> Option<Subject> {
    let lowered = name.to_lowercase();
    SUBJECT_KEYWORDS
        .iter()
        .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
        .map(|(subject, _)| *subject)
}

/// Subject a legacy record is filed under. Records without a notebook name
/// belong to math; unrecognised names to `other`.
pub fn legacy_subject(record: &LegacyRecord) -> Subject {
    match record.subject_name.as_deref().map(str::trim) {
        None | Some("") => Subject::Math,
        Some(name) => infer_subject_from_name(name).unwrap_or(Subject::Other),
    }
}

/// Find or create the tags named by each record.
///
/// Existing tags are matched by `(subject, name)`. Missing names become custom
/// tags, attached to the grade root the record's grade text resolves to.
pub fn migrate_legacy_records<S: TagStore + ?Sized>(
    store: &S,
    resolver: &GradeResolver,
    records: &[LegacyRecord],
) -> Result<(Vec<RecordTags>, MigrationStats)> {
    let mut stats = MigrationStats {
        total_records: records.len(),
        ..Default::default()
    };
    let mut links = Vec::new();

    info!("Migrating knowledge points of {} records", records.len());

    for record in records {
        let names = record
            .knowledge_points
            .as_deref()
            .map(parse_legacy_knowledge_points)
            .unwrap_or_default();

        if names.is_empty() {
            stats.records_skipped += 1;
            continue;
        }

        let subject = legacy_subject(record);
        // Resolved at most once per record, and only when a tag is missing
        let mut parent: Option<Option<TagId>> = None;
        let mut tag_ids: Vec<TagId> = Vec::with_capacity(names.len());

        for name in &names {
            let tag_id = match store.find_first(&TagFilter::named(subject, name))? {
                Some(existing) => existing.id,
                None => {
                    if parent.is_none() {
                        let resolved = resolver
                            .resolve(store, record.grade_semester.as_deref(), subject)?
                            .into_parent();
                        if resolved.is_none() {
                            warn!(
                                "Record {}: grade {:?} not resolved, tags stay parentless",
                                record.id, record.grade_semester
                            );
                        }
                        parent = Some(resolved);
                    }
                    let parent_id = parent.clone().flatten();

                    let created = store.create_node(NewTag {
                        name: name.clone(),
                        subject,
                        parent_id,
                        is_system: false,
                        order: 0,
                    })?;
                    debug!("Created custom {} tag '{}'", subject, created.name);
                    stats.tags_created += 1;
                    created.id
                }
            };

            if !tag_ids.contains(&tag_id) {
                tag_ids.push(tag_id);
            }
        }

        stats.tags_linked += tag_ids.len();
        stats.records_migrated += 1;
        links.push(RecordTags {
            record_id: record.id.clone(),
            tag_ids,
        });

        if stats.records_migrated % 50 == 0 {
            info!("Processed {}/{} records", stats.records_migrated, records.len());
        }
    }

    info!(
        "Migrated {} records: {} tags created, {} links",
        stats.records_migrated, stats.tags_created, stats.tags_linked
    );
    Ok((links, stats))
}
