//! Structural upsert and curriculum import.
//!
//! System nodes are identified by their position, `(subject, parent, order)`,
//! never by name. Re-importing a curriculum whose wording changed renames the
//! existing nodes in place. Reordering chapters or tags is NOT recognised: the
//! node at each position simply takes the new name, so curriculum edits must
//! keep existing positions stable and append new entries at the end.

use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};
use wrongbook_schemas::{ChapterSpec, CurriculumSpec, Subject, TagId};

use crate::error::{Result, TaxonomyError};
use crate::store::{NewTag, TagFilter, TagStore, TagUpdate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertAction {
    Created,
    Renamed,
    Unchanged,
}

/// Result of upserting one system node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub id: TagId,
    pub action: UpsertAction,
}

impl UpsertOutcome {
    pub fn was_created(&self) -> bool {
        self.action == UpsertAction::Created
    }

    pub fn was_updated(&self) -> bool {
        self.action == UpsertAction::Renamed
    }
}

/// Import statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportStats {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub deleted: usize,
}

impl ImportStats {
    fn record(&mut self, outcome: &UpsertOutcome) {
        match outcome.action {
            UpsertAction::Created => self.created += 1,
            UpsertAction::Renamed => self.updated += 1,
            UpsertAction::Unchanged => self.unchanged += 1,
        }
    }

    pub fn total_nodes(&self) -> usize {
        self.created + self.updated + self.unchanged
    }
}

/// Create or rename the system node at `(subject, parent_id, order)`.
pub fn upsert_tag<S: TagStore + ?Sized>(
    store: &S,
    subject: Subject,
    name: &str,
    parent_id: Option<&TagId>,
    order: i64,
) -> Result<UpsertOutcome> {
    let key = TagFilter::structural_key(subject, parent_id, order);

    if let Some(existing) = store.find_first(&key)? {
        if existing.name == name {
            return Ok(UpsertOutcome {
                id: existing.id,
                action: UpsertAction::Unchanged,
            });
        }

        let renamed = store.update_node(
            &existing.id,
            TagUpdate {
                name: Some(name.to_string()),
            },
        )?;
        info!(
            "Renamed tag {}: '{}' -> '{}'",
            renamed.id, existing.name, renamed.name
        );
        return Ok(UpsertOutcome {
            id: renamed.id,
            action: UpsertAction::Renamed,
        });
    }

    let created = store.create_node(NewTag {
        name: name.to_string(),
        subject,
        parent_id: parent_id.cloned(),
        is_system: true,
        order,
    })?;
    debug!("Created tag '{}' at order {}", created.name, order);

    Ok(UpsertOutcome {
        id: created.id,
        action: UpsertAction::Created,
    })
}

/// Tags grouped under an optional section node. Flat curricula yield a
/// single group without a section, so both shapes share one import loop.
struct TagGroup<'a> {
    section: Option<&'a str>,
    tags: &'a [String],
}

fn tag_groups(sectioned: bool, chapter: &ChapterSpec) -> Vec<TagGroup<'_>> {
    if sectioned {
        chapter
            .sections
            .iter()
            .map(|s| TagGroup {
                section: Some(s.section.as_str()),
                tags: &s.tags,
            })
            .collect()
    } else {
        vec![TagGroup {
            section: None,
            tags: &chapter.tags,
        }]
    }
}

/// Read and validate a curriculum JSON file
pub fn read_curriculum_file<P: AsRef<Path>>(path: P) -> Result<CurriculumSpec> {
    let raw = std::fs::read_to_string(path)?;
    let spec: CurriculumSpec = serde_json::from_str(&raw)?;
    validate_curriculum(&spec)?;
    Ok(spec)
}

/// Reject a curriculum before anything is written
pub fn validate_curriculum(spec: &CurriculumSpec) -> Result<()> {
    let invalid = |msg: String| -> Result<()> { Err(TaxonomyError::InvalidCurriculum(msg)) };

    let mut names = HashSet::new();
    let mut ranks = HashSet::new();

    for grade in &spec.grades {
        if grade.name.trim().is_empty() {
            return invalid("grade with empty name".to_string());
        }
        if !names.insert(grade.name.trim()) {
            return invalid(format!("duplicate grade '{}'", grade.name));
        }
        if !ranks.insert(grade.rank) {
            return invalid(format!(
                "grade '{}' reuses rank {}",
                grade.name, grade.rank
            ));
        }

        for chapter in &grade.chapters {
            if chapter.chapter.trim().is_empty() {
                return invalid(format!("empty chapter name in '{}'", grade.name));
            }
            if spec.sectioned && !chapter.tags.is_empty() {
                return invalid(format!(
                    "chapter '{}' has tags outside sections",
                    chapter.chapter
                ));
            }
            if !spec.sectioned && !chapter.sections.is_empty() {
                return invalid(format!(
                    "chapter '{}' has sections in a flat curriculum",
                    chapter.chapter
                ));
            }

            for group in tag_groups(spec.sectioned, chapter) {
                if group.section.is_some_and(|s| s.trim().is_empty()) {
                    return invalid(format!("empty section name in '{}'", chapter.chapter));
                }
                if group.tags.iter().any(|t| t.trim().is_empty()) {
                    return invalid(format!("empty tag name in '{}'", chapter.chapter));
                }
            }
        }
    }

    Ok(())
}

/// Bring the stored tree of `spec.subject` in line with the curriculum,
/// renaming nodes in place and creating missing ones.
///
/// Each node is its own unit of work: a store failure stops the import and is
/// returned, while nodes written before it stay. Re-running is safe.
pub fn import_curriculum<S: TagStore + ?Sized>(
    store: &S,
    spec: &CurriculumSpec,
) -> Result<ImportStats> {
    validate_curriculum(spec)?;

    let subject = spec.subject;
    let mut stats = ImportStats::default();

    info!("Importing {} curriculum ({} grades)", subject, spec.grades.len());

    for grade in &spec.grades {
        let grade_node = upsert_tag(store, subject, grade.name.trim(), None, grade.rank)?;
        stats.record(&grade_node);
        debug!("Grade '{}' ({} chapters)", grade.name, grade.chapters.len());

        for (chapter_idx, chapter) in grade.chapters.iter().enumerate() {
            let chapter_node = upsert_tag(
                store,
                subject,
                chapter.chapter.trim(),
                Some(&grade_node.id),
                chapter_idx as i64 + 1,
            )?;
            stats.record(&chapter_node);

            let groups = tag_groups(spec.sectioned, chapter);
            for (section_idx, group) in groups.iter().enumerate() {
                let parent_id = match group.section {
                    Some(section) => {
                        let section_node = upsert_tag(
                            store,
                            subject,
                            section.trim(),
                            Some(&chapter_node.id),
                            section_idx as i64 + 1,
                        )?;
                        stats.record(&section_node);
                        section_node.id
                    }
                    None => chapter_node.id.clone(),
                };

                for (tag_idx, tag) in group.tags.iter().enumerate() {
                    let tag_node = upsert_tag(
                        store,
                        subject,
                        tag.trim(),
                        Some(&parent_id),
                        tag_idx as i64 + 1,
                    )?;
                    stats.record(&tag_node);
                }
            }
        }
    }

    info!(
        "{}: created {}, updated {}, unchanged {}",
        subject, stats.created, stats.updated, stats.unchanged
    );
    Ok(stats)
}

/// Delete every system tag of the subject, then import from scratch.
/// Custom tags survive, detached from the deleted nodes.
pub fn replace_curriculum<S: TagStore + ?Sized>(
    store: &S,
    spec: &CurriculumSpec,
) -> Result<ImportStats> {
    validate_curriculum(spec)?;

    info!("Clearing existing {} system tags", spec.subject);
    let deleted = store.delete_nodes(&TagFilter::subject(spec.subject).system())?;

    let mut stats = import_curriculum(store, spec)?;
    stats.deleted = deleted;
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wrongbook_schemas::{GradeSpec, SectionSpec};

    fn flat_spec() -> CurriculumSpec {
        CurriculumSpec {
            subject: Subject::Physics,
            sectioned: false,
            grades: vec![GradeSpec {
                name: "國二上".to_string(),
                rank: 1,
                chapters: vec![ChapterSpec {
                    chapter: "聲音".to_string(),
                    sections: vec![],
                    tags: vec!["波動".to_string(), "聲速".to_string()],
                }],
            }],
        }
    }

    #[test]
    fn test_valid_flat_curriculum() {
        assert!(validate_curriculum(&flat_spec()).is_ok());
    }

    #[test]
    fn test_duplicate_rank_rejected() {
        let mut spec = flat_spec();
        spec.grades.push(GradeSpec {
            name: "國二下".to_string(),
            rank: 1,
            chapters: vec![],
        });
        assert!(matches!(
            validate_curriculum(&spec),
            Err(TaxonomyError::InvalidCurriculum(_))
        ));
    }

    #[test]
    fn test_shape_mismatch_rejected() {
        let mut spec = flat_spec();
        spec.grades[0].chapters[0].sections.push(SectionSpec {
            section: "聲波".to_string(),
            tags: vec![],
        });
        assert!(validate_curriculum(&spec).is_err());

        let mut sectioned = flat_spec();
        sectioned.sectioned = true;
        assert!(validate_curriculum(&sectioned).is_err());
    }

    #[test]
    fn test_blank_tag_rejected() {
        let mut spec = flat_spec();
        spec.grades[0].chapters[0].tags.push("  ".to_string());
        assert!(validate_curriculum(&spec).is_err());
    }

    #[test]
    fn test_tag_groups_flat_and_sectioned() {
        let chapter = ChapterSpec {
            chapter: "章".to_string(),
            sections: vec![SectionSpec {
                section: "節".to_string(),
                tags: vec!["點".to_string()],
            }],
            tags: vec!["直屬".to_string()],
        };

        let flat = tag_groups(false, &chapter);
        assert_eq!(flat.len(), 1);
        assert!(flat[0].section.is_none());
        assert_eq!(flat[0].tags, ["直屬".to_string()]);

        let sectioned = tag_groups(true, &chapter);
        assert_eq!(sectioned.len(), 1);
        assert_eq!(sectioned[0].section, Some("節"));
    }
}
