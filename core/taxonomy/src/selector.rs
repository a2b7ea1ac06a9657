//! Grade-scoped tag selection and tag-entry suggestions.

use std::collections::HashSet;
use tracing::debug;
use wrongbook_schemas::{stage_for_grade, Semester, Subject, TagNode};

use crate::error::Result;
use crate::store::{TagFilter, TagStore};
use crate::tree::TaxonomyTree;

/// Upper bound on suggestions returned for one query
pub const MAX_SUGGESTIONS: usize = 20;

fn push_year_names(names: &mut Vec<String>, name: &str) {
    names.push(format!("{}{}", name, Semester::First.native_suffix()));
    names.push(format!("{}{}", name, Semester::Second.native_suffix()));
    names.push(name.to_string());
}

/// Root names visible to a student in `grade`, in grade order.
///
/// Year N of a stage sees years 1..=N of that stage, under both the canonical
/// and the older root names. `None` when the grade is unknown or outside every
/// stage: every root of the subject is visible then.
pub fn root_names_for_grade(grade: Option<u8>) -> Option<Vec<String>> {
    let grade = grade?;
    let stage = stage_for_grade(grade)?;

    let mut names = Vec::new();
    for year_index in 0..=(grade - stage.first_grade) as usize {
        for name in stage.year_names(year_index) {
            push_year_names(&mut names, name);
        }
    }
    Some(names)
}

/// Leaf tag names of `subject` for a student in `grade`, cumulative within
/// the grade's stage and deduplicated by name (first occurrence kept).
pub fn tags_for_grade<S: TagStore + ?Sized>(
    store: &S,
    subject: Subject,
    grade: Option<u8>,
) -> Result<Vec<String>> {
    let tree = TaxonomyTree::load(store, subject)?;

    let roots: Vec<&TagNode> = match root_names_for_grade(grade) {
        Some(names) => names
            .iter()
            .flat_map(|name| tree.roots().filter(move |root| root.name == *name))
            .collect(),
        None => tree.roots().collect(),
    };

    let mut seen = HashSet::new();
    let mut tags = Vec::new();
    for root in roots {
        for name in tree.leaf_names(&root.id) {
            if seen.insert(name.clone()) {
                tags.push(name);
            }
        }
    }

    debug!("{} tags for {} grade {:?}", tags.len(), subject, grade);
    Ok(tags)
}

/// Every system leaf of a subject, in sibling order
pub fn leaf_tags_for_subject<S: TagStore + ?Sized>(
    store: &S,
    subject: Subject,
) -> Result<Vec<String>> {
    let leaves = store.find_nodes(&TagFilter::subject(subject).system().leaves())?;
    Ok(leaves.into_iter().map(|n| n.name).collect())
}

/// Tag names of `subject` containing `query` (case-insensitive): system
/// leaves first, then custom tags. At most `min(limit, MAX_SUGGESTIONS)`.
pub fn suggest_tags<S: TagStore + ?Sized>(
    store: &S,
    subject: Subject,
    query: &str,
    limit: usize,
) -> Result<Vec<String>> {
    let needle = query.trim().to_lowercase();
    let limit = limit.min(MAX_SUGGESTIONS);
    if limit == 0 {
        return Ok(Vec::new());
    }

    let mut custom_filter = TagFilter::subject(subject);
    custom_filter.is_system = Some(false);

    let candidates = leaf_tags_for_subject(store, subject)?.into_iter().chain(
        store
            .find_nodes(&custom_filter)?
            .into_iter()
            .map(|n| n.name),
    );

    let mut seen = HashSet::new();
    let suggestions: Vec<String> = candidates
        .filter(|name| name.to_lowercase().contains(&needle))
        .filter(|name| seen.insert(name.clone()))
        .take(limit)
        .collect();

    debug!("'{}' matched {} {} tags", query, suggestions.len(), subject);
    Ok(suggestions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_junior_grade_is_cumulative() {
        let names = root_names_for_grade(Some(8)).unwrap();
        assert_eq!(
            names,
            vec![
                "國一上", "國一下", "國一", "七年級上", "七年級下", "七年級", "國二上", "國二下",
                "國二", "八年級上", "八年級下", "八年級",
            ]
        );
    }

    #[test]
    fn test_senior_grade_starts_at_its_stage() {
        let names = root_names_for_grade(Some(10)).unwrap();
        assert_eq!(names, vec!["高一上", "高一下", "高一"]);
        let grade12 = root_names_for_grade(Some(12)).unwrap();
        assert!(!grade12.iter().any(|n| n.starts_with('國') || n.contains("年級")));
    }

    #[test]
    fn test_unknown_grade_is_unscoped() {
        assert_eq!(root_names_for_grade(None), None);
        assert_eq!(root_names_for_grade(Some(0)), None);
        assert_eq!(root_names_for_grade(Some(13)), None);
    }

    #[test]
    fn test_primary_grade() {
        assert_eq!(
            root_names_for_grade(Some(1)).unwrap(),
            vec!["一年級上", "一年級下", "一年級"]
        );
        assert_eq!(root_names_for_grade(Some(6)).unwrap().len(), 18);
    }
}
