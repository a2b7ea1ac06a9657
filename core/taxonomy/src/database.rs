use chrono::{SecondsFormat, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use wrongbook_schemas::{generate_tag_id, Subject, TagId, TagNode};

use crate::error::{Result, TaxonomyError};
use crate::store::{NewTag, ParentFilter, TagFilter, TagStore, TagUpdate};

pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_millis(5000);

const TAG_COLUMNS: &str =
    "t.id, t.name, t.subject, t.parent_id, t.is_system, t.sort_order, t.created_at, t.updated_at";

/// SQLite-backed tag store.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open (or create) the database and initialize the schema
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::open(path, DEFAULT_BUSY_TIMEOUT)
    }

    pub fn open<P: AsRef<Path>>(path: P, busy_timeout: Duration) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(busy_timeout)?;
        conn.pragma_update(None, "foreign_keys", "ON")?;

        let db = Self { conn };
        db.init_schema()?;

        info!("Database initialized");
        Ok(db)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute(
            "CREATE TABLE IF NOT EXISTS knowledge_tags (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                subject TEXT NOT NULL,
                parent_id TEXT,
                is_system INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                FOREIGN KEY (parent_id) REFERENCES knowledge_tags(id)
            )",
            [],
        )?;

        // Structural identity of system nodes: (subject, parent, order)
        self.conn.execute(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_tags_structural
             ON knowledge_tags(subject, COALESCE(parent_id, ''), sort_order)
             WHERE is_system = 1",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tags_parent ON knowledge_tags(parent_id)",
            [],
        )?;

        self.conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_tags_subject_name ON knowledge_tags(subject, name)",
            [],
        )?;

        Ok(())
    }

    pub fn get_node(&self, id: &TagId) -> Result<Option<TagNode>> {
        let sql = format!("SELECT {} FROM knowledge_tags t WHERE t.id = ?1", TAG_COLUMNS);
        let node = self
            .conn
            .query_row(&sql, params![id.0], row_to_tag)
            .optional()?;
        Ok(node)
    }

    /// Count all tags in the store
    pub fn count_tags(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM knowledge_tags", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Count tags per subject, system and custom separately
    pub fn tag_counts_by_subject(&self) -> Result<Vec<(Subject, usize, usize)>> {
        let mut stmt = self.conn.prepare(
            "SELECT subject,
                    SUM(CASE WHEN is_system = 1 THEN 1 ELSE 0 END),
                    SUM(CASE WHEN is_system = 0 THEN 1 ELSE 0 END)
             FROM knowledge_tags
             GROUP BY subject
             ORDER BY subject",
        )?;

        let counts = stmt
            .query_map([], |row| {
                Ok((
                    parse_subject(&row.get::<_, String>(0)?),
                    row.get::<_, i64>(1)? as usize,
                    row.get::<_, i64>(2)? as usize,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(counts)
    }
}

impl TagStore for Database {
    fn find_nodes(&self, filter: &TagFilter) -> Result<Vec<TagNode>> {
        let (clause, values) = filter_clause(filter);
        let sql = format!(
            "SELECT {} FROM knowledge_tags t WHERE {} ORDER BY t.sort_order, t.created_at, t.id",
            TAG_COLUMNS, clause
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let nodes = stmt
            .query_map(params_from_iter(values), row_to_tag)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(nodes)
    }

    fn create_node(&self, fields: NewTag) -> Result<TagNode> {
        let id = generate_tag_id();
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);

        self.conn.execute(
            "INSERT INTO knowledge_tags (id, name, subject, parent_id, is_system, sort_order, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                id.0,
                fields.name,
                fields.subject.as_str(),
                fields.parent_id.as_ref().map(|p| p.0.as_str()),
                fields.is_system as i32,
                fields.order,
                now,
                now
            ],
        )?;

        debug!("Created tag: {} ({})", fields.name, id);

        Ok(TagNode {
            id,
            name: fields.name,
            subject: fields.subject,
            parent_id: fields.parent_id,
            is_system: fields.is_system,
            order: fields.order,
            created_at: now.clone(),
            updated_at: now,
        })
    }

    fn update_node(&self, id: &TagId, update: TagUpdate) -> Result<TagNode> {
        if let Some(name) = update.name {
            let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
            let updated = self.conn.execute(
                "UPDATE knowledge_tags SET name = ?1, updated_at = ?2 WHERE id = ?3",
                params![name, now, id.0],
            )?;
            if updated == 0 {
                return Err(TaxonomyError::NotFound(format!("tag {}", id)));
            }
        }

        self.get_node(id)?
            .ok_or_else(|| TaxonomyError::NotFound(format!("tag {}", id)))
    }

    fn delete_nodes(&self, filter: &TagFilter) -> Result<usize> {
        // Matched nodes take their system descendants with them; custom
        // children of anything deleted are detached instead.
        let (clause, values) = filter_clause(filter);
        let doomed = format!(
            "WITH RECURSIVE doomed(id) AS (
                SELECT t.id FROM knowledge_tags t WHERE {}
                UNION
                SELECT c.id FROM knowledge_tags c JOIN doomed d ON c.parent_id = d.id
                WHERE c.is_system = 1
             )",
            clause
        );

        let tx = self.conn.unchecked_transaction()?;

        let detached = tx.execute(
            &format!(
                "{} UPDATE knowledge_tags SET parent_id = NULL
                 WHERE is_system = 0
                   AND parent_id IN (SELECT id FROM doomed)
                   AND id NOT IN (SELECT id FROM doomed)",
                doomed
            ),
            params_from_iter(values.iter()),
        )?;

        let deleted = tx.execute(
            &format!(
                "{} DELETE FROM knowledge_tags WHERE id IN (SELECT id FROM doomed)",
                doomed
            ),
            params_from_iter(values.iter()),
        )?;

        tx.commit()?;

        info!("Deleted {} tags, detached {} custom tags", deleted, detached);
        Ok(deleted)
    }
}

/// Build a WHERE clause (over alias `t`) and its positional values
fn filter_clause(filter: &TagFilter) -> (String, Vec<Value>) {
    let mut conditions: Vec<String> = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if let Some(subject) = filter.subject {
        values.push(Value::Text(subject.as_str().to_string()));
        conditions.push(format!("t.subject = ?{}", values.len()));
    }

    match &filter.parent {
        ParentFilter::Any => {}
        ParentFilter::Root => conditions.push("t.parent_id IS NULL".to_string()),
        ParentFilter::Of(id) => {
            values.push(Value::Text(id.0.clone()));
            conditions.push(format!("t.parent_id = ?{}", values.len()));
        }
    }

    if let Some(is_system) = filter.is_system {
        values.push(Value::Integer(is_system as i64));
        conditions.push(format!("t.is_system = ?{}", values.len()));
    }

    if let Some(order) = filter.order {
        values.push(Value::Integer(order));
        conditions.push(format!("t.sort_order = ?{}", values.len()));
    }

    if let Some(name) = &filter.name {
        values.push(Value::Text(name.clone()));
        conditions.push(format!("t.name = ?{}", values.len()));
    }

    if filter.leaf_only {
        conditions.push(
            "NOT EXISTS (SELECT 1 FROM knowledge_tags k WHERE k.parent_id = t.id)".to_string(),
        );
    }

    if conditions.is_empty() {
        ("1 = 1".to_string(), values)
    } else {
        (conditions.join(" AND "), values)
    }
}

fn row_to_tag(row: &Row) -> rusqlite::Result<TagNode> {
    Ok(TagNode {
        id: TagId(row.get(0)?),
        name: row.get(1)?,
        subject: parse_subject(&row.get::<_, String>(2)?),
        parent_id: row.get::<_, Option<String>>(3)?.map(TagId),
        is_system: row.get::<_, i64>(4)? != 0,
        order: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

fn parse_subject(raw: &str) -> Subject {
    Subject::from_key(raw).unwrap_or_else(|| {
        debug!("Unknown subject '{}', defaulting to Other", raw);
        Subject::Other
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    fn new_tag(name: &str, parent_id: Option<&TagId>, is_system: bool, order: i64) -> NewTag {
        NewTag {
            name: name.to_string(),
            subject: Subject::Math,
            parent_id: parent_id.cloned(),
            is_system,
            order,
        }
    }

    #[test]
    fn test_database_creation() {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path()).unwrap();

        assert_eq!(db.count_tags().unwrap(), 0);
    }

    #[test]
    fn test_create_and_find_by_structural_key() {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path()).unwrap();

        let root = db.create_node(new_tag("國一上", None, true, 1)).unwrap();
        let chapter = db
            .create_node(new_tag("整數的運算", Some(&root.id), true, 1))
            .unwrap();

        let found = db
            .find_first(&TagFilter::structural_key(Subject::Math, Some(&root.id), 1))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, chapter.id);
        assert_eq!(found.parent_id, Some(root.id.clone()));

        let roots = db.find_nodes(&TagFilter::system_roots(Subject::Math)).unwrap();
        assert_eq!(roots.len(), 1);
        assert_eq!(roots[0].name, "國一上");

        let other_subject = db.find_nodes(&TagFilter::system_roots(Subject::Physics)).unwrap();
        assert!(other_subject.is_empty());
    }

    #[test]
    fn test_structural_key_is_unique_for_system_nodes() {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path()).unwrap();

        db.create_node(new_tag("國一上", None, true, 1)).unwrap();
        assert!(db.create_node(new_tag("國一下", None, true, 1)).is_err());

        // Custom tags are not bound by the structural key
        db.create_node(new_tag("自訂一", None, false, 0)).unwrap();
        db.create_node(new_tag("自訂二", None, false, 0)).unwrap();
        assert_eq!(db.count_tags().unwrap(), 3);
    }

    #[test]
    fn test_update_node_renames_in_place() {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path()).unwrap();

        let node = db.create_node(new_tag("一元一次方程式", None, true, 1)).unwrap();
        let renamed = db
            .update_node(
                &node.id,
                TagUpdate {
                    name: Some("一元一次方程".to_string()),
                },
            )
            .unwrap();

        assert_eq!(renamed.id, node.id);
        assert_eq!(renamed.name, "一元一次方程");

        let missing = db.update_node(
            &TagId("tag_missing".to_string()),
            TagUpdate {
                name: Some("x".to_string()),
            },
        );
        assert!(matches!(missing, Err(TaxonomyError::NotFound(_))));
    }

    #[test]
    fn test_leaf_only_filter() {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path()).unwrap();

        let root = db.create_node(new_tag("國一上", None, true, 1)).unwrap();
        let chapter = db.create_node(new_tag("章", Some(&root.id), true, 1)).unwrap();
        db.create_node(new_tag("點一", Some(&chapter.id), true, 1)).unwrap();
        db.create_node(new_tag("點二", Some(&chapter.id), true, 2)).unwrap();

        let leaves = db
            .find_nodes(&TagFilter::subject(Subject::Math).system().leaves())
            .unwrap();
        let names: Vec<&str> = leaves.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["點一", "點二"]);
    }

    #[test]
    fn test_delete_takes_system_subtree_and_detaches_custom_tags() {
        let temp = NamedTempFile::new().unwrap();
        let db = Database::new(temp.path()).unwrap();

        let root = db.create_node(new_tag("國一上", None, true, 1)).unwrap();
        let chapter = db.create_node(new_tag("章", Some(&root.id), true, 1)).unwrap();
        db.create_node(new_tag("點", Some(&chapter.id), true, 1)).unwrap();
        let custom = db.create_node(new_tag("自訂", Some(&root.id), false, 0)).unwrap();

        let deleted = db
            .delete_nodes(&TagFilter::subject(Subject::Math).system())
            .unwrap();
        assert_eq!(deleted, 3);

        let survivor = db.get_node(&custom.id).unwrap().unwrap();
        assert!(survivor.parent_id.is_none());
        assert!(!survivor.is_system);
    }

    #[test]
    fn test_unknown_subject_defaults_to_other() {
        assert_eq!(parse_subject("astronomy"), Subject::Other);
        assert_eq!(parse_subject("math"), Subject::Math);
    }
}
