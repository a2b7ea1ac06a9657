pub mod config;
pub mod database;
pub mod error;
pub mod migration;
pub mod resolver;
pub mod selector;
pub mod store;
pub mod tree;
pub mod upsert;

pub use config::TaxonomyConfig;
pub use database::Database;
pub use error::{Result, TaxonomyError};
pub use migration::{
    infer_subject_from_name, legacy_subject, migrate_legacy_records,
    parse_legacy_knowledge_points, read_legacy_records, LegacyRecord, MigrationStats,
    RecordTags,
};
pub use resolver::{GradeResolver, Resolution};
pub use selector::{
    leaf_tags_for_subject, root_names_for_grade, suggest_tags, tags_for_grade, MAX_SUGGESTIONS,
};
pub use store::{NewTag, ParentFilter, TagFilter, TagStore, TagUpdate};
pub use tree::TaxonomyTree;
pub use upsert::{
    import_curriculum, read_curriculum_file, replace_curriculum, upsert_tag,
    validate_curriculum, ImportStats, UpsertAction, UpsertOutcome,
};
