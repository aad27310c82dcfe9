//! sps-core: document model, reference integrity, validation and runtime export
//! for the social-post data file (`Database.json`).
//!
//! The surface is intentionally small:
//! - `Document` over the raw JSON mapping, plus typed views of its entities
//! - Renames that carry every reference along (`integrity`)
//! - Validation issues with dotted paths the UI can jump to
//! - Export to the JS data module consumed by the game plugin
//! - A `Session` that owns the document and notifies observers on change
//!
pub mod backup;
pub mod edit;
pub mod error;
pub mod export;
pub mod integrity;
pub mod model;
pub mod names;
pub mod order;
pub mod session;
pub mod storage;
pub mod validate;

pub use backup::zip_backup;
pub use edit::{
    add_entity, delete_entity, duplicate_entity, get_at, remove_at, reset_post_emoji,
    select_post_preset, set_at, set_block_pool, set_post_override_range, set_preset_range,
};
pub use error::{CoreError, EditError, RenameError, Result};
pub use export::{ExportOpts, RuntimeData, export_runtime_module, export_value, normalize_timeslot};
pub use integrity::{
    RenameTarget, Renamed, rename, rename_comment_block, rename_comment_set, rename_emoji_preset,
    rename_username_pool,
};
pub use model::{Collection, Document, PostLocation, Range, Reaction, Section};
pub use names::make_unique_name;
pub use order::{ensure_orders, listed_ids, move_entity, reorder};
pub use session::{Change, ObserverId, Session};
pub use storage::{SaveOpts, load_document_file, save_document_file, write_export_file};
pub use validate::{Issue, IssueTarget, Level, has_errors, validate};

/// File name the editor opens when none is given.
pub const DEFAULT_DOCUMENT: &str = "Database.json";
