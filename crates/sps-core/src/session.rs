//! The editing session: one owned document, its file path, a dirty flag and
//! the observers that refresh views after a change.
//!
//! Every mutator here wraps a free function from `integrity`, `edit` or
//! `order`. On success it marks the session dirty and notifies each observer
//! exactly once, before returning. On failure nothing is notified and the dirty
//! flag is left alone.
use std::fmt;
use std::path::{Path, PathBuf};

use serde_json::Value;

use crate::edit;
use crate::error::{CoreError, EditError, RenameError, Result};
use crate::export::{ExportOpts, export_runtime_module};
use crate::integrity::{self, RenameTarget, Renamed};
use crate::model::{Collection, Document, PostLocation, Range, Reaction};
use crate::order;
use crate::storage::{self, SaveOpts};
use crate::validate::{Issue, validate};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A whole new document replaced the previous one.
    Loaded,
    Renamed {
        target: RenameTarget,
        old: String,
        new: String,
    },
    Added {
        collection: Collection,
        id: String,
    },
    Deleted {
        collection: Collection,
        id: String,
    },
    Duplicated {
        collection: Collection,
        id: String,
        new_id: String,
    },
    Reordered {
        collection: Collection,
    },
    /// A field edit; `path` is a JSON pointer or a dotted locator.
    Edited {
        path: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

type Observer = Box<dyn FnMut(&Change)>;

pub struct Session {
    document: Document,
    path: Option<PathBuf>,
    dirty: bool,
    observers: Vec<(ObserverId, Observer)>,
    next_observer: u64,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.path)
            .field("dirty", &self.dirty)
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new() -> Self {
        Session {
            document: Document::empty(),
            path: None,
            dirty: false,
            observers: Vec::new(),
            next_observer: 0,
        }
    }

    pub fn open(path: &Path) -> Result<Self> {
        let mut session = Session::new();
        session.open_file(path)?;
        Ok(session)
    }

    /// Replaces the current document with the file's content.
    pub fn open_file(&mut self, path: &Path) -> Result<()> {
        let doc = storage::load_document_file(path)?;
        self.replace(doc, Some(path.to_path_buf()));
        Ok(())
    }

    /// Takes any JSON value as the new document (see `Document::load`).
    pub fn load(&mut self, raw: Value, path: Option<PathBuf>) {
        self.replace(Document::load(raw), path);
    }

    fn replace(&mut self, doc: Document, path: Option<PathBuf>) {
        self.document = doc;
        self.path = path;
        self.dirty = false;
        self.notify(&Change::Loaded);
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn subscribe(&mut self, observer: impl FnMut(&Change) + 'static) -> ObserverId {
        let id = ObserverId(self.next_observer);
        self.next_observer += 1;
        self.observers.push((id, Box::new(observer)));
        id
    }

    /// Returns whether the observer was registered.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(i, _)| *i != id);
        self.observers.len() != before
    }

    fn notify(&mut self, change: &Change) {
        tracing::debug!(?change, observers = self.observers.len(), "document changed");
        for (_, observer) in self.observers.iter_mut() {
            observer(change);
        }
    }

    fn commit(&mut self, change: Change) {
        self.dirty = true;
        self.notify(&change);
    }

    // -------- rename --------

    pub fn try_rename(
        &mut self,
        target: RenameTarget,
        old: &str,
        new: &str,
    ) -> std::result::Result<Renamed, RenameError> {
        let renamed = integrity::rename(&mut self.document, target, old, new)?;
        self.commit(Change::Renamed {
            target,
            old: renamed.old.clone(),
            new: renamed.new.clone(),
        });
        Ok(renamed)
    }

    fn rename_quiet(&mut self, target: RenameTarget, old: &str, new: &str) -> bool {
        match self.try_rename(target, old, new) {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!(?target, old, new, error = %e, "rename refused");
                false
            }
        }
    }

    pub fn rename_username_pool(&mut self, old: &str, new: &str) -> bool {
        self.rename_quiet(RenameTarget::UsernamePool, old, new)
    }

    pub fn rename_comment_block(&mut self, old: &str, new: &str) -> bool {
        self.rename_quiet(RenameTarget::CommentBlock, old, new)
    }

    pub fn rename_comment_set(&mut self, old: &str, new: &str) -> bool {
        self.rename_quiet(RenameTarget::CommentSet, old, new)
    }

    pub fn rename_emoji_preset(&mut self, old: &str, new: &str) -> bool {
        self.rename_quiet(RenameTarget::EmojiPreset, old, new)
    }

    // -------- lifecycle and ordering --------

    pub fn add(
        &mut self,
        collection: &Collection,
        id: &str,
    ) -> std::result::Result<String, EditError> {
        let id = edit::add_entity(&mut self.document, collection, id)?;
        self.commit(Change::Added {
            collection: collection.clone(),
            id: id.clone(),
        });
        Ok(id)
    }

    pub fn delete(
        &mut self,
        collection: &Collection,
        id: &str,
    ) -> std::result::Result<Value, EditError> {
        let removed = edit::delete_entity(&mut self.document, collection, id)?;
        self.commit(Change::Deleted {
            collection: collection.clone(),
            id: id.to_string(),
        });
        Ok(removed)
    }

    pub fn duplicate(
        &mut self,
        collection: &Collection,
        id: &str,
    ) -> std::result::Result<String, EditError> {
        let new_id = edit::duplicate_entity(&mut self.document, collection, id)?;
        self.commit(Change::Duplicated {
            collection: collection.clone(),
            id: id.to_string(),
            new_id: new_id.clone(),
        });
        Ok(new_id)
    }

    pub fn listed_ids(&self, collection: &Collection) -> Vec<String> {
        order::listed_ids(&self.document, collection)
    }

    /// Backfills missing `order` fields; notifies only when something was written.
    pub fn ensure_orders(&mut self, collection: &Collection) -> bool {
        let written = order::ensure_orders(&mut self.document, collection);
        if written {
            self.commit(Change::Reordered {
                collection: collection.clone(),
            });
        }
        written
    }

    pub fn move_entity(
        &mut self,
        collection: &Collection,
        id: &str,
        to_index: usize,
    ) -> std::result::Result<(), EditError> {
        order::move_entity(&mut self.document, collection, id, to_index)?;
        self.commit(Change::Reordered {
            collection: collection.clone(),
        });
        Ok(())
    }

    pub fn reorder(
        &mut self,
        collection: &Collection,
        ids: &[String],
    ) -> std::result::Result<(), EditError> {
        order::reorder(&mut self.document, collection, ids)?;
        self.commit(Change::Reordered {
            collection: collection.clone(),
        });
        Ok(())
    }

    // -------- field edits --------

    pub fn set_preset_range(
        &mut self,
        preset: &str,
        reaction: Reaction,
        min: i64,
        max: i64,
    ) -> std::result::Result<Range, EditError> {
        let range = edit::set_preset_range(&mut self.document, preset, reaction, min, max)?;
        self.commit(Change::Edited {
            path: format!("emojiPresets.{preset}.{}", reaction.key()),
        });
        Ok(range)
    }

    pub fn set_post_override_range(
        &mut self,
        post: &PostLocation,
        reaction: Reaction,
        min: i64,
        max: i64,
    ) -> std::result::Result<Range, EditError> {
        let range = edit::set_post_override_range(&mut self.document, post, reaction, min, max)?;
        self.commit(Change::Edited {
            path: format!("{}.emojiOverride", post.path()),
        });
        Ok(range)
    }

    pub fn reset_post_emoji(&mut self, post: &PostLocation) -> std::result::Result<(), EditError> {
        edit::reset_post_emoji(&mut self.document, post)?;
        self.commit(Change::Edited {
            path: format!("{}.emojiOverride", post.path()),
        });
        Ok(())
    }

    pub fn select_post_preset(
        &mut self,
        post: &PostLocation,
        preset: &str,
    ) -> std::result::Result<(), EditError> {
        edit::select_post_preset(&mut self.document, post, preset)?;
        self.commit(Change::Edited {
            path: format!("{}.emojiPreset", post.path()),
        });
        Ok(())
    }

    pub fn set_block_pool(
        &mut self,
        block: &str,
        pool: &str,
    ) -> std::result::Result<(), EditError> {
        edit::set_block_pool(&mut self.document, block, pool)?;
        self.commit(Change::Edited {
            path: format!("commentBlocks.{block}.usernamePool"),
        });
        Ok(())
    }

    pub fn get_at(&self, pointer: &str) -> Option<&Value> {
        edit::get_at(&self.document, pointer)
    }

    pub fn set_at(&mut self, pointer: &str, value: Value) -> Result<()> {
        edit::set_at(&mut self.document, pointer, value)?;
        self.commit(Change::Edited {
            path: pointer.to_string(),
        });
        Ok(())
    }

    pub fn remove_at(&mut self, pointer: &str) -> Result<Value> {
        let removed = edit::remove_at(&mut self.document, pointer)?;
        self.commit(Change::Edited {
            path: pointer.to_string(),
        });
        Ok(removed)
    }

    // -------- read-only passes and persistence --------

    pub fn validate(&self) -> Vec<Issue> {
        validate(&self.document)
    }

    pub fn export_module(&self, opts: &ExportOpts) -> Result<String> {
        export_runtime_module(&self.document, opts)
    }

    pub fn save(&mut self, opts: SaveOpts) -> Result<()> {
        let path = self.path.clone().ok_or(CoreError::NoPath)?;
        storage::save_document_file(&path, &self.document, opts)?;
        self.dirty = false;
        Ok(())
    }

    pub fn save_as(&mut self, path: &Path, opts: SaveOpts) -> Result<()> {
        storage::save_document_file(path, &self.document, opts)?;
        self.path = Some(path.to_path_buf());
        self.dirty = false;
        Ok(())
    }

    /// Writes the runtime module; the dirty flag is not affected.
    pub fn export_to(&self, path: &Path, opts: &ExportOpts) -> Result<()> {
        storage::write_export_file(path, &self.document, opts)
    }
}
