//! Rename with reference propagation.
//!
//! Each rename checks every precondition before touching the document, so a
//! refused rename leaves it exactly as it was. Deleting an entity is not handled
//! here on purpose: deletions never cascade and the validator reports the
//! dangling references they leave behind.
use serde_json::Value;

use crate::error::RenameError;
use crate::model::{CommentSet, Document, Section};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenameTarget {
    /// `usernames` key, referenced by `commentBlocks[*].usernamePool`
    UsernamePool,
    /// `commentBlocks` key, referenced by the entries of `commentSets[*]`
    CommentBlock,
    /// `commentSets` key, referenced by every `Post.commentsSet`
    CommentSet,
    /// `emojiPresets` key, referenced by every `Post.emojiPreset`
    EmojiPreset,
}

impl RenameTarget {
    pub fn section(self) -> Section {
        match self {
            RenameTarget::UsernamePool => Section::Usernames,
            RenameTarget::CommentBlock => Section::CommentBlocks,
            RenameTarget::CommentSet => Section::CommentSets,
            RenameTarget::EmojiPreset => Section::EmojiPresets,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Renamed {
    pub target: RenameTarget,
    pub old: String,
    pub new: String,
    /// Number of reference sites rewritten.
    pub references: usize,
}

pub fn rename_username_pool(
    doc: &mut Document,
    old: &str,
    new: &str,
) -> Result<Renamed, RenameError> {
    rename(doc, RenameTarget::UsernamePool, old, new)
}

pub fn rename_comment_block(
    doc: &mut Document,
    old: &str,
    new: &str,
) -> Result<Renamed, RenameError> {
    rename(doc, RenameTarget::CommentBlock, old, new)
}

pub fn rename_comment_set(
    doc: &mut Document,
    old: &str,
    new: &str,
) -> Result<Renamed, RenameError> {
    rename(doc, RenameTarget::CommentSet, old, new)
}

pub fn rename_emoji_preset(
    doc: &mut Document,
    old: &str,
    new: &str,
) -> Result<Renamed, RenameError> {
    rename(doc, RenameTarget::EmojiPreset, old, new)
}

pub fn rename(
    doc: &mut Document,
    target: RenameTarget,
    old: &str,
    new: &str,
) -> Result<Renamed, RenameError> {
    let old = old.trim();
    let new = new.trim();
    if old.is_empty() || new.is_empty() {
        return Err(RenameError::EmptyName);
    }
    if old == new {
        return Err(RenameError::SameName);
    }

    let section = target.section();
    match doc.root().get(section.key()) {
        None | Some(Value::Null) => return Err(RenameError::NotFound(old.to_string())),
        Some(Value::Object(m)) => {
            if !m.contains_key(old) {
                return Err(RenameError::NotFound(old.to_string()));
            }
            if m.contains_key(new) {
                return Err(RenameError::AlreadyExists(new.to_string()));
            }
        }
        Some(_) => return Err(RenameError::SectionNotMapping(section.key())),
    }

    // Preconditions hold; from here on nothing can fail.
    if let Some(map) = doc.section_map_mut(section)
        && let Some(value) = map.shift_remove(old)
    {
        map.insert(new.to_string(), value);
    }

    let references = match target {
        RenameTarget::UsernamePool => rewrite_block_pools(doc, old, new),
        RenameTarget::CommentBlock => rewrite_set_entries(doc, old, new),
        RenameTarget::CommentSet => rewrite_post_field(doc, "commentsSet", old, new),
        RenameTarget::EmojiPreset => rewrite_post_field(doc, "emojiPreset", old, new),
    };
    tracing::info!(?target, old, new, references, "renamed");
    Ok(Renamed {
        target,
        old: old.to_string(),
        new: new.to_string(),
        references,
    })
}

fn rewrite_block_pools(doc: &mut Document, old: &str, new: &str) -> usize {
    let Some(Value::Object(blocks)) = doc.root_mut().get_mut(Section::CommentBlocks.key()) else {
        return 0;
    };
    let mut n = 0;
    for block in blocks.values_mut().filter_map(Value::as_object_mut) {
        if let Some(slot) = block.get_mut("usernamePool")
            && slot.as_str() == Some(old)
        {
            *slot = Value::String(new.to_string());
            n += 1;
        }
    }
    n
}

fn rewrite_set_entries(doc: &mut Document, old: &str, new: &str) -> usize {
    let Some(Value::Object(sets)) = doc.root_mut().get_mut(Section::CommentSets.key()) else {
        return 0;
    };
    let mut n = 0;
    for set in sets.values_mut() {
        let Some(entries) = CommentSet::entries_mut(set) else {
            continue;
        };
        for entry in entries.iter_mut().filter(|e| e.as_str() == Some(old)) {
            *entry = Value::String(new.to_string());
            n += 1;
        }
    }
    n
}

fn rewrite_post_field(doc: &mut Document, field: &str, old: &str, new: &str) -> usize {
    let mut n = 0;
    doc.for_each_post_mut(|post| {
        if let Some(slot) = post.get_mut(field)
            && slot.as_str() == Some(old)
        {
            *slot = Value::String(new.to_string());
            n += 1;
        }
    });
    n
}
