// Entity-level editing over a Document.
// - Lifecycle: `add_entity`, `delete_entity`, `duplicate_entity` for any Collection.
//   Deletion never cascades; dangling references are left to the validator.
// - Reactions: min/max edits clamp (negatives -> 0, max raised to min).
// - Generic RFC 6901 pointer access for plain field edits: `get_at`, `set_at`, `remove_at`.
use serde_json::{Map, Value, json};

use crate::error::{CoreError, EditError};
use crate::model::{
    Collection, DEFAULT_POOL, Document, EmojiPreset, EmojiValues, PostLocation, Range, Reaction,
    Section, default_pool_for_new_block,
};
use crate::names::make_unique_name;
use crate::order;

fn collection_mut<'a>(
    doc: &'a mut Document,
    collection: &Collection,
) -> Result<&'a mut Map<String, Value>, EditError> {
    if let Collection::ProfilePosts(profile) = collection
        && Collection::Profiles
            .map(doc)
            .is_none_or(|profiles| !profiles.contains_key(profile))
    {
        return Err(EditError::NotFound(profile.clone()));
    }
    collection
        .map_mut(doc)
        .ok_or_else(|| EditError::NotAMapping(collection.path()))
}

/// Appends `order = count` after re-sequencing the existing entities.
fn append_order(map: &mut Map<String, Value>, entity: &mut Value) {
    order::resequence(map);
    if let Value::Object(e) = entity {
        e.insert("order".into(), json!(map.len()));
    }
}

/// Creates an empty-shaped entity under `id` (trimmed). Returns the id used.
pub fn add_entity(
    doc: &mut Document,
    collection: &Collection,
    id: &str,
) -> Result<String, EditError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(EditError::EmptyId);
    }
    let mut entity = collection.default_entity(doc);
    let map = collection_mut(doc, collection)?;
    if map.contains_key(id) {
        return Err(EditError::AlreadyExists(id.to_string()));
    }
    if collection.is_ordered() {
        append_order(map, &mut entity);
    }
    map.insert(id.to_string(), entity);
    tracing::info!(collection = %collection.path(), id, "added");
    Ok(id.to_string())
}

/// Removes the entity only. References to it stay in place.
pub fn delete_entity(
    doc: &mut Document,
    collection: &Collection,
    id: &str,
) -> Result<Value, EditError> {
    let map = collection_mut(doc, collection)?;
    let removed = map
        .shift_remove(id)
        .ok_or_else(|| EditError::NotFound(id.to_string()))?;
    if collection.is_ordered() {
        order::resequence(map);
    }
    tracing::info!(collection = %collection.path(), id, "deleted");
    Ok(removed)
}

/// Deep-copies an entity under a fresh `<id>_Copy[N]` id. Returns the new id.
pub fn duplicate_entity(
    doc: &mut Document,
    collection: &Collection,
    id: &str,
) -> Result<String, EditError> {
    let fallback_pool = default_pool_for_new_block(doc);
    let map = collection_mut(doc, collection)?;
    let mut copy = map
        .get(id)
        .cloned()
        .ok_or_else(|| EditError::NotFound(id.to_string()))?;
    let new_id = make_unique_name(id, |c| map.contains_key(c));
    if *collection == Collection::CommentBlocks
        && let Value::Object(block) = &mut copy
    {
        block.entry("usernamePool").or_insert_with(|| Value::String(fallback_pool));
    }
    if collection.is_ordered() {
        append_order(map, &mut copy);
    }
    map.insert(new_id.clone(), copy);
    tracing::info!(collection = %collection.path(), id, new_id, "duplicated");
    Ok(new_id)
}

pub fn set_preset_range(
    doc: &mut Document,
    preset: &str,
    reaction: Reaction,
    min: i64,
    max: i64,
) -> Result<Range, EditError> {
    let presets = collection_mut(doc, &Collection::EmojiPresets)?;
    let entry = presets
        .get_mut(preset)
        .ok_or_else(|| EditError::NotFound(preset.to_string()))?
        .as_object_mut()
        .ok_or_else(|| EditError::NotAMapping(format!("emojiPresets.{preset}")))?;
    let range = Range::clamped(min, max);
    entry.insert(reaction.key().into(), range.to_value());
    Ok(range)
}

fn post_mut<'a>(
    doc: &'a mut Document,
    loc: &PostLocation,
) -> Result<&'a mut Map<String, Value>, EditError> {
    doc.post_mut(loc).ok_or_else(|| EditError::NotFound(loc.path()))
}

/// Edits the post's own ranges and switches it to custom reactions.
pub fn set_post_override_range(
    doc: &mut Document,
    loc: &PostLocation,
    reaction: Reaction,
    min: i64,
    max: i64,
) -> Result<Range, EditError> {
    let post = post_mut(doc, loc)?;
    let range = Range::clamped(min, max);
    let mut values = post
        .get("emojiOverride")
        .filter(|v| v.is_object())
        .cloned()
        .unwrap_or_else(|| EmojiValues::default().to_value());
    if let Value::Object(m) = &mut values {
        m.insert(reaction.key().into(), range.to_value());
    }
    post.insert("emojiOverride".into(), values);
    post.insert("emojiPreset".into(), Value::String(String::new()));
    Ok(range)
}

/// Back to custom reactions with every range zeroed.
pub fn reset_post_emoji(doc: &mut Document, loc: &PostLocation) -> Result<(), EditError> {
    let post = post_mut(doc, loc)?;
    post.insert("emojiPreset".into(), Value::String(String::new()));
    post.insert("emojiOverride".into(), EmojiValues::default().to_value());
    Ok(())
}

/// Points the post at a preset and caches the preset's ranges in
/// `emojiOverride`. An empty preset id switches to custom and keeps the cache.
pub fn select_post_preset(
    doc: &mut Document,
    loc: &PostLocation,
    preset: &str,
) -> Result<(), EditError> {
    let preset = preset.trim();
    let cached = if preset.is_empty() {
        None
    } else {
        let presets = Collection::EmojiPresets
            .map(doc)
            .ok_or_else(|| EditError::NotFound(preset.to_string()))?;
        let values = presets
            .get(preset)
            .map(EmojiPreset::from_value)
            .ok_or_else(|| EditError::NotFound(preset.to_string()))?
            .values;
        Some(values)
    };
    let post = post_mut(doc, loc)?;
    post.insert("emojiPreset".into(), Value::String(preset.to_string()));
    if let Some(values) = cached {
        post.insert("emojiOverride".into(), values.to_value());
    }
    Ok(())
}

/// Sets a comment block's username pool; an empty name falls back to `Global`.
pub fn set_block_pool(doc: &mut Document, block: &str, pool: &str) -> Result<(), EditError> {
    let blocks = collection_mut(doc, &Collection::CommentBlocks)?;
    let entry = blocks
        .get_mut(block)
        .ok_or_else(|| EditError::NotFound(block.to_string()))?;
    if entry.is_array() {
        // Legacy bare list: lift into the canonical shape before editing.
        let comments = entry.take();
        *entry = json!({ "usernamePool": DEFAULT_POOL, "comments": comments });
    }
    let obj = entry
        .as_object_mut()
        .ok_or_else(|| EditError::NotAMapping(format!("commentBlocks.{block}")))?;
    let pool = match pool.trim() {
        "" => DEFAULT_POOL,
        p => p,
    };
    obj.insert("usernamePool".into(), Value::String(pool.to_string()));
    obj.entry("comments").or_insert_with(|| Value::Array(Vec::new()));
    Ok(())
}

// -------- JSON Pointer access --------

fn unescape_token(tok: &str) -> String {
    tok.replace("~1", "/").replace("~0", "~")
}

fn split_pointer(pointer: &str) -> Option<(&str, &str)> {
    let rest = pointer.strip_prefix('/')?;
    match rest.find('/') {
        Some(i) => Some((&rest[..i], &rest[i..])),
        None => Some((rest, "")),
    }
}

fn parent_pointer(ptr: &str) -> Option<(&str, &str)> {
    let pos = ptr.rfind('/')?;
    Some((&ptr[..pos], &ptr[pos + 1..]))
}

pub fn get_at<'a>(doc: &'a Document, pointer: &str) -> Option<&'a Value> {
    let (first, rest) = split_pointer(pointer)?;
    doc.root().get(&unescape_token(first))?.pointer(rest)
}

fn get_at_mut<'a>(doc: &'a mut Document, pointer: &str) -> Option<&'a mut Value> {
    let (first, rest) = split_pointer(pointer)?;
    doc.root_mut().get_mut(&unescape_token(first))?.pointer_mut(rest)
}

/// Replaces the value at `pointer`, or adds the last key when its parent
/// object exists. Top-level keys are limited to the document sections.
pub fn set_at(doc: &mut Document, pointer: &str, value: Value) -> Result<(), CoreError> {
    if let Some(slot) = get_at_mut(doc, pointer) {
        *slot = value;
        return Ok(());
    }
    let (parent, last) =
        parent_pointer(pointer).ok_or_else(|| CoreError::PointerNotFound(pointer.into()))?;
    let last = unescape_token(last);
    if parent.is_empty() {
        if Section::from_key(&last).is_none() {
            return Err(CoreError::PointerNotFound(pointer.into()));
        }
        doc.root_mut().insert(last, value);
        return Ok(());
    }
    match get_at_mut(doc, parent) {
        Some(Value::Object(m)) => {
            m.insert(last, value);
            Ok(())
        }
        _ => Err(CoreError::PointerNotFound(pointer.into())),
    }
}

pub fn remove_at(doc: &mut Document, pointer: &str) -> Result<Value, CoreError> {
    let (parent, last) = parent_pointer(pointer).ok_or(EditError::RootRemoval)?;
    let last = unescape_token(last);
    if parent.is_empty() {
        return doc
            .root_mut()
            .shift_remove(&last)
            .ok_or_else(|| CoreError::PointerNotFound(pointer.into()));
    }
    match get_at_mut(doc, parent) {
        Some(Value::Object(m)) => m
            .shift_remove(&last)
            .ok_or_else(|| CoreError::PointerNotFound(pointer.into())),
        Some(Value::Array(arr)) => {
            let idx: usize = last.parse().map_err(|_| EditError::BadIndex(last.clone()))?;
            if idx >= arr.len() {
                return Err(EditError::BadIndex(last).into());
            }
            Ok(arr.remove(idx))
        }
        _ => Err(CoreError::PointerNotFound(pointer.into())),
    }
}
