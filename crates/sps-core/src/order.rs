// Display ordering for collections whose mapping key order carries no meaning.
// - Backfill: if any entity lacks `order`, every entity gets one from the
//   lexicographic key sort (0, 1, 2, ...). Existing values are otherwise untouched.
// - Listing: stable sort by `order`, ties keep mapping order.
// - Reorder: `order` is rewritten to the exact 0-based position, no gaps.
use serde_json::{Map, Value, json};

use crate::error::EditError;
use crate::model::{Collection, Document};

fn order_key(entity: &Value) -> i64 {
    match entity.get("order") {
        Some(Value::Number(n)) => n.as_i64().unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

pub fn needs_backfill(map: &Map<String, Value>) -> bool {
    map.values()
        .filter_map(Value::as_object)
        .any(|e| !e.contains_key("order"))
}

fn sorted_keys(map: &Map<String, Value>) -> Vec<String> {
    let mut keys: Vec<String> = map.keys().cloned().collect();
    keys.sort();
    keys
}

/// Assigns `order` from the key sort when at least one entity is missing it.
/// Returns whether anything was written.
pub fn backfill(map: &mut Map<String, Value>) -> bool {
    if !needs_backfill(map) {
        return false;
    }
    let keys = sorted_keys(map);
    apply_order(map, &keys);
    tracing::debug!(entities = keys.len(), "backfilled display order");
    true
}

/// Ids in display order. A collection still needing backfill lists in the
/// order backfill would produce, without writing it.
pub fn ordered_ids(map: &Map<String, Value>) -> Vec<String> {
    if needs_backfill(map) {
        return sorted_keys(map);
    }
    let mut entries: Vec<(&String, i64)> = map.iter().map(|(k, v)| (k, order_key(v))).collect();
    entries.sort_by_key(|(_, o)| *o);
    entries.into_iter().map(|(k, _)| k.clone()).collect()
}

/// Writes `order = position` for every listed id present in the map.
pub fn apply_order(map: &mut Map<String, Value>, ids: &[String]) {
    for (i, id) in ids.iter().enumerate() {
        if let Some(Value::Object(entity)) = map.get_mut(id) {
            entity.insert("order".into(), json!(i));
        }
    }
}

/// Rewrites the collection's orders to be contiguous from 0.
pub fn resequence(map: &mut Map<String, Value>) {
    let ids = ordered_ids(map);
    apply_order(map, &ids);
}

/// How the editor lists a collection: by `order` for ordered collections,
/// by key otherwise.
pub fn listed_ids(doc: &Document, collection: &Collection) -> Vec<String> {
    match collection.map(doc) {
        Some(map) if collection.is_ordered() => ordered_ids(map),
        Some(map) => sorted_keys(map),
        None => Vec::new(),
    }
}

pub fn ensure_orders(doc: &mut Document, collection: &Collection) -> bool {
    if !collection.is_ordered() {
        return false;
    }
    collection.map_mut(doc).is_some_and(backfill)
}

fn ordered_map_mut<'a>(
    doc: &'a mut Document,
    collection: &Collection,
) -> Result<&'a mut Map<String, Value>, EditError> {
    if !collection.is_ordered() {
        return Err(EditError::NotOrdered(collection.path()));
    }
    collection
        .map_mut(doc)
        .ok_or_else(|| EditError::NotAMapping(collection.path()))
}

/// Moves `id` to `to_index` (clamped to the end) and rewrites every order.
pub fn move_entity(
    doc: &mut Document,
    collection: &Collection,
    id: &str,
    to_index: usize,
) -> Result<(), EditError> {
    let map = ordered_map_mut(doc, collection)?;
    if !map.contains_key(id) {
        return Err(EditError::NotFound(id.to_string()));
    }
    let mut ids = ordered_ids(map);
    ids.retain(|k| k != id);
    ids.insert(to_index.min(ids.len()), id.to_string());
    apply_order(map, &ids);
    Ok(())
}

/// Replaces the whole sequence, e.g. after a drag and drop. Unknown and
/// repeated ids are skipped; entities left out keep their relative order
/// after the listed ones. Orders always end up 0..n.
pub fn reorder(
    doc: &mut Document,
    collection: &Collection,
    ids: &[String],
) -> Result<(), EditError> {
    let map = ordered_map_mut(doc, collection)?;
    let mut seq: Vec<String> = Vec::with_capacity(map.len());
    for id in ids {
        if map.contains_key(id) && !seq.contains(id) {
            seq.push(id.clone());
        }
    }
    for id in ordered_ids(map) {
        if !seq.contains(&id) {
            seq.push(id);
        }
    }
    apply_order(map, &seq);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backfill_is_lexicographic_and_ignores_insertion_order() {
        let mut m = json!({"B": {}, "A": {}, "C": {}}).as_object().cloned().unwrap_or_default();
        assert!(backfill(&mut m));
        assert_eq!(m["A"]["order"], json!(0));
        assert_eq!(m["B"]["order"], json!(1));
        assert_eq!(m["C"]["order"], json!(2));
    }

    #[test]
    fn complete_orders_are_left_alone() {
        let mut m = json!({"A": {"order": 7}, "B": {"order": 3}})
            .as_object()
            .cloned()
            .unwrap_or_default();
        assert!(!backfill(&mut m));
        assert_eq!(ordered_ids(&m), vec!["B".to_string(), "A".to_string()]);
    }

    #[test]
    fn partial_reorder_keeps_orders_contiguous() {
        let mut doc = Document::load(json!({
            "emojiPresets": {"A": {"order": 0}, "B": {"order": 1}, "C": {"order": 2}}
        }));
        let ids = ["C".to_string(), "A".to_string(), "C".to_string()];
        reorder(&mut doc, &Collection::EmojiPresets, &ids).unwrap();
        let v = doc.to_value();
        assert_eq!(v["emojiPresets"]["C"]["order"], json!(0));
        assert_eq!(v["emojiPresets"]["A"]["order"], json!(1));
        assert_eq!(v["emojiPresets"]["B"]["order"], json!(2));
    }
}
