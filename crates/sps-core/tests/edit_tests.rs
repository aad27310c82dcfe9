mod common;

use common::{sample, snapshot};
use serde_json::json;
use sps_core::model::Range;
use sps_core::{
    Collection, CoreError, Document, EditError, PostLocation, Reaction, add_entity, delete_entity,
    duplicate_entity, ensure_orders, get_at, listed_ids, move_entity, remove_at, reorder,
    reset_post_emoji, select_post_preset, set_at, set_block_pool, set_post_override_range,
    set_preset_range,
};

fn breakfast() -> PostLocation {
    PostLocation::Profile {
        profile: "CatElf".into(),
        post: "Breakfast".into(),
    }
}

#[test]
fn add_uses_default_shapes() {
    let mut doc = sample();
    add_entity(&mut doc, &Collection::ProfilePosts("CatElf".into()), "  Lunch ").unwrap();
    add_entity(&mut doc, &Collection::CommentSets, "Evening").unwrap();
    add_entity(&mut doc, &Collection::UsernamePools, "Haters").unwrap();
    let v = doc.to_value();
    let lunch = &v["profiles"]["CatElf"]["posts"]["Lunch"];
    assert_eq!(lunch["timeslot"], json!("all"));
    assert_eq!(lunch["emojiPreset"], json!(""));
    assert_eq!(lunch["emojiOverride"]["heart"], json!({"min": 0, "max": 0}));
    assert_eq!(lunch["lewdCondition"], json!({"min": 0, "max": 999_999}));
    assert_eq!(v["commentSets"]["Evening"], json!([]));
    assert_eq!(v["usernames"]["Haters"], json!([]));
    // new posts are valid right away
    assert!(sps_core::validate(&doc).is_empty());
}

#[test]
fn new_block_pool_prefers_global_then_first_sorted() {
    let mut doc = sample();
    add_entity(&mut doc, &Collection::CommentBlocks, "A").unwrap();
    assert_eq!(doc.to_value()["commentBlocks"]["A"]["usernamePool"], json!("Global"));

    let mut doc = Document::load(json!({"usernames": {"Zed": [], "Alpha": []}}));
    add_entity(&mut doc, &Collection::CommentBlocks, "A").unwrap();
    assert_eq!(doc.to_value()["commentBlocks"]["A"]["usernamePool"], json!("Alpha"));

    let mut doc = Document::empty();
    add_entity(&mut doc, &Collection::CommentBlocks, "A").unwrap();
    assert_eq!(doc.to_value()["commentBlocks"]["A"], json!({"usernamePool": "", "comments": []}));
}

#[test]
fn add_appends_to_ordered_collections() {
    let mut doc = sample();
    add_entity(&mut doc, &Collection::Profiles, "Bard").unwrap();
    add_entity(&mut doc, &Collection::EmojiPresets, "Cold").unwrap();
    let v = doc.to_value();
    assert_eq!(v["profiles"]["Bard"]["order"], json!(1));
    assert_eq!(v["profiles"]["Bard"]["posts"], json!({}));
    assert_eq!(v["emojiPresets"]["Cold"]["order"], json!(1));
    assert_eq!(v["emojiPresets"]["Cold"]["up"], json!({"min": 0, "max": 0}));
}

#[test]
fn add_rejects_bad_ids_without_mutation() {
    let mut doc = sample();
    let before = snapshot(&doc);
    assert_eq!(
        add_entity(&mut doc, &Collection::CommentBlocks, " "),
        Err(EditError::EmptyId)
    );
    assert_eq!(
        add_entity(&mut doc, &Collection::CommentBlocks, "Hello"),
        Err(EditError::AlreadyExists("Hello".into()))
    );
    assert_eq!(
        add_entity(&mut doc, &Collection::ProfilePosts("Nobody".into()), "X"),
        Err(EditError::NotFound("Nobody".into()))
    );
    assert_eq!(snapshot(&doc), before);
}

#[test]
fn delete_never_cascades() {
    let mut doc = sample();
    let removed = delete_entity(&mut doc, &Collection::CommentSets, "MorningSet").unwrap();
    assert_eq!(removed, json!(["Hello", "Fan"]));
    let v = doc.to_value();
    assert_eq!(v["profiles"]["CatElf"]["posts"]["Breakfast"]["commentsSet"], json!("MorningSet"));
    assert_eq!(v["commentBlocks"]["Hello"]["comments"], json!(["hi", "hey"]));
    assert_eq!(
        delete_entity(&mut doc, &Collection::CommentSets, "MorningSet"),
        Err(EditError::NotFound("MorningSet".into()))
    );
}

#[test]
fn delete_resequences_ordered_collections() {
    let mut doc = sample();
    add_entity(&mut doc, &Collection::Profiles, "Bard").unwrap();
    add_entity(&mut doc, &Collection::Profiles, "Cleric").unwrap();
    delete_entity(&mut doc, &Collection::Profiles, "Bard").unwrap();
    let v = doc.to_value();
    assert_eq!(v["profiles"]["CatElf"]["order"], json!(0));
    assert_eq!(v["profiles"]["Cleric"]["order"], json!(1));
}

#[test]
fn duplicate_picks_copy_names() {
    let mut doc = sample();
    let first = duplicate_entity(&mut doc, &Collection::CommentBlocks, "Hello").unwrap();
    let second = duplicate_entity(&mut doc, &Collection::CommentBlocks, "Hello").unwrap();
    assert_eq!(first, "Hello_Copy");
    assert_eq!(second, "Hello_Copy2");
    let v = doc.to_value();
    assert_eq!(v["commentBlocks"]["Hello_Copy2"], v["commentBlocks"]["Hello"]);

    let copy = duplicate_entity(&mut doc, &Collection::EmojiPresets, "Warm").unwrap();
    let v = doc.to_value();
    assert_eq!(v["emojiPresets"][&copy]["order"], json!(1));
    assert_eq!(v["emojiPresets"][&copy]["heart"], json!({"min": 2, "max": 4}));
}

#[test]
fn duplicated_copy_is_independent() {
    let mut doc = sample();
    let copy = duplicate_entity(&mut doc, &Collection::CommentSets, "MorningSet").unwrap();
    set_at(&mut doc, &format!("/commentSets/{copy}/0"), json!("Fan")).unwrap();
    assert_eq!(doc.to_value()["commentSets"]["MorningSet"], json!(["Hello", "Fan"]));
}

#[test]
fn preset_range_is_clamped() {
    let mut doc = sample();
    let r = set_preset_range(&mut doc, "Warm", Reaction::Heart, 7, 3).unwrap();
    assert_eq!(r, Range { min: 7, max: 7 });
    let r = set_preset_range(&mut doc, "Warm", Reaction::Up, -4, 2).unwrap();
    assert_eq!(r, Range { min: 0, max: 2 });
    let v = doc.to_value();
    assert_eq!(v["emojiPresets"]["Warm"]["heart"], json!({"min": 7, "max": 7}));
    assert_eq!(v["emojiPresets"]["Warm"]["up"], json!({"min": 0, "max": 2}));
    assert_eq!(
        set_preset_range(&mut doc, "Nope", Reaction::Up, 0, 1),
        Err(EditError::NotFound("Nope".into()))
    );
}

#[test]
fn manual_override_edit_switches_post_to_custom() {
    let mut doc = sample();
    set_post_override_range(&mut doc, &breakfast(), Reaction::Comment, 2, 1).unwrap();
    let v = doc.to_value();
    let post = &v["profiles"]["CatElf"]["posts"]["Breakfast"];
    assert_eq!(post["emojiPreset"], json!(""));
    assert_eq!(post["emojiOverride"]["comment"], json!({"min": 2, "max": 2}));
    // the other cached ranges survive
    assert_eq!(post["emojiOverride"]["heart"], json!({"min": 2, "max": 4}));
}

#[test]
fn selecting_a_preset_caches_its_values() {
    let mut doc = sample();
    let selfie = PostLocation::Heroine {
        post: "Selfie".into(),
    };
    select_post_preset(&mut doc, &selfie, "Warm").unwrap();
    let v = doc.to_value();
    assert_eq!(v["heroine"]["posts"]["Selfie"]["emojiPreset"], json!("Warm"));
    assert_eq!(
        v["heroine"]["posts"]["Selfie"]["emojiOverride"]["heart"],
        json!({"min": 2, "max": 4})
    );

    assert_eq!(
        select_post_preset(&mut doc, &selfie, "Ghost"),
        Err(EditError::NotFound("Ghost".into()))
    );

    reset_post_emoji(&mut doc, &selfie).unwrap();
    let v = doc.to_value();
    assert_eq!(v["heroine"]["posts"]["Selfie"]["emojiPreset"], json!(""));
    assert_eq!(
        v["heroine"]["posts"]["Selfie"]["emojiOverride"]["heart"],
        json!({"min": 0, "max": 0})
    );
}

#[test]
fn block_pool_edit_lifts_legacy_list() {
    let mut doc = sample();
    doc.root_mut()["commentBlocks"]["Old"] = json!(["a", "b"]);
    set_block_pool(&mut doc, "Old", "Fans").unwrap();
    set_block_pool(&mut doc, "Hello", "").unwrap();
    let v = doc.to_value();
    assert_eq!(v["commentBlocks"]["Old"], json!({"usernamePool": "Fans", "comments": ["a", "b"]}));
    assert_eq!(v["commentBlocks"]["Hello"]["usernamePool"], json!("Global"));
}

#[test]
fn listing_backfills_from_key_sort_when_orders_are_missing() {
    let mut doc = Document::load(json!({
        "profiles": {"B": {}, "A": {"order": 5}, "C": {}}
    }));
    assert_eq!(listed_ids(&doc, &Collection::Profiles), ["A", "B", "C"]);
    // listing alone writes nothing
    assert!(doc.to_value()["profiles"]["B"].get("order").is_none());

    assert!(ensure_orders(&mut doc, &Collection::Profiles));
    let v = doc.to_value();
    assert_eq!(v["profiles"]["A"]["order"], json!(0));
    assert_eq!(v["profiles"]["B"]["order"], json!(1));
    assert_eq!(v["profiles"]["C"]["order"], json!(2));
    assert!(!ensure_orders(&mut doc, &Collection::Profiles));
}

#[test]
fn listing_sorts_by_order_and_unordered_collections_by_key() {
    let doc = Document::load(json!({
        "emojiPresets": {"X": {"order": 2}, "Y": {"order": 0}, "Z": {"order": 1}},
        "commentBlocks": {"b": {}, "a": {}}
    }));
    assert_eq!(listed_ids(&doc, &Collection::EmojiPresets), ["Y", "Z", "X"]);
    assert_eq!(listed_ids(&doc, &Collection::CommentBlocks), ["a", "b"]);
    assert!(listed_ids(&doc, &Collection::HeroinePosts).is_empty());
}

#[test]
fn move_and_reorder_rewrite_contiguous_orders() {
    let mut doc = Document::load(json!({
        "heroine": {"posts": {"P1": {"order": 0}, "P2": {"order": 1}, "P3": {"order": 2}}}
    }));
    move_entity(&mut doc, &Collection::HeroinePosts, "P3", 0).unwrap();
    assert_eq!(listed_ids(&doc, &Collection::HeroinePosts), ["P3", "P1", "P2"]);
    move_entity(&mut doc, &Collection::HeroinePosts, "P3", 99).unwrap();
    assert_eq!(listed_ids(&doc, &Collection::HeroinePosts), ["P1", "P2", "P3"]);
    assert_eq!(
        move_entity(&mut doc, &Collection::HeroinePosts, "P9", 0),
        Err(EditError::NotFound("P9".into()))
    );

    reorder(
        &mut doc,
        &Collection::HeroinePosts,
        &["P2".to_string(), "ghost".to_string(), "P3".to_string(), "P1".to_string()],
    )
    .unwrap();
    let v = doc.to_value();
    assert_eq!(v["heroine"]["posts"]["P2"]["order"], json!(0));
    assert_eq!(v["heroine"]["posts"]["P3"]["order"], json!(1));
    assert_eq!(v["heroine"]["posts"]["P1"]["order"], json!(2));
}

#[test]
fn pointer_edits() {
    let mut doc = sample();
    assert_eq!(get_at(&doc, "/usernames/Global/1"), Some(&json!("ネコ")));
    assert_eq!(get_at(&doc, "/usernames/Nope"), None);

    set_at(&mut doc, "/heroine/posts/Selfie/description", json!("mirror")).unwrap();
    set_at(&mut doc, "/commentBlocks/Hello/note", json!(1)).unwrap();
    let removed = remove_at(&mut doc, "/usernames/Global/0").unwrap();
    assert_eq!(removed, json!("anon"));
    let v = doc.to_value();
    assert_eq!(v["heroine"]["posts"]["Selfie"]["description"], json!("mirror"));
    assert_eq!(v["commentBlocks"]["Hello"]["note"], json!(1));
    assert_eq!(v["usernames"]["Global"], json!(["ネコ"]));

    assert!(matches!(
        set_at(&mut doc, "/bogus", json!(1)),
        Err(CoreError::PointerNotFound(_))
    ));
    assert!(matches!(
        set_at(&mut doc, "/profiles/Nobody/posts/X", json!({})),
        Err(CoreError::PointerNotFound(_))
    ));
    assert!(matches!(
        remove_at(&mut doc, ""),
        Err(CoreError::Edit(EditError::RootRemoval))
    ));
    assert!(matches!(
        remove_at(&mut doc, "/usernames/Global/7"),
        Err(CoreError::Edit(EditError::BadIndex(_)))
    ));
}

#[test]
fn reorder_with_partial_list_appends_the_rest() {
    let mut doc = Document::load(json!({
        "emojiPresets": {"A": {"order": 0}, "B": {"order": 1}, "C": {"order": 2}, "D": {"order": 3}}
    }));
    reorder(&mut doc, &Collection::EmojiPresets, &["C".to_string(), "A".to_string()]).unwrap();
    assert_eq!(listed_ids(&doc, &Collection::EmojiPresets), ["C", "A", "B", "D"]);
    let v = doc.to_value();
    let mut orders: Vec<i64> = ["A", "B", "C", "D"]
        .iter()
        .map(|k| v["emojiPresets"][*k]["order"].as_i64().unwrap())
        .collect();
    orders.sort();
    assert_eq!(orders, [0, 1, 2, 3]);
}

#[test]
fn unordered_collections_refuse_moves() {
    let mut doc = sample();
    let before = snapshot(&doc);
    assert_eq!(
        move_entity(&mut doc, &Collection::CommentBlocks, "Fan", 0),
        Err(EditError::NotOrdered("commentBlocks".into()))
    );
    assert_eq!(
        reorder(
            &mut doc,
            &Collection::ProfilePosts("CatElf".into()),
            &["Breakfast".to_string()]
        ),
        Err(EditError::NotOrdered("profiles.CatElf.posts".into()))
    );
    assert_eq!(snapshot(&doc), before);
}
