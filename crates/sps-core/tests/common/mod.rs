#![allow(dead_code)]

use serde_json::{Value, json};
use sps_core::Document;

/// A small but complete document that validates clean.
pub fn sample_value() -> Value {
    json!({
        "profiles": {
            "CatElf": {
                "defaultDisplayName": "Cat Elf",
                "defaultProfileImage": "cat_elf",
                "order": 0,
                "posts": {
                    "Breakfast": {
                        "pictureName": "breakfast_01",
                        "description": "Toast again ☕",
                        "timeslot": "Morning 🌅",
                        "conditionJS": "$gameSwitches.value(3)",
                        "effectJs": "",
                        "emojiPreset": "Warm",
                        "emojiOverride": {
                            "up": {"min": 1, "max": 5},
                            "down": {"min": 0, "max": 0},
                            "heart": {"min": 2, "max": 4},
                            "comment": {"min": 0, "max": 3}
                        },
                        "commentsSet": "MorningSet",
                        "lewdCondition": {"min": 0, "max": 10}
                    }
                }
            }
        },
        "heroine": {
            "posts": {
                "Selfie": {
                    "pictureName": "selfie",
                    "description": "",
                    "timeslot": "NIGHT",
                    "conditionJS": "",
                    "effectJs": "",
                    "emojiPreset": "",
                    "emojiOverride": {"up": {"min": 3, "max": 9}},
                    "commentsSet": "MorningSet",
                    "lewdCondition": {},
                    "order": 0
                }
            }
        },
        "usernames": {
            "Global": ["anon", "ネコ"],
            "Fans": ["f1"]
        },
        "commentBlocks": {
            "Hello": {"usernamePool": "Global", "comments": ["hi", "hey"]},
            "Fan": {"usernamePool": "Fans", "comments": ["wow"]}
        },
        "commentSets": {
            "MorningSet": ["Hello", "Fan"]
        },
        "emojiPresets": {
            "Warm": {
                "order": 0,
                "up": {"min": 1, "max": 5},
                "down": {"min": 0, "max": 0},
                "heart": {"min": 2, "max": 4},
                "comment": {"min": 0, "max": 3}
            }
        }
    })
}

pub fn sample() -> Document {
    Document::load(sample_value())
}

pub fn snapshot(doc: &Document) -> String {
    doc.to_json_pretty().unwrap()
}
