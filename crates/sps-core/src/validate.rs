//! Structural and referential checks over one document snapshot.
//!
//! Issues come out in a fixed order: section types, username pools, comment
//! blocks, comment sets, then posts (profiles before the heroine). Nothing is
//! raised; every malformed value becomes an issue.
use std::fmt;

use serde::Serialize;
use serde_json::{Map, Value};

use crate::model::{Document, Fetched, PostLocation, Section, is_non_empty_str};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Level {
    /// Export would produce broken runtime data.
    #[serde(rename = "ERROR")]
    Error,
    #[serde(rename = "WARN")]
    Warn,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub level: Level,
    /// Dotted locator, e.g. `profiles.CatElf.posts.Breakfast.commentsSet`
    /// or `commentSets.MorningSet[2]`.
    pub path: String,
    pub message: String,
}

impl Issue {
    fn error(path: impl Into<String>, message: impl Into<String>) -> Self {
        Issue {
            level: Level::Error,
            path: path.into(),
            message: message.into(),
        }
    }

    fn warn(path: impl Into<String>, message: impl Into<String>) -> Self {
        Issue {
            level: Level::Warn,
            path: path.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.level, self.path, self.message)
    }
}

pub fn has_errors(issues: &[Issue]) -> bool {
    issues.iter().any(|i| i.level == Level::Error)
}

fn section_message(section: Section) -> &'static str {
    match section {
        Section::Usernames => "must be an object (poolId -> [names])",
        Section::CommentBlocks => "must be an object (blockId -> block)",
        Section::CommentSets => "must be an object (setId -> [blockIds])",
        Section::EmojiPresets => "must be an object (presetId -> preset)",
        Section::Profiles | Section::Heroine => "must be an object",
    }
}

/// A section that is not an object is reported once and read as empty for the
/// rest of the pass.
fn mapping_or_report<'a>(
    fetched: &'a Fetched<'_>,
    section: Section,
    empty: &'a Map<String, Value>,
    issues: &mut Vec<Issue>,
) -> &'a Map<String, Value> {
    match fetched.as_map() {
        Some(m) => m,
        None => {
            issues.push(Issue::error(section.key(), section_message(section)));
            empty
        }
    }
}

pub fn validate(doc: &Document) -> Vec<Issue> {
    let mut issues = Vec::new();
    let empty = Map::new();

    let usernames = doc.section(Section::Usernames);
    let blocks = doc.section(Section::CommentBlocks);
    let sets = doc.section(Section::CommentSets);
    let presets = doc.section(Section::EmojiPresets);
    let usernames = mapping_or_report(&usernames, Section::Usernames, &empty, &mut issues);
    let blocks = mapping_or_report(&blocks, Section::CommentBlocks, &empty, &mut issues);
    let sets = mapping_or_report(&sets, Section::CommentSets, &empty, &mut issues);
    let presets = mapping_or_report(&presets, Section::EmojiPresets, &empty, &mut issues);

    for (pool_id, names) in usernames {
        let p = format!("usernames.{pool_id}");
        let Some(names) = names.as_array() else {
            issues.push(Issue::error(p, "must be a list of strings"));
            continue;
        };
        for (i, n) in names.iter().enumerate() {
            if !is_non_empty_str(n) {
                issues.push(Issue::warn(format!("{p}[{i}]"), "empty or non-string name"));
            }
        }
    }

    for (block_id, block) in blocks {
        let p = format!("commentBlocks.{block_id}");
        let Some(block) = block.as_object() else {
            issues.push(Issue::error(p, "block must be an object"));
            continue;
        };
        if let Some(pool) = block.get("usernamePool").filter(|v| is_non_empty_str(v))
            && let Some(pool) = pool.as_str()
            && !usernames.contains_key(pool)
        {
            issues.push(Issue::error(
                format!("{p}.usernamePool"),
                format!("pool '{pool}' not found in usernames"),
            ));
        }
    }

    for (set_id, block_ids) in sets {
        let p = format!("commentSets.{set_id}");
        let Some(block_ids) = block_ids.as_array() else {
            issues.push(Issue::error(p, "must be a list of blockIds"));
            continue;
        };
        for (i, bid) in block_ids.iter().enumerate() {
            match bid.as_str() {
                Some(b) if !b.trim().is_empty() => {
                    if !blocks.contains_key(b) {
                        issues.push(Issue::error(
                            format!("{p}[{i}]"),
                            format!("blockId '{b}' not found in commentBlocks"),
                        ));
                    }
                }
                _ => issues.push(Issue::warn(format!("{p}[{i}]"), "empty or non-string blockId")),
            }
        }
    }

    for (loc, post) in doc.posts() {
        check_post_refs(&loc, post, presets, sets, &mut issues);
    }

    tracing::debug!(issues = issues.len(), "validated document");
    issues
}

fn check_post_refs(
    loc: &PostLocation,
    post: &Map<String, Value>,
    presets: &Map<String, Value>,
    sets: &Map<String, Value>,
    issues: &mut Vec<Issue>,
) {
    let dangling = |field: &str, targets: &Map<String, Value>| {
        post.get(field)
            .filter(|v| is_non_empty_str(v))
            .and_then(Value::as_str)
            .filter(|id| !targets.contains_key(*id))
            .map(str::to_string)
    };
    if let Some(ep) = dangling("emojiPreset", presets) {
        issues.push(Issue::error(
            format!("{}.emojiPreset", loc.path()),
            format!("preset '{ep}' not found in emojiPresets"),
        ));
    }
    if let Some(cs) = dangling("commentsSet", sets) {
        issues.push(Issue::error(
            format!("{}.commentsSet", loc.path()),
            format!("set '{cs}' not found in commentSets"),
        ));
    }
}

// -------- Issue path navigation --------

/// What an issue path points at, decoded from its dotted/bracketed grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IssueTarget {
    PostField { post: PostLocation, field: String },
    CommentBlock { block: String, field: Option<String> },
    CommentSetEntry { set: String, index: Option<usize> },
    UsernamePool { pool: String, index: Option<usize> },
    EmojiPreset { preset: String },
    Section(Section),
}

/// Splits a trailing `[n]` off a segment.
fn split_index(seg: &str) -> (&str, Option<usize>) {
    if let Some(open) = seg.rfind('[')
        && seg.ends_with(']')
        && let Ok(i) = seg[open + 1..seg.len() - 1].parse()
    {
        return (&seg[..open], Some(i));
    }
    (seg, None)
}

impl IssueTarget {
    pub fn parse(path: &str) -> Option<IssueTarget> {
        let parts: Vec<&str> = path.split('.').collect();
        match parts.as_slice() {
            ["profiles", profile, "posts", post, field] => Some(IssueTarget::PostField {
                post: PostLocation::Profile {
                    profile: profile.to_string(),
                    post: post.to_string(),
                },
                field: field.to_string(),
            }),
            ["heroine", "posts", post, field] => Some(IssueTarget::PostField {
                post: PostLocation::Heroine {
                    post: post.to_string(),
                },
                field: field.to_string(),
            }),
            ["commentBlocks", block, rest @ ..] => Some(IssueTarget::CommentBlock {
                block: block.to_string(),
                field: rest.first().map(|f| f.to_string()),
            }),
            ["commentSets", set] => {
                let (set, index) = split_index(set);
                Some(IssueTarget::CommentSetEntry {
                    set: set.to_string(),
                    index,
                })
            }
            ["usernames", pool] => {
                let (pool, index) = split_index(pool);
                Some(IssueTarget::UsernamePool {
                    pool: pool.to_string(),
                    index,
                })
            }
            ["emojiPresets", preset, ..] => Some(IssueTarget::EmojiPreset {
                preset: preset.to_string(),
            }),
            [section] => Section::from_key(section).map(IssueTarget::Section),
            _ => None,
        }
    }
}
