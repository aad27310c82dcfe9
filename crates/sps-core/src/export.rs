//! Runtime export: the editable document flattened into de-duplicated,
//! key-sorted data and wrapped in a data-only plugin module.
//!
//! Posts reference comment sets and emoji presets by id instead of embedding
//! them; only posts without a preset carry inline emoji ranges. Keys are sorted
//! at every level so that exporting an unchanged document is byte-identical.
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::model::{
    CommentBlock, CommentSet, DEFAULT_TIMESLOT, Document, EmojiPreset, EmojiValues, Post, Profile,
    Section, is_falsy,
};

#[derive(Debug, Clone)]
pub struct ExportOpts {
    /// Global namespace object the module merges its data into.
    pub namespace: String,
    pub author: String,
    /// Runtime plugin that consumes the data; named in the header help text.
    pub runtime_plugin: String,
}

impl Default for ExportOpts {
    fn default() -> Self {
        Self {
            namespace: "NAS".into(),
            author: "Naughty Arcade".into(),
            runtime_plugin: "NAS_SocialHelper_MZ".into(),
        }
    }
}

/// Strips everything but letters, digits, `_` and `-`, then lowercases.
/// An empty result means `all`.
pub fn normalize_timeslot(value: &str) -> String {
    let kept: String = value
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == '_' || *c == '-')
        .collect();
    let kept = kept.trim().to_lowercase();
    if kept.is_empty() {
        DEFAULT_TIMESLOT.to_string()
    } else {
        kept
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeBlock {
    #[serde(rename = "usernamePool")]
    pub username_pool: String,
    pub texts: Vec<Value>,
}

/// Exactly one emoji source survives export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EmojiSource {
    #[serde(rename = "emojiPresetId")]
    Preset(String),
    /// The post's own `emojiOverride` as stored, zeroed when absent.
    #[serde(rename = "emoji")]
    Inline(Value),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimePost {
    #[serde(rename = "pictureName")]
    pub picture_name: String,
    pub description: String,
    pub timeslot: String,
    #[serde(rename = "conditionJS")]
    pub condition_js: String,
    #[serde(rename = "effectJs")]
    pub effect_js: String,
    #[serde(rename = "commentsSetId")]
    pub comments_set_id: String,
    #[serde(rename = "lewdCondition")]
    pub lewd_condition: Value,
    #[serde(flatten)]
    pub emoji: EmojiSource,
}

impl From<&Post> for RuntimePost {
    fn from(p: &Post) -> Self {
        let preset = p.emoji_preset.trim();
        let emoji = if preset.is_empty() {
            let values = p
                .emoji_override
                .clone()
                .unwrap_or_else(|| EmojiValues::default().to_value());
            EmojiSource::Inline(values)
        } else {
            EmojiSource::Preset(preset.to_string())
        };
        RuntimePost {
            picture_name: p.picture_name.clone(),
            description: p.description.clone(),
            timeslot: normalize_timeslot(&p.timeslot),
            condition_js: p.condition_js.clone(),
            effect_js: p.effect_js.clone(),
            comments_set_id: p.comments_set.clone(),
            lewd_condition: p.lewd_condition.clone(),
            emoji,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeProfile {
    #[serde(rename = "defaultDisplayName")]
    pub default_display_name: String,
    #[serde(rename = "defaultProfileImage")]
    pub default_profile_image: String,
    pub posts: BTreeMap<String, RuntimePost>,
}

impl From<&Profile> for RuntimeProfile {
    fn from(p: &Profile) -> Self {
        RuntimeProfile {
            default_display_name: p.default_display_name.clone(),
            default_profile_image: p.default_profile_image.clone(),
            posts: p
                .posts
                .iter()
                .map(|(id, post)| (id.clone(), RuntimePost::from(post)))
                .collect(),
        }
    }
}

/// Everything the runtime receives. Editor-only `order` fields are gone.
#[derive(Debug, Clone, PartialEq)]
pub struct RuntimeData {
    /// `(poolId, names)` sorted by pool id.
    pub username_pools: Vec<(String, Value)>,
    pub comment_blocks: BTreeMap<String, RuntimeBlock>,
    pub comment_sets: BTreeMap<String, Vec<Value>>,
    /// Stored presets minus `order`.
    pub emoji_presets: BTreeMap<String, Value>,
    pub profiles: BTreeMap<String, RuntimeProfile>,
    pub heroine: RuntimeProfile,
}

fn object_or_empty<'a>(
    root: &'a Map<String, Value>,
    section: Section,
    empty: &'a Map<String, Value>,
) -> &'a Map<String, Value> {
    root.get(section.key()).and_then(Value::as_object).unwrap_or(empty)
}

impl RuntimeData {
    /// The root must be an object; everything below it is defaulted softly.
    pub fn from_value(raw: &Value) -> Result<Self> {
        let root = raw
            .as_object()
            .ok_or_else(|| CoreError::export_root_type(raw))?;
        Ok(Self::from_root(root))
    }

    pub fn from_document(doc: &Document) -> Self {
        Self::from_root(doc.root())
    }

    fn from_root(root: &Map<String, Value>) -> Self {
        let empty = Map::new();

        let pools = object_or_empty(root, Section::Usernames, &empty);
        let mut username_pools: Vec<(String, Value)> = pools
            .iter()
            .map(|(id, names)| {
                let names = if is_falsy(names) {
                    Value::Array(Vec::new())
                } else {
                    names.clone()
                };
                (id.clone(), names)
            })
            .collect();
        username_pools.sort_by(|a, b| a.0.cmp(&b.0));

        let comment_blocks = object_or_empty(root, Section::CommentBlocks, &empty)
            .iter()
            .map(|(id, b)| {
                let block = CommentBlock::from_value(b);
                let block = RuntimeBlock {
                    username_pool: block.username_pool,
                    texts: block.comments,
                };
                (id.clone(), block)
            })
            .collect();

        let comment_sets = object_or_empty(root, Section::CommentSets, &empty)
            .iter()
            .map(|(id, s)| (id.clone(), CommentSet::from_value(s).blocks))
            .collect();

        let emoji_presets = object_or_empty(root, Section::EmojiPresets, &empty)
            .iter()
            .map(|(id, p)| (id.clone(), EmojiPreset::runtime_value(p)))
            .collect();

        let profiles = object_or_empty(root, Section::Profiles, &empty)
            .iter()
            .map(|(id, p)| (id.clone(), RuntimeProfile::from(&Profile::from_value(p))))
            .collect();

        let heroine = root
            .get(Section::Heroine.key())
            .map(Profile::from_value)
            .unwrap_or_else(|| Profile::from_value(&Section::Heroine.empty_value()));

        RuntimeData {
            username_pools,
            comment_blocks,
            comment_sets,
            emoji_presets,
            profiles,
            heroine: RuntimeProfile::from(&heroine),
        }
    }
}

/// Recursively rebuilds every object with its keys sorted.
pub fn canonicalize(v: Value) -> Value {
    match v {
        Value::Object(m) => {
            let sorted: BTreeMap<String, Value> =
                m.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
            Value::Object(sorted.into_iter().collect())
        }
        Value::Array(a) => Value::Array(a.into_iter().map(canonicalize).collect()),
        other => other,
    }
}

/// Sorted keys, 2-space indentation, non-ASCII left unescaped.
fn dumps<T: Serialize>(value: &T) -> Result<String> {
    let v = canonicalize(serde_json::to_value(value)?);
    Ok(serde_json::to_string_pretty(&v)?)
}

/// Single-line JSON with `", "` and `": "` separators.
struct SpacedCompact;

impl Formatter for SpacedCompact {
    fn begin_array_value<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W: ?Sized + io::Write>(
        &mut self,
        writer: &mut W,
        first: bool,
    ) -> io::Result<()> {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W: ?Sized + io::Write>(&mut self, writer: &mut W) -> io::Result<()> {
        writer.write_all(b": ")
    }
}

fn dumps_inline(value: &Value) -> Result<String> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedCompact);
    value.serialize(&mut ser)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// `new Map([...])` literal so iteration order is fixed on the runtime side.
fn render_username_pools(pools: &[(String, Value)]) -> Result<String> {
    let mut lines = Vec::with_capacity(pools.len());
    for (id, names) in pools {
        lines.push(format!("    [{}, {}]", serde_json::to_string(id)?, dumps_inline(names)?));
    }
    Ok(format!("new Map([\n{}\n  ])", lines.join(",\n")))
}

const RULE: &str = "  // ─────────────────────────────────────────────────────────────";

fn section_banner(out: &mut String, title: &str) {
    writeln!(out, "{RULE}").ok();
    writeln!(out, "  // {title}").ok();
    writeln!(out, "{RULE}").ok();
}

const HELPERS: &str = r#"  function makeComments(texts, poolId = "Global") {
    return (texts || []).map(text => ({
      authorMode: "randomFromPool",
      poolId,
      fixedAuthor: "",
      text
    }));
  }

  function makeFinalComments(...groups) {
    return groups.reduce((acc, group) => {
      if (Array.isArray(group) && group.length > 0) {
        acc.push(...group);
      }
      return acc;
    }, []);
  }
"#;

pub fn render_module(data: &RuntimeData, opts: &ExportOpts) -> Result<String> {
    let ns = &opts.namespace;
    let mut out = String::new();

    writeln!(out, "/*:").ok();
    writeln!(out, " * @target MZ").ok();
    writeln!(out, " * @plugindesc [data-only] Social Data (export)").ok();
    writeln!(out, " * @author {}", opts.author).ok();
    writeln!(out, " * @help").ok();
    writeln!(out, " * Generated by the social post editor.").ok();
    writeln!(out, " * Must be loaded BEFORE the runtime plugin ({}).", opts.runtime_plugin).ok();
    writeln!(out, " */").ok();
    writeln!(out).ok();
    writeln!(out, "(() => {{").ok();
    writeln!(out, "  window.{ns} = window.{ns} || {{}};").ok();
    writeln!(out).ok();

    section_banner(&mut out, "Helpers: comments");
    out.push_str(HELPERS);
    writeln!(out).ok();

    section_banner(&mut out, "Data: username pools (Map)");
    let pools = render_username_pools(&data.username_pools)?;
    writeln!(out, "  const COMMENT_USERNAME_POOLS = {};", pools).ok();
    writeln!(out).ok();

    section_banner(&mut out, "Data: comment blocks/sets (referenced, not duplicated)");
    writeln!(out, "  const SOCIAL_COMMENT_BLOCKS = {};", dumps(&data.comment_blocks)?).ok();
    writeln!(out).ok();
    writeln!(out, "  const SOCIAL_COMMENT_SETS = {};", dumps(&data.comment_sets)?).ok();
    writeln!(out).ok();

    section_banner(&mut out, "Data: emoji presets (referenced, not duplicated)");
    writeln!(out, "  const SOCIAL_EMOJI_PRESETS = {};", dumps(&data.emoji_presets)?).ok();
    writeln!(out).ok();

    section_banner(&mut out, "Data: profiles");
    writeln!(out, "  const SOCIAL_PROFILES = {};", dumps(&data.profiles)?).ok();
    writeln!(out).ok();
    writeln!(out, "  const SOCIAL_HEROINE_PROFILE = {};", dumps(&data.heroine)?).ok();
    writeln!(out).ok();

    section_banner(&mut out, &format!("Exposed on the {ns} namespace"));
    for name in [
        "COMMENT_USERNAME_POOLS",
        "SOCIAL_COMMENT_BLOCKS",
        "SOCIAL_COMMENT_SETS",
        "SOCIAL_EMOJI_PRESETS",
        "SOCIAL_PROFILES",
        "SOCIAL_HEROINE_PROFILE",
    ] {
        writeln!(out, "  {ns}.{name} = {name};").ok();
    }
    writeln!(out).ok();
    writeln!(out, "  {ns}._makeComments = makeComments;").ok();
    writeln!(out, "  {ns}._makeFinalComments = makeFinalComments;").ok();
    writeln!(out, "}})();").ok();
    Ok(out)
}

/// Export from a raw value; fails only when the root is not an object.
pub fn export_value(raw: &Value, opts: &ExportOpts) -> Result<String> {
    let data = RuntimeData::from_value(raw)?;
    render_module(&data, opts)
}

pub fn export_runtime_module(doc: &Document, opts: &ExportOpts) -> Result<String> {
    let data = RuntimeData::from_document(doc);
    let out = render_module(&data, opts)?;
    tracing::info!(
        profiles = data.profiles.len(),
        heroine_posts = data.heroine.posts.len(),
        bytes = out.len(),
        "exported runtime module"
    );
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn pools_render_as_ordered_map_literal() {
        let pools = vec![
            ("A".to_string(), json!(["x", "é"])),
            ("B".to_string(), json!([])),
        ];
        let s = render_username_pools(&pools).unwrap();
        assert_eq!(s, "new Map([\n    [\"A\", [\"x\", \"é\"]],\n    [\"B\", []]\n  ])");
    }

    #[test]
    fn canonicalize_sorts_nested_keys() {
        let v = canonicalize(json!({"b": {"z": 1, "a": 2}, "a": [{"y": 1, "x": 2}]}));
        assert_eq!(
            serde_json::to_string(&v).unwrap(),
            r#"{"a":[{"x":2,"y":1}],"b":{"a":2,"z":1}}"#
        );
    }
}
