//! In-memory document and the canonical shapes read out of it.
//!
//! The document is kept as raw JSON so that malformed or legacy data survives a
//! load/save cycle untouched. Readers go through [`Fetched`] (owned default plus
//! an `absent` flag) and the `from_value` normalizers below, which never mutate
//! the source and never fail.
use std::borrow::Cow;

use serde_json::{Map, Value, json};

pub const DEFAULT_POOL: &str = "Global";
pub const DEFAULT_TIMESLOT: &str = "all";
pub const DEFAULT_LEWD_MAX: i64 = 999_999;

/// The six top-level members of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    Profiles,
    Heroine,
    Usernames,
    CommentBlocks,
    CommentSets,
    EmojiPresets,
}

impl Section {
    pub const ALL: [Section; 6] = [
        Section::Profiles,
        Section::Heroine,
        Section::Usernames,
        Section::CommentBlocks,
        Section::CommentSets,
        Section::EmojiPresets,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Section::Profiles => "profiles",
            Section::Heroine => "heroine",
            Section::Usernames => "usernames",
            Section::CommentBlocks => "commentBlocks",
            Section::CommentSets => "commentSets",
            Section::EmojiPresets => "emojiPresets",
        }
    }

    pub fn from_key(key: &str) -> Option<Section> {
        Section::ALL.into_iter().find(|s| s.key() == key)
    }

    pub fn empty_value(self) -> Value {
        match self {
            Section::Heroine => json!({ "posts": {} }),
            _ => Value::Object(Map::new()),
        }
    }
}

/// A value read with get-or-default semantics.
///
/// `absent` is true when the source was missing or empty-ish (null, `""`, `0`,
/// `false`, `[]`, `{}`), in which case `value` holds the owned default.
#[derive(Debug, Clone)]
pub struct Fetched<'a> {
    pub value: Cow<'a, Value>,
    pub absent: bool,
}

impl<'a> Fetched<'a> {
    pub fn or_default(source: Option<&'a Value>, default: impl FnOnce() -> Value) -> Self {
        match source {
            Some(v) if !is_falsy(v) => Fetched {
                value: Cow::Borrowed(v),
                absent: false,
            },
            _ => Fetched {
                value: Cow::Owned(default()),
                absent: true,
            },
        }
    }

    pub fn as_map(&self) -> Option<&Map<String, Value>> {
        self.value.as_object()
    }
}

pub fn is_falsy(v: &Value) -> bool {
    match v {
        Value::Null => true,
        Value::Bool(b) => !*b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(m) => m.is_empty(),
    }
}

pub fn json_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// True for a string with at least one non-whitespace character.
pub fn is_non_empty_str(v: &Value) -> bool {
    v.as_str().is_some_and(|s| !s.trim().is_empty())
}

/// Reads a free-text field: missing or empty-ish gives `""`, non-strings keep
/// their JSON rendering.
pub fn text_field(obj: &Map<String, Value>, key: &str) -> String {
    match obj.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(v) if !is_falsy(v) => v.to_string(),
        _ => String::new(),
    }
}

fn int_of(v: Option<&Value>) -> Option<i64> {
    let v = v?;
    v.as_i64().or_else(|| v.as_f64().map(|f| f as i64))
}

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    root: Map<String, Value>,
}

impl Default for Document {
    fn default() -> Self {
        Self::empty()
    }
}

impl Document {
    pub fn empty() -> Self {
        let mut root = Map::new();
        for s in Section::ALL {
            root.insert(s.key().to_string(), s.empty_value());
        }
        Self { root }
    }

    /// Accepts any JSON value. A non-object root is replaced by the empty
    /// document; nested data is taken as-is.
    pub fn load(raw: Value) -> Self {
        match raw {
            Value::Object(root) => Self { root },
            other => {
                tracing::warn!(
                    found = json_type_name(&other),
                    "document root is not an object, starting from an empty document"
                );
                Self::empty()
            }
        }
    }

    pub fn from_json_str(s: &str) -> crate::Result<Self> {
        let raw: Value = serde_json::from_str(s)?;
        Ok(Self::load(raw))
    }

    pub fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.root)
    }

    pub fn to_json_pretty(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(&self.root)?)
    }

    pub fn root(&self) -> &Map<String, Value> {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.root
    }

    pub fn section(&self, section: Section) -> Fetched<'_> {
        Fetched::or_default(self.root.get(section.key()), || section.empty_value())
    }

    /// Mutable access to a section mapping, created when missing or null.
    /// Returns `None` if the section holds something other than an object.
    pub fn section_map_mut(&mut self, section: Section) -> Option<&mut Map<String, Value>> {
        let slot = self
            .root
            .entry(section.key().to_string())
            .or_insert_with(|| section.empty_value());
        if slot.is_null() {
            *slot = section.empty_value();
        }
        slot.as_object_mut()
    }

    pub fn profile_posts_mut(&mut self, profile: &str) -> Option<&mut Map<String, Value>> {
        let prof = self.section_map_mut(Section::Profiles)?.get_mut(profile)?;
        posts_map_mut(prof)
    }

    pub fn heroine_posts_mut(&mut self) -> Option<&mut Map<String, Value>> {
        let heroine = self
            .root
            .entry(Section::Heroine.key().to_string())
            .or_insert_with(|| Section::Heroine.empty_value());
        posts_map_mut(heroine)
    }

    pub fn post_mut(&mut self, loc: &PostLocation) -> Option<&mut Map<String, Value>> {
        let posts = match loc {
            PostLocation::Profile { profile, .. } => self.profile_posts_mut(profile)?,
            PostLocation::Heroine { .. } => self.heroine_posts_mut()?,
        };
        posts.get_mut(loc.post_id())?.as_object_mut()
    }

    /// Every post object, profiles first (mapping order) then the heroine's.
    /// Entries that are not objects are skipped.
    pub fn posts(&self) -> Vec<(PostLocation, &Map<String, Value>)> {
        let mut out = Vec::new();
        if let Some(Value::Object(profiles)) = self.root.get(Section::Profiles.key()) {
            for (profile_id, prof) in profiles {
                let Some(Value::Object(posts)) = prof.as_object().and_then(|p| p.get("posts"))
                else {
                    continue;
                };
                for (post_id, post) in posts {
                    if let Value::Object(p) = post {
                        let loc = PostLocation::Profile {
                            profile: profile_id.clone(),
                            post: post_id.clone(),
                        };
                        out.push((loc, p));
                    }
                }
            }
        }
        if let Some(Value::Object(heroine)) = self.root.get(Section::Heroine.key())
            && let Some(Value::Object(posts)) = heroine.get("posts")
        {
            for (post_id, post) in posts {
                if let Value::Object(p) = post {
                    out.push((PostLocation::Heroine { post: post_id.clone() }, p));
                }
            }
        }
        out
    }

    /// Mutable counterpart of [`Document::posts`], same order.
    pub fn for_each_post_mut(&mut self, mut f: impl FnMut(&mut Map<String, Value>)) {
        if let Some(Value::Object(profiles)) = self.root.get_mut(Section::Profiles.key()) {
            for prof in profiles.values_mut() {
                let Some(Value::Object(posts)) =
                    prof.as_object_mut().and_then(|p| p.get_mut("posts"))
                else {
                    continue;
                };
                posts.values_mut().filter_map(Value::as_object_mut).for_each(&mut f);
            }
        }
        if let Some(Value::Object(heroine)) = self.root.get_mut(Section::Heroine.key())
            && let Some(Value::Object(posts)) = heroine.get_mut("posts")
        {
            posts.values_mut().filter_map(Value::as_object_mut).for_each(&mut f);
        }
    }
}

fn posts_map_mut(owner: &mut Value) -> Option<&mut Map<String, Value>> {
    let obj = owner.as_object_mut()?;
    let posts = obj
        .entry("posts")
        .or_insert_with(|| Value::Object(Map::new()));
    if posts.is_null() {
        *posts = Value::Object(Map::new());
    }
    posts.as_object_mut()
}

/// Where a post lives. Also the prefix of every issue path below a post.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PostLocation {
    Profile { profile: String, post: String },
    Heroine { post: String },
}

impl PostLocation {
    pub fn post_id(&self) -> &str {
        match self {
            PostLocation::Profile { post, .. } | PostLocation::Heroine { post } => post,
        }
    }

    pub fn path(&self) -> String {
        match self {
            PostLocation::Profile { profile, post } => format!("profiles.{profile}.posts.{post}"),
            PostLocation::Heroine { post } => format!("heroine.posts.{post}"),
        }
    }
}

/// A keyed collection of entities inside the document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collection {
    Profiles,
    ProfilePosts(String),
    HeroinePosts,
    UsernamePools,
    CommentBlocks,
    CommentSets,
    EmojiPresets,
}

impl Collection {
    /// Collections whose entities carry an explicit `order` field.
    pub fn is_ordered(&self) -> bool {
        matches!(
            self,
            Collection::Profiles | Collection::HeroinePosts | Collection::EmojiPresets
        )
    }

    /// Dotted locator, same grammar as issue paths.
    pub fn path(&self) -> String {
        match self {
            Collection::Profiles => "profiles".into(),
            Collection::ProfilePosts(p) => format!("profiles.{p}.posts"),
            Collection::HeroinePosts => "heroine.posts".into(),
            Collection::UsernamePools => "usernames".into(),
            Collection::CommentBlocks => "commentBlocks".into(),
            Collection::CommentSets => "commentSets".into(),
            Collection::EmojiPresets => "emojiPresets".into(),
        }
    }

    fn section(&self) -> Section {
        match self {
            Collection::Profiles | Collection::ProfilePosts(_) => Section::Profiles,
            Collection::HeroinePosts => Section::Heroine,
            Collection::UsernamePools => Section::Usernames,
            Collection::CommentBlocks => Section::CommentBlocks,
            Collection::CommentSets => Section::CommentSets,
            Collection::EmojiPresets => Section::EmojiPresets,
        }
    }

    pub fn map<'a>(&self, doc: &'a Document) -> Option<&'a Map<String, Value>> {
        let section = doc.root().get(self.section().key())?.as_object()?;
        match self {
            Collection::ProfilePosts(profile) => section.get(profile)?.get("posts")?.as_object(),
            Collection::HeroinePosts => section.get("posts")?.as_object(),
            _ => Some(section),
        }
    }

    /// Creates missing sections on the way; `None` when something on the path
    /// is not an object (or the profile does not exist).
    pub fn map_mut<'a>(&self, doc: &'a mut Document) -> Option<&'a mut Map<String, Value>> {
        match self {
            Collection::ProfilePosts(profile) => doc.profile_posts_mut(profile),
            Collection::HeroinePosts => doc.heroine_posts_mut(),
            _ => doc.section_map_mut(self.section()),
        }
    }

    /// Empty shape for a new entity of this collection (without `order`).
    pub fn default_entity(&self, doc: &Document) -> Value {
        match self {
            Collection::Profiles => Profile::default_value(),
            Collection::ProfilePosts(_) | Collection::HeroinePosts => Post::default_value(),
            Collection::UsernamePools | Collection::CommentSets => Value::Array(Vec::new()),
            Collection::CommentBlocks => {
                CommentBlock::default_value(&default_pool_for_new_block(doc))
            }
            Collection::EmojiPresets => EmojiValues::default().to_value(),
        }
    }
}

/// `Global` when that pool exists, otherwise the first pool by key, otherwise `""`.
pub fn default_pool_for_new_block(doc: &Document) -> String {
    let Some(pools) = Collection::UsernamePools.map(doc) else {
        return String::new();
    };
    if pools.contains_key(DEFAULT_POOL) {
        return DEFAULT_POOL.to_string();
    }
    pools.keys().min().cloned().unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Canonical shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Range {
    pub min: i64,
    pub max: i64,
}

impl Range {
    /// Negative bounds become 0; `max` is raised to `min`, never the reverse.
    pub fn clamped(min: i64, max: i64) -> Self {
        let min = min.max(0);
        let max = max.max(0).max(min);
        Range { min, max }
    }

    pub fn from_value(v: Option<&Value>) -> Self {
        let obj = v.and_then(Value::as_object);
        Range {
            min: int_of(obj.and_then(|o| o.get("min"))).unwrap_or(0),
            max: int_of(obj.and_then(|o| o.get("max"))).unwrap_or(0),
        }
    }

    pub fn to_value(self) -> Value {
        json!({ "min": self.min, "max": self.max })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Reaction {
    Up,
    Down,
    Heart,
    Comment,
}

impl Reaction {
    pub const ALL: [Reaction; 4] =
        [Reaction::Up, Reaction::Down, Reaction::Heart, Reaction::Comment];

    pub fn key(self) -> &'static str {
        match self {
            Reaction::Up => "up",
            Reaction::Down => "down",
            Reaction::Heart => "heart",
            Reaction::Comment => "comment",
        }
    }

    pub fn from_key(key: &str) -> Option<Reaction> {
        Reaction::ALL.into_iter().find(|r| r.key() == key)
    }
}

/// Min/max ranges for the four reaction kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EmojiValues {
    pub up: Range,
    pub down: Range,
    pub heart: Range,
    pub comment: Range,
}

impl EmojiValues {
    pub fn from_value(v: &Value) -> Self {
        let obj = v.as_object();
        let get = |r: Reaction| Range::from_value(obj.and_then(|o| o.get(r.key())));
        EmojiValues {
            up: get(Reaction::Up),
            down: get(Reaction::Down),
            heart: get(Reaction::Heart),
            comment: get(Reaction::Comment),
        }
    }

    pub fn get(&self, r: Reaction) -> Range {
        match r {
            Reaction::Up => self.up,
            Reaction::Down => self.down,
            Reaction::Heart => self.heart,
            Reaction::Comment => self.comment,
        }
    }

    pub fn to_value(self) -> Value {
        let mut m = Map::new();
        for r in Reaction::ALL {
            m.insert(r.key().to_string(), self.get(r).to_value());
        }
        Value::Object(m)
    }
}

/// `{min: 0, max: 999999}`: every lewd level.
pub fn default_lewd_condition() -> Value {
    json!({ "min": 0, "max": DEFAULT_LEWD_MAX })
}

/// A post as the runtime sees it. Text fields are normalized; the reaction
/// ranges and the lewd condition are kept exactly as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Post {
    pub picture_name: String,
    pub description: String,
    pub timeslot: String,
    pub condition_js: String,
    pub effect_js: String,
    pub emoji_preset: String,
    /// Raw `emojiOverride`, `None` when missing or empty-ish.
    pub emoji_override: Option<Value>,
    pub comments_set: String,
    /// Raw `lewdCondition`, or the default when missing or empty-ish.
    pub lewd_condition: Value,
}

impl Post {
    pub fn from_value(v: &Value) -> Self {
        let empty = Map::new();
        let obj = v.as_object().unwrap_or(&empty);
        let timeslot = match obj.get("timeslot") {
            None => DEFAULT_TIMESLOT.to_string(),
            Some(_) => text_field(obj, "timeslot"),
        };
        Post {
            picture_name: text_field(obj, "pictureName"),
            description: text_field(obj, "description"),
            timeslot,
            condition_js: text_field(obj, "conditionJS"),
            effect_js: text_field(obj, "effectJs"),
            emoji_preset: text_field(obj, "emojiPreset"),
            emoji_override: obj.get("emojiOverride").filter(|o| !is_falsy(o)).cloned(),
            comments_set: text_field(obj, "commentsSet"),
            lewd_condition: obj
                .get("lewdCondition")
                .filter(|l| !is_falsy(l))
                .cloned()
                .unwrap_or_else(default_lewd_condition),
        }
    }

    /// Shape given to a freshly created post.
    pub fn default_value() -> Value {
        json!({
            "pictureName": "",
            "description": "",
            "timeslot": DEFAULT_TIMESLOT,
            "conditionJS": "",
            "effectJs": "",
            "emojiPreset": "",
            "emojiOverride": EmojiValues::default().to_value(),
            "commentsSet": "",
            "lewdCondition": default_lewd_condition(),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub default_display_name: String,
    pub default_profile_image: String,
    /// Posts in mapping order.
    pub posts: Vec<(String, Post)>,
}

impl Profile {
    pub fn from_value(v: &Value) -> Self {
        let empty = Map::new();
        let obj = v.as_object().unwrap_or(&empty);
        let posts = match obj.get("posts") {
            Some(Value::Object(m)) => m
                .iter()
                .map(|(id, p)| (id.clone(), Post::from_value(p)))
                .collect(),
            _ => Vec::new(),
        };
        Profile {
            default_display_name: text_field(obj, "defaultDisplayName"),
            default_profile_image: text_field(obj, "defaultProfileImage"),
            posts,
        }
    }

    pub fn default_value() -> Value {
        json!({ "defaultDisplayName": "", "defaultProfileImage": "", "posts": {} })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentBlock {
    pub username_pool: String,
    pub comments: Vec<Value>,
}

impl CommentBlock {
    /// Accepts the canonical `{usernamePool, comments}` object and the legacy
    /// bare list of comments; anything else reads as an empty block.
    pub fn from_value(v: &Value) -> Self {
        match v {
            Value::Object(o) => {
                let username_pool = match text_field(o, "usernamePool") {
                    p if p.is_empty() => DEFAULT_POOL.to_string(),
                    p => p,
                };
                let comments = match o.get("comments") {
                    Some(Value::Array(a)) => a.clone(),
                    _ => Vec::new(),
                };
                CommentBlock { username_pool, comments }
            }
            Value::Array(a) => CommentBlock {
                username_pool: DEFAULT_POOL.to_string(),
                comments: a.clone(),
            },
            _ => CommentBlock {
                username_pool: DEFAULT_POOL.to_string(),
                comments: Vec::new(),
            },
        }
    }

    pub fn default_value(pool: &str) -> Value {
        json!({ "usernamePool": pool, "comments": [] })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommentSet {
    pub blocks: Vec<Value>,
}

impl CommentSet {
    /// Accepts a plain list and the legacy `{blocks: [...]}` wrapper.
    pub fn from_value(v: &Value) -> Self {
        let blocks = match v {
            Value::Array(a) => a.clone(),
            Value::Object(o) => match o.get("blocks") {
                Some(Value::Array(a)) => a.clone(),
                _ => Vec::new(),
            },
            _ => Vec::new(),
        };
        CommentSet { blocks }
    }

    /// The block id list inside either stored shape.
    pub fn entries_mut(v: &mut Value) -> Option<&mut Vec<Value>> {
        match v {
            Value::Array(a) => Some(a),
            Value::Object(o) => o.get_mut("blocks").and_then(Value::as_array_mut),
            _ => None,
        }
    }
}

/// A preset stores its four ranges beside the editor-only `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmojiPreset {
    pub values: EmojiValues,
}

impl EmojiPreset {
    pub fn from_value(v: &Value) -> Self {
        EmojiPreset {
            values: EmojiValues::from_value(v),
        }
    }

    /// The stored preset minus `order`; every other key is kept untouched.
    pub fn runtime_value(v: &Value) -> Value {
        let mut preset = v.as_object().cloned().unwrap_or_default();
        preset.shift_remove("order");
        Value::Object(preset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_object_root_falls_back_to_empty() {
        assert_eq!(Document::load(json!([1, 2])), Document::empty());
        assert_eq!(Document::load(Value::Null), Document::empty());
    }

    #[test]
    fn empty_document_shape() {
        let v = Document::empty().into_value();
        assert_eq!(
            v,
            json!({
                "profiles": {}, "heroine": {"posts": {}}, "usernames": {},
                "commentBlocks": {}, "commentSets": {}, "emojiPresets": {}
            })
        );
    }

    #[test]
    fn missing_section_reads_as_default_without_mutation() {
        let doc = Document::load(json!({}));
        let f = doc.section(Section::Heroine);
        assert!(f.absent);
        assert_eq!(*f.value, json!({"posts": {}}));
        assert!(doc.root().is_empty());
    }

    #[test]
    fn range_clamps_max_up_to_min() {
        assert_eq!(Range::clamped(5, 2), Range { min: 5, max: 5 });
        assert_eq!(Range::clamped(-3, -1), Range { min: 0, max: 0 });
        assert_eq!(Range::clamped(1, 4), Range { min: 1, max: 4 });
    }

    #[test]
    fn legacy_block_and_set_shapes() {
        let b = CommentBlock::from_value(&json!(["hi", "yo"]));
        assert_eq!(b.username_pool, "Global");
        let b = CommentBlock::from_value(&json!({"usernamePool": "", "comments": ["x"]}));
        assert_eq!(b.username_pool, "Global");
        assert_eq!(b.comments, vec![json!("x")]);
        let s = CommentSet::from_value(&json!({"blocks": ["A"]}));
        assert_eq!(s.blocks, vec![json!("A")]);
    }
}
