use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use sps_core::{
    Collection, DEFAULT_DOCUMENT, Document, ExportOpts, PostLocation, Reaction, RenameTarget,
    SaveOpts, Session,
};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "sps-cli",
    about = "Validate, edit and export social post data (Database.json)",
    version
)]
struct Cli {
    /// Document to work on
    #[arg(short, long, global = true, default_value = DEFAULT_DOCUMENT)]
    file: PathBuf,
    /// More log output on stderr (-v info, -vv debug); RUST_LOG wins when set
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
    #[command(subcommand)]
    cmd: Option<Cmd>,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Report dangling references and malformed values (exit 1 on errors)
    Validate(ValidateArgs),
    /// Write the runtime JS data module
    Export(ExportArgs),
    /// Rename an entity and rewrite every reference to it
    Rename(RenameArgs),
    /// List ids of a collection in display order
    List(KindArgs),
    /// Add an empty entity
    Add(EntityArgs),
    /// Delete an entity (references are left for the validator to report)
    Delete(EntityArgs),
    /// Copy an entity under a fresh `<id>_Copy` id
    Duplicate(EntityArgs),
    /// Move an entity to a display position
    Move(MoveArgs),
    /// Set a reaction range on a preset or a post (a post switches to custom reactions)
    Range(RangeArgs),
    /// Get value at JSON pointer
    Get(PtrArgs),
    /// Set value (raw JSON) at JSON pointer
    Set(SetArgs),
    /// Remove key or array element at JSON pointer
    Remove(PtrArgs),
    /// Zip the document next to itself
    Backup,
    /// Create an empty document
    New(NewArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    Profile,
    Post,
    HeroinePost,
    Pool,
    Block,
    Set,
    Preset,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum RenameKind {
    Pool,
    Block,
    Set,
    Preset,
}

impl From<RenameKind> for RenameTarget {
    fn from(k: RenameKind) -> Self {
        match k {
            RenameKind::Pool => RenameTarget::UsernamePool,
            RenameKind::Block => RenameTarget::CommentBlock,
            RenameKind::Set => RenameTarget::CommentSet,
            RenameKind::Preset => RenameTarget::EmojiPreset,
        }
    }
}

#[derive(ClapArgs, Debug)]
struct ValidateArgs {
    /// Print issues as a JSON array
    #[arg(long, default_value_t = false)]
    json: bool,
}

#[derive(ClapArgs, Debug)]
struct ExportArgs {
    /// Output .js path; prints to stdout when omitted
    #[arg(long)]
    out: Option<PathBuf>,
    /// Global namespace object
    #[arg(long)]
    namespace: Option<String>,
    #[arg(long)]
    author: Option<String>,
    /// Runtime plugin named in the module header
    #[arg(long)]
    plugin: Option<String>,
    /// Export even when validation reports errors
    #[arg(long, default_value_t = false)]
    force: bool,
}

#[derive(ClapArgs, Debug)]
struct WriteOpts {
    /// Write the result here instead of back to the document
    #[arg(long)]
    out: Option<PathBuf>,
    /// Zip the previous file before overwriting it
    #[arg(long, default_value_t = false)]
    backup: bool,
}

#[derive(ClapArgs, Debug)]
struct RenameArgs {
    kind: RenameKind,
    old: String,
    new: String,
    #[command(flatten)]
    write: WriteOpts,
}

#[derive(ClapArgs, Debug)]
struct KindArgs {
    kind: Kind,
    /// Owning profile, required for `post`
    #[arg(long)]
    profile: Option<String>,
}

#[derive(ClapArgs, Debug)]
struct EntityArgs {
    #[command(flatten)]
    kind: KindArgs,
    id: String,
    #[command(flatten)]
    write: WriteOpts,
}

#[derive(ClapArgs, Debug)]
struct MoveArgs {
    #[command(flatten)]
    kind: KindArgs,
    id: String,
    /// 0-based target position
    index: usize,
    #[command(flatten)]
    write: WriteOpts,
}

#[derive(ClapArgs, Debug)]
struct RangeArgs {
    /// Emoji preset to edit
    #[arg(long, conflicts_with = "post", required_unless_present = "post")]
    preset: Option<String>,
    /// Post to edit, as `<profile>/<post>` or `heroine/<post>`
    #[arg(long)]
    post: Option<String>,
    /// up, down, heart or comment
    reaction: String,
    #[arg(allow_negative_numbers = true)]
    min: i64,
    #[arg(allow_negative_numbers = true)]
    max: i64,
    #[command(flatten)]
    write: WriteOpts,
}

#[derive(ClapArgs, Debug)]
struct PtrArgs {
    /// JSON Pointer, e.g. /profiles/CatElf/posts/Breakfast/timeslot
    #[arg(long)]
    ptr: String,
    #[command(flatten)]
    write: WriteOpts,
}

#[derive(ClapArgs, Debug)]
struct SetArgs {
    #[command(flatten)]
    ptr: PtrArgs,
    /// New value as raw JSON (e.g., 123, true, "str", {"a":1})
    #[arg(long)]
    value: String,
}

#[derive(ClapArgs, Debug)]
struct NewArgs {
    /// Overwrite an existing file
    #[arg(long, default_value_t = false)]
    force: bool,
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let file = cli.file;
    match cli.cmd.unwrap_or(Cmd::Validate(ValidateArgs { json: false })) {
        Cmd::Validate(a) => cmd_validate(&file, a),
        Cmd::Export(a) => cmd_export(&file, a),
        Cmd::Rename(a) => cmd_rename(&file, a),
        Cmd::List(a) => cmd_list(&file, a),
        Cmd::Add(a) => cmd_add(&file, a),
        Cmd::Delete(a) => cmd_delete(&file, a),
        Cmd::Duplicate(a) => cmd_duplicate(&file, a),
        Cmd::Move(a) => cmd_move(&file, a),
        Cmd::Range(a) => cmd_range(&file, a),
        Cmd::Get(a) => cmd_get(&file, a),
        Cmd::Set(a) => cmd_set(&file, a),
        Cmd::Remove(a) => cmd_remove(&file, a),
        Cmd::Backup => cmd_backup(&file),
        Cmd::New(a) => cmd_new(&file, a),
    }
}

fn open(path: &Path) -> Session {
    Session::open(path).unwrap_or_else(|e| {
        eprintln!("error loading {}: {}", path.display(), e);
        std::process::exit(2);
    })
}

fn collection(k: &KindArgs) -> Collection {
    match k.kind {
        Kind::Profile => Collection::Profiles,
        Kind::Post => match &k.profile {
            Some(p) => Collection::ProfilePosts(p.clone()),
            None => {
                eprintln!("--profile is required for post");
                std::process::exit(3);
            }
        },
        Kind::HeroinePost => Collection::HeroinePosts,
        Kind::Pool => Collection::UsernamePools,
        Kind::Block => Collection::CommentBlocks,
        Kind::Set => Collection::CommentSets,
        Kind::Preset => Collection::EmojiPresets,
    }
}

fn write_back(session: &mut Session, w: WriteOpts) {
    let opts = SaveOpts { backup: w.backup };
    let res = match w.out {
        Some(out) => session.save_as(&out, opts),
        None => session.save(opts),
    };
    res.unwrap_or_else(|e| {
        eprintln!("error writing: {}", e);
        std::process::exit(5);
    });
    if let Some(p) = session.path() {
        tracing::debug!(path = %p.display(), backup = opts.backup, "document written");
    }
}

fn print_json(v: &serde_json::Value) {
    match serde_json::to_string_pretty(v) {
        Ok(s) => println!("{}", s),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(5);
        }
    }
}

fn cmd_validate(path: &Path, args: ValidateArgs) {
    let session = open(path);
    let issues = session.validate();
    if args.json {
        let v = serde_json::to_value(&issues).unwrap_or_default();
        print_json(&v);
    } else if issues.is_empty() {
        println!("OK: no issues");
    } else {
        for i in &issues {
            println!("{}", i);
        }
    }
    if sps_core::has_errors(&issues) {
        std::process::exit(1);
    }
}

fn cmd_export(path: &Path, args: ExportArgs) {
    let session = open(path);
    let issues = session.validate();
    let has_errors = sps_core::has_errors(&issues);
    if has_errors && !args.force {
        for i in issues.iter().filter(|i| i.level == sps_core::Level::Error) {
            eprintln!("{}", i);
        }
        eprintln!("refusing to export with validation errors (use --force)");
        std::process::exit(1);
    }
    let mut opts = ExportOpts::default();
    if let Some(ns) = args.namespace {
        opts.namespace = ns;
    }
    if let Some(a) = args.author {
        opts.author = a;
    }
    if let Some(p) = args.plugin {
        opts.runtime_plugin = p;
    }
    if has_errors {
        tracing::warn!("exporting despite validation errors");
    }
    match args.out {
        Some(out) => {
            session.export_to(&out, &opts).unwrap_or_else(|e| {
                eprintln!("error writing: {}", e);
                std::process::exit(5);
            });
            tracing::info!(out = %out.display(), namespace = %opts.namespace, "export written");
        }
        None => match session.export_module(&opts) {
            Ok(js) => print!("{}", js),
            Err(e) => {
                eprintln!("error: {}", e);
                std::process::exit(4);
            }
        },
    }
}

fn cmd_rename(path: &Path, args: RenameArgs) {
    let mut session = open(path);
    match session.try_rename(args.kind.into(), &args.old, &args.new) {
        Ok(r) => {
            tracing::info!(old = %r.old, new = %r.new, references = r.references, "rename applied")
        }
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(4);
        }
    }
    write_back(&mut session, args.write);
}

fn cmd_list(path: &Path, args: KindArgs) {
    let session = open(path);
    for id in session.listed_ids(&collection(&args)) {
        println!("{}", id);
    }
}

fn cmd_add(path: &Path, args: EntityArgs) {
    let mut session = open(path);
    let id = session.add(&collection(&args.kind), &args.id).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(4);
    });
    println!("{}", id);
    write_back(&mut session, args.write);
}

fn cmd_delete(path: &Path, args: EntityArgs) {
    let mut session = open(path);
    session.delete(&collection(&args.kind), &args.id).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(4);
    });
    write_back(&mut session, args.write);
}

fn cmd_duplicate(path: &Path, args: EntityArgs) {
    let mut session = open(path);
    let id = session.duplicate(&collection(&args.kind), &args.id).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(4);
    });
    println!("{}", id);
    write_back(&mut session, args.write);
}

fn cmd_move(path: &Path, args: MoveArgs) {
    let mut session = open(path);
    let coll = collection(&args.kind);
    session.move_entity(&coll, &args.id, args.index).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(4);
    });
    write_back(&mut session, args.write);
}

fn post_location(arg: &str) -> PostLocation {
    match arg.split_once('/') {
        Some(("heroine", post)) => PostLocation::Heroine { post: post.to_string() },
        Some((profile, post)) if !profile.is_empty() && !post.is_empty() => PostLocation::Profile {
            profile: profile.to_string(),
            post: post.to_string(),
        },
        _ => {
            eprintln!("invalid --post '{}', expected <profile>/<post> or heroine/<post>", arg);
            std::process::exit(3);
        }
    }
}

fn cmd_range(path: &Path, args: RangeArgs) {
    let Some(reaction) = Reaction::from_key(&args.reaction) else {
        eprintln!("unknown reaction '{}' (up, down, heart, comment)", args.reaction);
        std::process::exit(3);
    };
    let mut session = open(path);
    let res = match (&args.preset, &args.post) {
        (Some(preset), _) => session.set_preset_range(preset, reaction, args.min, args.max),
        (None, Some(post)) => {
            let loc = post_location(post);
            session.set_post_override_range(&loc, reaction, args.min, args.max)
        }
        (None, None) => {
            eprintln!("one of --preset or --post is required");
            std::process::exit(3);
        }
    };
    match res {
        Ok(r) => println!("{} {}..{}", reaction.key(), r.min, r.max),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(4);
        }
    }
    write_back(&mut session, args.write);
}

fn cmd_get(path: &Path, args: PtrArgs) {
    let session = open(path);
    match session.get_at(&args.ptr) {
        Some(x) => print_json(x),
        None => {
            eprintln!("not found: {}", args.ptr);
            std::process::exit(3);
        }
    }
}

fn cmd_set(path: &Path, args: SetArgs) {
    let mut session = open(path);
    let new_val: serde_json::Value = serde_json::from_str(&args.value).unwrap_or_else(|e| {
        eprintln!("invalid --value JSON: {}", e);
        std::process::exit(3);
    });
    session.set_at(&args.ptr.ptr, new_val).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(4);
    });
    write_back(&mut session, args.ptr.write);
}

fn cmd_remove(path: &Path, args: PtrArgs) {
    let mut session = open(path);
    session.remove_at(&args.ptr).unwrap_or_else(|e| {
        eprintln!("error: {}", e);
        std::process::exit(4);
    });
    write_back(&mut session, args.write);
}

fn cmd_backup(path: &Path) {
    match sps_core::zip_backup(path) {
        Ok(dest) => println!("{}", dest.display()),
        Err(e) => {
            eprintln!("error: {}", e);
            std::process::exit(5);
        }
    }
}

fn cmd_new(path: &Path, args: NewArgs) {
    if path.exists() && !args.force {
        eprintln!("{} already exists (use --force)", path.display());
        std::process::exit(3);
    }
    sps_core::save_document_file(path, &Document::empty(), SaveOpts::default()).unwrap_or_else(|e| {
        eprintln!("error writing: {}", e);
        std::process::exit(5);
    });
}
