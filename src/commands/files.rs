//! File management commands.
//!
//! Paths typed by the operator go through [`resolve_path`], which expands
//! `~` and environment variables (`$VAR`, `${VAR}`, `%VAR%`) and makes the
//! result absolute. Copy, move, rename and delete retry a few times when the
//! file is locked by another process.

use std::cmp::Reverse;
use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Local};
use regex::{Regex, RegexBuilder};

use crate::commands::split_pair;
use crate::console::Color;
use crate::interrupt::Interrupt;
use crate::registry::{Category, CommandEntry};
use crate::retry::RetryPolicy;
use crate::session::Session;
use crate::{Error, Result};

/// How many files `recent` lists.
pub const RECENT_LIMIT: usize = 50;

/// `EXDEV`
#[cfg(unix)]
const CROSS_DEVICE: i32 = 18;
/// `ERROR_NOT_SAME_DEVICE`
#[cfg(not(unix))]
const CROSS_DEVICE: i32 = 17;

pub(crate) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("ls", Category::Files, ls)
            .aliases(&["dir"])
            .summary("List a directory")
            .explain("ls/dir — list directory entries."),
        CommandEntry::new("cd", Category::Files, cd)
            .summary("Change directory")
            .explain("cd — change directory."),
        CommandEntry::new("cat", Category::Files, cat)
            .aliases(&["type"])
            .summary("Print a file")
            .explain("cat/type — print file contents."),
        CommandEntry::new("copyfile", Category::Files, copyfile)
            .aliases(&["copy"])
            .summary("Copy a file")
            .explain("copyfile — copy file (handles folders as dest).")
            .explain_alias("copy", "copy — copy files."),
        CommandEntry::new("movefile", Category::Files, movefile)
            .summary("Move a file")
            .explain("movefile — move/rename file or folder."),
        CommandEntry::new("rename", Category::Files, rename)
            .aliases(&["mv"])
            .summary("Rename a file or folder")
            .explain("rename/mv — rename files."),
        CommandEntry::new("deletefile", Category::Files, deletefile)
            .aliases(&["del", "rm"])
            .summary("Delete files (globs allowed)")
            .explain("deletefile — delete file or folder (confirmation).")
            .explain_alias("del", "del/rm — delete files (supports glob).")
            .explain_alias("rm", "del/rm — delete files (supports glob)."),
        CommandEntry::new("mkdir", Category::Files, mkdir)
            .summary("Create a folder")
            .explain("mkdir — make directory."),
        CommandEntry::new("rmdir", Category::Files, rmdir)
            .summary("Remove a folder and its contents")
            .explain("rmdir — remove directory recursively."),
        CommandEntry::new("find", Category::Files, find)
            .summary("Find files by name pattern")
            .explain("find — search files by name (supports glob)."),
        CommandEntry::new("search", Category::Files, search)
            .summary("Search text inside files")
            .explain("search — search text inside files."),
        CommandEntry::new("filesize", Category::Files, filesize)
            .summary("Human-readable file size")
            .explain("filesize — show human-readable size."),
        CommandEntry::new("recent", Category::Files, recent)
            .summary("Most recently modified files")
            .explain("recent — list recently modified files."),
    ]
}

/// Expand `$VAR`, `${VAR}` and `%VAR%` using `lookup`.
///
/// References to unknown variables are left as typed.
pub fn expand_vars(text: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(pos) = rest.find(['$', '%']) {
        out.push_str(&rest[..pos]);
        let tail = &rest[pos..];
        let consumed = match parse_reference(tail) {
            Some((name, len)) => {
                match lookup(name) {
                    Some(value) => out.push_str(&value),
                    None => out.push_str(&tail[..len]),
                }
                len
            }
            None => {
                out.push_str(&tail[..1]);
                1
            }
        };
        rest = &tail[consumed..];
    }
    out.push_str(rest);
    out
}

/// Parse a variable reference at the start of `text`, returning the name
/// and the length of the whole reference.
fn parse_reference(text: &str) -> Option<(&str, usize)> {
    let is_name = |name: &str| {
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    if let Some(body) = text.strip_prefix("${") {
        let end = body.find('}')?;
        let name = &body[..end];
        return is_name(name).then_some((name, end + 3));
    }
    if let Some(body) = text.strip_prefix('$') {
        let end = body
            .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
            .unwrap_or(body.len());
        let name = &body[..end];
        return is_name(name).then_some((name, end + 1));
    }
    if let Some(body) = text.strip_prefix('%') {
        let end = body.find('%')?;
        let name = &body[..end];
        return is_name(name).then_some((name, end + 2));
    }
    None
}

fn expand_home(text: &str) -> String {
    let home_relative = text == "~" || text.starts_with("~/") || text.starts_with("~\\");
    match dirs::home_dir() {
        Some(home) if home_relative => format!("{}{}", home.display(), &text[1..]),
        _ => text.to_string(),
    }
}

/// Expand `~` and environment variables, then make `text` absolute.
pub fn resolve_path(text: &str) -> PathBuf {
    let expanded = expand_vars(&expand_home(text.trim()), |name| {
        env::var(name).ok().filter(|v| !v.is_empty())
    });
    let path = PathBuf::from(expanded);
    std::path::absolute(&path).unwrap_or(path)
}

/// Translate a shell glob (`*`, `?`) into an anchored regex.
///
/// Matching is case-insensitive on Windows.
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let mut source = String::from("^");
    for c in pattern.chars() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    RegexBuilder::new(&source)
        .case_insensitive(cfg!(windows))
        .build()
        .map_err(|e| Error::InvalidInput(format!("bad pattern '{}': {}", pattern, e)))
}

fn is_glob(text: &str) -> bool {
    text.contains(['*', '?'])
}

/// Render a byte count with two decimals in B, KB, MB, GB or TB.
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

/// Visit every entry under `root`, depth first. Unreadable directories are
/// skipped; symlinked directories are not followed.
pub(crate) fn walk(
    root: &Path,
    interrupt: &Interrupt,
    mut visit: impl FnMut(&Path, bool) -> Result<()>,
) -> Result<()> {
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        interrupt.check()?;
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), "skipping: {}", e);
                continue;
            }
        };
        let mut children: Vec<fs::DirEntry> = entries.filter_map(|e| e.ok()).collect();
        children.sort_by_key(|e| e.file_name());
        for entry in children {
            let path = entry.path();
            let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
            visit(&path, is_dir)?;
            if is_dir {
                pending.push(path);
            }
        }
    }
    Ok(())
}

/// Source and destination from `rest`, prompting for whatever is missing.
fn two_paths(
    session: &mut Session<'_>,
    rest: &str,
    destination_question: &str,
) -> Result<Option<(String, String)>> {
    let (src, dst) = match split_pair(rest) {
        Some((src, dst)) => (src.to_string(), dst.to_string()),
        None => {
            let src = session.arg_or_ask(rest, "Source file: ")?;
            let dst = session.ask(destination_question)?;
            (src, dst)
        }
    };
    if src.is_empty() || dst.is_empty() {
        return Ok(None);
    }
    Ok(Some((src, dst)))
}

fn retry_notice<'s, 'a>(session: &'s mut Session<'a>) -> impl FnMut(u32, u32) + 's {
    move |attempt, attempts| {
        session.println(format!("File in use... retrying ({}/{})", attempt, attempts));
    }
}

/// Resolved source and destination for a copy or move into `dst`, which
/// may name a folder. `None` after reporting a missing source.
fn prepare_transfer(
    session: &mut Session<'_>,
    src_text: &str,
    dst_text: &str,
) -> Option<(PathBuf, PathBuf)> {
    let src = resolve_path(src_text);
    if !src.exists() {
        session.println(format!("Source '{}' not found.", src_text));
        return None;
    }
    let mut dst = resolve_path(dst_text);
    if dst.is_dir() {
        if let Some(name) = src.file_name() {
            dst = dst.join(name);
        }
    }
    Some((src, dst))
}

fn ls(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = if rest.trim().is_empty() { "." } else { rest.trim() };
    let dir = resolve_path(target);
    if !dir.is_dir() {
        session.println(format!("Not a directory: {}", dir.display()));
        return Ok(());
    }

    let mut entries: Vec<fs::DirEntry> = fs::read_dir(&dir)?.filter_map(|e| e.ok()).collect();
    entries.sort_by_key(|e| e.file_name().to_string_lossy().to_lowercase());
    for entry in entries {
        let name = entry.file_name().to_string_lossy().into_owned();
        let meta = entry.metadata();
        let marker = match meta {
            Ok(m) if m.is_dir() => "<DIR>".to_string(),
            Ok(m) => m.len().to_string(),
            Err(_) => "?".to_string(),
        };
        session.println(format!("{:>12}  {}", marker, name));
    }
    Ok(())
}

fn cd(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = session.arg_or_ask(rest, "Directory: ")?;
    if target.is_empty() {
        return Ok(());
    }
    let dir = resolve_path(&target);
    env::set_current_dir(&dir)
        .map_err(|e| Error::NotFound(format!("{}: {}", dir.display(), e)))?;
    session.println(format!("Changed directory to: {}", env::current_dir()?.display()));
    Ok(())
}

fn cat(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = session.arg_or_ask(rest, "File to show: ")?;
    if target.is_empty() {
        return Ok(());
    }
    let path = resolve_path(&target);
    if !path.is_file() {
        session.println(format!("File not found: {}", target));
        return Ok(());
    }
    let bytes = fs::read(&path)?;
    session.println(String::from_utf8_lossy(&bytes).trim_end_matches(['\r', '\n']));
    Ok(())
}

fn copyfile(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let Some((src, dst)) = two_paths(session, rest, "Destination (file or folder): ")? else {
        return Ok(());
    };
    let Some((src, dst)) = prepare_transfer(session, &src, &dst) else {
        return Ok(());
    };
    RetryPolicy::default()
        .run(|| fs::copy(&src, &dst), retry_notice(session))
        .map_err(|e| Error::Command(format!("copy failed: {}", e)))?;
    tracing::info!(src = %src.display(), dst = %dst.display(), "copied");
    session.println(format!("Copied: {} -> {}", src.display(), dst.display()));
    Ok(())
}

/// Rename, falling back to copy and delete across filesystems.
fn move_path(src: &Path, dst: &Path) -> io::Result<()> {
    match fs::rename(src, dst) {
        Err(e) if e.raw_os_error() == Some(CROSS_DEVICE) && src.is_file() => {
            fs::copy(src, dst)?;
            fs::remove_file(src)
        }
        other => other,
    }
}

fn movefile(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let Some((src, dst)) = two_paths(session, rest, "Destination (file or folder): ")? else {
        return Ok(());
    };
    let Some((src, dst)) = prepare_transfer(session, &src, &dst) else {
        return Ok(());
    };
    RetryPolicy::default()
        .run(|| move_path(&src, &dst), retry_notice(session))
        .map_err(|e| Error::Command(format!("move failed: {}", e)))?;
    tracing::info!(src = %src.display(), dst = %dst.display(), "moved");
    session.println(format!("Moved: {} -> {}", src.display(), dst.display()));
    Ok(())
}

fn rename(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let Some((src_text, dst_text)) = two_paths(session, rest, "New name or destination: ")? else {
        return Ok(());
    };
    let src = resolve_path(&src_text);
    if !src.exists() {
        session.println(format!("Source '{}' not found.", src_text));
        return Ok(());
    }
    // A bare new name stays in the source's folder.
    let dst = if Path::new(&dst_text).components().count() == 1 && !dst_text.starts_with('~') {
        src.with_file_name(&dst_text)
    } else {
        resolve_path(&dst_text)
    };
    RetryPolicy::default()
        .run(|| fs::rename(&src, &dst), retry_notice(session))
        .map_err(|e| Error::Command(format!("rename failed: {}", e)))?;
    session.println(format!("Renamed: {} -> {}", src.display(), dst.display()));
    Ok(())
}

/// Paths a delete target refers to: the target itself, or the entries of
/// its folder whose names match a glob in the last component.
pub fn delete_matches(target: &str) -> Result<Vec<PathBuf>> {
    let path = resolve_path(target);
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if !is_glob(&name) {
        return Ok(if path.exists() { vec![path] } else { Vec::new() });
    }

    let pattern = glob_to_regex(&name)?;
    let dir = path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let mut matches: Vec<PathBuf> = fs::read_dir(&dir)?
        .filter_map(|e| e.ok())
        .filter(|e| pattern.is_match(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect();
    matches.sort();
    Ok(matches)
}

fn remove_path(path: &Path) -> io::Result<()> {
    if path.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    }
}

fn deletefile(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = session.arg_or_ask(rest, "File to delete: ")?;
    if target.is_empty() {
        return Ok(());
    }
    let matches = delete_matches(&target)?;
    if matches.is_empty() {
        session.println(format!("Not found: {}", target));
        return Ok(());
    }

    let question = if let [single] = matches.as_slice() {
        format!("Type YES to delete {}: ", single.display())
    } else {
        session.println(format!("{} matches:", matches.len()));
        for path in &matches {
            session.println(format!("  {}", path.display()));
        }
        format!("Type YES to delete {} items: ", matches.len())
    };
    if !session.confirm(&question)? {
        session.println("Aborted.");
        return Ok(());
    }

    for path in matches {
        session.interrupt().check()?;
        match RetryPolicy::default().run(|| remove_path(&path), retry_notice(session)) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "deleted");
                session.println(format!("Deleted: {}", path.display()));
            }
            Err(e) => session.println_colored(
                Color::Red,
                format!("Failed to delete {}: {}", path.display(), e),
            ),
        }
    }
    Ok(())
}

fn mkdir(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = session.arg_or_ask(rest, "Folder name: ")?;
    if target.is_empty() {
        return Ok(());
    }
    let dir = resolve_path(&target);
    fs::create_dir_all(&dir)?;
    session.println(format!("Directory created: {}", dir.display()));
    Ok(())
}

fn rmdir(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = session.arg_or_ask(rest, "Folder to remove: ")?;
    if target.is_empty() {
        return Ok(());
    }
    let dir = resolve_path(&target);
    if !dir.is_dir() {
        session.println(format!("Not a directory: {}", dir.display()));
        return Ok(());
    }
    if !session.confirm(&format!(
        "Type YES to remove {} and everything in it: ",
        dir.display()
    ))? {
        session.println("Aborted.");
        return Ok(());
    }
    RetryPolicy::default()
        .run(|| fs::remove_dir_all(&dir), retry_notice(session))
        .map_err(|e| Error::Command(format!("rmdir failed: {}", e)))?;
    session.println(format!("Directory removed: {}", dir.display()));
    Ok(())
}

fn find(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let input = session.arg_or_ask(rest, "Filename or pattern to find (e.g. '*.txt'): ")?;
    if input.is_empty() {
        return Ok(());
    }
    let (pattern, start) = match input.split_once(' ') {
        Some((pattern, start)) if resolve_path(start).exists() => {
            (pattern.to_string(), resolve_path(start))
        }
        _ => (input.clone(), resolve_path(".")),
    };
    let matcher = glob_to_regex(&pattern)?;

    let interrupt = session.interrupt();
    let mut found = 0usize;
    walk(&start, interrupt, |path, _| {
        let name = path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
        if matcher.is_match(&name) {
            session.println(path.display().to_string());
            found += 1;
        }
        Ok(())
    })?;
    if found == 0 {
        session.println("No matches found.");
    }
    Ok(())
}

/// First line of `path` containing `needle`, with its 1-based number.
pub fn first_match(path: &Path, needle: &str) -> Option<(usize, String)> {
    let bytes = fs::read(path).ok()?;
    String::from_utf8_lossy(&bytes)
        .lines()
        .enumerate()
        .find(|(_, line)| line.contains(needle))
        .map(|(i, line)| (i + 1, line.trim().to_string()))
}

fn report_first_match(session: &mut Session<'_>, file: &Path, needle: &str) -> bool {
    match first_match(file, needle) {
        Some((line_no, line)) => {
            session.println(format!("{}:{}: {}", file.display(), line_no, line));
            true
        }
        None => false,
    }
}

fn search(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let (text, path) = match rest.trim().split_once(' ') {
        Some((text, path)) if !path.trim().is_empty() => (text.to_string(), path.trim().to_string()),
        _ => {
            let text = session.arg_or_ask(rest, "Text to search for: ")?;
            if text.is_empty() {
                return Ok(());
            }
            let path = crate::commands::ask_or_default(session, "Path to search in (default .): ", ".")?;
            (text, path)
        }
    };
    let start = resolve_path(&path);

    let mut found = 0usize;
    if start.is_file() {
        found += usize::from(report_first_match(session, &start, &text));
    } else {
        let interrupt = session.interrupt();
        walk(&start, interrupt, |file, is_dir| {
            if !is_dir {
                found += usize::from(report_first_match(session, file, &text));
            }
            Ok(())
        })?;
    }
    if found == 0 {
        session.println("No occurrences found.");
    }
    Ok(())
}

fn filesize(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = session.arg_or_ask(rest, "File to show size: ")?;
    if target.is_empty() {
        return Ok(());
    }
    let path = resolve_path(&target);
    match fs::metadata(&path) {
        Ok(meta) => session.println(format!("{}: {}", path.display(), format_size(meta.len()))),
        Err(_) => session.println(format!("Not found: {}", path.display())),
    }
    Ok(())
}

/// Up to `limit` files under `root`, newest first.
pub fn newest_files(
    root: &Path,
    interrupt: &Interrupt,
    limit: usize,
) -> Result<Vec<(SystemTime, PathBuf)>> {
    let mut files = Vec::new();
    walk(root, interrupt, |path, is_dir| {
        if !is_dir {
            if let Ok(modified) = fs::metadata(path).and_then(|m| m.modified()) {
                files.push((modified, path.to_path_buf()));
            }
        }
        Ok(())
    })?;
    files.sort_by_key(|(modified, path)| (Reverse(*modified), path.clone()));
    files.truncate(limit);
    Ok(files)
}

fn recent(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = if rest.trim().is_empty() { "." } else { rest.trim() };
    let root = resolve_path(target);
    if !root.is_dir() {
        session.println(format!("Not a directory: {}", root.display()));
        return Ok(());
    }
    for (modified, path) in newest_files(&root, session.interrupt(), RECENT_LIMIT)? {
        let stamp: DateTime<Local> = modified.into();
        session.println(format!("{} {}", stamp.format("%Y-%m-%dT%H:%M:%S"), path.display()));
    }
    Ok(())
}
