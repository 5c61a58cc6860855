//! `compress` / `extract`: zip archives, with gzip-compressed tar as an extra.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use flate2::Compression;
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::commands::{ask_or_default, files::resolve_path, files::walk};
use crate::interrupt::Interrupt;
use crate::registry::{Category, CommandEntry};
use crate::session::Session;
use crate::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

pub(crate) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("compress", Category::Files, compress)
            .summary("Zip a file or folder")
            .explain("compress — create zip from folder/file."),
        CommandEntry::new("extract", Category::Files, extract)
            .summary("Unpack a zip archive")
            .explain("extract — extract zip file."),
    ]
}

/// Container format of an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    Zip,
    TarGz,
}

impl ArchiveFormat {
    /// Format implied by the name of an archive about to be written.
    pub fn from_name(path: &Path) -> Self {
        let name = path.to_string_lossy().to_lowercase();
        if name.ends_with(".tar.gz") || name.ends_with(".tgz") {
            ArchiveFormat::TarGz
        } else {
            ArchiveFormat::Zip
        }
    }

    /// Format of an existing archive, judged by its first bytes.
    pub fn sniff(path: &Path) -> io::Result<Self> {
        let mut magic = [0u8; 2];
        let mut file = File::open(path)?;
        let read = file.read(&mut magic)?;
        Ok(if read == magic.len() && magic == GZIP_MAGIC {
            ArchiveFormat::TarGz
        } else {
            ArchiveFormat::Zip
        })
    }
}

/// Name stored in the archive for `source`, also the default archive stem.
fn base_name(source: &Path) -> String {
    source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "archive".to_string())
}

/// `<name>.zip` in the current directory.
pub fn default_archive_name(source: &Path) -> String {
    format!("{}.zip", base_name(source))
}

/// Entry name for `path` below `root`, `/`-separated and prefixed by `base`.
fn entry_name(base: &str, root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path);
    std::iter::once(base.to_string())
        .chain(
            relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned()),
        )
        .collect::<Vec<_>>()
        .join("/")
}

/// Write `source` (file or folder) into a new zip at `dest`, deflated.
///
/// A folder is stored under its own name, so extracting recreates it.
pub fn create_zip(source: &Path, dest: &Path, interrupt: &Interrupt) -> Result<()> {
    let mut zip = ZipWriter::new(File::create(dest)?);
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    let base = base_name(source);

    if source.is_dir() {
        zip.add_directory(base.as_str(), options).map_err(io::Error::from)?;
        walk(source, interrupt, |path, is_dir| {
            let name = entry_name(&base, source, path);
            if is_dir {
                zip.add_directory(name, options).map_err(io::Error::from)?;
            } else {
                zip.start_file(name, options).map_err(io::Error::from)?;
                io::copy(&mut File::open(path)?, &mut zip)?;
            }
            Ok(())
        })?;
    } else {
        zip.start_file(base, options).map_err(io::Error::from)?;
        io::copy(&mut File::open(source)?, &mut zip)?;
    }
    zip.finish().map_err(io::Error::from)?;
    Ok(())
}

/// Unpack the zip at `archive` into `dest`, creating it if needed.
///
/// Entries that would land outside `dest` are rejected.
pub fn extract_zip(archive: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    let mut zip = ZipArchive::new(File::open(archive)?)?;
    zip.extract(dest)?;
    Ok(())
}

/// Write `source` (file or folder) into a new `.tar.gz` at `dest`.
pub fn create_tar_gz(source: &Path, dest: &Path) -> io::Result<()> {
    let file = File::create(dest)?;
    let mut builder = tar::Builder::new(GzEncoder::new(file, Compression::default()));
    builder.follow_symlinks(false);

    let name = base_name(source);
    if source.is_dir() {
        builder.append_dir_all(&name, source)?;
    } else {
        builder.append_path_with_name(source, &name)?;
    }
    builder.into_inner()?.finish()?;
    Ok(())
}

/// Unpack the `.tar.gz` at `archive` into `dest`, creating it if needed.
pub fn extract_tar_gz(archive: &Path, dest: &Path) -> io::Result<()> {
    fs::create_dir_all(dest)?;
    let mut archive = tar::Archive::new(GzDecoder::new(File::open(archive)?));
    archive.unpack(dest)
}

/// Create an archive at `dest` in the format its name implies.
///
/// A partly written archive is removed on failure.
pub fn create_archive(source: &Path, dest: &Path, interrupt: &Interrupt) -> Result<ArchiveFormat> {
    let format = ArchiveFormat::from_name(dest);
    let result = match format {
        ArchiveFormat::Zip => create_zip(source, dest, interrupt),
        ArchiveFormat::TarGz => create_tar_gz(source, dest).map_err(Error::from),
    };
    if result.is_err() {
        let _ = fs::remove_file(dest);
    }
    result.map(|()| format)
}

/// Unpack `archive`, zip or `.tar.gz`, into `dest`.
pub fn extract_archive(archive: &Path, dest: &Path) -> io::Result<()> {
    match ArchiveFormat::sniff(archive)? {
        ArchiveFormat::Zip => extract_zip(archive, dest),
        ArchiveFormat::TarGz => extract_tar_gz(archive, dest),
    }
}

/// Turn I/O and format errors into a "<verb> failed" report.
fn failed(verb: &str, err: Error) -> Error {
    match err {
        Error::Io(e) => Error::Command(format!("{} failed: {}", verb, e)),
        other => other,
    }
}

fn compress(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let rest = rest.trim();
    let (source_text, dest_text) = match rest.split_once(' ') {
        Some((source, dest)) => (source.to_string(), Some(dest.trim().to_string())),
        None => (session.arg_or_ask(rest, "Folder/file to compress: ")?, None),
    };
    if source_text.is_empty() {
        return Ok(());
    }

    let source = resolve_path(&source_text);
    if !source.exists() {
        session.println(format!("Not found: {}", source.display()));
        return Ok(());
    }
    let dest: PathBuf = match dest_text.filter(|d| !d.is_empty()) {
        Some(dest) => resolve_path(&dest),
        None => resolve_path(&default_archive_name(&source)),
    };

    let format = create_archive(&source, &dest, session.interrupt())
        .map_err(|e| failed("compress", e))?;
    tracing::info!(source = %source.display(), archive = %dest.display(), ?format, "archive created");
    match format {
        ArchiveFormat::Zip => session.println(format!("Created zip: {}", dest.display())),
        ArchiveFormat::TarGz => session.println(format!("Created archive: {}", dest.display())),
    }
    Ok(())
}

fn extract(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let archive_text = session.arg_or_ask(rest, "Zip file to extract: ")?;
    if archive_text.is_empty() {
        return Ok(());
    }
    let archive = resolve_path(&archive_text);
    if !archive.is_file() {
        session.println(format!("Not found: {}", archive.display()));
        return Ok(());
    }

    let dest = ask_or_default(session, "Destination folder (default current): ", ".")?;
    let dest = resolve_path(&dest);
    extract_archive(&archive, &dest).map_err(|e| failed("extract", e.into()))?;
    session.println(format!("Extracted to: {}", dest.display()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{Outcome, dispatch_line};
    use crate::input::LineReader;
    use crate::test_utils::Harness;
    use std::io::Cursor;

    #[test]
    fn test_default_archive_name() {
        assert_eq!(default_archive_name(Path::new("/data/photos")), "photos.zip");
        assert_eq!(default_archive_name(Path::new("notes.txt")), "notes.txt.zip");
    }

    #[test]
    fn test_format_from_name() {
        assert_eq!(ArchiveFormat::from_name(Path::new("a.zip")), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_name(Path::new("a")), ArchiveFormat::Zip);
        assert_eq!(ArchiveFormat::from_name(Path::new("a.TAR.GZ")), ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::from_name(Path::new("a.tgz")), ArchiveFormat::TarGz);
    }

    #[test]
    fn test_folder_survives_compress_and_extract() {
        let mut harness = Harness::with_default_commands("");
        let root = harness.dir.path().to_path_buf();
        let source = root.join("project");
        fs::create_dir_all(source.join("src")).unwrap();
        fs::create_dir_all(source.join("empty")).unwrap();
        fs::write(source.join("README"), "hello").unwrap();
        fs::write(source.join("src/main.txt"), "fn main").unwrap();
        let archive = root.join("project.zip");
        let out = root.join("unpacked");

        dispatch_line(
            &mut harness.session(),
            &format!("compress {} {}", source.display(), archive.display()),
        );
        assert!(archive.is_file());
        assert_eq!(ArchiveFormat::sniff(&archive).unwrap(), ArchiveFormat::Zip);
        assert!(harness.output().contains("Created zip: "));

        harness.input = LineReader::new(Cursor::new(format!("{}\n", out.display()).into_bytes()));
        dispatch_line(&mut harness.session(), &format!("extract {}", archive.display()));

        assert_eq!(fs::read_to_string(out.join("project/README")).unwrap(), "hello");
        assert_eq!(
            fs::read_to_string(out.join("project/src/main.txt")).unwrap(),
            "fn main"
        );
        assert!(out.join("project/empty").is_dir());
        assert!(harness.output().contains("Extracted to: "));
    }

    #[test]
    fn test_zip_entries_are_prefixed_by_folder_name() {
        let dir = tempfile::TempDir::new().unwrap();
        let source = dir.path().join("docs");
        fs::create_dir_all(source.join("guide")).unwrap();
        fs::write(source.join("guide/intro.md"), "# intro").unwrap();
        let archive = dir.path().join("docs.zip");
        create_zip(&source, &archive, &Interrupt::new()).unwrap();

        let zip = ZipArchive::new(File::open(&archive).unwrap()).unwrap();
        let mut names: Vec<&str> = zip.file_names().collect();
        names.sort();
        assert_eq!(names, vec!["docs/", "docs/guide/", "docs/guide/intro.md"]);
    }

    #[test]
    fn test_single_file_zip() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("data.csv");
        fs::write(&file, "a,b\n").unwrap();
        let archive = dir.path().join("data.csv.zip");
        create_zip(&file, &archive, &Interrupt::new()).unwrap();

        let out = dir.path().join("out");
        extract_archive(&archive, &out).unwrap();
        assert_eq!(fs::read_to_string(out.join("data.csv")).unwrap(), "a,b\n");
    }

    #[test]
    fn test_tar_gz_when_named_so() {
        let dir = tempfile::TempDir::new().unwrap();
        let file = dir.path().join("data.csv");
        fs::write(&file, "a,b\n").unwrap();
        let archive = dir.path().join("data.tar.gz");
        let format = create_archive(&file, &archive, &Interrupt::new()).unwrap();
        assert_eq!(format, ArchiveFormat::TarGz);
        assert_eq!(ArchiveFormat::sniff(&archive).unwrap(), ArchiveFormat::TarGz);

        let out = dir.path().join("out");
        extract_archive(&archive, &out).unwrap();
        assert_eq!(fs::read_to_string(out.join("data.csv")).unwrap(), "a,b\n");
    }

    #[test]
    fn test_interrupted_compress_leaves_no_archive() {
        let mut harness = Harness::with_default_commands("");
        let source = harness.dir.path().join("big");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("a.txt"), "a").unwrap();
        let archive = harness.dir.path().join("big.zip");
        harness.interrupt.trigger();

        let outcome = dispatch_line(
            &mut harness.session(),
            &format!("compress {} {}", source.display(), archive.display()),
        );
        assert_eq!(outcome, Outcome::Interrupted);
        assert!(!archive.exists());
    }

    #[test]
    fn test_compress_missing_source() {
        let mut harness = Harness::with_default_commands("");
        dispatch_line(&mut harness.session(), "compress /no/such/folder");
        assert!(harness.output().contains("Not found: "));
    }

    #[test]
    fn test_extract_prompts_for_zip() {
        let mut harness = Harness::with_default_commands("\n");
        dispatch_line(&mut harness.session(), "extract");
        assert!(harness.output().contains("Zip file to extract: "));
    }

    #[test]
    fn test_extract_rejects_corrupt_archive() {
        let mut harness = Harness::with_default_commands("");
        let bogus = harness.dir.path().join("bogus.zip");
        fs::write(&bogus, "not a zip").unwrap();
        let out = harness.dir.path().join("out");
        harness.input = LineReader::new(Cursor::new(format!("{}\n", out.display()).into_bytes()));

        dispatch_line(&mut harness.session(), &format!("extract {}", bogus.display()));
        assert!(harness.output().contains("Error: Command failed: extract failed:"));
    }
}
