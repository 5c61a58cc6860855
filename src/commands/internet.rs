//! HTTP helpers: HEAD requests, downloads and opening URLs.

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::interrupt::Interrupt;
use crate::registry::{Category, CommandEntry};
use crate::session::Session;
use crate::{Error, Result};

/// Services tried in order by [`public_ip`].
const PUBLIC_IP_SERVICES: &[&str] = &[
    "https://api.ipify.org?format=text",
    "https://ifconfig.co/ip",
    "https://icanhazip.com",
];

const PUBLIC_IP_TIMEOUT: Duration = Duration::from_secs(5);
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);
const DOWNLOAD_CHUNK: usize = 64 * 1024;

pub(crate) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("http", Category::Internet, http)
            .summary("HEAD request: status and headers")
            .explain("http — HTTP HEAD request, shows status and headers."),
        CommandEntry::new("download", Category::Internet, download)
            .summary("Download a URL to the temp folder")
            .explain("download — download a URL to temp folder."),
        CommandEntry::new("open", Category::Internet, open)
            .summary("Open a URL or file")
            .explain("open — open URL/file with default handler."),
    ]
}

fn agent(timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .timeout(timeout)
        .user_agent(concat!("venom-console/", env!("CARGO_PKG_VERSION")))
        .build()
}

/// Prefix `http://` when `url` has no scheme.
pub fn normalize_url(url: &str) -> String {
    if url.contains("://") {
        url.to_string()
    } else {
        format!("http://{}", url)
    }
}

/// File name for a downloaded URL: the last path segment, query dropped.
pub fn download_file_name(url: &str) -> String {
    let without_query = url.split('?').next().unwrap_or(url);
    match without_query.rsplit('/').next() {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => "download".to_string(),
    }
}

/// Where `download` saves `url`.
pub fn download_path(url: &str, unix_seconds: u64) -> PathBuf {
    std::env::temp_dir().join(format!(
        "venom_download_{}_{}",
        unix_seconds,
        download_file_name(url)
    ))
}

/// Public address as reported by the first service that answers.
pub fn public_ip() -> Option<String> {
    let agent = agent(PUBLIC_IP_TIMEOUT);
    PUBLIC_IP_SERVICES.iter().find_map(|url| {
        match agent.get(url).call() {
            Ok(resp) => {
                let text = resp.into_string().ok()?;
                let text: String = text.trim().chars().take(128).collect();
                (!text.is_empty()).then_some(text)
            }
            Err(e) => {
                tracing::debug!(service = url, "public ip lookup failed: {}", e);
                None
            }
        }
    })
}

fn http(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let url = session.arg_or_ask(rest, "URL (e.g. https://example.com): ")?;
    if url.is_empty() {
        return Ok(());
    }
    let url = normalize_url(&url);

    let response = match agent(HTTP_TIMEOUT).head(&url).call() {
        Ok(resp) => resp,
        // Error statuses still carry useful headers.
        Err(ureq::Error::Status(_, resp)) => resp,
        Err(e) => return Err(e.into()),
    };

    session.println(format!(
        "Status: {} {}",
        response.status(),
        response.status_text()
    ));
    for name in response.headers_names() {
        if let Some(value) = response.header(&name) {
            session.println(format!("{}: {}", name, value));
        }
    }
    Ok(())
}

fn download(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let url = session.arg_or_ask(rest, "URL to download: ")?;
    if url.is_empty() {
        return Ok(());
    }
    let url = normalize_url(&url);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default();
    let path = download_path(&url, now);

    let bytes = download_to(&url, &path, session.interrupt())?;
    tracing::info!(url = %url, bytes, "downloaded");

    session.println(format!("Saved to {}", path.display()));
    Ok(())
}

/// Fetch `url` into a new file at `path`, returning the byte count.
///
/// The body is copied in chunks so Ctrl+C stops a slow transfer. Nothing is
/// left at `path` when the request, the transfer or the write fails.
pub fn download_to(url: &str, path: &Path, interrupt: &Interrupt) -> Result<u64> {
    let response = agent(HTTP_TIMEOUT).get(url).call()?;
    let mut reader = response.into_reader();
    let result = File::create(path)
        .map_err(Error::from)
        .and_then(|mut file| copy_chunks(&mut reader, &mut file, interrupt));
    if result.is_err() {
        let _ = fs::remove_file(path);
    }
    result
}

fn copy_chunks(reader: &mut impl Read, file: &mut File, interrupt: &Interrupt) -> Result<u64> {
    let mut buf = vec![0u8; DOWNLOAD_CHUNK];
    let mut total = 0u64;
    loop {
        interrupt.check()?;
        let read = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(read) => read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        file.write_all(&buf[..read])?;
        total += read as u64;
    }
    file.flush()?;
    Ok(total)
}

/// Command that opens `target` with the desktop's default handler.
pub fn opener(target: &str) -> Command {
    if cfg!(windows) {
        let mut cmd = Command::new("cmd");
        cmd.args(["/C", "start", "", target]);
        cmd
    } else if cfg!(target_os = "macos") {
        let mut cmd = Command::new("open");
        cmd.arg(target);
        cmd
    } else {
        let mut cmd = Command::new("xdg-open");
        cmd.arg(target);
        cmd
    }
}

fn open(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = session.arg_or_ask(rest, "URL/file to open: ")?;
    if target.is_empty() {
        return Ok(());
    }
    opener(&target)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::Command(format!("open failed: {}", e)))?;
    session.println(format!("Opened: {}", target));
    Ok(())
}
