//! `hexplain`: hex dump of a file or an inline string.

use std::fs;

use crate::commands::files::resolve_path;
use crate::registry::{Category, CommandEntry};
use crate::session::Session;
use crate::Result;

/// Bytes per dump row.
pub const ROW_WIDTH: usize = 16;

/// Prefix selecting inline text instead of a file name.
const INLINE_PREFIX: &str = ":s ";

pub(crate) fn entries() -> Vec<CommandEntry> {
    vec![
        CommandEntry::new("hexplain", Category::HelpTools, hexplain)
            .summary("Hex dump of a file or string")
            .explain("hexplain — hex dump of file or string."),
    ]
}

/// Format `data` as rows of `OFFSET  HEX  ASCII`.
///
/// ```text
/// 00000000  68 65 6C 6C 6F                                   hello
/// ```
pub fn hex_dump(data: &[u8]) -> Vec<String> {
    data.chunks(ROW_WIDTH)
        .enumerate()
        .map(|(row, chunk)| {
            let hex = chunk
                .iter()
                .map(|b| format!("{:02X}", b))
                .collect::<Vec<_>>()
                .join(" ");
            let ascii: String = chunk
                .iter()
                .map(|&b| if (32..127).contains(&b) { b as char } else { '.' })
                .collect();
            format!("{:08X}  {:<48}  {}", row * ROW_WIDTH, hex, ascii)
        })
        .collect()
}

fn hexplain(session: &mut Session<'_>, rest: &str) -> Result<()> {
    let target = session.arg_or_ask(rest, "Filename or ':s <text>': ")?;
    if target.is_empty() {
        return Ok(());
    }

    let data = match target.strip_prefix(INLINE_PREFIX) {
        Some(text) => text.as_bytes().to_vec(),
        None => {
            let path = resolve_path(&target);
            if !path.is_file() {
                session.println(format!("File not found: {}", target));
                return Ok(());
            }
            fs::read(&path)?
        }
    };

    for line in hex_dump(&data) {
        session.interrupt().check()?;
        session.println(line);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::dispatch_line;
    use crate::test_utils::Harness;

    #[test]
    fn test_hex_dump_short_row() {
        let lines = hex_dump(b"AB\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], format!("00000000  {:<48}  AB.", "41 42 0A"));
    }

    #[test]
    fn test_hex_dump_full_and_partial_rows() {
        let data: Vec<u8> = (0u8..20).collect();
        let lines = hex_dump(&data);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000000  00 01 02 03"));
        assert!(lines[0].ends_with("0E 0F   ................"));
        assert!(lines[1].starts_with("00000010  10 11 12 13"));
        assert_eq!(lines[1].len(), 8 + 2 + 48 + 2 + 4);
    }

    #[test]
    fn test_hex_dump_empty() {
        assert!(hex_dump(&[]).is_empty());
    }

    #[test]
    fn test_hexplain_inline_text() {
        let mut harness = Harness::with_default_commands("");
        dispatch_line(&mut harness.session(), "hexplain :s Hi!");
        assert!(harness.output().starts_with("00000000  48 69 21"));
        assert!(harness.output().trim_end().ends_with("Hi!"));
    }

    #[test]
    fn test_hexplain_file() {
        let mut harness = Harness::with_default_commands("");
        let path = harness.dir.path().join("blob.bin");
        fs::write(&path, [0xDE, 0xAD, 0xBE, 0xEF]).unwrap();
        dispatch_line(
            &mut harness.session(),
            &format!("hexplain {}", path.display()),
        );
        assert!(harness.output().contains("DE AD BE EF"));
    }

    #[test]
    fn test_hexplain_missing_file() {
        let mut harness = Harness::with_default_commands("");
        dispatch_line(&mut harness.session(), "hexplain /no/such/file.bin");
        assert!(harness.output().contains("File not found: /no/such/file.bin"));
    }
}
