//! Line-level file I/O for .gjf editing.
//!
//! The parsing core never touches the filesystem beyond being handed raw
//! line sequences and returning updated ones; these helpers are the thin
//! collaborator that reads and writes those sequences. Lines keep their
//! trailing newlines so that a read-then-write cycle is byte exact.

use crate::parser::GjfSection;
use std::fs;
use std::io::Result;
use std::path::Path;

/// Reads a file into raw lines, trailing newlines preserved.
pub fn read_lines(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)?;
    Ok(content.split_inclusive('\n').map(str::to_string).collect())
}

/// Writes raw lines back to a file by plain concatenation.
///
/// Lines are expected to carry their own newlines, as produced by
/// [`read_lines`] and by the section mutators.
pub fn write_lines(path: &Path, lines: &[String]) -> Result<()> {
    fs::write(path, lines.concat())
}

/// Concatenates all section line buffers back into file content.
///
/// Each section re-emits the verbatim `--LinkN--` line that opened it, so
/// an unedited parse reassembles to the original bytes.
pub fn reassemble(sections: &[GjfSection]) -> Vec<String> {
    let mut lines = Vec::new();

    for section in sections {
        if let Some(link) = &section.link_line {
            lines.push(link.clone());
        }
        lines.extend(section.lines.iter().cloned());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser;

    #[test]
    fn test_read_write_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("job.gjf");
        let content = "#p opt freq\n\ntitle\n\n0 1\nC 0.0 0.0 0.0\n";
        fs::write(&path, content).unwrap();

        let lines = read_lines(&path).unwrap();
        assert_eq!(lines.concat(), content);

        let out = dir.path().join("copy.gjf");
        write_lines(&out, &lines).unwrap();
        assert_eq!(fs::read_to_string(&out).unwrap(), content);
    }

    #[test]
    fn test_reassemble_restores_separators() {
        let content = "first\n--Link1--\n#p td=(nstates=5)\n";
        let lines: Vec<String> = content.split_inclusive('\n').map(str::to_string).collect();
        let sections = parser::parse_lines(lines);
        assert_eq!(reassemble(&sections).concat(), content);
    }
}
