use std::io;
use std::path::Path;

/// Read a newline-delimited class list. Line `i` names class `i`; each line
/// is trimmed, blank lines keep their slot.
pub fn load_labels(path: impl AsRef<Path>) -> io::Result<Vec<String>> {
    let path = path.as_ref();
    let labels = parse_labels(&std::fs::read_to_string(path)?);

    tracing::debug!(path = %path.display(), count = labels.len(), "Loaded class labels");
    Ok(labels)
}

/// Split already-read label text; same rules as [`load_labels`].
pub fn parse_labels(text: &str) -> Vec<String> {
    text.lines().map(|l| l.trim().to_string()).collect()
}
