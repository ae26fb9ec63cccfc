//! Markdown record store
//!
//! Each shop is one `.md` document opening with a metadata block:
//!
//! ```text
//! ---
//! rating: 4.5
//! location: "Harbor Street"
//! price: Cheap
//! ---
//! free-form notes...
//! ```

use crema_ai_core::{CoreError, ShopRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, info, instrument};

use crate::errors::TrainerError;

static FRONT_MATTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)---\r?\n(.*?)\r?\n---").expect("front matter pattern is valid")
});

/// Parse the first metadata block of a document into key/value pairs.
///
/// Returns an empty map when the document carries no block.
pub fn parse_front_matter(content: &str) -> HashMap<String, String> {
    let Some(captures) = FRONT_MATTER.captures(content) else {
        return HashMap::new();
    };

    captures[1]
        .lines()
        .filter_map(|line| line.split_once(':'))
        .map(|(key, value)| {
            (
                key.trim().to_string(),
                value.trim().trim_matches('"').to_string(),
            )
        })
        .collect()
}

/// Load every shop document in `dir`, ordered by file name.
///
/// Documents without metadata are skipped.
#[instrument(skip_all, fields(dir = %dir.as_ref().display()))]
pub fn load_corpus<P: AsRef<Path>>(dir: P) -> Result<Vec<ShopRecord>, TrainerError> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(CoreError::Corpus(format!("corpus directory {} not found", dir.display())).into());
    }

    let io_err = |source| TrainerError::Io {
        path: dir.display().to_string(),
        source,
    };

    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(io_err)? {
        let path = entry.map_err(io_err)?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "md") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut records = Vec::with_capacity(paths.len());
    for path in paths {
        let content = std::fs::read_to_string(&path).map_err(|source| TrainerError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let metadata = parse_front_matter(&content);
        if metadata.is_empty() {
            debug!(file = %path.display(), "skipping document without metadata");
            continue;
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        records.push(ShopRecord::from_metadata(name, metadata)?);
    }

    info!("Loaded {} shop records", records.len());
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_front_matter() {
        let doc = "---\nrating: 4.5\nlocation: \"Main St: corner\"\nprice: Cheap\n---\nGreat crema.";
        let meta = parse_front_matter(doc);
        assert_eq!(meta.get("rating").map(String::as_str), Some("4.5"));
        assert_eq!(meta.get("location").map(String::as_str), Some("Main St: corner"));
        assert_eq!(meta.get("price").map(String::as_str), Some("Cheap"));
    }

    #[test]
    fn test_parse_without_block() {
        assert!(parse_front_matter("just notes").is_empty());
    }

    #[test]
    fn test_load_corpus_skips_and_orders() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        fs::write(dir.path().join("b.md"), "---\nrating: 3\nprice: Cheap\n---\n")?;
        fs::write(dir.path().join("a.md"), "---\nrating: 4\nprice: Average\n---\n")?;
        fs::write(dir.path().join("notes.md"), "no metadata here")?;
        fs::write(dir.path().join("ignored.txt"), "---\nrating: 1\n---\n")?;

        let records = load_corpus(dir.path())?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name, "a");
        assert_eq!(records[0].rating, Some(4.0));
        assert_eq!(records[1].name, "b");
        Ok(())
    }

    #[test]
    fn test_missing_directory() {
        let err = load_corpus("/definitely/not/a/corpus").unwrap_err();
        assert!(matches!(err, TrainerError::Core(CoreError::Corpus(_))));
    }
}
