use crate::error::Res;
use anyhow::Context;
use std::path::Path;

/// Read a file to a `String`.
pub(crate) async fn read(path: &Path) -> Res<String> {
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read file at {}", path.display()))
}

/// Write a file.
#[cfg(test)]
pub(crate) async fn write(path: impl AsRef<Path>, contents: impl AsRef<[u8]>) -> Res<()> {
    let path = path.as_ref();
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Unable to write to {}", path.to_string_lossy()))
}

/// Describes a secret by its length only, e.g. `<46 chars>`.
pub(crate) fn redact(secret: &str) -> String {
    match secret.chars().count() {
        0 => "<empty>".to_string(),
        n => format!("<{n} chars>"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_then_read() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("x.txt");
        write(&path, "hello").await.unwrap();
        assert_eq!(read(&path).await.unwrap(), "hello");
        assert!(read(&dir.path().join("missing.txt")).await.is_err());
    }

    #[test]
    fn test_redact() {
        assert_eq!(redact(""), "<empty>");
        assert_eq!(redact("123456:ABCDEF"), "<13 chars>");
    }
}
