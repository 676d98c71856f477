//
// cross_file/content_provider.rs
//
// File content access for the include graph walker
//

use std::collections::HashMap;
use std::path::Path;

use tower_lsp::lsp_types::Url;

use super::file_cache::IncludeFileCache;

/// Source of file text for include resolution.
pub trait ContentProvider {
    /// Text of the file at `path`, preferring open documents over disk.
    ///
    /// If the file is open in the editor, the in-memory text is returned.
    /// Never return disk content for an open document.
    fn get_content(&self, path: &Path) -> Option<String>;
}

/// Document content accessor (minimal interface for open documents)
pub trait DocumentContent {
    fn content(&self) -> String;
}

/// Open documents first, then the disk cache.
pub struct EditorContentProvider<'a, D: DocumentContent> {
    pub open_documents: &'a HashMap<Url, D>,
    pub file_cache: &'a IncludeFileCache,
}

impl<'a, D: DocumentContent> EditorContentProvider<'a, D> {
    pub fn new(open_documents: &'a HashMap<Url, D>, file_cache: &'a IncludeFileCache) -> Self {
        Self {
            open_documents,
            file_cache,
        }
    }

    pub fn is_open(&self, path: &Path) -> bool {
        Url::from_file_path(path)
            .map(|uri| self.open_documents.contains_key(&uri))
            .unwrap_or(false)
    }
}

impl<'a, D: DocumentContent> ContentProvider for EditorContentProvider<'a, D> {
    fn get_content(&self, path: &Path) -> Option<String> {
        if let Ok(uri) = Url::from_file_path(path) {
            if let Some(doc) = self.open_documents.get(&uri) {
                return Some(doc.content());
            }
        }
        self.file_cache.read(path)
    }
}

/// Disk-only provider for the CLI and benches, where nothing is open.
pub struct DiskContentProvider<'a> {
    pub file_cache: &'a IncludeFileCache,
}

impl<'a> DiskContentProvider<'a> {
    pub fn new(file_cache: &'a IncludeFileCache) -> Self {
        Self { file_cache }
    }
}

impl ContentProvider for DiskContentProvider<'_> {
    fn get_content(&self, path: &Path) -> Option<String> {
        self.file_cache.read(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    struct MockDocument {
        content: String,
    }

    impl DocumentContent for MockDocument {
        fn content(&self) -> String {
            self.content.clone()
        }
    }

    #[test]
    fn test_open_doc_is_authoritative() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "disk content").unwrap();
        let uri = Url::from_file_path(temp.path()).unwrap();

        let mut open_docs = HashMap::new();
        open_docs.insert(
            uri,
            MockDocument {
                content: "editor content".to_string(),
            },
        );
        let cache = IncludeFileCache::new();
        let provider = EditorContentProvider::new(&open_docs, &cache);

        assert!(provider.is_open(temp.path()));
        assert_eq!(
            provider.get_content(temp.path()).as_deref(),
            Some("editor content")
        );
        // Open documents never touch the disk cache
        assert!(cache.is_empty());
    }

    #[test]
    fn test_closed_file_reads_from_disk() {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "disk content").unwrap();
        let open_docs: HashMap<Url, MockDocument> = HashMap::new();
        let cache = IncludeFileCache::new();
        let provider = EditorContentProvider::new(&open_docs, &cache);

        assert!(!provider.is_open(temp.path()));
        assert_eq!(
            provider.get_content(temp.path()).as_deref(),
            Some("disk content")
        );
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_disk_provider_missing_file() {
        let cache = IncludeFileCache::new();
        let provider = DiskContentProvider::new(&cache);
        assert!(provider
            .get_content(Path::new("/no/such/file.au3"))
            .is_none());
    }
}
