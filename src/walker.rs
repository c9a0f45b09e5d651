use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use crate::config::Config;
use crate::error::Error;
use crate::grammar::SUPPORTED_EXTENSIONS;

/// Build output and VCS directories that never hold hand-written sources.
const SKIPPED_DIRS: &[&str] = &[".git", "bin", "obj"];

/// File name suffixes used by code generators.
const GENERATED_SUFFIXES: &[&str] = &[".designer.cs", ".g.cs", ".g.i.cs", ".generated.cs"];

/// How many leading bytes to search for a generator banner.
const BANNER_WINDOW: usize = 1024;

/// A source file read from disk, with its path relative to the root.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the project root.
    pub path: PathBuf,
    /// File contents.
    pub source: String,
}

/// Discover and read every source file under `paths` (relative to `root`).
/// An empty `paths` means the whole root.
/// Applies the config's include/exclude filters and skips generated code.
///
/// # Errors
///
/// Returns `Error::FileNotFound` if a given path does not exist,
/// or `Error::Io` if a source file cannot be read. Files that are not
/// valid UTF-8 are logged and skipped.
pub fn discover(root: &Path, paths: &[PathBuf], config: &Config) -> Result<Vec<SourceFile>, Error> {
    let starts: Vec<PathBuf> = if paths.is_empty() {
        vec![root.to_path_buf()]
    } else {
        paths.iter().map(|p| return root.join(p)).collect()
    };

    let mut files = Vec::new();
    for start in starts {
        if !start.exists() {
            return Err(Error::FileNotFound { path: start });
        }

        for entry in WalkDir::new(&start)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| return e.depth() == 0 || !is_skipped_dir(e.path()))
            .filter_map(Result::ok)
            .filter(|e| return e.file_type().is_file() && has_supported_extension(e.path()))
        {
            let path = entry.path();
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            let relative_str = relative.to_string_lossy().replace('\\', "/");
            if !config.should_scan(&relative_str) {
                tracing::debug!(path = %relative_str, "excluded by config");
                continue;
            }

            let source = match std::fs::read_to_string(path) {
                Ok(source) => source,
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                    tracing::warn!(path = %relative_str, "not valid UTF-8, skipped");
                    continue;
                },
                Err(e) => return Err(Error::Io(e)),
            };
            if is_generated(&relative, &source) {
                tracing::debug!(path = %relative_str, "generated code skipped");
                continue;
            }
            files.push(SourceFile { path: relative, source });
        }
    }

    files.sort_by(|a, b| return a.path.cmp(&b.path));
    files.dedup_by(|a, b| return a.path == b.path);
    return Ok(files);
}

/// Whether a directory is one we never descend into.
fn is_skipped_dir(path: &Path) -> bool {
    return path.is_dir()
        && path
            .file_name()
            .and_then(|n| return n.to_str())
            .is_some_and(|n| return SKIPPED_DIRS.contains(&n));
}

/// Whether the file extension has a grammar.
fn has_supported_extension(path: &Path) -> bool {
    return path
        .extension()
        .and_then(|e| return e.to_str())
        .is_some_and(|e| return SUPPORTED_EXTENSIONS.contains(&e));
}

/// Generated code is never analyzed: recognized by file name or by an
/// `<auto-generated>` banner near the top of the file.
pub fn is_generated(path: &Path, source: &str) -> bool {
    let name = path
        .file_name()
        .map(|n| return n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    if GENERATED_SUFFIXES.iter().any(|suffix| return name.ends_with(suffix)) {
        return true;
    }

    let mut window = BANNER_WINDOW.min(source.len());
    while !source.is_char_boundary(window) {
        window = window.saturating_sub(1);
    }
    return source.get(..window).is_some_and(|head| return head.contains("<auto-generated"));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_by_name() {
        assert!(is_generated(Path::new("Forms/Main.Designer.cs"), ""));
        assert!(is_generated(Path::new("obj/Api.g.cs"), ""));
        assert!(!is_generated(Path::new("src/Program.cs"), "class P { }"));
    }

    #[test]
    fn generated_by_banner() {
        let source = "// <auto-generated>\n// This code was generated by a tool.\n// </auto-generated>\nclass P { }";
        assert!(is_generated(Path::new("src/Api.cs"), source));
    }

    #[test]
    fn discovers_only_csharp_outside_build_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        std::fs::create_dir_all(root.join("src")).unwrap();
        std::fs::create_dir_all(root.join("obj")).unwrap();
        std::fs::write(root.join("src/B.cs"), "class B { }").unwrap();
        std::fs::write(root.join("src/A.cs"), "class A { }").unwrap();
        std::fs::write(root.join("src/notes.md"), "# notes").unwrap();
        std::fs::write(root.join("obj/Temp.cs"), "class T { }").unwrap();

        let files = discover(root, &[], &Config::default()).unwrap();
        let paths: Vec<PathBuf> = files.into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec![PathBuf::from("src/A.cs"), PathBuf::from("src/B.cs")]);
    }

    #[test]
    fn non_utf8_source_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        // UTF-16LE with a byte-order mark, as Visual Studio sometimes saves.
        let mut utf16 = vec![0xFF, 0xFE];
        utf16.extend("class W { }".encode_utf16().flat_map(u16::to_le_bytes));
        std::fs::write(root.join("Wide.cs"), utf16).unwrap();
        std::fs::write(root.join("Plain.cs"), "class P { }").unwrap();

        let files = discover(root, &[], &Config::default()).unwrap();
        let paths: Vec<PathBuf> = files.into_iter().map(|f| f.path).collect();
        assert_eq!(paths, vec![PathBuf::from("Plain.cs")]);
    }

    #[test]
    fn missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = discover(dir.path(), &[PathBuf::from("nope")], &Config::default()).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
