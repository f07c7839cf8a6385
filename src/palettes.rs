use std::path::{Path, PathBuf};

use walkdir::WalkDir;

/// Parameter files (`*.par`, any case) directly inside one directory,
/// yielded in file-name order. A missing directory yields nothing.
pub struct ColorFiles {
    entries: walkdir::IntoIter,
}

impl ColorFiles {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        let entries = WalkDir::new(dir).min_depth(1).max_depth(1).sort_by_file_name().into_iter();
        ColorFiles { entries }
    }
}

fn is_param_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("par"))
}

impl Iterator for ColorFiles {
    type Item = PathBuf;

    fn next(&mut self) -> Option<PathBuf> {
        self.entries
            .by_ref()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .find(|p| is_param_file(p))
    }
}
