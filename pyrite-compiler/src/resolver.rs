// Source file lookup over the import search roots.
//
// A module named a.b.c maps to a/b/c.py under each search root, first
// match wins.

use std::path::PathBuf;

use pyrite_diagnostics::CompileError;

use crate::contexts::GlobalContext;
use crate::debug::{flag_enabled, DebugFlag};

impl GlobalContext {
    pub fn find_source_file(&self, module_name: &str) -> Result<String, CompileError> {
        let module_path_name = module_name.replace('.', "/");
        for path in &self.import_paths {
            let mut filename = PathBuf::from(path);
            filename.push(format!("{}.py", module_path_name));
            if flag_enabled(self.debug_flags, DebugFlag::ShowSearchDebug) {
                eprintln!("[{}] probing {}", module_name, filename.display());
            }
            if filename.is_file() {
                return Ok(filename.to_string_lossy().into_owned());
            }
        }

        Err(CompileError::compile(
            format!("can't find file for module {}", module_name),
            None,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_dotted_module_resolution() {
        let dir = tempfile::tempdir().unwrap();
        let package = dir.path().join("pkg/sub");
        fs::create_dir_all(&package).unwrap();
        fs::write(package.join("mod.py"), "x = 1\n").unwrap();
        fs::write(dir.path().join("top.py"), "y = 2\n").unwrap();

        let global = GlobalContext::new(vec![
            "/nonexistent".to_string(),
            dir.path().to_string_lossy().into_owned(),
        ]);

        let found = global.find_source_file("pkg.sub.mod").unwrap();
        assert!(found.ends_with("pkg/sub/mod.py"));
        let found = global.find_source_file("top").unwrap();
        assert!(found.ends_with("top.py"));
        assert!(global.find_source_file("missing").is_err());
    }

    #[test]
    fn test_first_match_wins() {
        let first = tempfile::tempdir().unwrap();
        let second = tempfile::tempdir().unwrap();
        fs::write(first.path().join("m.py"), "a = 1\n").unwrap();
        fs::write(second.path().join("m.py"), "a = 2\n").unwrap();

        let global = GlobalContext::new(vec![
            first.path().to_string_lossy().into_owned(),
            second.path().to_string_lossy().into_owned(),
        ]);
        let found = global.find_source_file("m").unwrap();
        assert!(found.starts_with(&first.path().to_string_lossy().into_owned()));
    }
}
