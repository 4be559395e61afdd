use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sage::{SageConfig, SageContext};

/// A scratch project: `base` at the root, `ext` under `extensions/ext`.
pub struct Project {
    dir: tempfile::TempDir,
}

impl Project {
    pub fn new() -> Self {
        let dir = tempfile::Builder::new()
            .prefix("sage_test_")
            .tempdir()
            .expect("create temp dir");
        Self { dir }
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn ext_root(&self) -> PathBuf {
        self.root().join("extensions/ext")
    }

    pub fn write(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.root().join(rel);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(&path, contents).expect("write file");
        path
    }

    /// Rewrite `rel` and move its mtime well past the previous one.
    pub fn rewrite(&self, rel: &str, contents: &str) -> PathBuf {
        let path = self.write(rel, contents);
        let later = SystemTime::now() + Duration::from_secs(10);
        set_mtime(&path, later);
        path
    }

    pub fn config_text(&self) -> String {
        r#"
[[layers]]
name = "base"
root = "."
install_order = 0

[[layers]]
name = "ext"
root = "extensions/ext"
install_order = 10

[locale_fallbacks]
de-CH = ["de"]
"#
        .to_string()
    }

    pub fn config(&self) -> SageConfig {
        SageConfig::from_toml_str(&self.config_text(), self.root()).expect("config")
    }

    pub fn context(&self) -> SageContext {
        SageContext::from_config(&self.config()).expect("context")
    }
}

pub fn set_mtime(path: &Path, time: SystemTime) {
    let file = fs::OpenOptions::new()
        .write(true)
        .open(path)
        .expect("open for mtime");
    file.set_modified(time).expect("set mtime");
}
