//! Directory scanning for image libraries.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::debug;
use walkdir::{DirEntry, WalkDir};

use crate::config::SceneSettings;

const IMAGE_EXTS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

/// Return `true` if `path` has a decodable image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            IMAGE_EXTS.contains(&ext.as_str())
        })
}

/// Recursively collects image paths under `root`, sorted for a stable order.
///
/// # Errors
/// Fails if `root` is missing or not a directory.
pub fn scan_images(root: &Path) -> Result<Vec<String>> {
    if !root.is_dir() {
        bail!("library {} is not a directory", root.display());
    }
    let mut found: Vec<PathBuf> = WalkDir::new(root)
        .follow_links(true)
        .into_iter()
        // Skip hidden dot-directories *below* the root only.
        .filter_entry(|e| !should_skip_dir(e))
        .flatten()
        .filter(|e| e.file_type().is_file() && is_supported_image(e.path()))
        .map(DirEntry::into_path)
        .collect();
    found.sort();
    debug!(root = %root.display(), count = found.len(), "library scanned");
    Ok(found
        .into_iter()
        .map(|p| p.to_string_lossy().into_owned())
        .collect())
}

/// Fills an empty asset list from `library`. Explicit assets always win.
pub fn fill_assets(scene: &mut SceneSettings, library: Option<&Path>) -> Result<()> {
    if let Some(root) = library
        && scene.assets.is_empty()
    {
        scene.assets = scan_images(root)?;
    }
    Ok(())
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn extension_filter_is_case_insensitive() {
        assert!(is_supported_image(Path::new("a/B.JPG")));
        assert!(is_supported_image(Path::new("c.webp")));
        assert!(!is_supported_image(Path::new("notes.txt")));
        assert!(!is_supported_image(Path::new("noext")));
    }

    #[test]
    fn scan_skips_hidden_dirs_and_sorts() {
        let tmp = tempdir().unwrap();
        let root = tmp.path();
        fs::create_dir_all(root.join("sub")).unwrap();
        fs::create_dir_all(root.join(".cache")).unwrap();
        fs::write(root.join("sub").join("b.png"), b"x").unwrap();
        fs::write(root.join("a.jpg"), b"x").unwrap();
        fs::write(root.join(".cache").join("c.jpg"), b"x").unwrap();
        fs::write(root.join("readme.md"), b"x").unwrap();

        let found = scan_images(root).unwrap();
        let expected: Vec<String> = [root.join("a.jpg"), root.join("sub").join("b.png")]
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect();
        assert_eq!(found, expected);
    }

    #[test]
    fn missing_library_is_an_error() {
        let tmp = tempdir().unwrap();
        assert!(scan_images(&tmp.path().join("nope")).is_err());
    }

    #[test]
    fn explicit_assets_are_kept() {
        let tmp = tempdir().unwrap();
        fs::write(tmp.path().join("a.jpg"), b"x").unwrap();
        let mut scene = SceneSettings {
            assets: vec!["keep.png".into()],
            ..SceneSettings::default()
        };
        fill_assets(&mut scene, Some(tmp.path())).unwrap();
        assert_eq!(scene.assets, vec!["keep.png".to_string()]);

        scene.assets.clear();
        fill_assets(&mut scene, Some(tmp.path())).unwrap();
        assert_eq!(scene.assets.len(), 1);
    }
}
