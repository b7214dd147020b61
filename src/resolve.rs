use crate::error::{Result, WardrobeError};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extensions tried when the claimed one does not exist
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// File-name token for background-removed variants
pub const NOBG_MARKER: &str = "_nobg";

/// How a claimed file name was matched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolveMethod {
    Exact,
    ExtensionSwap,
    MarkerToggle,
}

/// A claimed file name mapped to a file on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub path: PathBuf,
    pub method: ResolveMethod,
}

impl Resolved {
    /// File name of the matched file
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Resolves file names claimed by the AI against a directory.
///
/// The AI tends to swap extensions (`.png` written as `.jpg`) and to add or
/// drop the background-removal marker. Both fixes compose: every extension is
/// tried for the toggled name.
#[derive(Debug, Clone)]
pub struct AssetResolver {
    extensions: Vec<String>,
    marker: String,
}

impl Default for AssetResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetResolver {
    pub fn new() -> Self {
        Self {
            extensions: IMAGE_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            marker: NOBG_MARKER.to_string(),
        }
    }

    /// Find the file in `dir` that best matches `claimed`
    pub fn resolve(&self, claimed: &str, dir: &Path) -> Result<Resolved> {
        let not_found = || WardrobeError::AssetNotFound {
            claimed: claimed.to_string(),
            dir: dir.to_path_buf(),
        };

        // Only the final component counts; a claim never leaves `dir`
        let file_name = Path::new(claimed.trim())
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(not_found)?;
        let (base, ext) = split_extension(&file_name);

        let exact = dir.join(&file_name);
        if exact.is_file() {
            return Ok(Resolved {
                path: exact,
                method: ResolveMethod::Exact,
            });
        }

        for alt in self.extensions.iter().filter(|e| Some(e.as_str()) != ext) {
            let candidate = dir.join(format!("{}.{}", base, alt));
            if candidate.is_file() {
                debug!("Resolved {} by extension swap to {}", claimed, candidate.display());
                return Ok(Resolved {
                    path: candidate,
                    method: ResolveMethod::ExtensionSwap,
                });
            }
        }

        let toggled = if base.contains(&self.marker) {
            base.replace(&self.marker, "")
        } else {
            format!("{}{}", base, self.marker)
        };

        for alt in ext.into_iter().chain(self.extensions.iter().map(String::as_str)) {
            let candidate = dir.join(format!("{}.{}", toggled, alt));
            if candidate.is_file() {
                debug!("Resolved {} by marker toggle to {}", claimed, candidate.display());
                return Ok(Resolved {
                    path: candidate,
                    method: ResolveMethod::MarkerToggle,
                });
            }
        }

        Err(not_found())
    }

    /// Whether a file name carries the background-removal marker
    pub fn has_marker(&self, file_name: &str) -> bool {
        split_extension(file_name).0.contains(&self.marker)
    }

    /// Strip the marker from a file stem
    pub fn strip_marker(&self, stem: &str) -> String {
        stem.replace(&self.marker, "")
    }

    /// Whether a file name has one of the known image extensions
    pub fn is_image(&self, file_name: &str) -> bool {
        match split_extension(file_name).1 {
            Some(ext) => {
                let ext = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext)
            }
            None => false,
        }
    }

    /// Existing background-removed sibling of `path`, if any
    pub fn nobg_sibling(&self, path: &Path) -> Option<PathBuf> {
        let dir = path.parent()?;
        let stem = path.file_stem()?.to_string_lossy();
        if stem.contains(&self.marker) {
            return None;
        }
        self.extensions
            .iter()
            .map(|ext| dir.join(format!("{}{}.{}", stem, self.marker, ext)))
            .find(|candidate| candidate.is_file())
    }
}

/// Split `name.ext` into (`name`, `Some("ext")`); dotfiles have no extension
fn split_extension(file_name: &str) -> (&str, Option<&str>) {
    match file_name.rfind('.') {
        Some(idx) if idx > 0 => (&file_name[..idx], Some(&file_name[idx + 1..])),
        _ => (file_name, None),
    }
}
