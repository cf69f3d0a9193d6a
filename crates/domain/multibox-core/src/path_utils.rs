use std::path::Path;

pub struct PrefPath;

impl PrefPath {
    /// Standardize directory separators to forward slashes.
    /// Catalog patterns and reported relative paths always use this form.
    pub fn normalize(path: &str) -> String {
        path.replace('\\', "/")
    }

    /// A relative path is safe when it cannot escape the directory it is joined onto
    /// and never names that directory itself (`.` segments are refused).
    pub fn verify_safe(rel_path: &str) -> bool {
        if rel_path.starts_with('/') || rel_path.starts_with('\\') {
            return false;
        }
        // Drive-qualified paths (`C:foo`, `C:\foo`) are absolute on Windows even when
        // `Path::is_absolute` says otherwise on the host.
        if rel_path.len() > 1 && rel_path.chars().nth(1) == Some(':') {
            return false;
        }
        let normalized = Self::normalize(rel_path);
        !Path::new(&normalized).is_absolute() && !normalized.split('/').any(|seg| seg == ".." || seg == ".")
    }

    /// True when `name` is usable as exactly one directory name.
    pub fn is_single_component(name: &str) -> bool {
        !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && Self::verify_safe(name)
    }
}
