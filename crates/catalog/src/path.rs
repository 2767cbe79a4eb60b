//! Path validation for paths reported by external tools.

use crate::error::{ErrorKind, Result};
use std::path::{Component, Path, PathBuf};

/// Normalizes a path relative to the dataset root.
///
/// `.` and empty components are dropped and `..` is resolved, but the result
/// may never leave the root. Absolute paths, Windows prefixes and null bytes
/// are rejected.
///
/// ```
/// use std::path::Path;
/// use gearbase_catalog::validate_path;
/// assert_eq!(validate_path("software//./serum.yaml").unwrap(), Path::new("software/serum.yaml"));
/// assert!(validate_path("../secrets.yaml").is_err());
/// assert!(validate_path("/etc/passwd").is_err());
/// ```
pub fn validate(path: impl AsRef<Path>) -> Result<PathBuf> {
    let original = path.as_ref();
    let invalid = || ErrorKind::InvalidPath(original.to_path_buf());
    let mut components = Vec::new();
    for component in original.components() {
        match component {
            Component::Normal(s) => {
                if s.as_encoded_bytes().contains(&0) {
                    exn::bail!(invalid());
                }
                components.push(s)
            },
            Component::CurDir => {},
            Component::RootDir | Component::Prefix(_) => exn::bail!(invalid()),
            Component::ParentDir => {
                if components.pop().is_none() {
                    exn::bail!(invalid());
                }
            },
        }
    }
    match components.is_empty() {
        true => exn::bail!(invalid()),
        false => Ok(components.into_iter().collect()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("software/serum.yaml", "software/serum.yaml")]
    #[case("software//serum.yaml", "software/serum.yaml")]
    #[case("./hardware/./op-1.yaml", "hardware/op-1.yaml")]
    #[case("software/x/../serum.yaml", "software/serum.yaml")]
    #[case("manufacturers/", "manufacturers")]
    fn test_valid(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(validate(input).unwrap(), Path::new(expected));
    }

    #[rstest]
    #[case("")]
    #[case(".")]
    #[case("..")]
    #[case("../software/serum.yaml")]
    #[case("software/../../serum.yaml")]
    #[case("/software/serum.yaml")]
    #[case("soft\0ware/serum.yaml")]
    fn test_invalid(#[case] input: &str) {
        assert!(validate(input).is_err());
    }
}
