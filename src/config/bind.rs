use std::path::{Path, PathBuf};

use super::{BindMode, VolumeBind};
use crate::error::{LaunchError, Result};

/// Resolves `path` to an absolute, symlink-free path. The path must exist.
pub fn resolve_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    std::fs::canonicalize(path).map_err(|e| {
        LaunchError::invalid_bind(path.display().to_string(), format!("cannot resolve path: {e}"))
    })
}

/// Default mount point for a host path: `/root/<basename>`.
pub(crate) fn default_container_path(token: &str, host: &Path) -> Result<String> {
    let name = host
        .file_name()
        .ok_or_else(|| LaunchError::invalid_bind(token, "host path has no file name"))?;
    Ok(format!("/root/{}", name.to_string_lossy()))
}

fn split_pair<'a>(token: &'a str) -> Result<(&'a str, Option<&'a str>)> {
    let mut parts = token.split(':');
    let first = parts.next().unwrap_or_default();
    let second = parts.next();
    if parts.next().is_some() {
        return Err(LaunchError::invalid_bind(token, "expected at most one ':' separator"));
    }
    if first.is_empty() || second.is_some_and(str::is_empty) {
        return Err(LaunchError::invalid_bind(token, "empty segment"));
    }
    Ok((first, second))
}

/// Parses a `host[:container]` data token into a bind mount.
pub fn parse_data(token: &str) -> Result<VolumeBind> {
    let (host, container) = split_pair(token)?;
    let host = resolve_path(host)?;
    let container = match container {
        Some(container) => container.to_string(),
        None => default_container_path(token, &host)?,
    };

    Ok(VolumeBind {
        host,
        container,
        mode: BindMode::Rw,
    })
}

fn parse_port_number(token: &str, value: &str) -> Result<u16> {
    match value.parse::<u16>() {
        Ok(0) | Err(_) => Err(LaunchError::invalid_bind(
            token,
            format!("'{value}' is not a valid port number"),
        )),
        Ok(port) => Ok(port),
    }
}

/// Parses a `host[:container]` port token. Returns `(host, container)`.
pub fn parse_port(token: &str) -> Result<(u16, u16)> {
    let (host, container) = split_pair(token)?;
    let host = parse_port_number(token, host)?;
    let container = match container {
        Some(container) => parse_port_number(token, container)?,
        None => host,
    };
    Ok((host, container))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_data_defaults_container_path_to_basename() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::create_dir(dir.path().join("demos")).unwrap();

        // Relative segments are resolved away before the basename is taken.
        let token = format!("{}/demos/../data", dir.path().display());
        let bind = parse_data(&token).unwrap();

        assert_eq!(bind.host, dir.path().join("data").canonicalize().unwrap());
        assert_eq!(bind.container, "/root/data");
        assert_eq!(bind.mode, BindMode::Rw);
    }

    #[test]
    fn test_data_keeps_explicit_container_path() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();

        let token = format!("{}/data:/root/data2", dir.path().display());
        let bind = parse_data(&token).unwrap();

        assert_eq!(bind.container, "/root/data2");
        assert!(bind.host.is_absolute());
    }

    #[test]
    fn test_data_rejects_missing_host() {
        let dir = TempDir::new().unwrap();
        let token = format!("{}/nope", dir.path().display());
        let err = parse_data(&token).unwrap_err();
        assert!(matches!(err, LaunchError::InvalidBindSpec { .. }));
    }

    #[test]
    fn test_data_rejects_malformed_tokens() {
        for token in ["a:b:c", ":/root/x", "/tmp:", ""] {
            let err = parse_data(token).unwrap_err();
            assert!(
                matches!(err, LaunchError::InvalidBindSpec { .. }),
                "token {token:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_data_rejects_root_without_basename() {
        let err = parse_data("/").unwrap_err();
        assert!(err.to_string().contains("no file name"));
    }

    #[test]
    fn test_bare_port_maps_to_itself() {
        assert_eq!(parse_port("5555").unwrap(), (5555, 5555));
    }

    #[test]
    fn test_port_pair() {
        assert_eq!(parse_port("8080:9090").unwrap(), (8080, 9090));
    }

    #[test]
    fn test_port_rejects_garbage() {
        for token in ["http", "0", "70000", "1:2:3", "80:", ":80"] {
            assert!(parse_port(token).is_err(), "token {token:?} should be rejected");
        }
    }

    #[test]
    fn test_bind_string_includes_mode() {
        let bind = VolumeBind {
            host: PathBuf::from("/x/data"),
            container: "/root/data".to_string(),
            mode: BindMode::Ro,
        };
        assert_eq!(bind.to_bind(), "/x/data:/root/data:ro");
        assert_eq!(bind.to_string(), "/x/data:/root/data:ro");
    }
}
