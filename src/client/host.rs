// src/client/host.rs

//! Host detection: distro ID and machine architecture

use super::{ClientError, ClientResult};
use std::path::Path;

const OS_RELEASE: &str = "/etc/os-release";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Host {
    pub distro: String,
    /// Raw machine name such as `x86_64`; the server maps aliases
    pub architecture: String,
}

impl Host {
    pub fn new(distro: impl Into<String>, architecture: impl Into<String>) -> Self {
        Self {
            distro: distro.into(),
            architecture: architecture.into(),
        }
    }

    /// Detect the running host
    pub fn detect() -> ClientResult<Self> {
        Self::detect_from(Path::new(OS_RELEASE))
    }

    pub fn detect_from(os_release: &Path) -> ClientResult<Self> {
        let content = std::fs::read_to_string(os_release)?;
        let distro = parse_os_release_id(&content).ok_or_else(|| {
            ClientError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("No ID= line in {}", os_release.display()),
            ))
        })?;
        Ok(Self::new(distro, std::env::consts::ARCH))
    }
}

/// Value of the `ID=` line, unquoted
pub fn parse_os_release_id(content: &str) -> Option<String> {
    content
        .lines()
        .find_map(|line| line.trim().strip_prefix("ID="))
        .map(|value| value.trim().trim_matches(|c| c == '"' || c == '\'').to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_os_release() {
        let content = "NAME=\"Ubuntu\"\nVERSION_ID=\"24.04\"\nID=ubuntu\nID_LIKE=debian\n";
        assert_eq!(parse_os_release_id(content).as_deref(), Some("ubuntu"));

        assert_eq!(
            parse_os_release_id("ID=\"fedora\"\n").as_deref(),
            Some("fedora")
        );
        assert_eq!(parse_os_release_id("ID_LIKE=debian\n"), None);
        assert_eq!(parse_os_release_id("ID=\n"), None);
    }

    #[test]
    fn test_detect_from_file() {
        let file = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(file.path(), "ID=arch\n").unwrap();

        let host = Host::detect_from(file.path()).unwrap();
        assert_eq!(host.distro, "arch");
        assert_eq!(host.architecture, std::env::consts::ARCH);
    }
}
