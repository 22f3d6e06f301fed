// fetcher.rs -- Retrieval of herds.xml from a local file or a URL

use log::{debug, info};
use tokio::fs;
use tokio::process::Command;

use crate::exception::HerdstatError;
use crate::xml::herds::HerdRegistry;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HerdsSource {
    Path(String),
    Url(String),
}

impl HerdsSource {
    pub fn from_location(location: &str) -> Self {
        if ["http://", "https://", "ftp://"]
            .iter()
            .any(|scheme| location.starts_with(scheme))
        {
            HerdsSource::Url(location.to_string())
        } else {
            HerdsSource::Path(location.to_string())
        }
    }

    pub fn location(&self) -> &str {
        match self {
            HerdsSource::Path(p) => p,
            HerdsSource::Url(u) => u,
        }
    }

    /// Read the raw document.
    pub async fn fetch(&self) -> Result<Vec<u8>, HerdstatError> {
        match self {
            HerdsSource::Path(path) => {
                debug!("reading {}", path);
                fs::read(path)
                    .await
                    .map_err(|e| HerdstatError::retrieval(path, e))
            }
            HerdsSource::Url(url) => {
                info!("retrieving {}", url);
                let output = Command::new("wget")
                    .arg("--quiet")
                    .arg("--tries=1")
                    .arg("--timeout=60")
                    .arg("-O")
                    .arg("-")
                    .arg(url)
                    .output()
                    .await
                    .map_err(|e| HerdstatError::retrieval(url, format!("failed to execute wget: {}", e)))?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    let reason = if stderr.trim().is_empty() {
                        format!("wget exited with {}", output.status)
                    } else {
                        stderr.trim().to_string()
                    };
                    return Err(HerdstatError::retrieval(url, reason));
                }

                Ok(output.stdout)
            }
        }
    }
}

/// Fetch and parse herds.xml in one go.
pub async fn load_registry(source: &HerdsSource) -> Result<HerdRegistry, HerdstatError> {
    let bytes = source.fetch().await?;
    debug!("{} bytes read from {}", bytes.len(), source.location());
    HerdRegistry::from_bytes(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_location() {
        assert_eq!(
            HerdsSource::from_location("https://api.gentoo.org/packages/herds.xml"),
            HerdsSource::Url("https://api.gentoo.org/packages/herds.xml".to_string())
        );
        assert_eq!(
            HerdsSource::from_location("ftp://mirror/herds.xml"),
            HerdsSource::Url("ftp://mirror/herds.xml".to_string())
        );
        assert_eq!(
            HerdsSource::from_location("/usr/portage/metadata/herds.xml"),
            HerdsSource::Path("/usr/portage/metadata/herds.xml".to_string())
        );
        // a file that merely starts with "http"
        assert_eq!(
            HerdsSource::from_location("httpd-herds.xml"),
            HerdsSource::Path("httpd-herds.xml".to_string())
        );
    }

    #[tokio::test]
    async fn test_load_registry_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("herds.xml");
        std::fs::write(
            &path,
            "<herds><herd><name>x11</name><description>X</description></herd></herds>",
        )
        .unwrap();

        let source = HerdsSource::from_location(path.to_str().unwrap());
        let registry = load_registry(&source).await.unwrap();
        assert_eq!(registry.description("x11"), Some("X"));
    }

    #[tokio::test]
    async fn test_missing_file_is_retrieval_error() {
        let source = HerdsSource::Path("/nonexistent/herds.xml".to_string());
        match source.fetch().await {
            Err(HerdstatError::Retrieval { location, .. }) => {
                assert_eq!(location, "/nonexistent/herds.xml")
            }
            other => panic!("Expected retrieval error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_malformed_file_is_parse_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("herds.xml");
        std::fs::write(&path, "<herds><herd>").unwrap();

        let source = HerdsSource::from_location(path.to_str().unwrap());
        assert!(matches!(load_registry(&source).await, Err(HerdstatError::Parse(_))));
    }
}
