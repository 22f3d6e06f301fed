// porttree.rs -- Package lookups in the local ebuild repository

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::exception::HerdstatError;
use crate::xml::metadata::MetadataXml;

#[derive(Debug, Clone)]
pub struct PortTree {
    pub portdir: PathBuf,
}

impl PortTree {
    pub fn new(portdir: impl Into<PathBuf>) -> Self {
        PortTree {
            portdir: portdir.into(),
        }
    }

    /// Category directories: anything shaped like `app-foo`, plus `virtual`.
    pub fn categories(&self) -> Result<Vec<PathBuf>, HerdstatError> {
        let mut categories = Vec::new();
        for entry in fs::read_dir(&self.portdir)? {
            let path = entry?.path();
            if !path.is_dir() {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                if name.contains('-') || name == "virtual" {
                    categories.push(path);
                }
            }
        }
        categories.sort();
        Ok(categories)
    }

    /// Every `category/package` whose metadata.xml lists `herd`, sorted.
    pub fn herd_packages(&self, herd: &str) -> Result<Vec<String>, HerdstatError> {
        let mut packages = Vec::new();

        for category in self.categories()? {
            let Ok(entries) = fs::read_dir(&category) else {
                warn!("unable to read {}", category.display());
                continue;
            };

            for entry in entries.flatten() {
                let metadata_path = entry.path().join("metadata.xml");
                if !metadata_path.is_file() {
                    continue;
                }
                if Self::metadata_lists_herd(&metadata_path, herd) {
                    if let Some(cp) = Self::package_name(&metadata_path) {
                        packages.push(cp);
                    }
                }
            }
        }

        packages.sort();
        debug!("{} packages found for herd {}", packages.len(), herd);
        Ok(packages)
    }

    /// Resolve `cat/pkg` or a bare `pkg` to the matching `category/package` names.
    pub fn find_package(&self, name: &str) -> Result<Vec<String>, HerdstatError> {
        if name.contains('/') {
            let found = self.portdir.join(name).join("metadata.xml").is_file();
            return Ok(if found { vec![name.to_string()] } else { Vec::new() });
        }

        let mut matches = Vec::new();
        for category in self.categories()? {
            if category.join(name).join("metadata.xml").is_file() {
                if let Some(cat) = category.file_name().and_then(|n| n.to_str()) {
                    matches.push(format!("{}/{}", cat, name));
                }
            }
        }
        Ok(matches)
    }

    /// Parse the metadata.xml of `category/package`.
    pub fn metadata(&self, cp: &str) -> Result<MetadataXml, HerdstatError> {
        let path = self.portdir.join(cp).join("metadata.xml");
        let content = fs::read(&path)?;
        MetadataXml::from_bytes(&content)
    }

    fn metadata_lists_herd(path: &Path, herd: &str) -> bool {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) => {
                warn!("failed to read {}: {}", path.display(), e);
                return false;
            }
        };

        match MetadataXml::from_bytes(&content) {
            Ok(metadata) => metadata.belongs_to(herd),
            Err(e) => {
                warn!("skipping {}: {}", path.display(), e);
                false
            }
        }
    }

    /// `<portdir>/cat/pkg/metadata.xml` -> `cat/pkg`
    fn package_name(metadata_path: &Path) -> Option<String> {
        let pkg_dir = metadata_path.parent()?;
        let pkg = pkg_dir.file_name()?.to_str()?;
        let cat = pkg_dir.parent()?.file_name()?.to_str()?;
        Some(format!("{}/{}", cat, pkg))
    }
}
