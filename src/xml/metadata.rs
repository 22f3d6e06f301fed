// metadata.rs -- Package metadata.xml parsing

use std::io::BufRead;

use super::{XmlHandler, parse_xml};
use crate::exception::HerdstatError;

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Maintainer {
    pub email: Option<String>,
    pub name: Option<String>,
    pub description: Option<String>,
}

/// The parts of a package's metadata.xml herdstat cares about.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MetadataXml {
    pub herds: Vec<String>,
    pub maintainers: Vec<Maintainer>,
    /// English (or untagged) `<longdescription>`.
    pub longdescription: Option<String>,
}

impl MetadataXml {
    pub fn parse<R: BufRead>(source: R) -> Result<Self, HerdstatError> {
        let mut handler = MetadataHandler::default();
        parse_xml(source, &mut handler)?;
        Ok(handler.metadata)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HerdstatError> {
        Self::parse(bytes)
    }

    pub fn belongs_to(&self, herd: &str) -> bool {
        self.herds.iter().any(|h| h == herd)
    }
}

#[derive(Default)]
struct MetadataHandler {
    path: Vec<String>,
    in_longdesc: bool,
    metadata: MetadataXml,
}

impl MetadataHandler {
    fn under(&self, parents: &[&str]) -> bool {
        self.path.len() == parents.len() && self.path.iter().zip(parents).all(|(a, b)| a == b)
    }
}

impl XmlHandler for MetadataHandler {
    fn enter(&mut self, tag: &str, attrs: &[(String, String)]) {
        self.path.push(tag.to_string());

        if self.under(&["pkgmetadata", "maintainer"]) {
            self.metadata.maintainers.push(Maintainer::default());
        } else if self.under(&["pkgmetadata", "longdescription"]) {
            let lang = attrs.iter().find(|(k, _)| k == "lang").map(|(_, v)| v.as_str());
            self.in_longdesc = matches!(lang, None | Some("en"));
            if self.in_longdesc {
                // a later English block replaces an earlier one
                self.metadata.longdescription = None;
            }
        }
    }

    fn exit(&mut self, _tag: &str) {
        if self.under(&["pkgmetadata", "longdescription"]) {
            self.in_longdesc = false;
        }
        self.path.pop();
    }

    fn text(&mut self, content: &str) {
        // only <pkgmetadata><herd>, not herds mentioned deeper (e.g. upstream docs)
        if self.under(&["pkgmetadata", "herd"]) {
            self.metadata.herds.push(content.to_string());
        } else if self.in_longdesc {
            let desc = self.metadata.longdescription.get_or_insert_with(String::new);
            if !desc.is_empty() {
                desc.push(' ');
            }
            desc.push_str(content);
        } else if self.path.len() == 3 && self.path[..2] == ["pkgmetadata", "maintainer"] {
            let Some(maintainer) = self.metadata.maintainers.last_mut() else {
                return;
            };
            match self.path[2].as_str() {
                "email" => maintainer.email = Some(content.to_string()),
                "name" => maintainer.name = Some(content.to_string()),
                "description" => maintainer.description = Some(content.to_string()),
                _ => {}
            }
        }
    }
}
