// herds.rs -- herds.xml content handler

use std::io::BufRead;

use indexmap::IndexMap;
use log::{debug, trace};

use super::{XmlHandler, parse_xml};
use crate::exception::HerdstatError;

/// Developer email -> extra info (name, then role when present).
pub type Developers = IndexMap<String, Vec<String>>;

/// Where the builder currently is inside herds.xml.
///
/// `name` and `email` occur both under `<herd>` and under `<maintainer>`;
/// which one an element is depends only on whether a maintainer is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Herd,
    HerdName,
    HerdEmail,
    HerdDescription,
    Maintainer,
    MaintainerName,
    MaintainerEmail,
    MaintainerRole,
    Other,
}

/// Builds a [`HerdRegistry`] from herds.xml events.
///
/// One builder handles exactly one document; call [`finish`](Self::finish)
/// once the event stream has ended.
#[derive(Debug, Default)]
pub struct HerdRegistryBuilder {
    stack: Vec<Context>,
    current_herd: Option<String>,
    current_dev: Option<String>,
    herds: IndexMap<String, Developers>,
    descriptions: IndexMap<String, String>,
}

impl HerdRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn inside(&self, ctx: Context) -> bool {
        self.stack.contains(&ctx)
    }

    fn classify(&self, tag: &str) -> Context {
        let in_maintainer = self.inside(Context::Maintainer);
        match tag {
            "herd" => Context::Herd,
            "maintainer" => Context::Maintainer,
            "name" if in_maintainer => Context::MaintainerName,
            "email" if in_maintainer => Context::MaintainerEmail,
            "role" => Context::MaintainerRole,
            "name" => Context::HerdName,
            "email" => Context::HerdEmail,
            "description" if !in_maintainer => Context::HerdDescription,
            _ => Context::Other,
        }
    }

    fn current_developers(&mut self) -> Option<&mut Developers> {
        let herd = self.current_herd.as_ref()?;
        self.herds.get_mut(herd)
    }

    fn current_info(&mut self) -> Option<&mut Vec<String>> {
        let dev = self.current_dev.clone()?;
        self.current_developers()?.get_mut(&dev)
    }

    pub fn finish(self) -> HerdRegistry {
        debug!("parsed {} herds from herds.xml", self.herds.len());
        HerdRegistry {
            herds: self.herds,
            descriptions: self.descriptions,
        }
    }
}

impl XmlHandler for HerdRegistryBuilder {
    fn enter(&mut self, tag: &str, _attrs: &[(String, String)]) {
        let ctx = self.classify(tag);
        self.stack.push(ctx);
    }

    fn exit(&mut self, tag: &str) {
        match self.stack.pop() {
            Some(Context::Herd) => {
                self.current_herd = None;
                self.current_dev = None;
            }
            Some(_) => {}
            None => trace!("ignoring unbalanced </{}>", tag),
        }
    }

    fn text(&mut self, content: &str) {
        match self.stack.last().copied() {
            Some(Context::HerdName) if self.inside(Context::Herd) => {
                self.current_herd = Some(content.to_string());
                self.current_dev = None;
                self.herds.insert(content.to_string(), Developers::new());
            }
            Some(Context::HerdDescription) => {
                if let Some(herd) = self.current_herd.clone() {
                    self.descriptions.insert(herd, content.to_string());
                }
            }
            Some(Context::MaintainerEmail) => {
                if let Some(devs) = self.current_developers() {
                    devs.insert(content.to_string(), Vec::new());
                    self.current_dev = Some(content.to_string());
                } else {
                    trace!("maintainer {} outside of a named herd", content);
                }
            }
            Some(Context::MaintainerName) | Some(Context::MaintainerRole) => {
                if let Some(info) = self.current_info() {
                    info.push(content.to_string());
                }
            }
            _ => {}
        }
    }
}

/// Parsed herds.xml: herd -> developers, and herd -> description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HerdRegistry {
    herds: IndexMap<String, Developers>,
    descriptions: IndexMap<String, String>,
}

impl HerdRegistry {
    /// Parse a complete herds.xml document. Nothing is returned unless the
    /// whole document is well-formed.
    pub fn parse<R: BufRead>(source: R) -> Result<Self, HerdstatError> {
        let mut builder = HerdRegistryBuilder::new();
        parse_xml(source, &mut builder)?;
        Ok(builder.finish())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, HerdstatError> {
        Self::parse(bytes)
    }

    pub fn herds(&self) -> &IndexMap<String, Developers> {
        &self.herds
    }

    pub fn descriptions(&self) -> &IndexMap<String, String> {
        &self.descriptions
    }

    pub fn herd(&self, name: &str) -> Option<&Developers> {
        self.herds.get(name)
    }

    pub fn description(&self, name: &str) -> Option<&str> {
        self.descriptions.get(name).map(|s| s.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.herds.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.herds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.herds.is_empty()
    }

    /// Total developer entries across all herds (a developer in two herds counts twice).
    pub fn developer_count(&self) -> usize {
        self.herds.values().map(|devs| devs.len()).sum()
    }

    /// Herds listing `dev`, matching either the exact key or `dev@gentoo.org`.
    pub fn herds_of(&self, dev: &str) -> Vec<&str> {
        let email = format!("{}@gentoo.org", dev);
        self.herds
            .iter()
            .filter(|(_, devs)| devs.contains_key(&email) || devs.contains_key(dev))
            .map(|(herd, _)| herd.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<herds>
  <herd>
    <name>a</name>
    <email>a@gentoo.org</email>
    <description>D</description>
    <maintainer>
      <email>x@y</email>
      <name>X</name>
      <role>R</role>
    </maintainer>
  </herd>
</herds>
"#;

    fn parse(doc: &str) -> HerdRegistry {
        HerdRegistry::from_bytes(doc.as_bytes()).unwrap()
    }

    #[test]
    fn test_single_herd_with_maintainer() {
        let reg = parse(SAMPLE);

        assert_eq!(reg.herds()["a"]["x@y"], vec!["X", "R"]);
        assert_eq!(reg.descriptions()["a"], "D");
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_herd_name_not_confused_with_maintainer_name() {
        let reg = parse(
            r#"<herds><herd>
                <name>tools</name>
                <maintainer><email>dev@gentoo.org</email><name>Some Dev</name></maintainer>
            </herd></herds>"#,
        );

        assert!(reg.contains("tools"));
        assert!(!reg.contains("Some Dev"));
        assert_eq!(reg.herd("tools").unwrap()["dev@gentoo.org"], vec!["Some Dev"]);
    }

    #[test]
    fn test_herd_email_is_not_a_developer() {
        let reg = parse(
            "<herds><herd><name>h</name><email>h@gentoo.org</email></herd></herds>",
        );
        assert!(reg.herd("h").unwrap().is_empty());
    }

    #[test]
    fn test_independent_herds() {
        let reg = parse(
            r#"<herds>
              <herd><name>one</name>
                <maintainer><email>dup@gentoo.org</email><name>First</name></maintainer>
              </herd>
              <herd><name>two</name>
                <maintainer><email>dup@gentoo.org</email><name>Second</name><role>lead</role></maintainer>
                <maintainer><email>other@gentoo.org</email></maintainer>
              </herd>
            </herds>"#,
        );

        assert_eq!(reg.herd("one").unwrap().len(), 1);
        assert_eq!(reg.herd("two").unwrap().len(), 2);
        assert_eq!(reg.herds()["one"]["dup@gentoo.org"], vec!["First"]);
        assert_eq!(reg.herds()["two"]["dup@gentoo.org"], vec!["Second", "lead"]);
        assert_eq!(reg.developer_count(), 3);
    }

    #[test]
    fn test_maintainer_with_email_only() {
        let reg = parse(
            "<herds><herd><name>h</name><maintainer><email>solo@gentoo.org</email></maintainer></herd></herds>",
        );
        assert!(reg.herds()["h"]["solo@gentoo.org"].is_empty());
    }

    #[test]
    fn test_redeclared_herd_resets_developers() {
        let reg = parse(
            r#"<herds>
              <herd><name>h</name><maintainer><email>old@gentoo.org</email></maintainer></herd>
              <herd><name>h</name><maintainer><email>new@gentoo.org</email></maintainer></herd>
            </herds>"#,
        );

        let devs = reg.herd("h").unwrap();
        assert!(!devs.contains_key("old@gentoo.org"));
        assert!(devs.contains_key("new@gentoo.org"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_truncated_document_yields_no_registry() {
        let result = HerdRegistry::from_bytes(b"<herds><herd><name>a</name><maintainer>");
        assert!(matches!(result, Err(HerdstatError::Parse(_))));
    }

    #[test]
    fn test_parsing_twice_is_equal() {
        assert_eq!(parse(SAMPLE), parse(SAMPLE));
    }

    #[test]
    fn test_maintainer_outside_named_herd_is_ignored() {
        let reg = parse(
            r#"<herds>
              <herd><name>a</name></herd>
              <herd><maintainer><email>stray@gentoo.org</email><name>Stray</name></maintainer></herd>
            </herds>"#,
        );

        assert!(reg.herd("a").unwrap().is_empty());
        assert_eq!(reg.developer_count(), 0);
    }

    #[test]
    fn test_name_outside_herd_is_ignored() {
        let reg = parse("<herds><name>loose</name></herds>");
        assert!(reg.is_empty());
    }

    #[test]
    fn test_name_before_email_goes_to_previous_developer() {
        let reg = parse(
            r#"<herds><herd><name>h</name>
              <maintainer><email>first@gentoo.org</email><name>First</name></maintainer>
              <maintainer><name>Second</name><email>second@gentoo.org</email></maintainer>
            </herd></herds>"#,
        );

        assert_eq!(reg.herds()["h"]["first@gentoo.org"], vec!["First", "Second"]);
        assert!(reg.herds()["h"]["second@gentoo.org"].is_empty());
    }

    #[test]
    fn test_role_after_maintainer_closes() {
        let reg = parse(
            "<herds><herd><name>h</name><maintainer><email>x</email></maintainer><role>R</role></herd></herds>",
        );
        assert_eq!(reg.herds()["h"]["x"], vec!["R"]);
    }

    #[test]
    fn test_role_outside_herd_is_ignored() {
        let reg = parse(
            r#"<herds>
              <herd><name>h</name><maintainer><email>x</email></maintainer></herd>
              <role>R</role>
            </herds>"#,
        );
        assert!(reg.herds()["h"]["x"].is_empty());
    }

    #[test]
    fn test_events_driven_directly() {
        let mut builder = HerdRegistryBuilder::new();
        builder.enter("herds", &[]);
        builder.enter("herd", &[]);
        builder.enter("name", &[]);
        builder.text("direct");
        builder.exit("name");
        builder.enter("maintainer", &[]);
        builder.enter("email", &[]);
        builder.text("d@gentoo.org");
        builder.exit("email");
        builder.enter("role", &[]);
        builder.text("member");
        builder.exit("role");
        builder.exit("maintainer");
        builder.exit("herd");
        builder.exit("herds");

        let reg = builder.finish();
        assert_eq!(reg.herds()["direct"]["d@gentoo.org"], vec!["member"]);
        assert!(reg.description("direct").is_none());
    }

    #[test]
    fn test_herds_of() {
        let reg = parse(
            r#"<herds>
              <herd><name>one</name><maintainer><email>nick@gentoo.org</email></maintainer></herd>
              <herd><name>two</name><maintainer><email>nick</email></maintainer></herd>
              <herd><name>three</name><maintainer><email>else@gentoo.org</email></maintainer></herd>
            </herds>"#,
        );

        assert_eq!(reg.herds_of("nick"), vec!["one", "two"]);
        assert_eq!(reg.herds_of("nick@gentoo.org"), vec!["one"]);
        assert!(reg.herds_of("nobody").is_empty());
    }
}
