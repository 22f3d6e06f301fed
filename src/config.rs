// config.rs - Configuration handling

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use log::{debug, info};
use tokio::fs;

use crate::exception::HerdstatError;

pub const DEFAULT_HERDS_URL: &str = "https://api.gentoo.org/packages/herds.xml";
pub const DEFAULT_PORTDIR: &str = "/usr/portage";
pub const DEFAULT_MAXCOL: usize = 78;

const MAKE_CONF_PATHS: [&str; 2] = ["etc/make.conf", "etc/portage/make.conf"];

#[derive(Debug, Clone)]
pub struct Config {
    /// Path or URL of herds.xml.
    pub herds_xml: String,
    pub portdir: PathBuf,
    /// Usable output width.
    pub maxcol: usize,
    pub make_conf: HashMap<String, String>,
}

impl Config {
    /// Read make.conf below `root` and the process environment.
    /// `herds_xml` (from `--herdsxml`) takes precedence over `HERDS`.
    pub async fn load(root: &str, herds_xml: Option<&str>) -> Result<Self, HerdstatError> {
        let mut make_conf = HashMap::new();
        for rel in MAKE_CONF_PATHS {
            let path = Path::new(root).join(rel);
            if path.exists() {
                debug!("reading {}", path.display());
                let content = fs::read_to_string(&path).await?;
                Self::parse_config_file(&content, &mut make_conf);
            }
        }

        Ok(Self::from_lookup(herds_xml, make_conf, |key| std::env::var(key).ok()))
    }

    /// Build a config from already-parsed make.conf values and a variable lookup.
    pub fn from_lookup<F>(herds_xml: Option<&str>, make_conf: HashMap<String, String>, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let herds_xml = match herds_xml
            .map(|location| location.to_string())
            .or_else(|| lookup("HERDS"))
            .filter(|v| !v.is_empty())
        {
            Some(location) => location,
            None => {
                info!("HERDS environment variable is not set, using {}", DEFAULT_HERDS_URL);
                DEFAULT_HERDS_URL.to_string()
            }
        };

        let portdir = lookup("PORTDIR")
            .filter(|v| !v.is_empty())
            .or_else(|| make_conf.get("PORTDIR").cloned())
            .unwrap_or_else(|| DEFAULT_PORTDIR.to_string());

        let maxcol = lookup("COLUMNS")
            .and_then(|cols| cols.trim().parse::<usize>().ok())
            .filter(|&cols| cols > 2)
            .map(|cols| cols - 2)
            .unwrap_or(DEFAULT_MAXCOL);

        Config {
            herds_xml,
            portdir: PathBuf::from(portdir),
            maxcol,
            make_conf,
        }
    }

    fn parse_config_file(content: &str, map: &mut HashMap<String, String>) {
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().trim_start_matches("export ").trim().to_string();
                let value = value.trim().trim_matches(|c| c == '"' || c == '\'').to_string();
                map.insert(key, value);
            }
        }
    }
}
