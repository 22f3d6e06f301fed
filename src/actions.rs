// actions.rs -- herd, developer and package reports

use std::collections::BTreeSet;

use log::debug;
use regex::RegexBuilder;
use thiserror::Error;

use crate::config::Config;
use crate::exception::HerdstatError;
use crate::fetcher::{HerdsSource, load_registry};
use crate::output::Formatter;
use crate::porttree::PortTree;
use crate::xml::herds::HerdRegistry;

/// Target that lists every herd instead of a single one.
pub const ALL_HERDS: &str = "all";

#[derive(Debug, Clone)]
pub struct Options {
    pub verbose: bool,
    pub quiet: bool,
    /// Only print the number of results.
    pub count: bool,
    /// List a herd's packages instead of its members.
    pub package: bool,
    /// Targets are developers, not herds.
    pub dev: bool,
    /// Targets are packages; show their metadata.xml.
    pub metadata: bool,
    /// The single target is a case-insensitive regular expression.
    pub regex: bool,
    pub colors: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            verbose: false,
            quiet: false,
            count: false,
            package: false,
            dev: false,
            metadata: false,
            regex: false,
            colors: true,
        }
    }
}

impl Options {
    /// Bare values, one per line (`--quiet`, and what `--count` counts).
    fn raw(&self) -> bool {
        self.quiet || self.count
    }
}

/// A single target that could not be reported. Other targets still are.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("Herd '{0}' was not found in herds.xml.")]
    HerdNotFound(String),
    #[error("'{0}' doesn't seem to belong to any herds.")]
    NoHerds(String),
    #[error("The 'all' target cannot be combined with other herds.")]
    AllWithOthers,
    #[error("You may only specify one regular expression.")]
    TooManyRegex,
    #[error("Invalid regular expression: {0}")]
    BadRegex(#[from] regex::Error),
    #[error("No {kind} match '{pattern}'.")]
    NoMatch { kind: &'static str, pattern: String },
    #[error("Package '{0}' was not found.")]
    PackageNotFound(String),
    #[error("Package '{name}' is ambiguous: {}", .candidates.join(" "))]
    Ambiguous { name: String, candidates: Vec<String> },
    #[error("!!! {0}")]
    Failed(#[from] HerdstatError),
}

/// Load herds.xml from the configured location and report on `targets`.
pub async fn run(config: &Config, options: &Options, targets: &[String]) -> i32 {
    let fm = Formatter::new(config.maxcol, options.colors);

    if options.metadata {
        return action_metadata(config, options, targets);
    }

    let source = HerdsSource::from_location(&config.herds_xml);
    let registry = match load_registry(&source).await {
        Ok(registry) => registry,
        Err(e) => {
            eprintln!("{}", fm.error(&format!("!!! {}", e)));
            return 1;
        }
    };

    let targets = match regex_targets(&registry, options, targets) {
        Ok(targets) => targets,
        Err(e) => {
            eprintln!("{}", fm.error(&e.to_string()));
            return 1;
        }
    };

    if options.dev {
        action_devs(config, options, &registry, &targets)
    } else {
        action_herds(config, options, &registry, &targets)
    }
}

/// With `--regex`, replace the single pattern by every herd (or developer
/// with `--dev`) it matches. Otherwise the targets are returned unchanged.
pub fn regex_targets(
    registry: &HerdRegistry,
    options: &Options,
    targets: &[String],
) -> Result<Vec<String>, ActionError> {
    if !options.regex {
        return Ok(targets.to_vec());
    }

    let [pattern] = targets else {
        return Err(ActionError::TooManyRegex);
    };
    let re = RegexBuilder::new(pattern).case_insensitive(true).build()?;

    let (kind, candidates): (&'static str, BTreeSet<&str>) = if options.dev {
        let devs: BTreeSet<&str> = registry
            .herds()
            .values()
            .flat_map(|devs| devs.keys())
            .map(|dev| dev.as_str())
            .collect();
        ("developers", devs)
    } else {
        ("herds", registry.herds().keys().map(|h| h.as_str()).collect())
    };

    let matched: Vec<String> = candidates
        .into_iter()
        .filter(|c| re.is_match(c))
        .map(|c| c.to_string())
        .collect();
    debug!("/{}/ matched {} {}", pattern, matched.len(), kind);

    if matched.is_empty() {
        return Err(ActionError::NoMatch {
            kind,
            pattern: pattern.clone(),
        });
    }
    Ok(matched)
}

pub fn action_herds(config: &Config, options: &Options, registry: &HerdRegistry, herds: &[String]) -> i32 {
    let fm = Formatter::new(config.maxcol, options.colors);

    if herds.iter().any(|h| h == ALL_HERDS) {
        if herds.len() > 1 {
            eprintln!("{}", fm.error(&ActionError::AllWithOthers.to_string()));
            return 1;
        }
        let lines = all_herds_lines(registry, options, &fm);
        if options.count {
            println!("{}", lines.len());
        } else {
            print_lines(&lines);
        }
        return 0;
    }

    report_each(herds, options, &fm, |herd| herd_lines(config, options, registry, herd, &fm))
}

pub fn action_devs(config: &Config, options: &Options, registry: &HerdRegistry, devs: &[String]) -> i32 {
    let fm = Formatter::new(config.maxcol, options.colors);
    report_each(devs, options, &fm, |dev| dev_lines(options, registry, dev, &fm))
}

/// Show herds and maintainers from the metadata.xml of each package.
pub fn action_metadata(config: &Config, options: &Options, packages: &[String]) -> i32 {
    let fm = Formatter::new(config.maxcol, options.colors);
    let tree = PortTree::new(&config.portdir);
    report_each(packages, options, &fm, |pkg| metadata_lines(&tree, options, pkg, &fm))
}

fn report_each<F>(targets: &[String], options: &Options, fm: &Formatter, mut lines_for: F) -> i32
where
    F: FnMut(&str) -> Result<Vec<String>, ActionError>,
{
    let mut status = 0;
    let mut total = 0;

    for (n, target) in targets.iter().enumerate() {
        match lines_for(target.as_str()) {
            Ok(lines) if options.count => total += lines.len(),
            Ok(lines) => print_lines(&lines),
            Err(e) => {
                eprintln!("{}", fm.error(&e.to_string()));
                status = 1;
            }
        }

        if n + 1 != targets.len() && !options.raw() {
            println!();
        }
    }

    if options.count {
        println!("{}", total);
    }

    status
}

fn print_lines(lines: &[String]) {
    for line in lines {
        println!("{}", line);
    }
}

fn nick(email: &str) -> &str {
    email.split('@').next().unwrap_or(email)
}

/// Report for one herd: description plus members or packages.
pub fn herd_lines(
    config: &Config,
    options: &Options,
    registry: &HerdRegistry,
    herd: &str,
    fm: &Formatter,
) -> Result<Vec<String>, ActionError> {
    let devs = registry
        .herd(herd)
        .ok_or_else(|| ActionError::HerdNotFound(herd.to_string()))?;

    let mut emails: Vec<&String> = devs.keys().collect();
    emails.sort();

    let packages = if options.package {
        let packages = PortTree::new(&config.portdir).herd_packages(herd)?;
        Some(packages)
    } else {
        None
    };

    if options.raw() {
        return Ok(match packages {
            Some(packages) => packages,
            None => emails.into_iter().cloned().collect(),
        });
    }

    let mut lines = vec![
        fm.field("Herd", herd),
        fm.field("Description", registry.description(herd).unwrap_or("")),
    ];

    if let Some(packages) = packages {
        lines.push(fm.field(&format!("Packages({})", packages.len()), ""));
        lines.extend(packages.iter().map(|pkg| fm.indented(pkg)));
        return Ok(lines);
    }

    let label = format!("Members({})", emails.len());
    if options.verbose {
        lines.push(fm.field(&label, ""));
        for (n, email) in emails.iter().enumerate() {
            if n > 0 {
                lines.push(String::new());
            }
            lines.push(fm.indented(email));
            lines.extend(devs[*email].iter().map(|info| fm.indented(info)));
        }
    } else {
        let nicks: Vec<&str> = emails.iter().map(|e| nick(e)).collect();
        lines.extend(fm.wrapped(&label, &nicks));
    }

    Ok(lines)
}

/// Every herd with the average number of developers per herd.
pub fn all_herds_lines(registry: &HerdRegistry, options: &Options, fm: &Formatter) -> Vec<String> {
    let mut names: Vec<&str> = registry.herds().keys().map(|h| h.as_str()).collect();
    names.sort();

    if options.raw() {
        return names.into_iter().map(|h| h.to_string()).collect();
    }

    let avg = if registry.is_empty() {
        0.0
    } else {
        registry.developer_count() as f64 / registry.len() as f64
    };
    debug!("{} developer entries in {} herds", registry.developer_count(), registry.len());

    let label = format!("Herds({})", names.len());
    let mut lines = Vec::new();
    if options.verbose {
        lines.push(fm.field(&label, ""));
        for (n, herd) in names.iter().enumerate() {
            if n > 0 {
                lines.push(String::new());
            }
            lines.push(fm.indented(&fm.highlight(herd)));
            if let Some(desc) = registry.description(herd) {
                lines.push(fm.indented(desc));
            }
        }
        lines.push(String::new());
    } else {
        lines.extend(fm.wrapped(&label, &names));
    }
    lines.push(fm.field("Avg devs/herd", &format!("{:.2}", avg)));

    lines
}

/// Herds a developer belongs to, given a nick or a full email address.
pub fn dev_lines(
    options: &Options,
    registry: &HerdRegistry,
    dev: &str,
    fm: &Formatter,
) -> Result<Vec<String>, ActionError> {
    let mut herds = registry.herds_of(dev);
    if herds.is_empty() {
        return Err(ActionError::NoHerds(dev.to_string()));
    }
    herds.sort();

    if options.raw() {
        return Ok(herds.into_iter().map(|h| h.to_string()).collect());
    }

    let mut lines = vec![fm.field("Developer", dev)];
    let label = format!("Herds({})", herds.len());

    if options.verbose {
        let email = format!("{}@gentoo.org", dev);
        let name = herds
            .iter()
            .filter_map(|h| registry.herd(h))
            .filter_map(|devs| devs.get(&email).or_else(|| devs.get(dev)))
            .find_map(|info| info.first());
        if let Some(name) = name {
            lines.push(fm.field("Name", name));
        }

        lines.push(fm.field(&label, ""));
        for (n, herd) in herds.iter().enumerate() {
            if n > 0 {
                lines.push(String::new());
            }
            lines.push(fm.indented(&fm.highlight(herd)));
            if let Some(desc) = registry.description(herd) {
                lines.push(fm.indented(desc));
            }
        }
    } else {
        lines.extend(fm.wrapped(&label, &herds));
    }

    Ok(lines)
}

/// Herds and maintainers recorded in a package's metadata.xml.
pub fn metadata_lines(
    tree: &PortTree,
    options: &Options,
    package: &str,
    fm: &Formatter,
) -> Result<Vec<String>, ActionError> {
    let mut found = tree.find_package(package)?;
    let cp = match found.len() {
        0 => return Err(ActionError::PackageNotFound(package.to_string())),
        1 => found.remove(0),
        _ => {
            return Err(ActionError::Ambiguous {
                name: package.to_string(),
                candidates: found,
            });
        }
    };

    let metadata = tree.metadata(&cp)?;
    let emails: Vec<&str> = metadata
        .maintainers
        .iter()
        .filter_map(|m| m.email.as_deref())
        .collect();

    if options.raw() {
        let mut lines = metadata.herds.clone();
        lines.extend(emails.iter().map(|e| e.to_string()));
        return Ok(lines);
    }

    let mut lines = vec![fm.field("Package", &cp)];
    lines.extend(fm.wrapped(&format!("Herds({})", metadata.herds.len()), &metadata.herds));

    let label = format!("Maintainers({})", metadata.maintainers.len());
    if options.verbose {
        lines.push(fm.field(&label, ""));
        for (n, maintainer) in metadata.maintainers.iter().enumerate() {
            if n > 0 {
                lines.push(String::new());
            }
            let details = [&maintainer.email, &maintainer.name, &maintainer.description];
            lines.extend(details.into_iter().flatten().map(|d| fm.indented(d)));
        }
        if let Some(desc) = &metadata.longdescription {
            let words: Vec<&str> = desc.split_whitespace().collect();
            lines.extend(fm.wrapped("Description", &words));
        }
    } else {
        lines.extend(fm.wrapped(&label, &emails));
    }

    Ok(lines)
}
