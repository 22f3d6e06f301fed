use clap::{Arg, ArgMatches, Command};
use std::process;

use herdstat::actions::{self, Options};
use herdstat::config::Config;

#[tokio::main]
async fn main() {
    let app = create_app();
    let matches = app.get_matches();

    init_logging(matches.get_flag("debug"));

    let result = run_herdstat(matches).await;
    process::exit(result);
}

fn init_logging(debug: bool) {
    let mut builder = env_logger::Builder::from_default_env();
    if debug {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.init();
}

fn create_app() -> Command {
    Command::new("herdstat")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Display statistics about Gentoo herds, their members and packages")
        .after_help(
            "herdstat checks the HERDS environment variable for the location of \
             herds.xml (a local file or a URL). If it is not set, herds.xml is \
             retrieved from gentoo.org. Use 'all' as the only herd to list every herd.",
        )
        .arg(
            Arg::new("verbose")
                .long("verbose")
                .short('v')
                .help("Display verbose output")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("quiet")
                .long("quiet")
                .short('q')
                .help("Only display the raw data, one item per line")
                .conflicts_with("verbose")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("count")
                .long("count")
                .short('c')
                .help("Only display the number of results")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("regex")
                .long("regex")
                .short('r')
                .help("Treat the target as a case-insensitive regular expression")
                .conflicts_with("metadata")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("metadata")
                .long("metadata")
                .short('m')
                .help("Treat targets as packages and show their metadata.xml")
                .conflicts_with_all(["package", "dev"])
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("package")
                .long("package")
                .short('p')
                .help("Show packages belonging to the specified herd(s) (may take a while)")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("dev")
                .long("dev")
                .short('d')
                .help("Treat targets as developers and show the herds they belong to")
                .conflicts_with("package")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("herdsxml")
                .long("herdsxml")
                .short('H')
                .value_name("FILE|URL")
                .help("Location of herds.xml (overrides HERDS)"),
        )
        .arg(
            Arg::new("nocolor")
                .long("nocolor")
                .short('n')
                .help("Disable colored output")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .short('D')
                .help("Enable debug logging")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("targets")
                .help("Herd(s), developer(s) with --dev, or package(s) with --metadata")
                .action(clap::ArgAction::Set)
                .num_args(0..),
        )
}

async fn run_herdstat(matches: ArgMatches) -> i32 {
    let options = Options {
        verbose: matches.get_flag("verbose"),
        quiet: matches.get_flag("quiet"),
        count: matches.get_flag("count"),
        package: matches.get_flag("package"),
        dev: matches.get_flag("dev"),
        metadata: matches.get_flag("metadata"),
        regex: matches.get_flag("regex"),
        colors: !matches.get_flag("nocolor"),
    };

    if !options.colors {
        colored::control::set_override(false);
    }

    let targets: Vec<String> = matches
        .get_many::<String>("targets")
        .unwrap_or_default()
        .cloned()
        .collect();

    if targets.is_empty() {
        eprintln!("herdstat: no herds specified (use --help for usage)");
        return 1;
    }

    let herds_xml = matches.get_one::<String>("herdsxml").map(|s| s.as_str());
    let config = match Config::load("/", herds_xml).await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("herdstat: {}", e);
            return 1;
        }
    };

    actions::run(&config, &options, &targets).await
}
