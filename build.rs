// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

const KINDS: [&str; 5] = ["manifests", "pkgsinfo", "catalogs", "icons", "pkgs"];

/// Common argument: record kind
fn kind_arg() -> Arg {
    Arg::new("kind")
        .required(true)
        .value_parser(KINDS)
        .help("Record kind")
}

/// Common argument: kind-relative record path
fn path_arg() -> Arg {
    Arg::new("path")
        .required(true)
        .help("Path relative to the kind directory")
}

fn build_cli() -> Command {
    Command::new("munkiadmin")
        .version(env!("CARGO_PKG_VERSION"))
        .author("MunkiAdmin Contributors")
        .about("Administer a Munki software-deployment repository")
        .subcommand_required(false)
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("PATH")
                .global(true)
                .help("Configuration file (default: ~/.config/munkiadmin/config.toml)"),
        )
        .arg(
            Arg::new("repo_dir")
                .short('r')
                .long("repo-dir")
                .value_name("DIR")
                .global(true)
                .help("Repository root; overrides the configuration file"),
        )
        .arg(
            Arg::new("git")
                .long("git")
                .value_name("PATH")
                .global(true)
                .help("git binary used for change auditing"),
        )
        .arg(
            Arg::new("no_audit")
                .long("no-audit")
                .action(ArgAction::SetTrue)
                .global(true)
                .help("Do not commit changes to git even if configured"),
        )
        .arg(
            Arg::new("user")
                .short('u')
                .long("user")
                .global(true)
                .help("Login name of the acting user"),
        )
        .arg(Arg::new("first_name").long("first-name").global(true))
        .arg(Arg::new("last_name").long("last-name").global(true))
        .arg(Arg::new("email").long("email").global(true))
        .subcommand(
            Command::new("list")
                .about("List records of a kind")
                .arg(kind_arg()),
        )
        .subcommand(
            Command::new("show")
                .about("Show one record")
                .arg(kind_arg())
                .arg(path_arg())
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print structured records as JSON instead of XML"),
                ),
        )
        .subcommand(
            Command::new("create")
                .about("Create a record; structured kinds get defaults without --from")
                .arg(kind_arg())
                .arg(path_arg())
                .arg(Arg::new("from").long("from").value_name("FILE").help("Initial content")),
        )
        .subcommand(
            Command::new("put")
                .about("Overwrite a record with the contents of a file")
                .arg(kind_arg())
                .arg(path_arg())
                .arg(Arg::new("file").required(true).help("Source file"))
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Treat the source as JSON and convert it to a plist"),
                ),
        )
        .subcommand(
            Command::new("patch")
                .about("Merge top-level keys from a JSON object into a record")
                .arg(kind_arg())
                .arg(path_arg())
                .arg(Arg::new("file").required(true).help("JSON object with the keys to replace")),
        )
        .subcommand(
            Command::new("delete")
                .about("Delete a record")
                .arg(kind_arg())
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("query")
                .about("Query structured records with key=value filters")
                .arg(kind_arg())
                .arg(Arg::new("terms").num_args(0..).help("Filters such as name=Firefox")),
        )
        .subcommand(Command::new("catalogs").about("List catalog names"))
        .subcommand(
            Command::new("catalog-info")
                .about("Show suggested/update/versioned names per catalog with global facets"),
        )
        .subcommand(
            Command::new("ref-count")
                .about("Count pkginfo records referencing an installer item")
                .arg(Arg::new("pkg_path").required(true).help("Path relative to the pkgs directory")),
        )
        .subcommand(
            Command::new("install-items")
                .about("Show install-item names valid for a manifest")
                .arg(Arg::new("manifest").required(true)),
        )
        .subcommand(
            Command::new("pkgsinfo")
                .about("Show every item with its versions, newest first")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Print JSON instead of a table"),
                ),
        )
        .subcommand(
            Command::new("mass-delete")
                .about("Delete several pkginfo records")
                .arg(Arg::new("paths").required(true).num_args(1..))
                .arg(
                    Arg::new("delete_pkgs")
                        .long("delete-pkgs")
                        .action(ArgAction::SetTrue)
                        .help("Also delete installer items no other pkginfo references"),
                ),
        )
        .subcommand(
            Command::new("edit-catalogs")
                .about("Add and remove catalogs on several pkginfo records")
                .arg(Arg::new("paths").required(true).num_args(1..))
                .arg(
                    Arg::new("add")
                        .long("add")
                        .value_name("CATALOG")
                        .action(ArgAction::Append)
                        .help("Catalog to add (repeatable)"),
                )
                .arg(
                    Arg::new("remove")
                        .long("remove")
                        .value_name("CATALOG")
                        .action(ArgAction::Append)
                        .help("Catalog to remove (repeatable)"),
                ),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // Create man directory - use CARGO_MANIFEST_DIR which is always set by cargo
    let manifest_dir = match env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(e) => {
            println!("cargo:warning=CARGO_MANIFEST_DIR not set: {}", e);
            return;
        }
    };
    let man_dir = manifest_dir.join("man");

    if let Err(e) = fs::create_dir_all(&man_dir) {
        println!("cargo:warning=Failed to create man directory: {}", e);
        return;
    }

    let man = Man::new(build_cli());
    let mut buffer = Vec::new();

    if let Err(e) = man.render(&mut buffer) {
        println!("cargo:warning=Failed to render man page: {}", e);
        return;
    }

    let man_path = man_dir.join("munkiadmin.1");
    if let Err(e) = fs::write(&man_path, buffer) {
        println!("cargo:warning=Failed to write man page: {}", e);
    }
}
