// build.rs

use clap::{Arg, ArgAction, Command};
use clap_mangen::Man;
use std::env;
use std::fs;
use std::path::PathBuf;

fn dir_arg() -> Arg {
    Arg::new("dir")
        .short('d')
        .long("dir")
        .value_name("DIR")
        .default_value(".")
        .help("Depot directory")
}

fn json_arg() -> Arg {
    Arg::new("json")
        .long("json")
        .action(ArgAction::SetTrue)
        .help("Print as JSON")
}

fn build_cli() -> Command {
    Command::new("depot")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Depot Contributors")
        .about("Parcel depot tracker with crash-safe flat-file records")
        .subcommand_required(false)
        .subcommand(
            Command::new("init")
                .about("Create the depot's record files")
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("process")
                .about("Process the collection of a parcel by its queued recipient")
                .arg(Arg::new("package_id").required(true).help("Package identifier"))
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("add-recipient")
                .about("Queue a recipient for a parcel")
                .arg(Arg::new("surname").required(true).help("Recipient surname"))
                .arg(Arg::new("package_id").required(true).help("Package identifier"))
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("add-parcel")
                .about("Register a new parcel")
                .arg(Arg::new("package_id").required(true).help("Package identifier"))
                .arg(Arg::new("mass").required(true).help("Mass in kilograms"))
                .arg(Arg::new("dimensions").required(true).help("Dimensions as LxWxH"))
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("remove-recipient")
                .about("Remove a recipient whose parcel has left the depot")
                .arg(Arg::new("surname").required(true).help("Recipient surname"))
                .arg(Arg::new("package_id").required(true).help("Package identifier"))
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("remove-parcel")
                .about("Remove a collected parcel")
                .arg(Arg::new("package_id").required(true).help("Package identifier"))
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("queue")
                .about("Show the recipient queue")
                .arg(json_arg())
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("inventory")
                .about("Show the parcel inventory")
                .arg(json_arg())
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("log")
                .about("Show the event log")
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("released")
                .about("Show the released-items ledger")
                .arg(dir_arg()),
        )
        .subcommand(
            Command::new("session")
                .about("Run commands from standard input against one open depot")
                .arg(dir_arg()),
        )
}

fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap());
    let man_dir = manifest_dir.join("man");
    fs::create_dir_all(&man_dir).expect("Failed to create man directory");

    let mut page = Vec::new();
    Man::new(build_cli())
        .render(&mut page)
        .expect("Failed to render depot man page");

    let page_path = man_dir.join("depot.1");
    fs::write(&page_path, page).expect("Failed to write depot man page");
}
