//! Purge installed kernels made obsolete by newer versions, always keeping
//! the running kernel and its immediate predecessor as a rollback target.

use std::collections::BTreeSet;

use clap::Parser;

use aptsweep::error::{Error, Result};
use aptsweep::kernel::{self, KernelVersion, RunningPosition};
use aptsweep::{apt, logging, parse};

/// Remove obsolete installed kernels while keeping a rollback target.
#[derive(Parser, Debug)]
#[command(name = "purge-kernels")]
#[command(version)]
#[command(about = "Remove obsolete installed kernels while keeping a rollback target", long_about = None)]
struct Cli {}

fn main() {
    let _cli = Cli::parse();
    logging::init("purge-kernels");
    if let Err(err) = run() {
        println!("ERROR! {err}");
        tracing::error!(error = %err, "purge-kernels failed");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    apt::ensure_tools(&["sudo", "apt-get", "dpkg", "uname"])?;

    println!("\n## Checking installed kernels...\n");
    let lines = apt::installed_kernel_lines()?;
    let mut kernels: BTreeSet<KernelVersion> = BTreeSet::new();
    for line in &lines {
        println!("{}", line.raw);
        kernels.insert(line.version);
    }
    if kernels.is_empty() {
        return Err(Error::StateInconsistency(
            "No installed kernels found!".to_string(),
        ));
    }
    let installed: Vec<String> = kernels.iter().map(ToString::to_string).collect();
    println!("\n## Installed kernels: {}\n", installed.join(", "));

    let release = apt::running_kernel_release()?;
    println!("{release}");
    let Some(running) = parse::uname_version(&release) else {
        return Err(Error::Parse(format!("Bad version format: {release}")));
    };
    println!("\n## Current kernel version: {running}\n");

    let plan = kernel::plan_retention(&kernels, running)?;
    match plan.position {
        RunningPosition::Only => {
            println!(
                "The currently loaded kernel is the ONLY kernel installed, there's nothing to be done.\n"
            );
            return Ok(());
        }
        RunningPosition::Oldest => {
            println!(
                "The currently loaded kernel is the OLDEST, please rerun this tool after reboot.\n"
            );
            return Ok(());
        }
        RunningPosition::Middle | RunningPosition::Latest => {}
    }

    if let Some(rollback) = plan.rollback {
        println!("## Keeping older kernel {rollback} for reliability.\n");
    }
    if !plan.remove.is_empty() {
        let removing: Vec<String> = plan.remove.iter().map(ToString::to_string).collect();
        println!(
            "## Going to remove kernels: {}; please provide root password to proceed:\n",
            removing.join(", ")
        );
        apt::purge_kernels(&plan.remove)?;
        println!("\n## Making sure the boot loader is up to date\n");
        apt::update_boot_loader()?;
        println!();
    }

    if matches!(plan.position, RunningPosition::Latest) {
        println!(
            "The currently loaded kernel is the LATEST, nothing else has to be done, though reboot is suggested to make sure the system boots normally.\n"
        );
    } else {
        println!(
            "The currently loaded kernel is NOT the latest, please rerun this tool after reboot.\n"
        );
    }
    Ok(())
}
