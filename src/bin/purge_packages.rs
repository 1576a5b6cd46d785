//! Purge orphaned `[installed,local]` packages once their reverse
//! dependencies are accounted for and the plan has been independently
//! verified.

use std::collections::BTreeSet;

use clap::Parser;

use aptsweep::apt::{self, ReinstallOutcome};
use aptsweep::error::Result;
use aptsweep::{logging, orphan};

/// Remove orphaned locally-installed packages that nothing else requires.
#[derive(Parser, Debug)]
#[command(name = "purge-packages")]
#[command(version)]
#[command(about = "Remove orphaned locally-installed packages that nothing else requires", long_about = None)]
struct Cli {}

fn main() {
    let _cli = Cli::parse();
    logging::init("purge-packages");
    if let Err(err) = run() {
        println!("ERROR! {err}");
        tracing::error!(error = %err, "purge-packages failed");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    apt::ensure_tools(&["sudo", "apt", "apt-get"])?;

    println!("\n## Checking [installed,local] packages:\n");
    let packages = apt::list_local_packages()?;
    for package in &packages {
        println!("{package}");
    }
    if packages.is_empty() {
        println!("No local installed packages found");
        return Ok(());
    }

    println!("\n## Trying to reinstall:\n");
    let mut reinstalled: Vec<&str> = Vec::new();
    for package in &packages {
        match apt::try_reinstall(package) {
            ReinstallOutcome::Reinstalled => reinstalled.push(package.as_str()),
            ReinstallOutcome::NotDownloadable => {}
            ReinstallOutcome::Failed(err) => {
                tracing::warn!("Reinstall probe for {package} failed: {err}");
            }
        }
    }
    if !reinstalled.is_empty() {
        println!(
            "\n## The following packages were re-installed: {}\nPlease re-run the tool.\n",
            reinstalled.join(" ")
        );
        return Ok(());
    }
    println!("## No packages could be re-installed, checking reverse dependencies:\n");

    let mut dependencies = orphan::DependencyMap::new();
    for package in &packages {
        let deps = apt::reverse_removal_set(package)?;
        if !deps.is_empty() {
            println!("{package}: {}", join_names(&deps));
        }
        dependencies.insert(package.clone(), deps);
    }

    let analysis = orphan::analyze(&mut dependencies);
    if analysis.externals.is_empty() {
        println!("\n## No external dependencies found");
    } else {
        println!(
            "\n## The following external dependencies detected: {}",
            join_names(&analysis.externals)
        );
        let blocked: BTreeSet<String> = analysis
            .blockers
            .difference(&analysis.externals)
            .cloned()
            .collect();
        println!(
            "\n## The following packages depend on external dependencies: {}",
            join_names(&blocked)
        );
    }

    if analysis.to_purge.is_empty() {
        println!("Nothing to remove");
        return Ok(());
    }

    println!("\n## Verifying possible remove:\n");
    let verified = apt::simulate_remove(&analysis.to_purge)?;
    orphan::check_verification(&analysis.to_purge, &verified)?;

    println!("\n## Verified, proceeding with remove:\n");
    apt::remove_packages(&analysis.to_purge)?;

    // Audit step: show which purged packages a repository would still hand
    // back. Never affects the run's outcome.
    println!("\n## Trying to reinstall removed packages:\n");
    for package in &analysis.to_purge {
        match apt::try_install(package) {
            ReinstallOutcome::Reinstalled => {
                tracing::info!("{package} was reinstalled after the purge");
            }
            ReinstallOutcome::NotDownloadable => {
                tracing::info!("{package} stays removed; no download source");
            }
            ReinstallOutcome::Failed(err) => {
                tracing::warn!("Post-purge reinstall attempt for {package} failed: {err}");
            }
        }
    }
    Ok(())
}

/// Space-join a set of names for console reporting.
fn join_names(names: &BTreeSet<String>) -> String {
    names
        .iter()
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(" ")
}
