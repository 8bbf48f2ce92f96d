use std::io::Write;
use std::path::Path;

use anyhow::Result;
use ccr_install::{same_file, Access, InstallLayout, InstallStatus, InstallerConfig};
use tabwriter::TabWriter;

pub fn handle(config: &InstallerConfig) -> Result<()> {
    let layout = InstallLayout::from_config(config)?;
    let status = layout.status();

    let mut writer = TabWriter::new(Vec::new()).padding(2);
    writeln!(writer, "Item\tState\tPath")?;
    for (item, state, path) in rows(&layout, &status) {
        writeln!(writer, "{item}\t{state}\t{path}")?;
    }
    writer.flush()?;
    let table = String::from_utf8(writer.into_inner()?)?;
    println!("{table}");

    if status.is_installed() {
        println!(
            "{} is installed from {} ({})",
            layout.binary_name,
            config.repository(),
            config.asset()
        );
    } else {
        println!("{} is not installed", layout.binary_name);
    }
    Ok(())
}

fn rows(layout: &InstallLayout, status: &InstallStatus) -> Vec<(&'static str, String, String)> {
    let link_state = if !status.link_present {
        "missing".to_string()
    } else if !status.link_is_symlink {
        "not a symlink".to_string()
    } else if status.link_is_current {
        "ok".to_string()
    } else {
        match &status.link_target {
            Some(target) => format!("points to {}", target.display()),
            None => "dangling".to_string(),
        }
    };
    let on_path = match &status.resolved_on_path {
        Some(found) if same_file(found, &layout.link) => "ok".to_string(),
        Some(found) => format!("resolves to {}", found.display()),
        None => "not found".to_string(),
    };

    vec![
        ("install dir", present(status.install_dir_exists), show(&layout.install_dir)),
        ("entry point", present(status.entry_point_exists), show(&layout.entry_point)),
        ("bin dir", bin_dir_state(status.bin_dir_access), show(&layout.bin_dir)),
        ("link", link_state, show(&layout.link)),
        ("on PATH", on_path, layout.binary_name.clone()),
        ("config dir", present(status.config_dir_exists), show(&layout.config_dir)),
        (
            "service",
            if status.service_marker_exists {
                "marker present".to_string()
            } else {
                "not running".to_string()
            },
            show(&layout.pid_file),
        ),
    ]
}

fn bin_dir_state(access: Access) -> String {
    match access {
        Access::Direct => "writable".to_string(),
        Access::NeedsElevation => "needs elevation".to_string(),
    }
}

fn present(exists: bool) -> String {
    let state = if exists { "present" } else { "missing" };
    state.to_string()
}

fn show(path: &Path) -> String {
    path.display().to_string()
}
