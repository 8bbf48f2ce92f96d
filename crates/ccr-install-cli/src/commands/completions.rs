use std::{fs, io, path::Path};

use anyhow::Result;
use clap_complete::{generate, Shell};

use ccr_install_cli::build_cli_command;

pub fn handle(shell: Shell, out: Option<&Path>) -> Result<()> {
    let mut cmd = build_cli_command();
    let name = cmd.get_name().to_string();
    match out {
        Some(path) => {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = fs::File::create(path)?;
            generate(shell, &mut cmd, name, &mut file);
            println!("Wrote {shell:?} completion to {}", path.display());
        }
        None => generate(shell, &mut cmd, name, &mut io::stdout()),
    }
    Ok(())
}
