use ccr_install_cli::build_cli_command;

pub fn handle() {
    print!("{}", build_cli_command().render_version());
}
