use colored::Colorize;
use contract_codegen::cli;
use tracing::Level;

fn main() {
    let command_line_interface = cli::CommandLineInterface::load();
    let level = match command_line_interface.verbose {
        0 => Level::WARN,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(level)
        .init();

    if let Err(error) = command_line_interface.run() {
        eprintln!("{} {error:#}", "error:".red().bold());
        std::process::exit(1);
    }
}
