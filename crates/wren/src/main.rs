//
// main.rs
//
// Command-line entry point: the LSP server over stdio, or analysis-stats
//

use std::env;

use wren::{backend, cli};

fn print_usage() {
    println!("wren {}, a static AutoIt Language Server.", env!("CARGO_PKG_VERSION"));
    print!(
        r#"
Usage: wren [OPTIONS]
       wren analysis-stats <path> [--csv] [--only <phase>]

Available options:

--stdio                      Start the LSP server using stdio transport
--version                    Print the version
--help                       Print this help message

"#
    );
}

fn run_analysis_stats(argv: &mut impl Iterator<Item = String>) -> anyhow::Result<()> {
    let args = cli::analysis_stats::parse_args(argv).map_err(|e| anyhow::anyhow!(e))?;
    let results = cli::analysis_stats::run_analysis_stats(&args);
    if args.csv {
        cli::analysis_stats::print_results_csv(&results);
    } else {
        cli::analysis_stats::print_results(&results);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let mut argv = env::args();
    argv.next(); // skip executable name

    let mut use_stdio = false;

    while let Some(arg) = argv.next() {
        match arg.as_str() {
            "--stdio" => use_stdio = true,
            "--version" => {
                println!("wren {}", env!("CARGO_PKG_VERSION"));
                return Ok(());
            }
            "--help" => {
                print_usage();
                return Ok(());
            }
            "analysis-stats" => {
                env_logger::init();
                return run_analysis_stats(&mut argv);
            }
            other => {
                return Err(anyhow::anyhow!("Unknown argument: '{other}'"));
            }
        }
    }

    if !use_stdio {
        print_usage();
        return Ok(());
    }

    env_logger::init();

    backend::start_lsp().await
}
