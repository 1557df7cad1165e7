//! vfs-conformance - runs the conformance suite against registered backends.
//!
//! Usage: vfs-conformance [--dso=<PATH>]... [--scheme=<NAME>]...

use std::process::ExitCode;

use modular_vfs::config::{self, Flags};
use modular_vfs::conformance::{self, Suite};

fn main() -> ExitCode {
    env_logger::init();

    let flags = match Flags::parse(std::env::args().skip(1)) {
        Ok(flags) => flags,
        Err(e) => {
            eprintln!("{}", e);
            eprintln!();
            eprintln!("{}", config::USAGE);
            return ExitCode::from(1);
        }
    };
    if flags.help {
        println!("{}", config::USAGE);
        return ExitCode::SUCCESS;
    }

    let env = match config::build_env(&flags) {
        Ok(env) => env,
        Err(e) => {
            eprintln!("Failed to set up file systems: {:#}", e);
            return ExitCode::from(1);
        }
    };

    let schemes = conformance::select_schemes(&flags.schemes, &env.registered_schemes());
    if schemes.is_empty() {
        println!("No schemes to test");
        return ExitCode::SUCCESS;
    }

    let temp_root = match config::temp_root() {
        Ok(root) => root,
        Err(e) => {
            eprintln!("{:#}", e);
            return ExitCode::from(1);
        }
    };
    let report = Suite::new(&env, schemes, &temp_root).run();
    println!("{}", report);

    if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    }
}
