/*!
MapDraft keeps the state of a map drafting session: drawings captured from a web map, the working table they are saved into, reference layers loaded from uploaded files, and the map view. It also compares two versions of a vector layer by column and by keyed row.
*/

#![warn(noop_method_call)]
#![warn(single_use_lifetimes)]
#![warn(unused_lifetimes)]
#![warn(trivial_numeric_casts)]
#![warn(unreachable_pub)]
#![warn(unused_crate_dependencies)]
#![warn(meta_variable_misuse)]
#![warn(unused_macro_rules)]
#![warn(unused_qualifications)]
#![warn(unused_results)] // ignored results need a `_ = ` in front, mostly map inserts and removes.
#![warn(variant_size_differences)]

use clap::Parser;

pub(crate) mod errors;
pub(crate) mod commands;
pub(crate) mod config;
pub(crate) mod diff;
pub(crate) mod gis;
pub(crate) mod progress;
pub(crate) mod scene;
pub(crate) mod session;
pub(crate) mod table;
pub(crate) mod utils;

use commands::MainCommand;
use commands::Task;
use errors::ProgramError;
use progress::ConsoleProgressBar;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub(crate) struct MapDraft {

    #[command(subcommand)]
    command: MainCommand

}

/**
Runs MapDraft with arbitrary arguments. The first item in the arguments is the program name and is ignored.
*/
pub(crate) fn run<Arg, Args>(args: Args) -> Result<(),ProgramError>
where
    Arg: Clone + Into<std::ffi::OsString>,
    Args: IntoIterator<Item = Arg>
{
    let mut progress = ConsoleProgressBar::new();
    let program = MapDraft::try_parse_from(args)?;
    program.command.run(&mut progress)?;
    Ok(())
}

fn main() -> std::process::ExitCode {
    // the error is printed with Display here, returning it from main would print it with Debug.
    match run(std::env::args()) {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}",err);
            std::process::ExitCode::FAILURE
        }
    }
}
