use std::path::PathBuf;

use clap::Args;
use clap::Subcommand;

use crate::config::SessionConfig;
use crate::errors::CommandError;
use crate::progress::ProgressObserver;
use crate::session::Effect;

mod diff;
mod docs;
mod ingest;
mod replay;
mod schema;
mod table;

use diff::Diff;
use docs::Docs;
use ingest::Ingest;
use replay::Replay;
use schema::Schema;
use table::Table;

pub(crate) trait Task {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError>;

}

#[macro_export]
macro_rules! command_def {
    ($struct_name: ident {$($command_name: ident),*}) => {

        #[derive(Subcommand)]
        pub(crate) enum $struct_name {
            $(
                $command_name($command_name)
            ),*
        }

        impl Task for $struct_name {

            fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {
                match self {
                    $(Self::$command_name(a) => a.run(progress)),*
                }
            }

        }
    };
}

command_def!{
    MainCommand {
        Replay,
        Ingest,
        Diff,
        Table,
        Schema,
        Docs
    }
}

#[derive(Args)]
pub(crate) struct ConfigArg {

    #[arg(long)]
    /// A JSON file with session settings. Settings that aren't in the file keep their defaults, see the `schema config` command.
    config: Option<PathBuf>

}

impl ConfigArg {

    pub(crate) fn load(&self) -> Result<SessionConfig,CommandError> {
        SessionConfig::load_or_default(self.config.as_ref())
    }
}

/// Reports what the user interface would show for an effect. Effects which only affect the map are left to the caller.
pub(crate) fn report_effect<Progress: ProgressObserver>(effect: &Effect, progress: &Progress) {
    match effect {
        Effect::Rerender | Effect::FitBounds(_) => (),
        Effect::Notice(message) => progress.message(|| message),
        Effect::Warning(_) | Effect::Diagnostic { .. } => progress.warning(|| effect.to_string()),
        Effect::Suggestions(suggestions) => if suggestions.is_empty() {
            progress.message(|| "No suggestions.")
        } else {
            for suggestion in suggestions {
                progress.message(|| format!("  {suggestion}"))
            }
        }
    }
}
