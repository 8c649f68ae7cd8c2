use clap::Args;
use clap::ValueEnum;
use schemars::schema::RootSchema;
use schemars::schema_for;

use super::Task;
use crate::config::SessionConfig;
use crate::errors::CommandError;
use crate::progress::ProgressObserver;
use crate::session::Event;

#[derive(Clone,Copy,ValueEnum)]
pub(crate) enum SchemaKind {
    /// The session configuration file
    Config,
    /// The event script used by `replay`
    Events
}

impl SchemaKind {

    pub(crate) fn root_schema(self) -> RootSchema {
        match self {
            Self::Config => schema_for!(SessionConfig),
            Self::Events => schema_for!(Vec<Event>),
        }
    }
}

#[derive(Args)]
/// Prints the JSON schema of one of the files the commands read.
pub(crate) struct Schema {

    #[arg(value_enum)]
    /// Which file to describe
    kind: SchemaKind

}

impl Task for Schema {

    fn run<Progress: ProgressObserver>(self, _: &mut Progress) -> Result<(),CommandError> {
        println!("{}",serde_json::to_string_pretty(&self.kind.root_schema())?);
        Ok(())
    }
}
