use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;

use clap::Args;
use clap_markdown::help_markdown;

use super::Task;
use super::schema::SchemaKind;
use crate::MapDraft;
use crate::errors::CommandError;
use crate::progress::ProgressObserver;

fn write_command_help(target: &Path) -> Result<(),CommandError> {
    let mut target = File::create(target)?;
    write!(&mut target,"{}",help_markdown::<MapDraft>())?;
    Ok(())
}

fn write_schema(kind: SchemaKind, target: &Path) -> Result<(),CommandError> {
    let mut target = File::create(target)?;
    write!(&mut target,"{}",serde_json::to_string_pretty(&kind.root_schema())?)?;
    Ok(())
}

#[derive(Args)]
#[command(hide=true)]
/// Writes the command line documentation and the json schemas to folders.
pub(crate) struct Docs {

    #[arg(long)]
    /// The folder to output the generated documentation to
    docs: PathBuf,

    #[arg(long)]
    /// The folder to output generated schemas to
    schemas: PathBuf

}

impl Task for Docs {

    fn run<Progress: ProgressObserver>(self, progress: &mut Progress) -> Result<(),CommandError> {
        std::fs::create_dir_all(&self.docs)?;
        std::fs::create_dir_all(&self.schemas)?;
        write_command_help(&self.docs.join("Commands.md"))?;
        write_schema(SchemaKind::Config, &self.schemas.join("config.schema.json"))?;
        write_schema(SchemaKind::Events, &self.schemas.join("events.schema.json"))?;
        progress.message(|| format!("Documentation written to {} and {}.",self.docs.display(),self.schemas.display()));
        Ok(())
    }
}
