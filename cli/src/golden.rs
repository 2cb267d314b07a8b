use std::path::PathBuf;

use clap::{Args, Subcommand};

use ttu::motion::{compare, GoldenStore};
use ttu::Context;

#[derive(Args)]
pub struct Golden {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every golden document in the project's golden tree
    #[command()]
    List,

    /// Print one golden document
    #[command()]
    Show(Show),

    /// Compare an actual time series document against a golden one
    #[command()]
    Verify(Verify),
}

#[derive(Args)]
struct Show {
    /// Test class the golden belongs to
    class: String,
    /// Test method the golden belongs to
    method: String,
    /// Identifier for tests recording more than one golden
    #[arg(short, long)]
    identifier: Option<String>,
}

#[derive(Args)]
struct Verify {
    /// The golden document
    golden: PathBuf,
    /// The actual document to check against it
    actual: PathBuf,
}

impl Golden {
    pub fn run(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        match &self.command {
            Command::List => self.list(ctx),
            Command::Show(c) => self.show(ctx, c),
            Command::Verify(c) => self.verify(c),
        }
    }

    fn list(&self, ctx: &dyn Context) -> anyhow::Result<()> {
        let store = GoldenStore::new(ctx)?;
        for golden in store.list() {
            println!("{}", golden.display());
        }
        Ok(())
    }

    fn show(&self, ctx: &dyn Context, params: &Show) -> anyhow::Result<()> {
        let store = GoldenStore::new(ctx)?;
        let series = store.read(
            &params.class,
            &params.method,
            params.identifier.as_deref(),
        )?;
        println!("{}", serde_json::to_string_pretty(&series.to_json())?);
        Ok(())
    }

    fn verify(&self, params: &Verify) -> anyhow::Result<()> {
        let golden = GoldenStore::read_document(&params.golden)?;
        let actual = GoldenStore::read_document(&params.actual)?;

        let comparison = compare(&golden, &actual);
        if comparison.is_match() {
            println!("OK");
            return Ok(());
        }

        for fact in comparison.facts() {
            println!("{}", fact);
        }
        anyhow::bail!("golden mismatch")
    }
}
