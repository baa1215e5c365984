use clap::Parser;
use privilege_core::{ReconcilePolicy, Relationship, TieBreak};

#[derive(Debug, Parser)]
#[command(name = "privilege-migrate")]
#[command(about = "Collapse redundant privilege records to one effective record per pair")]
pub struct Cli {
    /// Postgres connection string
    #[arg(long, env = "PRIVILEGE_DATABASE_URL")]
    pub database_url: String,

    /// Relationship to reconcile (repeatable; default: all)
    #[arg(long = "relationship", value_name = "RELATIONSHIP")]
    pub relationships: Vec<Relationship>,

    /// How to choose between records with equal level and equal grant time
    #[arg(long, default_value_t = TieBreak::LowestId)]
    pub tie_break: TieBreak,

    /// Plan only; delete nothing
    #[arg(long)]
    pub dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Connection pool size
    #[arg(long, env = "PRIVILEGE_MAX_CONNECTIONS", default_value_t = 2)]
    pub max_connections: u32,
}

impl Cli {
    pub fn policy(&self) -> ReconcilePolicy {
        let relationships = if self.relationships.is_empty() {
            Relationship::ALL.to_vec()
        } else {
            self.relationships.clone()
        };
        ReconcilePolicy {
            tie_break: self.tie_break,
            dry_run: self.dry_run,
            relationships,
        }
    }
}
