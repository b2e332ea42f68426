use std::error::Error;

use clap::{Args, Parser, Subcommand};
use ledger::{Currency, Ledger};
use migration::MigratorTrait;
use sea_orm::Database;

#[derive(Parser, Debug)]
#[command(name = "quota_admin")]
#[command(about = "Admin utilities for Quota (bootstrap users/groups, reconcile balances)")]
struct Cli {
    /// Database connection string (also read from `DATABASE_URL`).
    #[arg(
        long,
        env = "DATABASE_URL",
        default_value = "sqlite:./quota.db?mode=rwc"
    )]
    database_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    User(User),
    Group(Group),
    /// Recompute a group's balances from the transaction store and repair
    /// any cache drift.
    Reconcile(ReconcileArgs),
    /// Print a group's cached net balances.
    Balances(BalancesArgs),
}

#[derive(Args, Debug)]
struct User {
    #[command(subcommand)]
    command: UserCommand,
}

#[derive(Subcommand, Debug)]
enum UserCommand {
    Create(UserCreateArgs),
}

#[derive(Args, Debug)]
struct UserCreateArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    display_name: String,
}

#[derive(Args, Debug)]
struct Group {
    #[command(subcommand)]
    command: GroupCommand,
}

#[derive(Subcommand, Debug)]
enum GroupCommand {
    Create(GroupCreateArgs),
}

#[derive(Args, Debug)]
struct GroupCreateArgs {
    #[arg(long)]
    owner: String,
    #[arg(long)]
    name: String,
    #[arg(long, default_value = "EUR")]
    currency: String,
}

#[derive(Args, Debug)]
struct ReconcileArgs {
    #[arg(long)]
    group: String,
    /// Actor recorded on the audit entry if a repair happens.
    #[arg(long, default_value = "admin")]
    actor: String,
}

#[derive(Args, Debug)]
struct BalancesArgs {
    #[arg(long)]
    group: String,
    /// Member on whose behalf the balances are read.
    #[arg(long)]
    user: String,
}

fn parse_currency(raw: &str) -> Result<Currency, String> {
    Currency::try_from(raw).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let cli = Cli::parse();

    let db = Database::connect(&cli.database_url).await?;
    migration::Migrator::up(&db, None).await?;
    let ledger = Ledger::builder().database(db).build().await?;

    match cli.command {
        Command::User(user) => match user.command {
            UserCommand::Create(args) => {
                ledger.create_user(&args.username, &args.display_name).await?;
                println!("created user {}", args.username);
            }
        },
        Command::Group(group) => match group.command {
            GroupCommand::Create(args) => {
                let currency = parse_currency(&args.currency)?;
                let group_id = ledger
                    .create_group(&args.name, &args.owner, Some(currency))
                    .await?;
                println!("created group {group_id}");
            }
        },
        Command::Reconcile(args) => {
            let report = ledger.reconcile(&args.group, &args.actor).await?;
            if report.repaired {
                println!("repaired {} drifted balance(s):", report.diffs.len());
                for diff in &report.diffs {
                    println!("  {diff:?}");
                }
            } else {
                println!("caches match the transaction store");
            }
        }
        Command::Balances(args) => {
            let balances = ledger.group_balances(&args.group, &args.user).await?;
            for balance in balances {
                println!("{}\t{}", balance.user_id, balance.balance);
            }
        }
    }

    Ok(())
}
