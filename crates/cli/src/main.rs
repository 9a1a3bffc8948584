use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};
use girder_lib::{
    execute_balances, execute_materials, BalanceRequest, CurrencyId, Grouping, MaterialRequest,
    ProjectionMode, Rate, TenantId,
};
use std::{fs::File, io::BufReader, path::Path, process::exit};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "girder")]
#[command(about = "Wallet balances and material requirements from CSV snapshots")]
struct Cli {
    /// Log filter used when `RUST_LOG` is not set.
    #[arg(long, env = "GIRDER_LOG", default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Aggregate movements into signed balances, written as CSV to stdout.
    Balances(BalancesArgs),
    /// Roll task quantities up into required materials, written as CSV to stdout.
    Materials(MaterialsArgs),
}

#[derive(Args, Debug)]
struct BalancesArgs {
    #[arg(long)]
    categories: String,
    #[arg(long)]
    currencies: String,
    #[arg(long)]
    movements: String,
    #[arg(long, env = "GIRDER_TENANT")]
    tenant: u32,
    /// Currency of the normalized projection.
    #[arg(long, env = "GIRDER_BASE_CURRENCY")]
    base: u32,
    /// Currency of the alternate projection.
    #[arg(long, env = "GIRDER_ALTERNATE_CURRENCY")]
    alternate: u32,
    #[arg(long, default_value_t = ProjectionMode::Origin)]
    mode: ProjectionMode,
    #[arg(long, default_value_t = Grouping::Wallet)]
    group_by: Grouping,
    /// Base units per alternate unit, needed by the alternate projection.
    #[arg(long)]
    alternate_rate: Option<Rate>,
    /// First day included (YYYY-MM-DD).
    #[arg(long)]
    from: Option<NaiveDate>,
    /// Last day included (YYYY-MM-DD).
    #[arg(long)]
    to: Option<NaiveDate>,
}

#[derive(Args, Debug)]
struct MaterialsArgs {
    #[arg(long)]
    scaling: String,
    #[arg(long)]
    ratios: String,
    #[arg(long)]
    acquired: Option<String>,
    /// Break requirements down per phase instead of per project.
    #[arg(long)]
    by_phase: bool,
}

fn open(path: &str) -> Result<BufReader<File>> {
    let file = File::open(Path::new(path)).wrap_err_with(|| format!("Failed to open {path}"))?;
    Ok(BufReader::new(file))
}

fn balances(args: BalancesArgs) -> Result<()> {
    let request = BalanceRequest {
        tenant: TenantId(args.tenant),
        base: CurrencyId(args.base),
        alternate: CurrencyId(args.alternate),
        mode: args.mode,
        grouping: args.group_by,
        alternate_rate: args.alternate_rate,
        from: args.from,
        to: args.to,
    };
    tracing::info!(
        tenant = %request.tenant,
        mode = %request.mode,
        grouping = %request.grouping,
        from = ?request.from,
        to = ?request.to,
        "aggregating balances"
    );

    execute_balances(
        &request,
        open(&args.categories)?,
        open(&args.currencies)?,
        open(&args.movements)?,
        std::io::stdout().lock(),
    )?;
    Ok(())
}

fn materials(args: MaterialsArgs) -> Result<()> {
    let request = MaterialRequest {
        by_phase: args.by_phase,
    };
    if args.by_phase && args.acquired.is_some() {
        tracing::warn!("acquired quantities are ignored by the per-phase breakdown");
    }
    tracing::info!(by_phase = request.by_phase, "rolling up material requirements");

    let acquired = args.acquired.as_deref().map(open).transpose()?;
    execute_materials(
        &request,
        open(&args.scaling)?,
        open(&args.ratios)?,
        acquired,
        std::io::stdout().lock(),
    )?;
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = match cli.command {
        Command::Balances(args) => balances(args),
        Command::Materials(args) => materials(args),
    };

    if let Err(err) = result {
        tracing::error!("{err:?}");
        exit(1);
    }
    tracing::debug!("done");
}
