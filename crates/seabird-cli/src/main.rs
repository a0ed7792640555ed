use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use uuid::Uuid;

use seabird_core::{AllocationRun, covariates, run_allocation};
use seabird_store::{RunConfig, RunInputs, Store, write_covariates, write_distributions};

#[derive(Parser)]
#[command(name = "seabird", about = "Allocate seabird colony counts onto a model grid")]
struct Cli {
    /// Enable verbose debug output
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full allocation and write one table per group
    Allocate {
        /// Run configuration (TOML)
        #[arg(long)]
        config: PathBuf,

        /// Override the output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Archive the run into this SQLite database
        #[arg(long)]
        archive: Option<PathBuf>,

        /// Allocate colonies on a single thread
        #[arg(long)]
        sequential: bool,
    },

    /// Load every input and report what a run would see
    Check {
        #[arg(long)]
        config: PathBuf,
    },

    /// Write the survey covariate table for the density model
    Covariates {
        #[arg(long)]
        config: PathBuf,

        /// Survey CSV (id, lon, lat, density)
        #[arg(long)]
        surveys: PathBuf,

        /// Output CSV path
        #[arg(long)]
        output: PathBuf,
    },

    /// List archived runs
    Runs {
        #[arg(long)]
        archive: PathBuf,
    },

    /// Print one group's table from an archived run
    Show {
        #[arg(long)]
        archive: PathBuf,

        #[arg(long)]
        run: Uuid,

        #[arg(long)]
        group: String,
    },
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into())
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match &cli.command {
        Commands::Allocate {
            config,
            output,
            archive,
            sequential,
        } => cmd_allocate(config, output.as_deref(), archive.as_deref(), *sequential),
        Commands::Check { config } => cmd_check(config),
        Commands::Covariates {
            config,
            surveys,
            output,
        } => cmd_covariates(config, surveys, output),
        Commands::Runs { archive } => cmd_runs(archive),
        Commands::Show {
            archive,
            run,
            group,
        } => cmd_show(archive, *run, group),
    }
}

fn load_config(path: &Path) -> Result<RunConfig> {
    RunConfig::load(path).with_context(|| format!("failed to load config {}", path.display()))
}

fn load_inputs(config: &RunConfig) -> Result<RunInputs> {
    RunInputs::load(config).context("failed to load run inputs")
}

fn open_archive(path: &Path) -> Result<Store> {
    Store::open(path).with_context(|| format!("failed to open archive {}", path.display()))
}

fn cmd_allocate(
    config_path: &Path,
    output: Option<&Path>,
    archive: Option<&Path>,
    sequential: bool,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(dir) = output {
        config.output.dir = dir.to_path_buf();
    }
    if let Some(path) = archive {
        config.output.archive = Some(path.to_path_buf());
    }
    if sequential {
        config.allocation.parallel = false;
    }

    let inputs = load_inputs(&config)?;
    if inputs.grid.is_empty() {
        bail!("grid has no usable cells");
    }

    let run = run_allocation(
        &inputs.colonies,
        &inputs.land,
        &inputs.grid,
        &config.allocation_config(),
    );

    let paths = write_distributions(&config.output.dir, &run.distributions)
        .context("failed to write group tables")?;
    for path in paths {
        tracing::debug!("wrote {}", path.display());
    }

    print_summary(&run);

    if let Some(path) = &config.output.archive {
        let store = open_archive(path)?;
        let run_id = store
            .save_run(&run, &inputs.grid, &config)
            .context("failed to archive run")?;
        println!("archived: {run_id}");
    }

    Ok(())
}

fn print_summary(run: &AllocationRun) {
    println!(
        "colonies: {} allocated, {} skipped, {} with empty buffers",
        run.colonies.len(),
        run.skipped.len(),
        run.empty_buffers()
    );
    for d in &run.distributions {
        let adjusted = d
            .adjusted_cell
            .map(|id| format!(", floor paid by cell {id}"))
            .unwrap_or_default();
        println!(
            "group {}: abundance={:.2}, cells={}, floored={}{}",
            d.group,
            d.total_abundance,
            d.eligible_rows().count(),
            d.floored_cells,
            adjusted
        );
    }
    for failure in &run.failures {
        println!("condition: {failure}");
    }
    for warning in run.warnings() {
        println!("warning: {warning}");
    }
}

fn cmd_check(config_path: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let inputs = load_inputs(&config)?;

    let with_radius = inputs
        .colonies
        .iter()
        .filter(|c| c.radius_km.is_some())
        .count();

    println!("colonies:       {}", inputs.colonies.len());
    println!("with radius:    {with_radius}");
    println!("cells:          {}", inputs.grid.len());
    println!(
        "eligible cells: {}",
        inputs.grid.eligible_count(&config.eligibility)
    );
    println!("land polygons:  {}", inputs.land.geometry().0.len());
    if !inputs.missing_radius.is_empty() {
        let species: Vec<&str> = inputs.missing_radius.iter().map(String::as_str).collect();
        println!("missing radius: {}", species.join(", "));
    }
    Ok(())
}

fn cmd_covariates(config_path: &Path, surveys: &Path, output: &Path) -> Result<()> {
    let config = load_config(config_path)?;
    let inputs = load_inputs(&config)?;
    let points = inputs
        .load_surveys(surveys)
        .with_context(|| format!("failed to read surveys {}", surveys.display()))?;

    let rows = covariates(&points, &inputs.land, config.allocation.units_per_km);
    write_covariates(output, &rows)
        .with_context(|| format!("failed to write {}", output.display()))?;

    println!("wrote {} survey rows to {}", rows.len(), output.display());
    Ok(())
}

fn cmd_runs(archive: &Path) -> Result<()> {
    let store = open_archive(archive)?;
    let runs = store.list_runs().context("failed to list runs")?;
    if runs.is_empty() {
        println!("(no runs archived)");
        return Ok(());
    }
    for run in runs {
        println!(
            "{}  {}  colonies={} skipped={} groups={} cells={}",
            run.id,
            run.created_at,
            run.colony_count,
            run.skipped_count,
            run.group_count,
            run.cell_count
        );
    }
    Ok(())
}

fn cmd_show(archive: &Path, run_id: Uuid, group: &str) -> Result<()> {
    let store = open_archive(archive)?;
    if store.run_config(run_id)?.is_none() {
        bail!("no archived run {run_id}");
    }
    let rows = store
        .load_group(run_id, group)
        .with_context(|| format!("failed to load group '{group}'"))?;
    if rows.is_empty() {
        bail!("run {run_id} has no group '{group}'");
    }

    println!("box_id,botz,boundary,eligible,abundance,proportion");
    for row in rows {
        let proportion = row.proportion.map(|p| p.to_string()).unwrap_or_default();
        println!(
            "{},{},{},{},{},{}",
            row.cell_id, row.botz, row.boundary, row.eligible, row.abundance, proportion
        );
    }
    for condition in store.load_conditions(run_id)? {
        eprintln!("condition: {condition}");
    }
    Ok(())
}
