use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use sf_app::{App, AppResult};
use sf_compile::compile;
use sf_graph::Graph;
use sf_project::{SCHEMA_VERSION, load_model, save_model};

#[derive(Parser)]
#[command(name = "sf-cli")]
#[command(about = "StockFlow CLI - system dynamics model runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a model file: schema, wiring and acyclicity
    Validate {
        /// Path to the model file (.json/.sfm/.yaml)
        model_path: PathBuf,
    },
    /// Run a model and print final variable values
    Run {
        /// Path to the model file
        model_path: PathBuf,
        /// End time (overrides step * n_steps from the file)
        #[arg(long)]
        t_end: Option<f64>,
        /// Integration order: 1, 2 or 4
        #[arg(long)]
        order: Option<usize>,
        /// Write a step-by-step log of all variables to this file
        #[arg(long)]
        log: Option<PathBuf>,
    },
    /// Upgrade a model file to the current schema version
    Migrate {
        /// Path to the model file to read
        model_path: PathBuf,
        /// Path to write the upgraded file
        out_path: PathBuf,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Validate { model_path } => cmd_validate(&model_path),
        Commands::Run {
            model_path,
            t_end,
            order,
            log,
        } => cmd_run(&model_path, t_end, order, log.as_deref()),
        Commands::Migrate {
            model_path,
            out_path,
        } => cmd_migrate(&model_path, &out_path),
    }
}

fn cmd_validate(model_path: &Path) -> AppResult<()> {
    println!("Validating model: {}", model_path.display());
    let file = load_model(model_path)?;
    let mut graph = Graph::new();
    file.populate(&mut graph)?;
    compile(&mut graph)?;
    println!(
        "✓ Model is valid ({} items, {} wires, {} variables)",
        graph.item_count(),
        graph.wire_count(),
        graph.values.len()
    );
    Ok(())
}

fn cmd_run(
    model_path: &Path,
    t_end: Option<f64>,
    order: Option<usize>,
    log: Option<&Path>,
) -> AppResult<()> {
    let mut app = App::new();
    app.load_file(model_path)?;
    if let Some(order) = order {
        app.solver.order = order;
    }
    if let Some(t_end) = t_end {
        let span = t_end - app.solver.t0;
        app.solver.n_steps = ((span / app.solver.step).ceil() as usize).max(1);
    }

    if let Some(path) = log {
        let watched: Vec<String> = app.graph.values.iter().map(|(id, _)| id.clone()).collect();
        app.sim.open_log(path, &watched)?;
    }

    println!("Running: {}", model_path.display());
    println!(
        "  step = {}, steps = {}, order = {}",
        app.solver.step, app.solver.n_steps, app.solver.order
    );
    app.reset()?;
    let (t, _) = app.step()?;
    println!("✓ Finished at t = {t}");

    println!("\nFinal values:");
    for (id, value) in app.graph.values.iter() {
        println!("  {:<24} {}", id, value.value);
    }
    Ok(())
}

fn cmd_migrate(model_path: &Path, out_path: &Path) -> AppResult<()> {
    let file = load_model(model_path)?;
    save_model(out_path, &file)?;
    println!(
        "✓ Wrote {} at schema version {}",
        out_path.display(),
        SCHEMA_VERSION
    );
    Ok(())
}
