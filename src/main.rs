use std::path::{Path, PathBuf};
use std::process::ExitCode;

use analisi_report::{
    AssemblyPlan, Error, PageGeometry, ReportConfig, ReportRecord, SectionKind, SectionRenderer,
    content_disposition,
};
use clap::{Parser, Subcommand};

const READY_MESSAGE: &str = "Analisi report generator is ready";

#[derive(Parser)]
#[command(
    name = "analisi-report",
    version,
    about = "Compose analysis reports into the strategy template"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Build the full report for one record
    Generate {
        /// Record JSON, `{"data": {...}}` or the bare field object
        record: PathBuf,
        /// Output file (defaults to analisi_<slug>.pdf)
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[command(flatten)]
        opts: RenderOpts,
        /// Template PDF
        #[arg(long)]
        template: Option<PathBuf>,
        /// Assembly plan JSON (defaults to the built-in plan)
        #[arg(long)]
        plan: Option<PathBuf>,
    },
    /// Render the sections only, without the template
    Sections {
        record: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Only this section (repeatable), e.g. `competitors`
        #[arg(long = "section")]
        sections: Vec<SectionKind>,
        #[command(flatten)]
        opts: RenderOpts,
    },
    /// Print the built-in assembly plan as JSON
    Plan,
    /// Print a liveness message
    Status,
}

#[derive(clap::Args)]
struct RenderOpts {
    /// Page geometry preset: current or legacy
    #[arg(long)]
    geometry: Option<PageGeometry>,
    #[arg(long)]
    font_regular: Option<PathBuf>,
    #[arg(long)]
    font_bold: Option<PathBuf>,
    /// Title used when the record names no client
    #[arg(long)]
    title: Option<String>,
}

impl RenderOpts {
    fn apply(self, config: &mut ReportConfig) {
        if let Some(geometry) = self.geometry {
            config.geometry = geometry;
        }
        if self.font_regular.is_some() {
            config.font_regular = self.font_regular;
        }
        if self.font_bold.is_some() {
            config.font_bold = self.font_bold;
        }
        if let Some(title) = self.title {
            config.default_title = title;
        }
    }
}

fn load_record(path: &Path) -> Result<ReportRecord, Error> {
    let file = std::fs::File::open(path)?;
    ReportRecord::from_reader(std::io::BufReader::new(file))
}

fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Generate {
            record,
            output,
            opts,
            template,
            plan,
        } => {
            let mut config = ReportConfig::from_env();
            opts.apply(&mut config);
            if let Some(template) = template {
                config.template_path = template;
            }
            if let Some(plan) = plan {
                config.plan = AssemblyPlan::load(&plan)?;
            }
            let report = analisi_report::generate_report(&record, output.as_deref(), config)?;
            log::info!("Content-Disposition: {}", content_disposition(&report.slug));
            println!("{}", report.path.display());
        }
        Command::Sections {
            record,
            output,
            sections,
            opts,
        } => {
            let mut config = ReportConfig::from_env();
            opts.apply(&mut config);
            let record = load_record(&record)?;
            let renderer = SectionRenderer::from_config(&config)?;
            let bytes = if sections.is_empty() {
                renderer.render_combined(&record)?
            } else {
                renderer.render_selected(&record, &sections)?
            };
            let out =
                output.unwrap_or_else(|| PathBuf::from(format!("sezioni_{}.pdf", record.slug())));
            std::fs::write(&out, bytes)?;
            println!("{}", out.display());
        }
        Command::Plan => {
            let json = serde_json::to_string_pretty(&AssemblyPlan::builtin())
                .map_err(|e| Error::InvalidPlan(e.to_string()))?;
            println!("{json}");
        }
        Command::Status => println!("{READY_MESSAGE}"),
    }
    Ok(())
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
