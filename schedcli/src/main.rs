use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use sheetsched::{
    Delivery, DirectoryDelivery, ExportConfig, ExportedFile, ScheduleData, ScheduleExporter,
    TemplateSource,
};
use std::fs;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod report;

#[derive(Parser)]
#[command(name = "schedcli")]
#[command(about = "Export school timetables into XLSX templates", long_about = None)]
#[command(version)]
struct Cli {
    /// Schedule data (JSON with teachers, slots, notes and gradeSections)
    #[arg(short, long, value_name = "JSON")]
    data: PathBuf,

    /// Path to configuration file (TOML)
    #[arg(short, long, value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the template files
    #[arg(short, long, value_name = "DIR", default_value = "templates")]
    templates: PathBuf,

    /// Base URL to fetch templates from instead of the templates directory
    #[cfg(feature = "remote-templates")]
    #[arg(long, value_name = "URL")]
    template_url: Option<String>,

    /// Directory the exported workbook is written to
    #[arg(short, long, value_name = "DIR", default_value = ".")]
    output: PathBuf,

    /// Output format
    #[arg(short, long, value_enum, default_value = "human")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Master schedule, one row per teacher
    Master,
    /// Weekly schedule of one teacher
    Teacher {
        /// Teacher id
        #[arg(long)]
        id: String,
    },
    /// One sheet per teacher
    AllTeachers,
    /// Weekly schedule of one class
    Class {
        #[arg(long)]
        grade: u32,
        #[arg(long)]
        section: u32,
    },
    /// One sheet per class
    AllClasses,
}

#[derive(Clone, ValueEnum)]
enum OutputFormat {
    /// Human-readable colored output
    Human,
    /// JSON output for scripting
    Json,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "sheetsched=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        ExportConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {}", config_path.display()))?
    } else {
        // Try to load default config from current directory if it exists
        let default_config_path = PathBuf::from("sheetsched.toml");
        if default_config_path.exists() {
            ExportConfig::from_file(&default_config_path).with_context(|| {
                format!(
                    "Failed to load config from {}",
                    default_config_path.display()
                )
            })?
        } else {
            ExportConfig::default()
        }
    };
    config.validate().context("Invalid configuration")?;

    let content = fs::read_to_string(&cli.data)
        .with_context(|| format!("Failed to read schedule data from {}", cli.data.display()))?;
    let data = ScheduleData::from_json(&content)
        .with_context(|| format!("Failed to parse schedule data in {}", cli.data.display()))?;
    debug!(
        teachers = data.teachers.len(),
        slots = data.slots.len(),
        "loaded schedule data"
    );

    #[cfg(feature = "remote-templates")]
    {
        if let Some(url) = &cli.template_url {
            let source = sheetsched::HttpSource::new(url.as_str(), 30)
                .context("Failed to create HTTP client")?;
            let exporter = ScheduleExporter::with_config(source, config);
            return run(&cli, &exporter, &data);
        }
    }

    let source = sheetsched::DirectorySource::new(&cli.templates);
    let exporter = ScheduleExporter::with_config(source, config);
    run(&cli, &exporter, &data)
}

fn run<S: TemplateSource>(
    cli: &Cli,
    exporter: &ScheduleExporter<S>,
    data: &ScheduleData,
) -> Result<()> {
    let file = export(&cli.command, exporter, data)?;

    let path = DirectoryDelivery::new(&cli.output)
        .deliver(&file)
        .with_context(|| format!("Failed to write {} into {}", file.filename, cli.output.display()))?;

    match cli.format {
        OutputFormat::Human => report::print_human(&file, &path),
        OutputFormat::Json => report::print_json(&file, &path)?,
    }

    Ok(())
}

fn export<S: TemplateSource>(
    command: &Command,
    exporter: &ScheduleExporter<S>,
    data: &ScheduleData,
) -> Result<ExportedFile> {
    let file = match command {
        Command::Master => {
            exporter.export_master_schedule(&data.teachers, &data.slots, &data.notes)
        }
        Command::Teacher { id } => {
            let teacher = data
                .teacher(id)
                .with_context(|| format!("Unknown teacher id '{id}'"))?;
            exporter.export_teacher_schedule(teacher, &data.slots)
        }
        Command::AllTeachers => exporter.export_all_teachers(&data.teachers, &data.slots),
        Command::Class { grade, section } => {
            exporter.export_class_schedule(*grade, *section, &data.slots, &data.teachers)
        }
        Command::AllClasses => exporter.export_all_classes(
            &data.slots,
            &data.teachers,
            data.grade_sections.as_ref(),
        ),
    };

    file.context("Export failed")
}
