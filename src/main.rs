use anyhow::Context;
use clap::Parser;
use scan2bcr::{
    BcrWriter, NmmScanReader, Pipeline, ProcessingConfig, ScanFileName, TopoError, TraceRequest,
    DEFAULT_CHANNEL,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scan2bcr")]
#[command(version, about = "Convert scanning-probe scan records to BCR / ISO 25178-71 files", long_about = None)]
struct Cli {
    /// Input filename including path
    #[arg(value_name = "INPUT")]
    input: Option<PathBuf>,

    /// Result filename including path
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    /// User supplied comment string
    #[arg(long, default_value = "---")]
    comment: String,

    /// Channel to export
    #[arg(short, long, default_value = DEFAULT_CHANNEL, allow_hyphen_values = true)]
    channel: String,

    /// Scan index for multi-scan files
    #[arg(short, long, default_value_t = 0)]
    scan: usize,

    /// Height reference technique (0-12)
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    reference: i32,

    /// Scale factor for height axis
    #[arg(short, long, default_value_t = 1e-6)]
    zscale: f64,

    /// Bias value [um] to be subtracted
    #[arg(short, long, default_value_t = 0.0, allow_hyphen_values = true)]
    bias: f64,

    /// Quiet mode, only errors are reported
    #[arg(short, long)]
    quiet: bool,

    /// Use backtrace profile (when present)
    #[arg(long)]
    back: bool,

    /// Mean of forward and backtrace profile (when present)
    #[arg(long)]
    both: bool,

    /// Difference (forward - backtrace) profile (when present)
    #[arg(long)]
    diff: bool,

    /// Force standardized format
    #[arg(long)]
    strict: bool,

    /// Output file ISO 25178-71:2012 compliant
    #[arg(long)]
    iso: bool,

    /// Perform Heydemann nonlinearity correction
    #[arg(long)]
    heydemann: bool,

    /// Extract single profile (0 = whole field)
    #[arg(short, long, default_value_t = 0, allow_hyphen_values = true)]
    profile: i64,

    /// Force single profiles to be of width 0
    #[arg(long = "1Dprofile")]
    line_only: bool,

    /// Suppress postfixes on the result filename
    #[arg(long = "noPostfix")]
    no_postfix: bool,
}

impl Cli {
    fn processing_config(&self) -> ProcessingConfig {
        ProcessingConfig {
            channel_symbol: self.channel.clone(),
            scan_index: self.scan,
            profile_index: self.profile,
            reference_code: self.reference,
            bias_um: self.bias,
            z_scale: self.zscale,
            trace_request: TraceRequest::from_flags(self.back, self.both, self.diff),
            nonlinearity_correction: self.heydemann,
            strict: self.strict,
            iso_format: self.iso,
            line_only: self.line_only,
            add_postfix: !self.no_postfix,
            user_comment: self.comment.clone(),
            output_path: self.output.clone(),
        }
    }
}

fn init_logging(quiet: bool) {
    let level = if quiet { "error" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let input = cli
        .input
        .as_ref()
        .ok_or_else(|| TopoError::MissingInput("no input file given".to_string()))?;
    let config = cli.processing_config();

    log::info!("{}", scan2bcr::core::trailer::converter_signature());

    let file_name = ScanFileName::new(input).with_scan_index(config.scan_index);
    let mut reader = NmmScanReader::new(file_name)
        .with_context(|| format!("Reading {}", input.display()))?;

    let writer = BcrWriter::new(config.strict, config.iso_format);
    let report = Pipeline::new(config).run(&mut reader, &writer)?;

    if !report.advisories.is_empty() {
        log::info!("Finished with {} advisories", report.advisories.len());
    }
    log::info!(
        "{} x {} points, trace {}, reference: {}",
        report.points_per_profile,
        report.number_of_profiles,
        report.trace,
        report.reference
    );
    log::info!("Done, wrote {}", report.output_path.display());
    Ok(())
}

/// Help and version requests succeed; usage errors are configuration errors
fn usage_exit_code(err: &clap::Error) -> i32 {
    if err.use_stderr() {
        TopoError::Configuration(String::new()).exit_code()
    } else {
        0
    }
}

fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(usage_exit_code(&err));
        }
    };
    init_logging(cli.quiet);

    if let Err(err) = run(&cli) {
        let code = err
            .downcast_ref::<TopoError>()
            .map(TopoError::exit_code)
            .unwrap_or(1);
        log::error!("{:#}", err);
        std::process::exit(code);
    }
}
