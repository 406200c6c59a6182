use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use log::{info, Level};
use simple_logger::init_with_level;

use rusalt::caller::{CallOutcome, EventCaller};
use rusalt::classify::PatternClassifier;
use rusalt::config::{
    ClassifierConfig, CriterionWeights, GenomeContext, GroupingConfig, DEFAULT_DOMINANT_FRACTION,
    DEFAULT_FLANK_SIZE, DEFAULT_GENOME_LENGTH, DEFAULT_HET_LIMIT, DEFAULT_HIGH_HET,
    DEFAULT_MULTIPLE_THRESHOLD, DEFAULT_NOISE, DEFAULT_ORI_H, DEFAULT_ORI_L, DEFAULT_RADIUS,
};
use rusalt::grouping::SpatialGrouper;
use rusalt::io;
use rusalt::reference::{InMemoryReference, ReferenceSequence};
use rusalt::rusalt_structs::{BedInterval, RawCluster};

/// Classify mitochondrial deletions/duplications from breakpoint clusters.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Log per-event detail
    #[arg(long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Type clusters as deletions/duplications and write TSV + VCF
    Call(InputArgs),
    /// Call, group and classify one sample
    Classify(ClassifyArgs),
}

#[derive(clap::Args, Debug)]
struct InputArgs {
    /// Sample name, also the output file prefix
    #[arg(long)]
    prefix: String,

    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Cluster table from the breakpoint-clustering step
    #[arg(long)]
    cluster: PathBuf,

    /// Breakpoint table from the breakpoint-clustering step
    #[arg(long)]
    breakpoint: PathBuf,

    /// Reference FASTA, enables flanking sequence and microhomology output
    #[arg(long)]
    reference: Option<PathBuf>,

    /// BED file of regions to flag
    #[arg(long)]
    blacklist: Option<PathBuf>,

    #[arg(long, default_value_t = DEFAULT_GENOME_LENGTH)]
    genome_length: i64,

    #[arg(long, default_value_t = DEFAULT_ORI_H.0)]
    ori_h_start: i64,

    #[arg(long, default_value_t = DEFAULT_ORI_H.1)]
    ori_h_end: i64,

    #[arg(long, default_value_t = DEFAULT_ORI_L.0)]
    ori_l_start: i64,

    #[arg(long, default_value_t = DEFAULT_ORI_L.1)]
    ori_l_end: i64,

    /// Minimum heteroplasmy fraction for an event to be reported
    #[arg(long, default_value_t = DEFAULT_HET_LIMIT)]
    het_limit: f64,

    #[arg(long, default_value_t = DEFAULT_FLANK_SIZE)]
    flank_size: usize,
}

#[derive(clap::Args, Debug)]
struct ClassifyArgs {
    #[command(flatten)]
    input: InputArgs,

    /// Grouping radius in bp
    #[arg(long, default_value_t = DEFAULT_RADIUS)]
    radius: i64,

    /// Heteroplasmy (%) marking a high-level event
    #[arg(long, default_value_t = DEFAULT_HIGH_HET)]
    high_het: f64,

    /// Heteroplasmy (%) below which events are ignored
    #[arg(long, default_value_t = DEFAULT_NOISE)]
    noise: f64,

    #[arg(long, default_value_t = DEFAULT_MULTIPLE_THRESHOLD)]
    multiple_threshold: usize,

    #[arg(long, default_value_t = DEFAULT_DOMINANT_FRACTION)]
    dominant_fraction: f64,

    /// JSON classifier settings; replaces the threshold flags above
    #[arg(long)]
    classify_config: Option<PathBuf>,
}

impl InputArgs {
    fn context(&self) -> GenomeContext {
        GenomeContext {
            genome_length: self.genome_length,
            ori_h: (self.ori_h_start, self.ori_h_end),
            ori_l: (self.ori_l_start, self.ori_l_end),
            het_limit: self.het_limit,
            flank_size: self.flank_size,
        }
    }

    fn output(&self, suffix: &str) -> PathBuf {
        self.output_dir.join(format!("{}.{suffix}", self.prefix))
    }
}

impl ClassifyArgs {
    fn classifier_config(&self) -> anyhow::Result<ClassifierConfig> {
        match &self.classify_config {
            Some(path) => {
                let text = fs::read_to_string(path)
                    .map_err(|e| rusalt::error::Error::io(e, path))?;
                Ok(ClassifierConfig::from_json(&text)?)
            }
            None => Ok(ClassifierConfig {
                high_het: self.high_het,
                noise: self.noise,
                multiple_threshold: self.multiple_threshold,
                dominant_fraction: self.dominant_fraction,
                weights: CriterionWeights::default(),
            }),
        }
    }
}

/// Inputs loaded once and shared read-only by the stages.
struct Inputs {
    clusters: Vec<RawCluster>,
    blacklist: Option<Vec<BedInterval>>,
    reference: Option<InMemoryReference>,
}

fn load_inputs(args: &InputArgs) -> anyhow::Result<Inputs> {
    fs::create_dir_all(&args.output_dir)
        .map_err(|e| rusalt::error::Error::io(e, &args.output_dir))?;

    let clusters = io::read_clusters(&args.cluster, &args.breakpoint)?;
    let blacklist = args
        .blacklist
        .as_deref()
        .map(io::read_blacklist)
        .transpose()?;
    let reference = args
        .reference
        .as_deref()
        .map(InMemoryReference::from_fasta)
        .transpose()?;

    if let Some(reference) = &reference {
        if reference.length() != args.genome_length {
            log::warn!(
                "Reference length {} differs from --genome-length {}",
                reference.length(),
                args.genome_length
            );
        }
    }

    Ok(Inputs {
        clusters,
        blacklist,
        reference,
    })
}

fn build_caller<'a>(context: GenomeContext, inputs: &'a Inputs) -> anyhow::Result<EventCaller<'a>> {
    let mut caller = EventCaller::new(context)?;
    if let Some(blacklist) = &inputs.blacklist {
        caller = caller.with_blacklist(blacklist);
    }
    if let Some(reference) = &inputs.reference {
        caller = caller.with_reference(reference);
    }
    Ok(caller)
}

fn contig(inputs: &Inputs) -> &str {
    inputs
        .reference
        .as_ref()
        .map(|r| r.name.as_str())
        .filter(|name| !name.is_empty())
        .unwrap_or("chrM")
}

fn report_rejections(calls: &[CallOutcome]) {
    for call in calls {
        if let CallOutcome::Rejected(err) = call {
            log::error!("{err}");
        }
    }
}

fn run_call(args: &InputArgs) -> anyhow::Result<()> {
    let inputs = load_inputs(args)?;
    let context = args.context();
    let caller = build_caller(context.clone(), &inputs)?;

    let calls = caller.call_all(&args.prefix, &inputs.clusters);
    report_rejections(&calls);
    let events: Vec<_> = calls.into_iter().filter_map(CallOutcome::into_event).collect();

    io::write_call_tsv(&args.output("rusalt_call.tsv"), &events)?;
    io::write_vcf(
        &args.output("rusalt.vcf"),
        &events,
        &context,
        contig(&inputs),
    )?;
    Ok(())
}

fn run_classify(args: &ClassifyArgs) -> anyhow::Result<()> {
    let input = &args.input;
    let inputs = load_inputs(input)?;
    let context = input.context();
    let caller = build_caller(context.clone(), &inputs)?;
    let grouper = SpatialGrouper::new(&GroupingConfig { radius: args.radius }, context.genome_length);
    let classifier = PatternClassifier::new(args.classifier_config()?)?;

    let analysis = rusalt::analyze_sample(
        &input.prefix,
        &inputs.clusters,
        &caller,
        &grouper,
        &classifier,
    )?;
    report_rejections(&analysis.calls);

    io::write_call_tsv(&input.output("rusalt_call.tsv"), &analysis.events)?;
    io::write_vcf(
        &input.output("rusalt.vcf"),
        &analysis.events,
        &context,
        contig(&inputs),
    )?;
    io::write_classify_metadata(
        &input.output("rusalt_classify_metadata.tsv"),
        &analysis.events,
        &analysis.grouping,
    )?;
    io::write_report(
        &input.output("rusalt_classify.txt"),
        &input.output("rusalt_classify.json"),
        &analysis.verdict,
    )?;
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let start = std::time::Instant::now();
    let args = Args::parse();

    let level = if args.verbose { Level::Debug } else { Level::Info };
    init_with_level(level)?;

    info!("rusalt v{}", env!("CARGO_PKG_VERSION"));
    match &args.command {
        Command::Call(input) => run_call(input)?,
        Command::Classify(classify) => run_classify(classify)?,
    }

    info!("Elapsed: {:.2?}", start.elapsed());
    Ok(())
}
