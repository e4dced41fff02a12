use std::io::{BufWriter, Write};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use eyre::{Result, WrapErr};

use rnakit_rpkm_rs::threads::thread_pool;
use rnakit_rpkm_rs::{ExonTable, IntervalTagger, RegionCounter, RpkmPipeline, Sample, TagOutcome};

#[derive(Parser)]
#[command(name = "rnakit")]
#[command(about = "Constitutive-exon RPKM quantification of RNA-Seq alignments", long_about = None)]
#[command(version)]
struct Cli {
    /// Increase logging verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct TaggerOptions {
    /// Interval annotation tool
    #[arg(long, value_name = "PROGRAM", default_value = IntervalTagger::DEFAULT_TAGGER)]
    tagger: String,

    /// SAM/BAM conversion tool
    #[arg(long, value_name = "PROGRAM", default_value = IntervalTagger::DEFAULT_SAMTOOLS)]
    samtools: String,

    /// Label attached to the intervals
    #[arg(short, long, default_value = IntervalTagger::DEFAULT_LABEL)]
    label: String,

    /// Minimum overlap as a fraction of the alignment
    #[arg(short = 'f', long, value_name = "FLOAT", default_value = "1.0")]
    min_overlap: f64,
}

impl TaggerOptions {
    fn build(&self) -> Result<IntervalTagger> {
        IntervalTagger::builder()
            .set_tagger(&self.tagger)
            .set_samtools(&self.samtools)
            .set_label(&self.label)
            .set_min_overlap(self.min_overlap)
            .build()
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Keep only alignments overlapping the given intervals
    Tag {
        /// Input alignments (BAM)
        #[arg(value_name = "ALIGNMENTS")]
        alignments: PathBuf,

        /// Intervals (GFF)
        #[arg(value_name = "INTERVALS")]
        intervals: PathBuf,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output_dir: PathBuf,

        #[command(flatten)]
        tagger: TaggerOptions,
    },

    /// Count reads per interval in tagged alignments
    Count {
        /// Tagged alignments (BAM or SAM)
        #[arg(value_name = "TAGGED")]
        tagged: PathBuf,

        /// Label attached to the intervals
        #[arg(short, long, default_value = IntervalTagger::DEFAULT_LABEL)]
        label: String,
    },

    /// Compute gene-level RPKM tables for a sample
    Rpkm {
        /// Sample label
        #[arg(short, long)]
        sample: String,

        /// Input alignments (BAM)
        #[arg(value_name = "ALIGNMENTS")]
        alignments: PathBuf,

        /// Total number of mapped reads in the sample
        #[arg(short, long, value_name = "INT")]
        mapped_reads: u64,

        /// Constitutive exon table, as NAME=GFF:GENES (repeatable)
        #[arg(long = "table", value_name = "NAME=GFF:GENES", required = true, value_parser = parse_table)]
        tables: Vec<TableSpec>,

        /// Output directory
        #[arg(short, long, value_name = "DIR")]
        output_dir: PathBuf,

        /// Worker threads; negative values leave that many cores idle
        #[arg(short, long, value_name = "INT", default_value = "1", allow_hyphen_values = true)]
        threads: isize,

        #[command(flatten)]
        tagger: TaggerOptions,
    },
}

#[derive(Clone)]
struct TableSpec {
    name: String,
    gff: PathBuf,
    genes: PathBuf,
}

fn parse_table(value: &str) -> Result<TableSpec, String> {
    let (name, files) = value
        .split_once('=')
        .ok_or_else(|| format!("Table must be NAME=GFF:GENES, got {value}"))?;
    let (gff, genes) = files
        .split_once(':')
        .ok_or_else(|| format!("Table must be NAME=GFF:GENES, got {value}"))?;
    if name.is_empty() || gff.is_empty() || genes.is_empty() {
        return Err(format!("Table must be NAME=GFF:GENES, got {value}"));
    }
    Ok(TableSpec {
        name: name.to_owned(),
        gff: PathBuf::from(gff),
        genes: PathBuf::from(genes),
    })
}

fn run(command: Commands) -> Result<()> {
    match command {
        Commands::Tag {
            alignments,
            intervals,
            output_dir,
            tagger,
        } => {
            let outcome = tagger.build()?.tag(&alignments, &intervals, &output_dir)?;
            if let TagOutcome::Created { stats, .. } = &outcome {
                log::info!(
                    "Forwarded {} headers and {} hits, dropped {} alignments",
                    stats.headers(),
                    stats.hits(),
                    stats.filtered()
                );
            }
            println!("{}", outcome.path().display());
        }
        Commands::Count { tagged, label } => {
            let counts = RegionCounter::new(label).count_path(&tagged)?;

            let mut stdout = BufWriter::new(std::io::stdout().lock());
            writeln!(stdout, "region\tcounts")?;
            for (region, count) in counts.sorted() {
                writeln!(stdout, "{region}\t{count}")?;
            }
            stdout.flush().wrap_err("Failed to write counts")?;
        }
        Commands::Rpkm {
            sample,
            alignments,
            mapped_reads,
            tables,
            output_dir,
            threads,
            tagger,
        } => {
            let tables = tables
                .into_iter()
                .map(|x| ExonTable::load(x.name, x.gff, &x.genes))
                .collect::<Result<Vec<_>>>()?;

            let pipeline = RpkmPipeline::builder(output_dir)
                .set_tagger(tagger.build()?)
                .set_thread_pool(thread_pool(threads)?)
                .build()?;

            let sample = Sample::new(sample, alignments, mapped_reads);
            for (table, path) in pipeline.run(&sample, &tables)? {
                println!("{table}\t{}", path.display());
            }
        }
    }
    Ok(())
}

fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .format_target(false)
        .init();

    if let Err(err) = run(cli.command) {
        log::error!("{err:#}");
        std::process::exit(1);
    }
}
