use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use crossbeam_channel::{Receiver, bounded};
use dotenvy::dotenv;
use repeat_cache::config::SourceConfig;
use repeat_cache::hierarchy::ItemKind;
use repeat_cache::reader::FieldGetter;
use repeat_cache::{RecordSource, RepeatingSource};
use tracing::info;

#[derive(Debug, Parser)]
#[command(version, about = "Replay a cached window of records to concurrent streams")]
struct Args {
    /// TOML configuration file; command-line values override it
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Record store to read
    #[arg(long, short = 'i', env = "REPEAT_SOURCE")]
    source: Option<PathBuf>,

    /// Number of records to cache and repeat
    #[arg(long, env = "REPEAT_COUNT")]
    repeat: Option<u32>,

    /// Records to discard before filling the cache
    #[arg(long, env = "SKIP_RECORDS")]
    skip: Option<u32>,

    /// Number of concurrent streams
    #[arg(long, env = "STREAMS")]
    streams: Option<usize>,

    /// Field selection rule ("keep <glob>" or "drop <glob>"), repeatable
    #[arg(long = "field-rule")]
    field_rules: Vec<String>,

    /// Total number of records to deliver across all streams
    #[arg(long, short = 'n', default_value_t = 100)]
    records: u64,

    /// Print every delivered record
    #[arg(long, default_value_t = false)]
    dump: bool,

    /// Print the recognised configuration parameters and exit
    #[arg(long, default_value_t = false)]
    describe: bool,
}

/// One delivered record, as reported by a worker.
#[derive(Debug)]
struct Delivery {
    stream: usize,
    logical_index: u64,
    slot: usize,
    event: u64,
    fields: usize,
    bytes: usize,
}

fn build_config(args: &Args) -> Result<SourceConfig> {
    let mut cfg = match (&args.config, &args.source) {
        (Some(path), _) => {
            SourceConfig::load(path).with_context(|| format!("load config {:?}", path))?
        }
        (None, Some(source)) => SourceConfig::new(source),
        (None, None) => bail!("either --config or --source is required"),
    };
    if let Some(source) = &args.source {
        cfg.source_path = source.clone();
    }
    if let Some(n) = args.repeat {
        cfg.repeat_count = n;
    }
    if let Some(n) = args.skip {
        cfg.skip_records = n;
    }
    if let Some(n) = args.streams {
        cfg.streams = n;
    }
    if !args.field_rules.is_empty() {
        cfg.field_rules = args.field_rules.clone();
    }
    Ok(cfg)
}

fn reporter_thread(rx: Receiver<Delivery>, dump: bool) -> (u64, usize) {
    let mut records = 0u64;
    let mut bytes = 0usize;
    for d in rx {
        records += 1;
        bytes += d.bytes;
        if dump {
            println!(
                "stream={} idx={} slot={} event={} fields={} bytes={}",
                d.stream, d.logical_index, d.slot, d.event, d.fields, d.bytes
            );
        }
    }
    (records, bytes)
}

fn main() -> Result<()> {
    // Load environment variables from .env if present
    let _ = dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    if args.describe {
        for p in SourceConfig::describe() {
            let default = p.default.unwrap_or("<required>");
            println!("{:<14} default={:<12} {}", p.name, default, p.comment);
        }
        return Ok(());
    }

    let cfg = build_config(&args)?;
    let source = RepeatingSource::open(&cfg)
        .with_context(|| format!("open repeating source {:?}", cfg.source_path))?;

    // The hierarchy is shared, so open it once before the streams start.
    loop {
        match source.next_item_kind(0) {
            ItemKind::Container => info!("Container opened"),
            ItemKind::RunGroup => info!("Run {}", source.read_run_group().run),
            ItemKind::LumiGroup => {
                let lumi = source.read_lumi_group();
                info!("Lumi {}:{}", lumi.run, lumi.lumi);
            }
            ItemKind::Record => break,
        }
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        ctrlc::set_handler(move || stop.store(true, Ordering::SeqCst))
            .context("install Ctrl-C handler")?;
    }

    let (tx, rx) = bounded::<Delivery>(8192);
    let reporter = std::thread::spawn(move || reporter_thread(rx, args.dump));

    let remaining = AtomicU64::new(args.records);
    let ids: Vec<_> = source.field_index().iter().map(|(id, _)| id).collect();
    let started = Instant::now();
    std::thread::scope(|scope| -> Result<()> {
        let workers: Vec<_> = (0..source.streams())
            .map(|stream| {
                let (source, tx, stop, remaining, ids) =
                    (&source, tx.clone(), &stop, &remaining, &ids);
                scope.spawn(move || -> Result<()> {
                    let take_one = || {
                        remaining
                            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                            .is_ok()
                    };
                    while !stop.load(Ordering::Relaxed) && take_one() {
                        let view = source.read_record(stream)?;
                        let mut fields = 0;
                        let mut bytes = 0;
                        for id in ids.iter() {
                            if let Some(p) = view.get_field(*id)? {
                                fields += 1;
                                bytes += p.len();
                            }
                        }
                        let _ = tx.send(Delivery {
                            stream,
                            logical_index: view.logical_index(),
                            slot: view.slot(),
                            event: view.metadata().event,
                            fields,
                            bytes,
                        });
                    }
                    Ok(())
                })
            })
            .collect();
        for w in workers {
            w.join().map_err(|_| anyhow::anyhow!("worker stream panicked"))??;
        }
        Ok(())
    })?;
    drop(tx);

    let (records, bytes) =
        reporter.join().map_err(|_| anyhow::anyhow!("reporter thread panicked"))?;
    let elapsed = started.elapsed();
    eprintln!(
        "Delivered {} records ({} field bytes) from a {}-record cache over {} streams in {:.3}s.",
        records,
        bytes,
        source.cache().len(),
        source.streams(),
        elapsed.as_secs_f64()
    );
    Ok(())
}
