use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use repeat_cache::error::Error;
use repeat_cache::field_index::FieldIndex;
use repeat_cache::selection::SelectionRules;
use repeat_cache::store::{FileStore, RecordStore};
use time::format_description::well_known::Rfc3339;

#[derive(Debug, Parser)]
#[command(about = "Read a record store sequentially, verify frame CRCs and summarise it")]
struct Args {
    /// Input file path to read
    #[arg(long, short = 'i')]
    input: PathBuf,

    /// Field selection rule ("keep <glob>" or "drop <glob>"), repeatable
    #[arg(long = "field-rule")]
    field_rules: Vec<String>,

    /// Print the metadata of every record
    #[arg(long, default_value_t = false)]
    dump: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    let rules = if args.field_rules.is_empty() {
        SelectionRules::keep_all()
    } else {
        SelectionRules::parse(&args.field_rules)?
    };
    let mut store = FileStore::open(&args.input, &rules)
        .with_context(|| format!("open {:?}", args.input))?;

    let header = store.header();
    let created = header
        .created_at()
        .and_then(|t| t.format(&Rfc3339).ok())
        .unwrap_or_else(|| "?".into());
    eprintln!("Header: v{} created={} fields={}", header.version, created, header.schema.len());
    for d in store.schema() {
        eprintln!("  field {:>6} {:<10} {}", d.id.0, format!("{:?}", d.scope), d.name);
    }
    let index = FieldIndex::build(store.schema());

    let mut records = 0u64;
    let mut bytes = 0usize;
    let mut per_lumi: BTreeMap<(u32, u32), u64> = BTreeMap::new();
    loop {
        let rec = match store.read_next() {
            Ok(rec) => rec,
            Err(Error::EndOfStore) => break,
            Err(e) => return Err(e).with_context(|| format!("record {}", records)),
        };
        records += 1;
        *per_lumi.entry((rec.metadata.run, rec.metadata.lumi)).or_default() += 1;
        let present = rec.fields.iter().filter(|f| index.resolve(f.id).is_ok()).count();
        bytes += rec.fields.iter().map(|f| f.bytes.len()).sum::<usize>();
        if args.dump {
            println!(
                "run={} lumi={} event={} history={:#x} selections={:?} fields={}/{}",
                rec.metadata.run,
                rec.metadata.lumi,
                rec.metadata.event,
                rec.metadata.process_history,
                rec.metadata.selection_ids,
                present,
                index.len()
            );
        }
    }
    for ((run, lumi), n) in &per_lumi {
        eprintln!("  {}:{} -> {} records", run, lumi, n);
    }
    eprintln!(
        "Read {} records ({} field bytes) in {} lumi blocks.",
        records,
        bytes,
        per_lumi.len()
    );
    Ok(())
}
