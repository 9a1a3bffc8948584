use chrono::{Duration, NaiveDate};
use clap::Parser;
use csv::WriterBuilder;
use girder_lib::{Flow, UAmount};
use itertools::iproduct;
use rand::prelude::*;
use rand::{distributions::WeightedIndex, rngs::StdRng};
use std::fs::File;
use std::io::{self, BufWriter, Cursor, Write};
use std::path::{Path, PathBuf};
use strum::VariantNames;

const CURRENCIES: [(u32, &str, f64); 3] = [(1, "ARS", 1.0), (2, "USD", 1000.0), (3, "EUR", 1100.0)];
const TENANT: u32 = 1;
const WALLETS: u32 = 12;
const COUNTERPARTIES: u32 = 40;
const TASKS: u32 = 200;
const RESOURCES: u32 = 80;
const PHASES: u32 = 6;

#[derive(Debug, Clone, Copy)]
struct Category {
    id: u32,
    parent: Option<u32>,
    flow: Option<Flow>,
}

/// Two system roots per flow with a few levels of tenant subcategories below them.
fn categories(rng: &mut StdRng) -> Vec<Category> {
    let mut out = Vec::new();
    let mut next_id = 1;
    for &flow in &[Flow::Inflow, Flow::Outflow, Flow::Inflow, Flow::Outflow] {
        let root = next_id;
        next_id += 1;
        out.push(Category {
            id: root,
            parent: None,
            flow: Some(flow),
        });

        let mut frontier = vec![root];
        for _depth in 0..3 {
            let mut next = Vec::new();
            for &parent in &frontier {
                for _ in 0..rng.gen_range(1..4) {
                    out.push(Category {
                        id: next_id,
                        parent: Some(parent),
                        flow: None,
                    });
                    next.push(next_id);
                    next_id += 1;
                }
            }
            frontier = next;
        }
    }
    out
}

fn leaves(categories: &[Category]) -> Vec<u32> {
    categories
        .iter()
        .filter(|c| !categories.iter().any(|other| other.parent == Some(c.id)))
        .map(|c| c.id)
        .collect()
}

fn amount_field(buf: &mut [u8; 48], amount: UAmount) -> Result<&[u8], io::Error> {
    let mut cursor = Cursor::new(&mut buf[..]);
    write!(cursor, "{:.2}", amount)?;
    let len = cursor.position() as usize;
    Ok(&buf[..len])
}

fn writer(dir: &Path, name: &str) -> Result<csv::Writer<BufWriter<File>>, io::Error> {
    let file = File::create(dir.join(name))?;
    Ok(WriterBuilder::new().from_writer(BufWriter::new(file)))
}

fn write_categories(dir: &Path, categories: &[Category]) -> Result<(), io::Error> {
    let mut writer = writer(dir, "categories.csv")?;
    writer.write_record(["id", "name", "parent", "tenant", "flow"])?;

    let mut id_buf = itoa::Buffer::new();
    let mut parent_buf = itoa::Buffer::new();
    let mut tenant_buf = itoa::Buffer::new();

    for category in categories {
        let name = match category.flow {
            Some(flow) => format!("{flow} {}", category.id),
            None => format!("Category {}", category.id),
        };
        let parent: &[u8] = match category.parent {
            Some(parent) => parent_buf.format(parent).as_bytes(),
            None => b"",
        };
        // roots are system provided, everything below belongs to the tenant
        let tenant: &[u8] = match category.parent {
            Some(_) => tenant_buf.format(TENANT).as_bytes(),
            None => b"",
        };
        let flow = category.flow.map(|f| f.to_string()).unwrap_or_default();

        writer.write_record([
            id_buf.format(category.id).as_bytes(),
            name.as_bytes(),
            parent,
            tenant,
            flow.as_bytes(),
        ])?;
    }

    writer.flush()
}

fn write_currencies(dir: &Path) -> Result<(), io::Error> {
    let mut writer = writer(dir, "currencies.csv")?;
    writer.write_record(["id", "label"])?;
    let mut id_buf = itoa::Buffer::new();
    for (id, label, _) in CURRENCIES {
        writer.write_record([id_buf.format(id).as_bytes(), label.as_bytes()])?;
    }
    writer.flush()
}

fn write_movements(
    dir: &Path,
    rng: &mut StdRng,
    leaves: &[u32],
    count: u32,
) -> Result<(), io::Error> {
    let mut writer = writer(dir, "movements.csv")?;
    writer.write_record([
        "id",
        "date",
        "amount",
        "currency",
        "rate",
        "wallet",
        "category",
        "counterparty",
    ])?;

    // Mostly base currency, some hard currency, a little of the third.
    let currency_dist =
        WeightedIndex::new([70, 25, 5]).map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
    let start = NaiveDate::from_ymd_opt(2023, 1, 1)
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "invalid start date"))?;

    let mut id_buf = itoa::Buffer::new();
    let mut currency_buf = itoa::Buffer::new();
    let mut wallet_buf = itoa::Buffer::new();
    let mut category_buf = itoa::Buffer::new();
    let mut counterparty_buf = itoa::Buffer::new();
    let mut amount_buf = [0u8; 48];
    let mut rate_buf = [0u8; 48];

    for id in 1..=count {
        let (currency, _, base_rate) = CURRENCIES[currency_dist.sample(rng)];
        let date = start + Duration::days(rng.gen_range(0..730));
        let rate = if currency == 1 {
            UAmount::ONE
        } else {
            UAmount::from_num(base_rate * rng.gen_range(0.8..1.6))
        };
        let amount = UAmount::from_num(rng.gen_range(1.0..50_000.0f64));
        let category = leaves.choose(rng).copied().unwrap_or(1);
        let counterparty: &[u8] = if rng.gen_bool(0.3) {
            counterparty_buf
                .format(rng.gen_range(1..=COUNTERPARTIES))
                .as_bytes()
        } else {
            b""
        };

        writer.write_record([
            id_buf.format(id).as_bytes(),
            date.to_string().as_bytes(),
            amount_field(&mut amount_buf, amount)?,
            currency_buf.format(currency).as_bytes(),
            amount_field(&mut rate_buf, rate)?,
            wallet_buf.format(rng.gen_range(1..=WALLETS)).as_bytes(),
            category_buf.format(category).as_bytes(),
            counterparty,
        ])?;
    }

    writer.flush()
}

fn write_materials(dir: &Path, rng: &mut StdRng) -> Result<(), io::Error> {
    let mut ratios = writer(dir, "ratios.csv")?;
    ratios.write_record(["resource", "task", "per_unit"])?;

    let mut resource_buf = itoa::Buffer::new();
    let mut task_buf = itoa::Buffer::new();
    let mut amount_buf = [0u8; 48];

    // Each task consumes roughly 5% of all resources.
    for (task, resource) in iproduct!(1..=TASKS, 1..=RESOURCES) {
        if !rng.gen_bool(0.05) {
            continue;
        }
        ratios.write_record([
            resource_buf.format(resource).as_bytes(),
            task_buf.format(task).as_bytes(),
            amount_field(&mut amount_buf, UAmount::from_num(rng.gen_range(0.01..25.0f64)))?,
        ])?;
    }
    ratios.flush()?;

    let mut scaling = writer(dir, "scaling.csv")?;
    scaling.write_record(["task", "multiplier", "phase", "phase_order"])?;
    let mut phase_buf = itoa::Buffer::new();
    let mut order_buf = itoa::Buffer::new();

    for (phase, task) in iproduct!(1..=PHASES, 1..=TASKS) {
        if !rng.gen_bool(0.3) {
            continue;
        }
        scaling.write_record([
            task_buf.format(task).as_bytes(),
            amount_field(&mut amount_buf, UAmount::from_num(rng.gen_range(0.5..400.0f64)))?,
            phase_buf.format(phase).as_bytes(),
            order_buf.format(phase).as_bytes(),
        ])?;
    }
    scaling.flush()
}

#[derive(Parser, Debug)]
#[command(name = "girder-generator")]
#[command(about = "Writes a random but consistent set of ledger and material CSV files")]
struct Args {
    /// Directory the CSV files are written to, created if missing.
    #[arg(default_value = ".")]
    dir: PathBuf,
    /// Number of movements to generate.
    #[arg(long, default_value_t = 100_000)]
    count: u32,
    #[arg(long, default_value_t = 42)]
    seed: u64,
}

fn main() -> Result<(), io::Error> {
    let args = Args::parse();
    let dir = args.dir.as_path();
    std::fs::create_dir_all(dir)?;
    let mut rng = StdRng::seed_from_u64(args.seed);

    let categories = categories(&mut rng);
    write_categories(dir, &categories)?;
    write_currencies(dir)?;
    write_movements(dir, &mut rng, &leaves(&categories), args.count)?;
    write_materials(dir, &mut rng)?;

    eprintln!(
        "wrote {} movements over {} categories ({}) to {}",
        args.count,
        categories.len(),
        Flow::VARIANTS.join("/"),
        dir.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Args::command().debug_assert();
    }

    #[test]
    fn defaults_apply_when_flags_are_omitted() {
        let args = Args::try_parse_from(["girder-generator"]).unwrap();
        assert_eq!(args.dir, PathBuf::from("."));
        assert_eq!(args.count, 100_000);
        assert_eq!(args.seed, 42);

        let args = Args::try_parse_from(["girder-generator", "out", "--count", "250", "--seed", "7"])
            .unwrap();
        assert_eq!(args.dir, PathBuf::from("out"));
        assert_eq!(args.count, 250);
        assert_eq!(args.seed, 7);
    }

    #[test]
    fn malformed_numbers_are_rejected() {
        assert!(Args::try_parse_from(["girder-generator", "out", "--count", "10k"]).is_err());
        assert!(Args::try_parse_from(["girder-generator", "out", "--seed", "-1"]).is_err());
        assert!(Args::try_parse_from(["girder-generator", "out", "10k"]).is_err());
    }
}
