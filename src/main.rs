use clap::{App, Arg};
use genepath::fasta::FASTARecord;
use genepath::model::{HiddenMarkovModel, ModelConfig};
use genepath::Decoded;
#[macro_use]
extern crate log;

fn app() -> App<'static, 'static> {
    App::new("genepath")
        .version("0.1")
        .author("Bansho Masutani")
        .about("Sequence(FASTA or TEXT)->Most probable hidden state path")
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Debug mode"),
        )
        .arg(
            Arg::with_name("input")
                .value_name("SEQUENCE")
                .index(1)
                .help("Sequence to decode. FASTA or plain text. Read from stdin if absent."),
        )
        .arg(
            Arg::with_name("model")
                .long("model")
                .short("m")
                .value_name("JSON")
                .takes_value(true)
                .help("Model parameters in JSON. The 3-state reference model if absent."),
        )
        .arg(
            Arg::with_name("tables")
                .long("tables")
                .help("Print the alpha matrix and the backpointers."),
        )
        .arg(
            Arg::with_name("parallel")
                .long("parallel")
                .help("Compute the states of each column in parallel."),
        )
        .arg(
            Arg::with_name("threads")
                .long("threads")
                .short("t")
                .takes_value(true)
                .default_value("1")
                .help("Number of threads"),
        )
}

fn decode(model: &HiddenMarkovModel, seq: &[u8], parallel: bool) -> genepath::Result<Decoded> {
    let (alpha, backpointers) = if parallel {
        genepath::fill_par(model, seq)?
    } else {
        genepath::fill(model, seq)?
    };
    let (path, max_log_prob) = genepath::backtrack(&alpha, &backpointers);
    Ok(Decoded {
        path,
        max_log_prob,
        alpha,
        backpointers,
    })
}

// Each record is decoded on its own; a failure does not affect the others.
fn decode_records<'a>(
    model: &'a HiddenMarkovModel,
    records: &'a [FASTARecord],
    parallel: bool,
) -> impl Iterator<Item = (&'a str, genepath::Result<Decoded>)> + 'a {
    records
        .iter()
        .map(move |(id, seq)| (id.as_str(), decode(model, seq, parallel)))
}

fn print_decoded(id: &str, decoded: &Decoded, tables: bool) {
    println!(">{}", id);
    if tables {
        println!("*****Alpha Matrix*****\n{}", decoded.alpha);
        println!("*****Backpointers*****\n{}", decoded.backpointers);
    }
    println!("*****Maximum Probability*****\n{}", decoded.max_log_prob);
    println!("*****Best Path*****\n{}", decoded.labels().join(" "));
}

/// Returns the number of records that could not be decoded.
fn run(matches: &clap::ArgMatches) -> genepath::Result<usize> {
    let config = match matches.value_of("model") {
        Some(path) => ModelConfig::from_path(path)?,
        None => ModelConfig::reference(),
    };
    let model = HiddenMarkovModel::from_config(&config)?;
    println!("*****Model*****\n{}", model);
    let records = genepath::fasta::read_observations(&matches.value_of("input"))?;
    debug!("Read {} records", records.len());
    let (parallel, tables) = (matches.is_present("parallel"), matches.is_present("tables"));
    let mut failed = 0;
    for (id, result) in decode_records(&model, &records, parallel) {
        match result {
            Ok(decoded) => print_decoded(id, &decoded, tables),
            Err(why) => {
                error!("{}\t{}", id, why);
                failed += 1;
            }
        }
    }
    Ok(failed)
}

fn main() {
    let matches = app().get_matches();
    let level = match matches.occurrences_of("verbose") {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
    let threads: usize = matches
        .value_of("threads")
        .and_then(|x| x.parse().ok())
        .unwrap_or(1);
    if let Err(why) = rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        debug!("{:?} Using the existing thread pool.", why);
    }
    debug!("Start");
    match run(&matches) {
        Ok(0) => {}
        Ok(failed) => {
            warn!("{} records failed", failed);
            std::process::exit(1);
        }
        Err(why) => {
            error!("{}", why);
            std::process::exit(1);
        }
    }
}
