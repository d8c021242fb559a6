use quiver_mutation::prelude::*;
use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();

    let mut cfg = ClassifierConfig::default();
    let mut validate_only = false;
    let mut minimal_only = false;
    let mut extensions = false;
    let mut matrix: Option<ExchangeMatrix> = None;

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--test" | "--validate" => {
                validate_only = true;
                i += 1;
            }
            "--matrix" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                matrix = Some(parse_exchange_matrix(v).unwrap_or_else(|e| fail(&e)));
                i += 2;
            }
            "--type" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                let t: DynkinType = v.parse().unwrap_or_else(|e| fail(&e));
                matrix = Some(t.matrix().unwrap_or_else(|e| fail(&e)));
                i += 2;
            }
            "--collapsed" => {
                cfg.mode = EnumerationMode::UpToEquivalence;
                i += 1;
            }
            "--minimal" => {
                minimal_only = true;
                i += 1;
            }
            "--extensions" => {
                extensions = true;
                i += 1;
            }
            "--max-weight" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                cfg.extension_weight = v.parse().unwrap_or_else(|_| usage_and_exit(2));
                i += 2;
            }
            "--workers" | "--chains" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                let n: usize = v.parse().unwrap_or_else(|_| usage_and_exit(2));
                cfg.pipeline = PipelineConfig::with_workers(n);
                cfg.heuristic.chains = n.max(1);
                i += 2;
            }
            "--steps" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                cfg.heuristic.max_steps = v.parse().unwrap_or_else(|_| usage_and_exit(2));
                i += 2;
            }
            "--seed" => {
                let v = args.get(i + 1).unwrap_or_else(|| usage_and_exit(2));
                cfg.heuristic.seed = Some(v.parse().unwrap_or_else(|_| usage_and_exit(2)));
                i += 2;
            }
            "--help" | "-h" => usage_and_exit(0),
            _ => usage_and_exit(2),
        }
    }

    let classifier = Classifier::new(cfg);

    if validate_only {
        match validate_catalogue(classifier.context(), 6) {
            Ok(()) => {
                println!("Validation OK: bundled class sizes are correct.");
                return;
            }
            Err(e) => {
                eprintln!("Validation FAILED: {e}");
                std::process::exit(1);
            }
        }
    }

    let Some(m) = matrix else { usage_and_exit(2) };
    let cancel = CancelToken::new();
    println!("{m}");
    println!("--------------------------------------------------");

    if minimal_only {
        let verdict = classifier
            .is_minimally_mutation_infinite(&m, &cancel)
            .unwrap_or_else(|e| fail(&e));
        println!("minimally mutation-infinite: {}", yes_no(verdict));
        return;
    }

    let result = classifier.classify(&m, &cancel).unwrap_or_else(|e| fail(&e));
    println!("{result}");

    if extensions {
        let w = classifier.config().extension_weight;
        let survey = classifier
            .survey_extensions(&m, w, &cancel)
            .unwrap_or_else(|e| fail(&e));
        println!("--------------------------------------------------");
        println!(
            "extensions (weights in [-{w}, {w}]): {} checked, {} finite, {} infinite, {} unknown",
            survey.checked, survey.finite, survey.infinite, survey.unknown
        );
        let maximal = match (result.finite(), survey.complete) {
            (Some(false), _) => Some(false),
            (Some(true), true) if survey.unknown == 0 => Some(survey.finite == 0),
            (Some(true), _) if survey.finite > 0 => Some(false),
            _ => None,
        };
        println!("maximally mutation-finite: {}", yes_no(maximal));
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn yes_no(v: Option<bool>) -> &'static str {
    match v {
        Some(true) => "yes",
        Some(false) => "no",
        None => "unknown",
    }
}

fn fail(e: &QuiverError) -> ! {
    eprintln!("Error: {e}");
    std::process::exit(1)
}

fn usage_and_exit(code: i32) -> ! {
    eprintln!(
        "Usage:\n  quiver (--matrix ROWS | --type NAME) [--collapsed] [--minimal] [--extensions]\n         [--max-weight W] [--workers N] [--steps S] [--seed SEED]\n  quiver --test\n\nOptions:\n  --matrix ROWS            Exchange matrix, rows separated by ';' (e.g. \"0,1,0;-1,0,1;0,-1,0\")\n  --type NAME              Dynkin type from the catalogue (A1.., D4.., E6..E8)\n  --collapsed              Count matrices up to relabelling of the vertices\n  --minimal                Only decide minimal mutation-infiniteness\n  --extensions             Survey one-vertex extensions and decide maximal finiteness\n  --max-weight W           Arrow weights [-W, W] for extensions (default: 2)\n  --workers/--chains N     Worker threads and random-walk chains (default: auto-detect)\n  --steps S                Random-walk length (default: 3000)\n  --seed SEED              Deterministic base seed (optional)\n  --test/--validate        Validate bundled catalogue class sizes\n\nLogging is controlled by RUST_LOG (default: info).\n"
    );
    std::process::exit(code)
}
