//! forge – command-line quotation to PDF generator.
//!
//! Usage:
//!   forge <quote.json> [output.pdf] [--template NAME] [--template-dir DIR]
//!         [--config FILE] [--dump-html] [--versions] [--clients]
//!
//! If `output.pdf` is omitted the PDF is written to the working directory as
//! `Orcamento_<number>_<client>.pdf`.

use std::{env, fs, path::PathBuf, process};

use chrono::Local;
use quote_forge::{QuoteConfig, QuoteGenerator, QuoteRequest};

fn fail(msg: impl std::fmt::Display) -> ! {
    eprintln!("Error: {msg}");
    process::exit(1);
}

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut template: Option<String> = None;
    let mut template_dir: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;
    let mut dump_html = false;
    let mut versions = false;
    let mut list_clients = false;
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--template" => match iter.next() {
                Some(v) => template = Some(v.clone()),
                None => fail("--template needs a file name"),
            },
            "--template-dir" => match iter.next() {
                Some(v) => template_dir = Some(PathBuf::from(v)),
                None => fail("--template-dir needs a directory"),
            },
            "--config" | "-c" => match iter.next() {
                Some(v) => config_path = Some(PathBuf::from(v)),
                None => fail("--config needs a file"),
            },
            "--dump-html" => dump_html = true,
            "--versions" => versions = true,
            "--clients" => list_clients = true,
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if positional == 0 {
                    input_path = Some(PathBuf::from(path));
                } else if positional == 1 {
                    output_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    let mut config = match &config_path {
        Some(path) => QuoteConfig::load(path).unwrap_or_else(|e| fail(e)),
        None => QuoteConfig::from_env(),
    };
    if let Some(name) = template {
        config.template_name = name;
    }
    if let Some(dir) = template_dir {
        config.template_dir = dir;
    }
    config.debug_dump_html |= dump_html;

    let generator = QuoteGenerator::from_config(&config);
    if versions {
        print!("{}", generator.backend_report());
        return;
    }
    if list_clients {
        let mut catalog = config.open_catalog().unwrap_or_else(|e| fail(e));
        for record in catalog.list_clients() {
            println!("{}\t{}\t{}", record.id, record.client.cnpj, record.client.razao_social);
        }
        return;
    }

    let input = match input_path {
        Some(p) => p,
        None => {
            eprintln!("Error: no quotation file specified.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    let text = fs::read_to_string(&input)
        .unwrap_or_else(|e| fail(format!("reading '{}': {e}", input.display())));
    let request: QuoteRequest = serde_json::from_str(&text)
        .unwrap_or_else(|e| fail(format!("parsing '{}': {e}", input.display())));
    let quotation = request
        .into_quotation(Local::now().date_naive())
        .unwrap_or_else(|e| fail(e));

    let output = output_path.unwrap_or_else(|| PathBuf::from(quotation.output_file_name()));

    match generator.generate(&quotation) {
        Ok(bytes) => {
            if let Some(parent) = output.parent() {
                if !parent.as_os_str().is_empty() {
                    if let Err(e) = fs::create_dir_all(parent) {
                        fail(format!("creating output directory: {e}"));
                    }
                }
            }
            if let Err(e) = fs::write(&output, &bytes) {
                fail(format!("writing '{}': {e}", output.display()));
            }
            let totals = quotation.totals();
            eprintln!(
                "Wrote '{}' ({} bytes, {} item{}, total {:.2})",
                output.display(),
                bytes.len(),
                quotation.itens.len(),
                if quotation.itens.len() == 1 { "" } else { "s" },
                totals.total_nf
            );
        }
        Err(e) => fail(format!("generating PDF: {e}")),
    }
}

fn print_usage(prog: &str) {
    eprintln!("forge – quotation PDF generator (quote-forge)");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <quote.json> [output.pdf] [flags]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <quote.json>   Quotation request (company key, client, items, payment, taxes)");
    eprintln!("  [output.pdf]   Output path  (default: Orcamento_<number>_<client>.pdf)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --template NAME       Template file name (default: orcamento.html)");
    eprintln!("  --template-dir DIR    Template directory (default: templates)");
    eprintln!("  --config, -c FILE     JSON configuration file");
    eprintln!("  --dump-html           Keep the rendered HTML for inspection");
    eprintln!("  --versions            Show rendering backends and exit");
    eprintln!("  --clients             List clients of the configured catalog and exit");
    eprintln!("  --help                Print this message");
}
