//! CLI entry point for the `regdump` GIC register inspector.

mod cli;
mod logging;

use clap::Parser;
use regdump_core::{
    DecodedRegister, FamilyRow, FileMemory, Inspector, QueryError, RegisterCatalog,
};
#[cfg(test)]
use tempfile as _;

use crate::cli::Args;

fn print_catalog(catalog: &RegisterCatalog) {
    println!("{:<10} {:<6} {:<11} {}", "FAMILY", "OFFSET", "LAYOUT", "FIELD");
    for family in catalog.iter() {
        println!("{}", FamilyRow(family));
    }
}

fn print_register(register: &DecodedRegister, json: bool) -> Result<(), String> {
    if json {
        let line = serde_json::to_string(register)
            .map_err(|error| format!("cannot serialize {}: {error}", register.reference))?;
        println!("{line}");
    } else {
        print!("{register}");
    }
    Ok(())
}

fn report_query_error(query: &str, error: &QueryError) {
    if error.is_user_error() {
        eprintln!("error: {error}");
    } else {
        eprintln!("error: {query}: {error}");
    }
}

fn run(args: &Args) -> Result<(), i32> {
    let catalog = RegisterCatalog::gic_distributor();

    if args.list {
        print_catalog(&catalog);
        return Ok(());
    }

    let Some(image) = &args.image else {
        eprintln!("error: no memory image given (use --image or REGDUMP_IMAGE)");
        return Err(2);
    };

    let memory = FileMemory::open(image, args.load_address).map_err(|error| {
        eprintln!("error: {error}");
        1
    })?;
    log::info!(
        "reading {} at {:#x}, distributor at {:#x}",
        image.display(),
        args.load_address,
        args.base
    );

    let mut inspector = Inspector::new(&catalog, args.layout(), memory);
    let mut failed = false;

    for (position, query) in args.queries.iter().enumerate() {
        match inspector.query(query) {
            Ok(register) => {
                if position > 0 && !args.json {
                    println!();
                }
                if let Err(message) = print_register(&register, args.json) {
                    eprintln!("error: {message}");
                    failed = true;
                }
            }
            Err(error) => {
                report_query_error(query, &error);
                failed = true;
            }
        }
    }

    if failed {
        Err(1)
    } else {
        Ok(())
    }
}

fn main() {
    let args = Args::parse();
    logging::init(args.log_level());

    let exit_code = match run(&args) {
        Ok(()) => 0,
        Err(code) => code,
    };

    std::process::exit(exit_code);
}
