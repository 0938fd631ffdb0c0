use crate::cli::MontagesArgs;
use crate::exit_codes;
use crate::output;
use eegstream::{MontageCatalog, MontageDefinition};

pub fn execute(args: MontagesArgs) -> i32 {
    let catalog = match MontageCatalog::load(&args.montage_dir) {
        Ok(catalog) => catalog,
        Err(e) => return exit_codes::report(&e),
    };

    let mut montages: Vec<&MontageDefinition> = Vec::with_capacity(catalog.len());
    for name in catalog.names() {
        match catalog.get(&name) {
            Ok(montage) => montages.push(montage),
            Err(e) => return exit_codes::report(&e),
        }
    }

    if args.json {
        return output::emit_json(&montages, false, None);
    }

    println!("{:<32} {:<10} Channels", "Montage", "Kind");
    println!("{}", "-".repeat(56));
    for montage in &montages {
        if montage.is_bipolar() {
            println!(
                "{:<32} {:<10} {}",
                montage.name,
                "bipolar",
                montage.pairs().len()
            );
        } else {
            println!("{:<32} {:<10} all", montage.name, "identity");
        }
    }

    exit_codes::SUCCESS
}
