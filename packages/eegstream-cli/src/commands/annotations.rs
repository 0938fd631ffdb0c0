use crate::cli::AnnotationsArgs;
use crate::exit_codes;
use crate::output;
use eegstream::AnnotationStore;

pub fn execute(args: AnnotationsArgs) -> i32 {
    let store = match AnnotationStore::open(&args.file, &args.montage) {
        Ok(store) => store,
        Err(e) => return exit_codes::report(&e),
    };

    if args.json {
        return output::emit_json(&store.annotations(), false, None);
    }

    if store.is_empty() {
        println!("No annotations at {}", store.path().display());
        return exit_codes::SUCCESS;
    }

    println!("{:>10} {:>10}  {:<8} Channels", "Start", "Stop", "Label");
    for annotation in store.annotations() {
        println!(
            "{:>10.3} {:>10.3}  {:<8} {}",
            annotation.start_time,
            annotation.stop_time,
            annotation.onset,
            annotation.channels.join(", ")
        );
    }

    exit_codes::SUCCESS
}
