use episim::runner;

fn main() {
    if let Err(error) = runner::run_with_args() {
        eprintln!("{error}");
        std::process::exit(1);
    }
}
