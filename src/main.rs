fn main() {
    if let Err(e) = trust_cert::cli::run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}
