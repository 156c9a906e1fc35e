fn main() {
    if let Err(err) = airq::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
