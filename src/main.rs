fn main() {
    if let Err(err) = csv_realign::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
