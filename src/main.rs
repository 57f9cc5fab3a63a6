fn main() {
    if let Err(err) = rzd_lib::run() {
        eprintln!("rzd: {err:#}");
        std::process::exit(1);
    }
}
