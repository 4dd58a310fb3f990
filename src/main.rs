fn main() {
    if let Err(err) = clickmap_lib::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
