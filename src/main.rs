fn main() {
    if let Err(e) = grabghr::cli::run() {
        log::debug!("{e:?}");
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
