fn main() {
    #[cfg(feature = "cli")]
    gsecm6::cli::run();

    #[cfg(not(feature = "cli"))]
    {
        eprintln!("gsecm6: CLI not enabled. Rebuild with `--features cli`.");
        std::process::exit(1);
    }
}
