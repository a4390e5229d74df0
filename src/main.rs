fn main() {
    use clap::Parser;
    use std::error::Error;
    let args = nuscrape::cli::Args::parse();
    let level = if args.quiet { "warn" } else { "info" };
    if let Err(e) = nuscrape::logging::init(level) {
        eprintln!("{:#}", e);
    }
    if let Err(e) = nuscrape::cli::run(&args) {
        eprintln!("{}", e);
        if args.verbose {
            let mut source = e.source();
            while let Some(s) = source {
                eprintln!("  cause: {}", s);
                source = s.source();
            }
        }
        std::process::exit(e.exit_code());
    }
}
