//! `pinhook` binary

use clap::Parser;

fn main() {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(false)
                .unicode(true)
                .context_lines(2)
                .tab_width(4)
                .build(),
        )
    }))
    .ok();

    let cli = pinhook::Cli::parse();

    // Any error, including a failed hook run, exits 1 so git aborts the commit
    if let Err(e) = pinhook::run(cli) {
        let report = miette::Report::msg(format!("{e:#}"));
        eprintln!("{report:?}");
        std::process::exit(1);
    }
}
