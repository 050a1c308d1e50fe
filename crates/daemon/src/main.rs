use clap::Parser;

use etcdfs_daemon::{init_logging, run, Cli};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format);

    if let Err(err) = run(cli).await {
        eprintln!("etcdfs error: {err:#}");
        std::process::exit(1);
    }
}
