use clap::Parser;

use testgraph::cli::{self, Cli};
use testgraph::observability::init_logging;

fn main() -> testgraph::error::Result<()> {
    init_logging();
    cli::run(Cli::parse())
}
