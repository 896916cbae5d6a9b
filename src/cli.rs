//! Command-line definition for unit-ingest.

use clap::Parser;
use loadtest_populate_mysql::MySQLPopulateArgs;

#[derive(Parser, Debug)]
#[command(name = "unit-ingest")]
#[command(about = "Multi-task synthetic insert load generator for MySQL")]
#[command(
    long_about = "Starts one insert task per table (unit_<n>) on `start` and stops them all on \
                  `stop`. Commands are read from stdin, one per line."
)]
pub struct Cli {
    #[command(flatten)]
    pub args: MySQLPopulateArgs,
}
