//! Sample manifest command

use pinhook_config::manifest::sample_config;

/// Print a starter manifest to stdout
pub fn run() {
    print!("{}", sample_config());
}
