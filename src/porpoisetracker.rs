// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

pub use porpoisetracker_core as core;
pub mod util;
mod cli;

fn main() {
    let opts: cli::Opts = argh::from_env();

    util::init_logging(opts.log_file.as_deref(), opts.verbose);
    log_panics::init();

    if let Err(e) = cli::run(opts) {
        ::log::error!("{e}");
        std::process::exit(1);
    }
}
