// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright © 2021-2022 Adrian <adrian.eddy at gmail>

use simplelog::*;

pub fn get_version() -> &'static str { env!("CARGO_PKG_VERSION") }

pub fn init_logging(log_file: Option<&str>, verbose: bool) {
    let level = if verbose { LevelFilter::Debug } else { LevelFilter::Info };
    let log_config = ["csv", "rayon"]
        .into_iter()
        .fold(ConfigBuilder::new(), |mut cfg, x| { cfg.add_filter_ignore_str(x); cfg })
        .set_time_format_rfc3339()
        .build();

    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![
        TermLogger::new(level, log_config.clone(), TerminalMode::Stderr, ColorChoice::Auto)
    ];
    if let Some(path) = log_file {
        match std::fs::File::create(path) {
            Ok(file) => loggers.push(WriteLogger::new(LevelFilter::Debug, log_config, file)),
            Err(e) => eprintln!("Cannot create log file {path}: {e}")
        }
    }
    let _ = CombinedLogger::init(loggers);
}

/// `"3840x2160"` or `"55.1,10.4"`
pub fn parse_pair(s: &str, sep: char) -> Result<(f64, f64), String> {
    use itertools::Itertools;
    s.split(sep)
        .map(|x| x.trim().parse::<f64>().map_err(|e| format!("{s:?}: {e}")))
        .collect_tuple()
        .ok_or_else(|| format!("expected two numbers separated by '{sep}', got {s:?}"))
        .and_then(|(a, b)| Ok((a?, b?)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("3840x2160", 'x', Some((3840.0, 2160.0)))]
    #[test_case("55.1, 10.4", ',', Some((55.1, 10.4)))]
    #[test_case("1x2x3", 'x', None)]
    #[test_case("1", 'x', None)]
    #[test_case("ax2", 'x', None)]
    fn pairs(s: &str, sep: char, expected: Option<(f64, f64)>) {
        assert_eq!(parse_pair(s, sep).ok(), expected);
    }
}
