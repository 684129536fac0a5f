// Copyright (C) 2025 Ryan Daum <ryan.daum@gmail.com> This program is free
// software: you can redistribute it and/or modify it under the terms of the GNU
// General Public License as published by the Free Software Foundation, version
// 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Logging setup shared by the muckr binaries.

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

/// Crates whose events are shown when `RUST_LOG` is not set.
const MUCKR_TARGETS: &[&str] = &["muckr_common", "muckr_db", "muckr_kernel", "mpi_eval"];

fn fallback_filter(debug: bool) -> EnvFilter {
    let level = if debug { "debug" } else { "info" };
    let directives: Vec<String> = MUCKR_TARGETS
        .iter()
        .map(|target| format!("{target}={level}"))
        .collect();
    EnvFilter::new(format!("warn,{}", directives.join(",")))
}

/// Install a compact stderr subscriber, keeping stdout free for evaluated output.
///
/// `RUST_LOG` wins when set. Otherwise our own crates log at `info`, or `debug` with
/// `debug` set, and everything else at `warn`.
pub fn init_tracing(debug: bool) -> Result<(), eyre::Report> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback_filter(debug));
    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .compact()
                .with_target(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .try_init()
        .map_err(|e| eyre::eyre!("Unable to initialize tracing: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_filter_names_our_crates() {
        let filter = fallback_filter(true).to_string();
        assert!(filter.contains("muckr_kernel=debug"));
        assert!(!fallback_filter(false).to_string().contains("=debug"));
    }
}
