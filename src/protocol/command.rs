//! The single command line uploaded to the device.
//!
//! ```text
//! P [C<ch>] [F<hi16>f<lo16>] [S<custom_hi16>] [U<hi24>u<lo24> [M<hi24>m<lo24>]] [G<sec>g<usec>] X
//! ```
//!
//! The firmware reads values with Arduino's `parseInt()`, which copes with
//! bounded decimal integers only, hence the 16-bit split of the filter masks.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use crate::models::address::AddressPair;
use crate::models::config::CaptureConfig;

/// Render `config` as a newline terminated command line.
///
/// `now` is only used when time sync is on.
pub fn build_command(config: &CaptureConfig, now: DateTime<Utc>) -> String {
    let mut line = String::from("P");

    if let Some(channel) = config.channel {
        let _ = write!(line, "C{}", channel);
    }

    if !config.filter.is_empty() {
        if let Some(standard) = config.filter.standard {
            let _ = write!(line, "F{}f{}", standard >> 16, standard & 0xFFFF);
        }
        // Low 16 bits of the custom mask are never sent
        let custom = config.filter.custom.unwrap_or(0);
        let _ = write!(line, "S{}", (custom >> 16) & 0xFFFF);
    }

    if let Some(unicast) = config.unicast {
        push_pair(&mut line, 'U', 'u', unicast);
        push_pair(&mut line, 'M', 'm', config.multicast.unwrap_or(AddressPair::NONE));
    }

    if config.time_sync {
        let micros = now.timestamp_micros();
        let _ = write!(line, "G{}g{}", micros / 1_000_000, micros % 1_000_000);
    }

    line.push_str("X\n");
    line
}

fn push_pair(line: &mut String, hi: char, lo: char, pair: AddressPair) {
    let _ = write!(
        line,
        "{}{}{}{}",
        hi, pair.most_significant, lo, pair.least_significant
    );
}
