// config.rs
//
// The engine's microarchitectural configuration, and the parser that turns
// the `buffers` / `latencies` text format (see README / SPEC_FULL.md §6)
// into it. Parsing is an external collaborator to the engine: the engine
// only ever sees a fully-populated EngineConfig.

use crate::errors::PipesimError;
use std::io::BufRead;
use std::path::{Path, PathBuf};

/// Reservation-station counts and ROB size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferConfig {
    pub eff_addr_stations: usize,
    pub fp_add_stations: usize,
    pub fp_mul_stations: usize,
    pub int_stations: usize,
    pub reorder_buffer_size: usize,
}

/// Execute-stage latency, in cycles, for each floating-point op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyConfig {
    pub fp_add: usize,
    pub fp_sub: usize,
    pub fp_mul: usize,
    pub fp_div: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    pub buffers: BufferConfig,
    pub latencies: LatencyConfig,
}

impl EngineConfig {
    pub fn new(buffers: BufferConfig, latencies: LatencyConfig) -> Self {
        Self { buffers, latencies }
    }
}

#[derive(Default)]
struct PartialConfig {
    eff_addr: Option<usize>,
    fp_adds: Option<usize>,
    fp_muls: Option<usize>,
    ints: Option<usize>,
    reorder: Option<usize>,
    fp_add_latency: Option<usize>,
    fp_sub_latency: Option<usize>,
    fp_mul_latency: Option<usize>,
    fp_div_latency: Option<usize>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Section {
    None,
    Buffers,
    Latencies,
}

/// Parses a config file from disk.
pub fn parse_config_file(path: impl AsRef<Path>) -> Result<EngineConfig, PipesimError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| PipesimError::ConfigUnreadable {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(std::io::BufReader::new(file), path)
}

/// Parses a config from any reader, attributing errors to `path` (used
/// purely for error messages; the reader itself may be any source).
pub fn parse_config<R: BufRead>(reader: R, path: impl Into<PathBuf>) -> Result<EngineConfig, PipesimError> {
    let path = path.into();
    let mut section = Section::None;
    let mut partial = PartialConfig::default();

    for (idx, line) in reader.lines().enumerate() {
        let line_no = idx + 1;
        let line = line.map_err(|e| PipesimError::ConfigMalformed {
            path: path.clone(),
            line: line_no,
            reason: format!("I/O error: {}", e),
        })?;

        if line.trim().is_empty() {
            continue;
        }
        // Bare section keywords, with or without a trailing colon.
        let bare = line.trim().trim_end_matches(':');
        if bare == "buffers" {
            section = Section::Buffers;
            continue;
        }
        if bare == "latencies" {
            section = Section::Latencies;
            continue;
        }

        let colon = line.find(':').ok_or_else(|| PipesimError::ConfigMalformed {
            path: path.clone(),
            line: line_no,
            reason: "expected 'key: value'".to_string(),
        })?;
        let key = line[..colon].trim();
        let value = line[colon + 1..].trim();
        let int_value: usize = value.parse().map_err(|_| PipesimError::ConfigMalformed {
            path: path.clone(),
            line: line_no,
            reason: format!("'{}' is not a non-negative integer", value),
        })?;

        match section {
            Section::Buffers => match key {
                "eff addr" => partial.eff_addr = Some(int_value),
                "fp adds" => partial.fp_adds = Some(int_value),
                "fp muls" => partial.fp_muls = Some(int_value),
                "ints" => partial.ints = Some(int_value),
                "reorder" => partial.reorder = Some(int_value),
                _ => {}, // unrecognized keys are ignored, matching the original tool
            },
            Section::Latencies => match key {
                "fp_add" => partial.fp_add_latency = Some(int_value),
                "fp_sub" => partial.fp_sub_latency = Some(int_value),
                "fp_mul" => partial.fp_mul_latency = Some(int_value),
                "fp_div" => partial.fp_div_latency = Some(int_value),
                _ => {},
            },
            Section::None => {
                return Err(PipesimError::ConfigMalformed {
                    path: path.clone(),
                    line: line_no,
                    reason: "key found before a 'buffers' or 'latencies' section header".to_string(),
                });
            },
        }
    }

    let missing = |field: &str| PipesimError::ConfigMalformed {
        path: path.clone(),
        line: 0,
        reason: format!("missing required field '{}'", field),
    };

    Ok(EngineConfig::new(
        BufferConfig {
            eff_addr_stations: partial.eff_addr.ok_or_else(|| missing("buffers.eff addr"))?,
            fp_add_stations: partial.fp_adds.ok_or_else(|| missing("buffers.fp adds"))?,
            fp_mul_stations: partial.fp_muls.ok_or_else(|| missing("buffers.fp muls"))?,
            int_stations: partial.ints.ok_or_else(|| missing("buffers.ints"))?,
            reorder_buffer_size: partial.reorder.ok_or_else(|| missing("buffers.reorder"))?,
        },
        LatencyConfig {
            fp_add: partial.fp_add_latency.ok_or_else(|| missing("latencies.fp_add"))?,
            fp_sub: partial.fp_sub_latency.ok_or_else(|| missing("latencies.fp_sub"))?,
            fp_mul: partial.fp_mul_latency.ok_or_else(|| missing("latencies.fp_mul"))?,
            fp_div: partial.fp_div_latency.ok_or_else(|| missing("latencies.fp_div"))?,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
buffers
   eff addr: 3
    fp adds: 3
    fp muls: 2
       ints: 4
    reorder: 8
latencies:
   fp_add: 2
   fp_sub: 2
   fp_mul: 10
   fp_div: 40
";

    #[test]
    fn parses_all_fields() {
        let config = parse_config(SAMPLE.as_bytes(), "test.cfg").unwrap();
        assert_eq!(config.buffers.eff_addr_stations, 3);
        assert_eq!(config.buffers.fp_add_stations, 3);
        assert_eq!(config.buffers.fp_mul_stations, 2);
        assert_eq!(config.buffers.int_stations, 4);
        assert_eq!(config.buffers.reorder_buffer_size, 8);
        assert_eq!(config.latencies.fp_add, 2);
        assert_eq!(config.latencies.fp_sub, 2);
        assert_eq!(config.latencies.fp_mul, 10);
        assert_eq!(config.latencies.fp_div, 40);
    }

    #[test]
    fn unknown_key_in_known_section_is_ignored() {
        let text = format!("{}\n   bogus: 1\n", SAMPLE);
        let config = parse_config(text.as_bytes(), "test.cfg").unwrap();
        assert_eq!(config.latencies.fp_div, 40);
    }

    #[test]
    fn missing_field_is_an_error() {
        let text = "buffers\n   eff addr: 1\n";
        let err = parse_config(text.as_bytes(), "test.cfg").unwrap_err();
        assert!(matches!(err, PipesimError::ConfigMalformed { .. }));
    }

    #[test]
    fn non_integer_value_is_an_error() {
        let text = "buffers\n   eff addr: three\n";
        let err = parse_config(text.as_bytes(), "test.cfg").unwrap_err();
        assert!(matches!(err, PipesimError::ConfigMalformed { .. }));
    }

    #[test]
    fn unreadable_file_is_an_error() {
        let err = parse_config_file("/nonexistent/path/to/pipesim.cfg").unwrap_err();
        assert!(matches!(err, PipesimError::ConfigUnreadable { .. }));
    }
}
