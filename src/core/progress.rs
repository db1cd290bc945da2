//! Progress tracking from ffmpeg's `-progress` stream
//!
//! With `-progress pipe:1` ffmpeg writes blocks of `key=value` lines to
//! stdout, each block terminated by `progress=continue` or `progress=end`.

use std::time::Duration;

/// Snapshot of one `-progress` block
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Progress {
    /// Frames written so far
    pub frame: Option<u64>,
    /// Current encoding frame rate
    pub fps: Option<f64>,
    /// Bytes written to the output so far
    pub total_size: Option<u64>,
    /// Media time written so far
    pub out_time: Option<Duration>,
    /// Processing speed relative to real time (e.g. 2.5 for "2.5x")
    pub speed: Option<f64>,
    /// Set on the final block (`progress=end`)
    pub finished: bool,
}

impl Progress {
    /// Human-readable one-line summary
    pub fn summary(&self) -> String {
        let mut parts = Vec::new();

        if let Some(out_time) = self.out_time {
            parts.push(format!("time {}", format_timestamp(out_time)));
        }
        if let Some(size) = self.total_size {
            parts.push(format_bytes(size));
        }
        if let Some(speed) = self.speed {
            parts.push(format!("{:.2}x", speed));
        }

        if parts.is_empty() {
            "waiting for data".to_string()
        } else {
            parts.join(" • ")
        }
    }
}

/// Incremental parser for the `-progress` line protocol
#[derive(Debug, Default)]
pub struct ProgressParser {
    current: Progress,
}

impl ProgressParser {
    /// Create a new parser
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns a snapshot when the line closes a block
    pub fn push_line(&mut self, line: &str) -> Option<Progress> {
        let (key, value) = line.trim().split_once('=')?;
        let value = value.trim();

        match key.trim() {
            "frame" => self.current.frame = value.parse().ok(),
            "fps" => self.current.fps = value.parse().ok(),
            "total_size" => self.current.total_size = value.parse().ok(),
            // Despite the name, out_time_ms is in microseconds as well
            "out_time_us" | "out_time_ms" => {
                if let Ok(micros) = value.parse::<i64>() {
                    if micros >= 0 {
                        self.current.out_time = Some(Duration::from_micros(micros as u64));
                    }
                }
            }
            "out_time" => {
                if self.current.out_time.is_none() {
                    self.current.out_time = parse_timestamp(value);
                }
            }
            "speed" => self.current.speed = value.trim_end_matches('x').trim().parse().ok(),
            "progress" => {
                let mut snapshot = std::mem::take(&mut self.current);
                snapshot.finished = value == "end";
                return Some(snapshot);
            }
            _ => {}
        }

        None
    }
}

/// Parse `HH:MM:SS.micros` as written by ffmpeg
pub fn parse_timestamp(value: &str) -> Option<Duration> {
    let mut parts = value.split(':');
    let hours: u64 = parts.next()?.parse().ok()?;
    let minutes: u64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }

    // Rejects nan, inf, negative and out-of-range values
    let fraction = Duration::try_from_secs_f64(seconds).ok()?;
    let whole = hours.checked_mul(3600)?.checked_add(minutes.checked_mul(60)?)?;
    Duration::from_secs(whole).checked_add(fraction)
}

/// Format a media position as `HH:MM:SS`
pub fn format_timestamp(duration: Duration) -> String {
    let total = duration.as_secs();
    format!("{:02}:{:02}:{:02}", total / 3600, (total % 3600) / 60, total % 60)
}

/// Format bytes as human-readable string
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
    const THRESHOLD: f64 = 1024.0;

    if bytes == 0 {
        return "0 B".to_string();
    }

    let bytes_f64 = bytes as f64;
    let exp = (bytes_f64.ln() / THRESHOLD.ln()).floor() as usize;
    let exp = exp.min(UNITS.len() - 1);

    let value = bytes_f64 / THRESHOLD.powi(exp as i32);

    if exp == 0 {
        format!("{} {}", bytes, UNITS[exp])
    } else {
        format!("{:.1} {}", value, UNITS[exp])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BLOCK: &str = "frame=250\n\
fps=50.00\n\
stream_0_0_q=-1.0\n\
bitrate=1520.3kbits/s\n\
total_size=1900000\n\
out_time_us=10000000\n\
out_time_ms=10000000\n\
out_time=00:00:10.000000\n\
dup_frames=0\n\
drop_frames=0\n\
speed=2.01x\n\
progress=continue\n";

    #[test]
    fn test_parse_block() {
        let mut parser = ProgressParser::new();
        let snapshots: Vec<Progress> = BLOCK.lines().filter_map(|l| parser.push_line(l)).collect();

        assert_eq!(snapshots.len(), 1);
        let progress = &snapshots[0];
        assert_eq!(progress.frame, Some(250));
        assert_eq!(progress.fps, Some(50.0));
        assert_eq!(progress.total_size, Some(1_900_000));
        assert_eq!(progress.out_time, Some(Duration::from_secs(10)));
        assert_eq!(progress.speed, Some(2.01));
        assert!(!progress.finished);
    }

    #[test]
    fn test_end_block_and_reset() {
        let mut parser = ProgressParser::new();
        for line in BLOCK.lines() {
            parser.push_line(line);
        }

        // Next block only carries a size; fields from the previous block are gone
        assert_eq!(parser.push_line("total_size=2000000"), None);
        let last = parser.push_line("progress=end").unwrap();
        assert!(last.finished);
        assert_eq!(last.total_size, Some(2_000_000));
        assert_eq!(last.frame, None);
    }

    #[test]
    fn test_unparseable_values() {
        let mut parser = ProgressParser::new();
        parser.push_line("speed=N/A");
        parser.push_line("out_time_us=N/A");
        parser.push_line("garbage line without separator");
        let progress = parser.push_line("progress=continue").unwrap();
        assert_eq!(progress.speed, None);
        assert_eq!(progress.out_time, None);
    }

    #[test]
    fn test_negative_out_time_ignored() {
        let mut parser = ProgressParser::new();
        parser.push_line("out_time_us=-9223372036854775807");
        let progress = parser.push_line("progress=continue").unwrap();
        assert_eq!(progress.out_time, None);
    }

    #[test]
    fn test_parse_timestamp() {
        assert_eq!(
            parse_timestamp("01:02:03.500000"),
            Some(Duration::from_secs(3723) + Duration::from_millis(500))
        );
        assert_eq!(parse_timestamp("00:00:00.000000"), Some(Duration::ZERO));
        assert_eq!(parse_timestamp("N/A"), None);
        assert_eq!(parse_timestamp("1:2:3:4"), None);
    }

    #[test]
    fn test_parse_timestamp_rejects_non_finite_and_huge() {
        assert_eq!(parse_timestamp("00:00:nan"), None);
        assert_eq!(parse_timestamp("00:00:inf"), None);
        assert_eq!(parse_timestamp("00:00:-1.5"), None);
        assert_eq!(parse_timestamp("00:00:1e300"), None);
        assert_eq!(parse_timestamp("18446744073709551615:00:00"), None);
    }

    #[test]
    fn test_non_finite_out_time_does_not_stop_parsing() {
        let mut parser = ProgressParser::new();
        parser.push_line("out_time=00:00:inf");
        parser.push_line("total_size=2048");
        let progress = parser.push_line("progress=continue").unwrap();
        assert_eq!(progress.out_time, None);
        assert_eq!(progress.total_size, Some(2048));
    }

    #[test]
    fn test_summary() {
        let progress = Progress {
            out_time: Some(Duration::from_secs(83)),
            total_size: Some(1536),
            speed: Some(1.5),
            ..Default::default()
        };
        assert_eq!(progress.summary(), "time 00:01:23 • 1.5 KB • 1.50x");
        assert_eq!(Progress::default().summary(), "waiting for data");
    }

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(1023), "1023 B");
        assert_eq!(format_bytes(1024), "1.0 KB");
        assert_eq!(format_bytes(1048576), "1.0 MB");
        assert_eq!(format_bytes(1073741824), "1.0 GB");
    }

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_timestamp(Duration::from_secs(3661)), "01:01:01");
    }
}
