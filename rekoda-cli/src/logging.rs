use chrono::Local;
use tracing::Level;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt::format::Writer;
use tracing_subscriber::fmt::time::FormatTime;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Crates whose events follow the chosen level. Everything else logs at `warn`.
const OWN_TARGETS: [&str; 3] = ["rekoda", "rekoda_recorder", "rekoda_platforms"];

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut Writer<'_>) -> std::fmt::Result {
        let now = Local::now();
        write!(w, "{}", now.format("%Y-%m-%dT%H:%M:%S%.3f%:z"))
    }
}

/// `trace` and `debug` are honoured, anything else means `info`.
pub fn level_from_name(name: Option<&str>) -> Level {
    match name.map(str::trim) {
        Some(n) if n.eq_ignore_ascii_case("trace") => Level::TRACE,
        Some(n) if n.eq_ignore_ascii_case("debug") => Level::DEBUG,
        _ => Level::INFO,
    }
}

fn filter_for(level: Level) -> EnvFilter {
    let directives = OWN_TARGETS
        .iter()
        .map(|target| format!("{target}={}", level.as_str().to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join(",");
    EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(directives)
}

pub fn init_logging(level: Option<&str>) -> anyhow::Result<Level> {
    let level = level_from_name(level);

    tracing_subscriber::registry()
        .with(filter_for(level))
        .with(
            fmt::layer()
                .with_target(false)
                .with_timer(LocalTimer)
                .with_writer(std::io::stdout),
        )
        .try_init()?;
    Ok(level)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_levels_fall_back_to_info() {
        assert_eq!(level_from_name(Some("trace")), Level::TRACE);
        assert_eq!(level_from_name(Some("DEBUG")), Level::DEBUG);
        assert_eq!(level_from_name(Some("loud")), Level::INFO);
        assert_eq!(level_from_name(None), Level::INFO);
    }

    #[test]
    fn filter_targets_own_crates() {
        let filter = filter_for(Level::DEBUG).to_string().to_ascii_lowercase();
        assert!(filter.contains("rekoda_recorder=debug"));
        assert!(filter.contains("warn"));
    }
}
