//! Process-wide logger setup

use std::sync::Once;

static INIT: Once = Once::new();

/// Install the global logger once; later calls do nothing.
///
/// An explicit `filter` wins over `RUST_LOG`; with neither, `info` and above
/// are shown. The filter uses `env_logger` syntax, e.g. `meld_field=debug,wgpu=warn`.
pub fn init_logging(filter: Option<&str>) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();
        if let Some(filter) = filter {
            builder.parse_filters(filter);
        } else if let Ok(filter) = std::env::var("RUST_LOG") {
            builder.parse_filters(&filter);
        } else {
            builder
                .filter_level(log::LevelFilter::Info)
                .filter_module("wgpu_core", log::LevelFilter::Warn)
                .filter_module("wgpu_hal", log::LevelFilter::Warn)
                .filter_module("naga", log::LevelFilter::Warn);
        }
        builder.format_timestamp(None);
        builder.init();
        log::debug!("logging initialized");
    });
}
