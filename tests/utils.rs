#![allow(dead_code)]

use log::LevelFilter;
use std::sync::Once;

static LOGGER: Once = Once::new();

pub fn enable_logging() {
    LOGGER.call_once(|| {
        env_logger::Builder::new()
            .filter(None, LevelFilter::Warn)
            .is_test(true)
            .init();
    });
}
