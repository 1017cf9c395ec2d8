//! Shared foundation for the Deephold game server.
//!
//! The `deephold-core` crate holds everything both the server and offline
//! tooling need: the immutable boot-time catalog (terrain features, object
//! kinds, monster races, ego templates, vault blueprints, dungeon-type
//! rules), the world-coordinate and dice primitives, the tunable constants,
//! and the logging bootstrap.

use log::{LevelFilter, SetLoggerError};
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

pub mod catalog;
pub mod constants;
pub mod dice;
pub mod rng;
pub mod types;

/// Configure the process-wide logger.
///
/// Always logs to stderr at `log_level`; when `file_path` is given, a file
/// appender additionally receives everything down to trace so an incident
/// can be reconstructed after the fact.
pub fn initialize_logger(
    log_level: LevelFilter,
    file_path: Option<&str>,
) -> Result<(), SetLoggerError> {
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();

    let mut config_builder = Config::builder();
    let mut root_builder = Root::builder();

    if let Some(path) = file_path {
        let logfile = FileAppender::builder()
            // Pattern: https://docs.rs/log4rs/*/log4rs/encode/pattern/index.html
            .encoder(Box::new(PatternEncoder::new("{d} {l} - {m}\n")))
            .build(path)
            .unwrap();

        config_builder =
            config_builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
        root_builder = root_builder.appender("logfile");
    }

    let config = config_builder
        .appender(
            Appender::builder()
                .filter(Box::new(ThresholdFilter::new(log_level)))
                .build("stderr", Box::new(stderr)),
        )
        .build(root_builder.appender("stderr").build(LevelFilter::Trace))
        .unwrap();

    let _handle = log4rs::init_config(config)?;

    Ok(())
}
