use log4rs::append::console::ConsoleAppender;
use log4rs::append::file::FileAppender;
use log4rs::config::{Appender, Root};
use log4rs::encode::pattern::PatternEncoder;
use log4rs::Handle;
use crate::config::General;
use crate::errors::ConfigError;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S)} {l:<5} {t} - {m}{n}";

/// Builds the log4rs configuration: always a file appender, plus stdout if asked for
///
/// # Arguments
///
/// * 'general' - the general section of the configuration
pub fn logger_config(general: &General) -> Result<log4rs::Config, ConfigError> {
    let file = FileAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build(&general.log_path)?;

    let mut builder = log4rs::Config::builder()
        .appender(Appender::builder().build("file", Box::new(file)));
    let mut root = Root::builder().appender("file");

    if general.log_to_stdout {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(PATTERN)))
            .build();
        builder = builder.appender(Appender::builder().build("stdout", Box::new(stdout)));
        root = root.appender("stdout");
    }

    builder.build(root.build(general.log_level))
        .map_err(|e| ConfigError(format!("logger config: {}", e)))
}

/// Sets up the global logger
///
/// # Arguments
///
/// * 'general' - the general section of the configuration
pub fn setup_logger(general: &General) -> Result<Handle, ConfigError> {
    let config = logger_config(general)?;

    log4rs::init_config(config).map_err(|e| ConfigError(format!("logger init: {}", e)))
}
