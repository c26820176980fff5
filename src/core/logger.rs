//! Runtime logger handles

use super::filter::FilterResult;
use super::log_context::LogContext;
use super::log_event::{LogEvent, Location};
use super::log_level::LogLevel;
use super::error::Result;
use crate::config::{Configuration, LogRequest, LoggerConfig};
use arc_swap::ArcSwap;
use std::fmt;
use std::sync::Arc;

/// What a logger currently logs against
struct PrivateConfig {
    configuration: Arc<Configuration>,
    logger_config: Arc<LoggerConfig>,
}

impl PrivateConfig {
    fn new(name: &str, configuration: &Arc<Configuration>) -> Self {
        Self {
            configuration: Arc::clone(configuration),
            logger_config: configuration.get_logger_config(name),
        }
    }
}

/// The handle applications log through
///
/// Obtained from [`LoggerContext::get_logger`](super::LoggerContext::get_logger).
/// The context repoints every handle when its configuration changes, so a
/// handle stays valid across reconfiguration.
pub struct Logger {
    name: String,
    private: ArcSwap<PrivateConfig>,
}

impl Logger {
    pub(crate) fn new(name: impl Into<String>, configuration: &Arc<Configuration>) -> Self {
        let name = name.into();
        let private = PrivateConfig::new(&name, configuration);
        Self {
            name,
            private: ArcSwap::from_pointee(private),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Effective level of the LoggerConfig this logger resolves to
    pub fn level(&self) -> LogLevel {
        self.private.load().logger_config.level()
    }

    pub fn logger_config(&self) -> Arc<LoggerConfig> {
        Arc::clone(&self.private.load().logger_config)
    }

    pub fn configuration(&self) -> Arc<Configuration> {
        Arc::clone(&self.private.load().configuration)
    }

    pub(crate) fn update_configuration(&self, configuration: &Arc<Configuration>) {
        self.private
            .store(Arc::new(PrivateConfig::new(&self.name, configuration)));
    }

    #[inline]
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level.is_enabled_for(self.level())
    }

    fn passes(&self, private: &PrivateConfig, level: LogLevel, message: &str) -> bool {
        if let Some(filter) = private.configuration.filter().filter() {
            let probe = LogEvent::new(self.name.as_str(), level, message);
            match filter.filter(&probe) {
                FilterResult::Accept => return true,
                FilterResult::Deny => return false,
                FilterResult::Neutral => {}
            }
        }
        level.is_enabled_for(private.logger_config.level())
    }

    /// Log `request`, returning append failures of appenders that do not
    /// ignore exceptions
    pub fn try_log(&self, request: &LogRequest<'_>) -> Result<()> {
        let private = self.private.load_full();
        if !self.passes(&private, request.level, request.message) {
            return Ok(());
        }
        let next = || Arc::clone(&self.private.load().logger_config);
        private
            .logger_config
            .reliability_strategy()
            .log(&next, request)
    }

    fn log_request(&self, request: &LogRequest<'_>) {
        if let Err(e) = self.try_log(request) {
            self.private.load().configuration.status().error(format!(
                "Logger \"{}\" failed to log an event: {}",
                self.name, e
            ));
        }
    }

    pub fn log(&self, level: LogLevel, message: impl AsRef<str>) {
        self.log_request(&LogRequest::new(&self.name, level, message.as_ref()));
    }

    /// Log with the call site attached; used by the crate macros
    pub fn log_at(&self, level: LogLevel, location: Location, message: impl AsRef<str>) {
        self.log_request(&LogRequest::new(&self.name, level, message.as_ref()).with_location(location));
    }

    pub fn log_with_context(&self, level: LogLevel, message: impl AsRef<str>, context: &LogContext) {
        self.log_request(&LogRequest::new(&self.name, level, message.as_ref()).with_context(context));
    }

    pub fn trace(&self, message: impl AsRef<str>) {
        self.log(LogLevel::TRACE, message);
    }

    pub fn debug(&self, message: impl AsRef<str>) {
        self.log(LogLevel::DEBUG, message);
    }

    pub fn info(&self, message: impl AsRef<str>) {
        self.log(LogLevel::INFO, message);
    }

    pub fn warn(&self, message: impl AsRef<str>) {
        self.log(LogLevel::WARN, message);
    }

    pub fn error(&self, message: impl AsRef<str>) {
        self.log(LogLevel::ERROR, message);
    }

    pub fn fatal(&self, message: impl AsRef<str>) {
        self.log(LogLevel::FATAL, message);
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let private = self.private.load();
        f.debug_struct("Logger")
            .field("name", &self.name)
            .field("logger_config", &private.logger_config.name())
            .field("configuration", &private.configuration.name())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::appenders::ListAppender;
    use crate::config::ConfigurationSettings;
    use crate::core::{
        Appender, FilterResult, LifeCycle, LogLevel, LoggerContext, StatusLogger, ThresholdFilter,
    };
    use std::sync::Arc;

    fn context_with(list: &Arc<ListAppender>, json: &str) -> Arc<LoggerContext> {
        let settings = ConfigurationSettings::default().with_status(StatusLogger::silent());
        let appender: Arc<dyn Appender> = list.clone();
        LoggerContext::builder()
            .settings(settings)
            .appender(appender)
            .json(json)
            .build()
            .unwrap()
    }

    #[test]
    fn test_level_check_is_live() {
        let list = Arc::new(ListAppender::new("LIST", StatusLogger::silent()));
        let context = context_with(
            &list,
            r#"{ "loggers": { "logger": { "name": "app", "level": "info" },
                              "root": { "level": "error", "AppenderRef": { "ref": "LIST" } } } }"#,
        );
        let logger = context.get_logger("app.web");
        assert_eq!(logger.logger_config().name(), "app");

        logger.debug("hidden");
        logger.info("shown");
        assert_eq!(list.messages(), vec!["shown"]);

        logger.logger_config().set_level(Some(LogLevel::DEBUG));
        assert!(logger.is_enabled(LogLevel::DEBUG));
        logger.debug("now shown");
        assert_eq!(list.len(), 2);
        context.stop(context.configuration().shutdown_timeout());
    }

    #[test]
    fn test_configuration_filter_runs_before_level() {
        let list = Arc::new(ListAppender::new("LIST", StatusLogger::silent()));
        let context = context_with(
            &list,
            r#"{ "loggers": { "root": { "level": "error", "AppenderRef": { "ref": "LIST" } } } }"#,
        );
        let configuration = context.configuration();
        configuration.add_filter(Arc::new(
            ThresholdFilter::new(LogLevel::WARN).with_results(FilterResult::Accept, FilterResult::Neutral),
        ));

        let logger = context.get_logger("any");
        logger.warn("accepted below the root level");
        logger.info("still rejected by level");
        assert_eq!(list.messages(), vec!["accepted below the root level"]);
        assert!(configuration.is_started());
    }
}
