//! Leveled logging
//!
//! - AVR with `serial-log`: lines are written with `ufmt` to the polled
//!   diagnostic USART.
//! - Host tests: stdout/stderr.
//! - Anything else: compiled out.
//!
//! Format strings follow `ufmt` rules, so only `{}` and `{:?}` are
//! available.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
}

impl LogLevel {
    pub const fn prefix(self) -> &'static str {
        match self {
            LogLevel::Error => "[ERROR] ",
            LogLevel::Warn => "[WARN] ",
            LogLevel::Info => "[INFO] ",
            LogLevel::Debug => "[DEBUG] ",
        }
    }
}

#[cfg(all(target_arch = "avr", feature = "serial-log"))]
#[doc(hidden)]
pub fn write_prefix(level: LogLevel) {
    use ufmt::uWrite;
    let _ = crate::hal::uart::SerialLog.write_str(level.prefix());
}

#[doc(hidden)]
#[macro_export]
macro_rules! __log {
    ($level:expr, $($arg:tt)*) => {{
        #[cfg(all(target_arch = "avr", feature = "serial-log"))]
        {
            $crate::logger::write_prefix($level);
            let _ = ::ufmt::uwriteln!(&mut $crate::hal::uart::SerialLog, $($arg)*);
        }
        #[cfg(test)]
        {
            let level: $crate::logger::LogLevel = $level;
            match level {
                $crate::logger::LogLevel::Error | $crate::logger::LogLevel::Warn => {
                    eprintln!("{}{}", level.prefix(), format!($($arg)*))
                }
                _ => println!("{}{}", level.prefix(), format!($($arg)*)),
            }
        }
        #[cfg(not(any(test, all(target_arch = "avr", feature = "serial-log"))))]
        {
            let _ = || ($level, $($arg)*);
        }
    }};
}

/// Log error message
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::__log!($crate::logger::LogLevel::Error, $($arg)*)
    };
}

/// Log warning message
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::__log!($crate::logger::LogLevel::Warn, $($arg)*)
    };
}

/// Log informational message
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::__log!($crate::logger::LogLevel::Info, $($arg)*)
    };
}

/// Log debug message
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::__log!($crate::logger::LogLevel::Debug, $($arg)*)
    };
}
