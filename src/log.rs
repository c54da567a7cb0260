//! Console logging
//!
//! On wasm32 messages go to the browser console through `web_sys::console`.
//! Native builds (unit tests, tooling) write to stderr instead, since calling
//! imported JS functions off-wasm panics.

macro_rules! console_log {
    ($($t:tt)*) => {
        $crate::log::emit($crate::log::Level::Log, &format!($($t)*))
    };
}

macro_rules! console_warn {
    ($($t:tt)*) => {
        $crate::log::emit($crate::log::Level::Warn, &format!($($t)*))
    };
}

macro_rules! console_error {
    ($($t:tt)*) => {
        $crate::log::emit($crate::log::Level::Error, &format!($($t)*))
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Level {
    Log,
    Warn,
    Error,
}

#[cfg(target_arch = "wasm32")]
pub(crate) fn emit(level: Level, msg: &str) {
    let value = wasm_bindgen::JsValue::from_str(msg);
    match level {
        Level::Log => web_sys::console::log_1(&value),
        Level::Warn => web_sys::console::warn_1(&value),
        Level::Error => web_sys::console::error_1(&value),
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub(crate) fn emit(level: Level, msg: &str) {
    let tag = match level {
        Level::Log => "log",
        Level::Warn => "warn",
        Level::Error => "error",
    };
    eprintln!("[{}] {}", tag, msg);
}
