//! A `log` sink for unit tests. Records are kept per thread, so tests
//! running in parallel only see what they logged themselves.

use std::cell::RefCell;
use std::sync::Once;

use log::{Level, LevelFilter, Log, Metadata, Record};

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = RefCell::new(vec![]);
}

struct Capture;

impl Log for Capture {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let message = record.args().to_string();
        RECORDS.with(|records| records.borrow_mut().push((record.level(), message)));
    }

    fn flush(&self) {}
}

static INSTALL: Once = Once::new();

/// Installs the capturing logger for the whole test binary.
pub fn install() {
    INSTALL.call_once(|| {
        if log::set_boxed_logger(Box::new(Capture)).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}

/// Drains the records logged on this thread so far.
pub fn take() -> Vec<(Level, String)> {
    RECORDS.with(|records| records.borrow_mut().drain(..).collect())
}

/// Whether a record at `level` containing `text` was logged on this thread.
pub fn logged(level: Level, text: &str) -> bool {
    take().iter().any(|(l, message)| *l == level && message.contains(text))
}
