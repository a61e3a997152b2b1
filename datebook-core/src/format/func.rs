use std::fmt;
use std::sync::Arc;

use super::{DateFormatter, VerboseFormattingArg, ZonedMarker};
use crate::env::DateEnv;

pub type FormatCallback = Arc<dyn Fn(&VerboseFormattingArg) -> String + Send + Sync>;

/// Hands formatting to a caller-supplied function.
#[derive(Clone)]
pub struct CallbackFormatter {
    callback: FormatCallback,
}

impl CallbackFormatter {
    pub fn new(callback: FormatCallback) -> Self {
        CallbackFormatter { callback }
    }
}

impl fmt::Debug for CallbackFormatter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackFormatter").finish_non_exhaustive()
    }
}

impl DateFormatter for CallbackFormatter {
    fn format(&self, date: &ZonedMarker, env: &DateEnv) -> String {
        (self.callback)(&VerboseFormattingArg::new(date, None, env))
    }

    fn format_range(
        &self,
        start: &ZonedMarker,
        end: &ZonedMarker,
        env: &DateEnv,
        separator: &str,
    ) -> String {
        let mut arg = VerboseFormattingArg::new(start, Some(end), env);
        arg.default_separator = separator.to_string();
        (self.callback)(&arg)
    }
}
