//! Overlays CLI flags onto a base [`ApplyOptions`] (the default, or one
//! loaded from a `--config` TOML file). A flag only overrides the base value
//! when the user actually passed it; an absent flag defers to the config
//! file, and an absent config file defers to `ApplyOptions::default()`.

use hunkstitch_core::ApplyOptions;

use crate::Opts;

pub fn overlay(base: ApplyOptions, opts: &Opts) -> ApplyOptions {
    let mut options = base;
    if opts.validate_diff {
        options.validate_diff = true;
    }
    if opts.no_detect_already_applied {
        options.detect_already_applied = false;
    }
    if opts.no_preserve_crlf {
        options.preserve_crlf = false;
    }
    if let Some(window) = opts.max_search_window {
        options.max_search_window = window;
    }
    options
}
