//! Progress bar driven by the download update hook.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use mediafetch::{Content, UpdateHook};

/// Creates a byte progress bar and the hook feeding it.
///
/// `expected_total` is the combined size of everything about to be fetched.
/// Per-resource totals reported through the hook are not used for the length:
/// a content item may have several resources and a run several items, so only
/// the caller knows the overall size. Without one the bar shows a spinner and
/// a byte counter.
///
/// Returns `(None, None)` when progress output is disabled.
pub(crate) fn progress_hook(
    enabled: bool,
    expected_total: Option<u64>,
) -> (Option<UpdateHook>, Option<ProgressBar>) {
    if !enabled {
        return (None, None);
    }

    let (bar, template) = match expected_total {
        Some(total) => (
            ProgressBar::new(total),
            "{spinner} [{elapsed_precise}] [{bar:40}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) {msg}",
        ),
        None => (
            ProgressBar::no_length(),
            "{spinner} [{elapsed_precise}] {bytes} ({bytes_per_sec}) {msg}",
        ),
    };
    bar.set_style(
        ProgressStyle::with_template(template).unwrap_or_else(|_| ProgressStyle::default_bar()),
    );
    bar.set_message("downloading");
    bar.enable_steady_tick(Duration::from_millis(100));

    let hook_bar = bar.clone();
    let hook: UpdateHook = Arc::new(move |bytes: u64, _total: Option<u64>| {
        hook_bar.inc(bytes);
    });
    (Some(hook), Some(bar))
}

/// Combined size of `content`, or `None` when any item has an unknown size.
pub(crate) fn expected_total(content: &[Content]) -> Option<u64> {
    content
        .iter()
        .map(|item| (item.size > 0).then_some(item.size))
        .try_fold(0u64, |sum, size| sum.checked_add(size?))
}
