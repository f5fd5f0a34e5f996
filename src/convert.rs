//! The conversion driver.
//!
//! Markers are located once against the original document and then applied
//! one after another. Every replacement changes the length of the document,
//! so the driver threads a [`RewriteState`] through the markers: the text
//! rewritten so far and the signed distance between original offsets and
//! offsets into that text.

use std::{ops::Range, panic::AssertUnwindSafe, time::Duration};

use futures::{FutureExt as _, StreamExt as _, stream};
use tracing::{debug, info, warn};

use crate::{
    progress::{ConversionReporter, NullReporter, Tally},
    render::render,
    resolver::{MetadataResult, Resolver},
    scanner::{MarkerOccurrence, scan},
};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConvertError {
    #[error("span {start}..{end} shifted by {offset} falls outside the document")]
    OutOfRange {
        start: usize,
        end: usize,
        offset: isize,
    },
    #[error("text at {start}..{end} no longer matches the marker")]
    SpanMismatch { start: usize, end: usize },
    #[error("resolver panicked")]
    ResolverPanicked,
}

/// Accumulator of one conversion run.
///
/// Before occurrence `i` is applied, `cumulative_offset` is the sum of
/// `replacement.len() - raw_span.len()` over the occurrences before it that
/// were applied. Skipped occurrences contribute nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewriteState {
    current_text: String,
    cumulative_offset: isize,
    tally: Tally,
}

impl RewriteState {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            current_text: text.into(),
            cumulative_offset: 0,
            tally: Tally::default(),
        }
    }

    pub fn text(&self) -> &str {
        &self.current_text
    }

    pub fn into_text(self) -> String {
        self.current_text
    }

    pub fn cumulative_offset(&self) -> isize {
        self.cumulative_offset
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    /// Where `occurrence` sits in the rewritten text.
    fn locate(&self, occurrence: &MarkerOccurrence) -> Result<Range<usize>, ConvertError> {
        let out_of_range = || ConvertError::OutOfRange {
            start: occurrence.start,
            end: occurrence.end,
            offset: self.cumulative_offset,
        };
        let start = occurrence
            .start
            .checked_add_signed(self.cumulative_offset)
            .ok_or_else(out_of_range)?;
        let end = occurrence
            .end
            .checked_add_signed(self.cumulative_offset)
            .ok_or_else(out_of_range)?;
        let current = self.current_text.get(start..end).ok_or_else(out_of_range)?;
        if current != occurrence.raw_span {
            return Err(ConvertError::SpanMismatch { start, end });
        }
        Ok(start..end)
    }

    fn splice(&self, range: Range<usize>, occurrence: &MarkerOccurrence, fragment: &str) -> Self {
        let mut text =
            String::with_capacity(self.current_text.len() - range.len() + fragment.len());
        text.push_str(&self.current_text[..range.start]);
        text.push_str(fragment);
        text.push_str(&self.current_text[range.end..]);
        Self {
            current_text: text,
            cumulative_offset: self.cumulative_offset + fragment.len() as isize
                - occurrence.raw_span.len() as isize,
            tally: self.tally,
        }
    }
}

/// Turns bookmark markers into cards, one marker at a time.
pub struct BookmarkConverter<R> {
    resolver: R,
    request_interval: Duration,
}

impl<R: Resolver + Sync> BookmarkConverter<R> {
    pub fn new(resolver: R, request_interval: Duration) -> Self {
        Self {
            resolver,
            request_interval,
        }
    }

    /// Rewrites every marker in `text`. Never fails: markers that cannot be
    /// resolved become failure annotations and markers that cannot be applied
    /// stay untouched.
    pub async fn convert(&self, text: &str) -> String {
        self.convert_with(text, &NullReporter).await.into_text()
    }

    pub async fn convert_with(
        &self,
        text: &str,
        reporter: &impl ConversionReporter,
    ) -> RewriteState {
        let occurrences = scan(text);
        let initial = RewriteState::new(text);
        if occurrences.is_empty() {
            return initial;
        }
        reporter.found(occurrences.len());
        let last = occurrences.len() - 1;
        let state = stream::iter(occurrences.iter().enumerate())
            .fold(initial, move |state, (index, occurrence)| async move {
                let state = self.step(state, occurrence, reporter).await;
                if index < last {
                    tokio::time::sleep(self.request_interval).await;
                }
                state
            })
            .await;
        let tally = state.tally();
        info!(
            converted = tally.converted,
            failed = tally.failed,
            skipped = tally.skipped,
            "bookmark conversion finished"
        );
        state
    }

    /// Applies one occurrence. On error the incoming state is returned as it
    /// was, apart from the skip count.
    pub(crate) async fn step(
        &self,
        state: RewriteState,
        occurrence: &MarkerOccurrence,
        reporter: &impl ConversionReporter,
    ) -> RewriteState {
        match self.apply(&state, occurrence).await {
            Ok((mut next, result)) => {
                match &result {
                    MetadataResult::Success(metadata) => {
                        next.tally.converted += 1;
                        let title = if metadata.title.is_empty() {
                            occurrence.target_url.as_str()
                        } else {
                            metadata.title.as_str()
                        };
                        debug!(url = %occurrence.target_url, %title, "converted bookmark");
                        reporter.converted(occurrence, title);
                    }
                    MetadataResult::Failure { reason } => {
                        next.tally.failed += 1;
                        reporter.failed(occurrence, reason);
                    }
                }
                next
            }
            Err(error) => {
                warn!(url = %occurrence.target_url, %error, "skipping bookmark");
                reporter.skipped(occurrence, &error);
                let mut state = state;
                state.tally.skipped += 1;
                state
            }
        }
    }

    async fn apply(
        &self,
        state: &RewriteState,
        occurrence: &MarkerOccurrence,
    ) -> Result<(RewriteState, MetadataResult), ConvertError> {
        let range = state.locate(occurrence)?;
        let result = AssertUnwindSafe(self.resolver.resolve(&occurrence.target_url))
            .catch_unwind()
            .await
            .map_err(|_| ConvertError::ResolverPanicked)?;
        let fragment = render(&result, occurrence);
        Ok((state.splice(range, occurrence, &fragment), result))
    }
}
