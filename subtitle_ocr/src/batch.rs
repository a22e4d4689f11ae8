//! Recognizing a whole stream of captions on a background thread.

use pgssub::Caption;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use crate::ctx::{OcrContext, ScannedCaption};
use crate::errors::Error;

/// What to do about glyphs we can't recognize.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanMode {
    /// Stop at the first caption with an unknown glyph, so the user can
    /// label it.
    ReportUnknown,
    /// Leave unknown glyphs unresolved and keep going.
    SkipUnknown,
}

/// Something that happened on the worker thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BatchEvent {
    /// We're about to work on this caption.
    Progress {
        /// The caption's index.
        caption: usize,
    },
    /// We finished a caption.
    Scanned {
        /// The caption's index.
        caption: usize,
        /// What we read, as tagged text.
        text: String,
    },
    /// This caption has a glyph that needs a label.  The batch stops here.
    NeedsLabel {
        /// The caption's index.
        caption: usize,
    },
    /// This caption could not be decoded or segmented.  The batch goes on.
    Failed {
        /// The caption's index.
        caption: usize,
        /// What went wrong.
        message: String,
    },
    /// The worker is done.
    Finished {
        /// Did we stop early because of `BatchWorker::cancel`?
        cancelled: bool,
    },
}

/// Runs OCR over a list of captions on its own thread.  The context is
/// locked for one caption at a time, so the fonts can be edited between
/// captions by taking the same lock.
pub struct BatchWorker {
    cancel: Arc<AtomicBool>,
    events: Receiver<BatchEvent>,
    handle: JoinHandle<Vec<ScannedCaption>>,
}

impl BatchWorker {
    /// Start recognizing `captions`, skipping any before `start`.
    pub fn spawn(ctx: Arc<Mutex<OcrContext>>,
                 captions: Vec<Caption>,
                 start: usize,
                 mode: ScanMode)
                 -> BatchWorker {
        let cancel = Arc::new(AtomicBool::new(false));
        let (tx, events) = channel();
        let flag = cancel.clone();
        let handle = thread::spawn(move || {
            let captions = captions.get(start..).unwrap_or_default();
            run(&ctx, captions, mode, &flag, &tx)
        });
        BatchWorker { cancel, events, handle }
    }

    /// Events from the worker, ending with `BatchEvent::Finished`.
    pub fn events(&self) -> &Receiver<BatchEvent> {
        &self.events
    }

    /// Ask the worker to stop before its next caption.
    pub fn cancel(&self) {
        self.cancel.store(true, Ordering::SeqCst);
    }

    /// Wait for the worker and return the captions it scanned.
    pub fn join(self) -> Vec<ScannedCaption> {
        match self.handle.join() {
            Ok(scanned) => scanned,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

fn run(ctx: &Mutex<OcrContext>,
       captions: &[Caption],
       mode: ScanMode,
       cancel: &AtomicBool,
       tx: &Sender<BatchEvent>)
       -> Vec<ScannedCaption> {
    // A closed channel just means nobody is listening.
    let send = |event| {
        let _ = tx.send(event);
    };
    let mut scanned = vec![];
    let mut cancelled = false;
    for caption in captions {
        if cancel.load(Ordering::SeqCst) {
            debug!("batch cancelled before caption {}", caption.index());
            cancelled = true;
            break;
        }
        let index = caption.index();
        send(BatchEvent::Progress { caption: index });
        let image = match caption.to_image() {
            Ok(image) => image,
            Err(err) => {
                warn!("could not decode caption {}: {}", index, err);
                send(BatchEvent::Failed { caption: index, message: err.to_string() });
                continue;
            }
        };
        let mut ctx = ctx.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        match ctx.ocr(index, &image, mode == ScanMode::ReportUnknown) {
            Ok(result) => {
                send(BatchEvent::Scanned { caption: index, text: result.tagged_text() });
                scanned.push(result);
            }
            Err(Error::UnknownSymbol { caption }) => {
                send(BatchEvent::NeedsLabel { caption });
                break;
            }
            Err(err) => {
                warn!("could not scan caption {}: {}", index, err);
                send(BatchEvent::Failed { caption: index, message: err.to_string() });
            }
        }
    }
    send(BatchEvent::Finished { cancelled });
    scanned
}

/// How far along a batch got.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ScanSummary {
    /// Captions we have no text for.
    pub unscanned: usize,
    /// Captions where every glyph was recognized.
    pub finished: usize,
    /// Captions with at least one unrecognized glyph.
    pub with_errors: usize,
}

impl ScanSummary {
    /// Summarize the results of scanning `total` captions.
    pub fn new(total: usize, scanned: &[ScannedCaption]) -> ScanSummary {
        let finished = scanned.iter().filter(|c| c.is_complete()).count();
        ScanSummary {
            unscanned: total.saturating_sub(scanned.len()),
            finished,
            with_errors: scanned.len() - finished,
        }
    }
}

impl fmt::Display for ScanSummary {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} finished, {} with errors, {} unscanned",
               self.finished, self.with_errors, self.unscanned)
    }
}
