use chat_session::{ChannelState, EntryId, LogEntry, Origin, Renderer, SessionView};
use std::io::Write;

/// Prints the transcript as plain lines.
///
/// Only entries newer than the last one printed are written, so the same
/// view can be rendered any number of times.
pub struct TranscriptPrinter<W: Write + Send> {
    out: W,
    last_printed: Option<EntryId>,
    last_state: Option<ChannelState>,
    timestamps: bool,
}

impl<W: Write + Send> TranscriptPrinter<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_printed: None,
            last_state: None,
            timestamps: false,
        }
    }

    pub fn with_timestamps(mut self, timestamps: bool) -> Self {
        self.timestamps = timestamps;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&self, entry: &LogEntry) -> String {
        let body = match entry.origin {
            Origin::User => entry.text.clone(),
            Origin::Agent => format!("Agent: {}", entry.text),
            Origin::System => format!("[{}]", entry.text),
        };
        if self.timestamps {
            let local = entry.created_at.with_timezone(&chrono::Local);
            format!("{} {}", local.format("%H:%M:%S"), body)
        } else {
            body
        }
    }
}

fn status_line(state: ChannelState) -> &'static str {
    match state {
        ChannelState::Connecting => "[connecting...]",
        ChannelState::Open => "[channel open]",
        ChannelState::Closed => "[channel closed]",
    }
}

impl<W: Write + Send> Renderer for TranscriptPrinter<W> {
    fn render(&mut self, view: &SessionView) {
        let fresh: Vec<String> = view
            .entries
            .iter()
            .filter(|e| self.last_printed.is_none_or(|last| e.id > last))
            .map(|e| self.line(e))
            .collect();
        for line in &fresh {
            let _ = writeln!(self.out, "{line}");
        }
        if let Some(last) = view.entries.last() {
            self.last_printed = Some(last.id);
        }

        if self.last_state != Some(view.channel_state) {
            let _ = writeln!(self.out, "{}", status_line(view.channel_state));
            self.last_state = Some(view.channel_state);
        }
        let _ = self.out.flush();
    }
}
