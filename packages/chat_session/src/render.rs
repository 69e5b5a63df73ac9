use tokio::sync::watch;

use crate::controller::SessionView;

/// Observer that draws a session.
///
/// Renderers receive the whole view on every change and must tolerate
/// being handed the same view more than once.
pub trait Renderer: Send {
    fn render(&mut self, view: &SessionView);
}

/// Render the current view, then again after each change. Returns once
/// the session stops publishing.
pub async fn render_loop<R: Renderer>(
    mut views: watch::Receiver<SessionView>,
    mut renderer: R,
) -> R {
    loop {
        let view = views.borrow_and_update().clone();
        renderer.render(&view);
        if views.changed().await.is_err() {
            break;
        }
    }
    // The final value may have been published just before the sender went away.
    let view = views.borrow().clone();
    renderer.render(&view);
    renderer
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::ChannelState;
    use crate::log::{MessageLog, Origin};

    #[derive(Default)]
    struct Recorder {
        lengths: Vec<usize>,
    }

    impl Renderer for Recorder {
        fn render(&mut self, view: &SessionView) {
            self.lengths.push(view.entries.len());
        }
    }

    #[tokio::test]
    async fn test_render_loop_follows_changes_until_sender_drops() {
        let (tx, rx) = watch::channel(SessionView::default());
        let task = tokio::spawn(render_loop(rx, Recorder::default()));

        let mut log = MessageLog::new();
        log.append(Origin::System, "WebSocket connected");
        tx.send_replace(SessionView {
            entries: log.snapshot(),
            channel_state: ChannelState::Open,
        });
        drop(tx);

        let recorder = task.await.unwrap();
        assert!(recorder.lengths.len() >= 2);
        assert_eq!(recorder.lengths.last(), Some(&1));
    }
}
