use std::time::{Duration, Instant};

use crate::graph::state::SyncState;

impl SyncState {
    pub fn tick_metrics(&mut self, now: Instant) {
        let window = Duration::from_secs(2);
        while let Some(front) = self.perf.msg_window.front() {
            if now.duration_since(*front) > window {
                self.perf.msg_window.pop_front();
            } else {
                break;
            }
        }
        self.perf.message_rate = self.perf.msg_window.len() as f32 / window.as_secs_f32();
    }

    pub(crate) fn on_message(&mut self, now: Instant) {
        self.perf.messages_total += 1;
        self.perf.msg_window.push_back(now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_rate_uses_two_second_window() {
        let mut st = SyncState::default();
        let t0 = Instant::now();
        for i in 0..4 {
            st.on_message(t0 + Duration::from_millis(i * 100));
        }
        st.tick_metrics(t0 + Duration::from_millis(500));
        assert_eq!(st.perf.messages_total, 4);
        assert_eq!(st.perf.message_rate, 2.0);

        st.tick_metrics(t0 + Duration::from_secs(5));
        assert_eq!(st.perf.message_rate, 0.0);
        assert_eq!(st.perf.messages_total, 4);
    }
}
