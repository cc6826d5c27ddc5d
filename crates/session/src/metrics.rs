//! Session counters, exported through whatever recorder the host
//! process installs.

pub(crate) fn record_turn_completed() {
    metrics::counter!("talk_turns_completed_total").increment(1);
}

pub(crate) fn record_transcription_failure() {
    metrics::counter!("talk_transcription_failures_total").increment(1);
}

pub(crate) fn record_barge_in() {
    metrics::counter!("talk_barge_ins_total").increment(1);
}

pub(crate) fn record_reply_spoken() {
    metrics::counter!("talk_replies_spoken_total").increment(1);
}

pub(crate) fn record_relay_failure() {
    metrics::counter!("talk_relay_failures_total").increment(1);
}
