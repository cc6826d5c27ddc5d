//! Layered settings for talk mode
//!
//! Defaults → optional TOML file → `TALK_*` environment overrides
//! (double underscore as the section separator, e.g.
//! `TALK_STT__URL=http://127.0.0.1:5552`).

mod settings;

pub use settings::{
    CaptureSettings, RelaySettings, Settings, SttSettings, TtsBackendKind, TtsSettings, UiSettings,
    VoiceSettings,
};
