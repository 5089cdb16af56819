//! Host audio: keep microphones muted while recording

use async_trait::async_trait;
use std::sync::Mutex;
use tokio::process::Command;
use tracing::{info, warn};

#[async_trait]
pub trait HostAudio: Send + Sync {
    /// Mute every capture source. Never fails; problems are logged.
    async fn mute_inputs(&self);

    /// Undo `mute_inputs`
    async fn restore_inputs(&self);
}

/// Capture sources from `pactl list short sources` that look like inputs.
///
/// Lines are tab separated: `<id>\t<name>\t...`.
pub fn parse_sources(listing: &str) -> Vec<(String, String)> {
    listing
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut parts = line.split('\t');
            let id = parts.next()?.trim();
            let name = parts.next().unwrap_or_default().trim();
            (!id.is_empty() && (name.contains("input") || name.contains("source")))
                .then(|| (id.to_string(), name.to_string()))
        })
        .collect()
}

/// PulseAudio / PipeWire through the `pactl` CLI
#[derive(Default)]
pub struct PactlAudio {
    muted: Mutex<Vec<String>>,
}

impl PactlAudio {
    pub fn new() -> Self {
        Self::default()
    }

    async fn pactl(args: &[&str]) -> std::io::Result<String> {
        let output = Command::new("pactl").args(args).output().await?;
        if !output.status.success() {
            return Err(std::io::Error::other(format!(
                "pactl {} exited with {}",
                args.join(" "),
                output.status
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn take_muted(&self) -> Vec<String> {
        let mut guard = self.muted.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        std::mem::take(&mut *guard)
    }
}

#[async_trait]
impl HostAudio for PactlAudio {
    async fn mute_inputs(&self) {
        let listing = match Self::pactl(&["list", "short", "sources"]).await {
            Ok(listing) => listing,
            Err(err) => {
                warn!(error = %err, "Could not list audio sources; mute microphones manually");
                return;
            }
        };

        let mut muted = Vec::new();
        for (id, name) in parse_sources(&listing) {
            match Self::pactl(&["set-source-mute", &id, "1"]).await {
                Ok(_) => {
                    info!(source = %name, "Muted");
                    muted.push(id);
                }
                Err(err) => warn!(source = %name, error = %err, "Could not mute source; mute it manually"),
            }
        }
        info!(count = muted.len(), "Microphones muted");
        self.muted
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .extend(muted);
    }

    async fn restore_inputs(&self) {
        let ids = self.take_muted();
        if ids.is_empty() {
            return;
        }
        for id in &ids {
            if let Err(err) = Self::pactl(&["set-source-mute", id, "0"]).await {
                warn!(source = %id, error = %err, "Could not unmute source");
            }
        }
        info!(count = ids.len(), "Microphones unmuted");
    }
}

/// For hosts without a mixer, and for tests
pub struct NoAudio;

#[async_trait]
impl HostAudio for NoAudio {
    async fn mute_inputs(&self) {}

    async fn restore_inputs(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_input_sources_only() {
        let listing = concat!(
            "45\talsa_output.pci-0000_00_1f.3.analog-stereo.monitor\tPipeWire\ts32le 2ch 48000Hz\tSUSPENDED\n",
            "46\talsa_input.pci-0000_00_1f.3.analog-stereo\tPipeWire\ts32le 2ch 48000Hz\tRUNNING\n",
            "\n",
            "51\tbluez_source.AA_BB\tPipeWire\ts16le 1ch 16000Hz\tIDLE\n",
        );
        let sources = parse_sources(listing);
        assert_eq!(
            sources,
            vec![
                ("46".to_string(), "alsa_input.pci-0000_00_1f.3.analog-stereo".to_string()),
                ("51".to_string(), "bluez_source.AA_BB".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn restore_without_mute_is_a_no_op() {
        let audio = PactlAudio::new();
        audio.restore_inputs().await;
        assert!(audio.take_muted().is_empty());
    }
}
