#![allow(dead_code)]

use std::path::Path;

use cmdpipe::config::{RawSettings, Settings};
use cmdpipe::descriptor::CommandDescriptor;

/// Builder for `Settings` rooted in a test's own rendezvous directory.
pub struct SettingsBuilder {
    raw: RawSettings,
}

impl SettingsBuilder {
    pub fn new(tmp_dir: &Path) -> Self {
        Self {
            raw: RawSettings {
                tmp_dir: tmp_dir.to_path_buf(),
                poll_interval_ms: 10,
                ..RawSettings::default()
            },
        }
    }

    pub fn propagate(mut self, entry: &str) -> Self {
        self.raw.propagate_env.push(entry.to_string());
        self
    }

    pub fn accept_timeout_ms(mut self, ms: u64) -> Self {
        self.raw.accept_timeout_ms = Some(ms);
        self
    }

    pub fn strict_channels(mut self, val: bool) -> Self {
        self.raw.strict_channels = val;
        self
    }

    pub fn prefetch(mut self, n: usize) -> Self {
        self.raw.prefetch = n;
        self
    }

    pub fn consumer_tag(mut self, tag: &str) -> Self {
        self.raw.consumer_tag = Some(tag.to_string());
        self
    }

    pub fn build(self) -> Settings {
        Settings::try_from(self.raw).expect("Failed to build valid settings from builder")
    }
}

/// Builder for `CommandDescriptor`.
pub struct DescriptorBuilder {
    descriptor: CommandDescriptor,
}

impl DescriptorBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            descriptor: CommandDescriptor {
                name: name.to_string(),
                params: vec![],
                env: vec![],
                out: "cmdpipe-test00-out".to_string(),
                input: "cmdpipe-test00-in".to_string(),
                error: "cmdpipe-test00-err".to_string(),
                exit: "cmdpipe-test00-exit".to_string(),
            },
        }
    }

    pub fn param(mut self, p: &str) -> Self {
        self.descriptor.params.push(p.to_string());
        self
    }

    pub fn env(mut self, entry: &str) -> Self {
        self.descriptor.env.push(entry.to_string());
        self
    }

    pub fn channels(mut self, out: &str, input: &str, error: &str, exit: &str) -> Self {
        self.descriptor.out = out.to_string();
        self.descriptor.input = input.to_string();
        self.descriptor.error = error.to_string();
        self.descriptor.exit = exit.to_string();
        self
    }

    pub fn build(self) -> CommandDescriptor {
        self.descriptor
    }
}
