// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

use serde_json::{Map, Value};

use crate::engine::Worker;
use crate::message::Message;
use crate::runtime::Processor;
use crate::traits::HostCommand;

/// Everything a hook sees when it is invoked.
///
/// Handlers read their positional and named parameters from the message,
/// the settings parsed from their override URL (`read?channel=2`), and may
/// reach back into the processor, for instance to enqueue follow-up work.
#[derive(Clone, Copy)]
pub struct HookCall<'a> {
    processor: &'a Processor,
    message: &'a Message,
    settings: &'a Map<String, Value>,
    worker: Option<&'a Worker>,
}

impl<'a> HookCall<'a> {
    pub fn new(
        processor: &'a Processor,
        message: &'a Message,
        settings: &'a Map<String, Value>,
        worker: Option<&'a Worker>,
    ) -> Self {
        Self {
            processor,
            message,
            settings,
            worker,
        }
    }

    /// Same call, with the settings of another stage.
    pub fn with_settings(self, settings: &'a Map<String, Value>) -> Self {
        Self { settings, ..self }
    }

    pub fn processor(&self) -> &'a Processor {
        self.processor
    }

    pub fn message(&self) -> &'a Message {
        self.message
    }

    pub fn args(&self) -> &'a [Value] {
        &self.message.args
    }

    pub fn kwargs(&self) -> &'a Map<String, Value> {
        &self.message.kwargs
    }

    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.message.args.get(index)
    }

    pub fn kwarg(&self, key: &str) -> Option<&'a Value> {
        self.message.kwargs.get(key)
    }

    pub fn settings(&self) -> &'a Map<String, Value> {
        self.settings
    }

    pub fn setting(&self, key: &str) -> Option<&'a Value> {
        self.settings.get(key)
    }

    /// The worker running this call, or `None` on the caller's thread.
    pub fn worker(&self) -> Option<&'a Worker> {
        self.worker
    }

    /// Host command capability, when the processor was built with one.
    pub fn host(&self) -> Option<&'a dyn HostCommand> {
        self.processor.host()
    }
}
