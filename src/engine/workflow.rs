// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! The `simple` and `extended` pipelines.
//!
//! ```text
//! extended:  validator ─► handler ─► converter ─► listeners ─► reactors ─► returner
//! simple:                 handler ────────────► listeners ─► reactors ─► returner
//! ```
//!
//! Listeners and reactors are skipped for a null result. A message with no
//! handler override yields null without calling anything.

use serde_json::Value;

use crate::errors::{ConfigurationError, ProcessorError};
use crate::hooks::{HookCall, HookKind, HookResult};
use crate::keywords::is_truthy;
use crate::message::{HookUrl, Message};

pub fn simple_workflow(call: &HookCall<'_>) -> HookResult {
    run_pipeline(call, false)
}

/// `simple` plus a validator before and a converter after the handler.
pub fn extended_workflow(call: &HookCall<'_>) -> HookResult {
    run_pipeline(call, true)
}

fn run_pipeline(call: &HookCall<'_>, extended: bool) -> HookResult {
    let processor = call.processor();
    let message = call.message();
    let hooks = processor.hooks();

    if extended {
        if let Some(validator) = stage(message, HookKind::Validator)? {
            let rejection =
                hooks.call_validator(&validator.name, &call.with_settings(&validator.settings))?;
            if is_truthy(&rejection) {
                return Err(ProcessorError::Validation(rejection));
            }
        }
    }

    let Some(handler) = stage(message, HookKind::Handler)? else {
        return Ok(Value::Null);
    };
    let mut result = hooks.call_handler(&handler.name, &call.with_settings(&handler.settings))?;

    if extended {
        if let Some(converter) = stage(message, HookKind::Converter)? {
            result = hooks.call_converter(
                &converter.name,
                &call.with_settings(&converter.settings),
                result,
            )?;
        }
    }

    if !result.is_null() {
        hooks.fire_listeners(message, &result);
        processor.reactors().react(processor, message, &result);
    }

    if let Some(returner) = stage(message, HookKind::Returner)? {
        hooks.call_returner(&returner.name, &call.with_settings(&returner.settings), &result)?;
    }

    Ok(result)
}

fn stage(message: &Message, kind: HookKind) -> Result<Option<HookUrl>, ConfigurationError> {
    message.hook_override(kind).map(HookUrl::parse).transpose()
}
