use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use serde_json::{json, Map, Value};

use crate::models::Step;
use crate::runs::summary::now_utc_iso;

pub type EventPayload = Map<String, Value>;

pub const RUN_STARTED: &str = "run_started";
pub const RUN_FINISHED: &str = "run_finished";
pub const RUN_FAILED: &str = "run_failed";
pub const STEP_STARTED: &str = "step_started";
pub const STEP_FINISHED: &str = "step_finished";

/// Append-only writer for a terminal run's `events.jsonl`.
///
/// Every line is one compact JSON object with `type`, `run_id` and `ts`;
/// payload keys are merged last and may override them. The file is opened
/// on the first emit and kept open; clones share the handle.
#[derive(Debug, Clone)]
pub struct EventWriter {
    path: Arc<PathBuf>,
    run_id: Arc<str>,
    file: Arc<Mutex<Option<File>>>,
}

impl EventWriter {
    pub fn new(path: impl Into<PathBuf>, run_id: impl Into<String>) -> Self {
        Self {
            path: Arc::new(path.into()),
            run_id: Arc::from(run_id.into()),
            file: Arc::new(Mutex::new(None)),
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    pub fn emit(&self, event_type: &str, payload: EventPayload) -> anyhow::Result<Value> {
        let mut event = EventPayload::new();
        event.insert("type".to_string(), json!(event_type));
        event.insert("run_id".to_string(), json!(self.run_id()));
        event.insert("ts".to_string(), json!(now_utc_iso()));
        event.extend(payload);
        let event = Value::Object(event);

        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        let mut slot = self
            .file
            .lock()
            .map_err(|_| anyhow::anyhow!("event writer lock poisoned"))?;
        if slot.is_none() {
            *slot = Some(self.open()?);
        }
        if let Some(file) = slot.as_mut() {
            file.write_all(&line)?;
        }
        Ok(event)
    }

    fn open(&self) -> anyhow::Result<File> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.path.as_path())
            .with_context(|| format!("failed to open {}", self.path.display()))?;
        Ok(file)
    }

    /// Step events always name the step tag and the model serving it.
    pub fn emit_step(
        &self,
        event_type: &str,
        step: Step,
        model: &str,
        extra: EventPayload,
    ) -> anyhow::Result<Value> {
        let mut payload = EventPayload::new();
        payload.insert("step".to_string(), Value::String(step.tag().to_string()));
        payload.insert("model".to_string(), Value::String(model.to_string()));
        payload.extend(extra);
        self.emit(event_type, payload)
    }
}
