//! Versioned single-record state files.
//!
//! Each file holds one line: `{"kind":..,"version":..,"state":{..}}`.
//!
//! Load rules:
//! - a missing file is a fresh start (`Ok(None)`), not an error;
//! - a bare JSON object without the envelope is a version-0 record;
//! - a foreign `kind` or a `version` newer than this build is rejected;
//! - older versions pass through [`Persisted::upgrade`], then missing fields
//!   are default-filled (`#[serde(default)]`) and unknown fields ignored.

use std::fs;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::core::types::Pose;

/// A record type that can live in a state file.
pub trait Persisted: Serialize + DeserializeOwned {
    /// Stable tag written into the envelope.
    const KIND: &'static str;
    /// Schema version written by this build.
    const VERSION: u32;

    /// Rewrite a record saved by schema version `from` into the current shape.
    fn upgrade(from: u32, state: Value) -> Result<Value> {
        let _ = from;
        Ok(state)
    }
}

impl Persisted for Pose {
    const KIND: &'static str = "pose";
    const VERSION: u32 = 1;
}

/// Synchronous load/save of one record.
pub trait StateStore<T> {
    fn load(&mut self) -> Result<Option<T>>;
    fn save(&mut self, value: &T) -> Result<()>;
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    kind: &'a str,
    version: u32,
    state: &'a T,
}

#[derive(Deserialize)]
struct Envelope {
    kind: String,
    version: u32,
    state: Value,
}

/// Serialize `value` into its one-line envelope (no trailing newline).
pub fn encode<T: Persisted>(value: &T) -> Result<String> {
    serde_json::to_string(&EnvelopeRef {
        kind: T::KIND,
        version: T::VERSION,
        state: value,
    })
    .with_context(|| format!("serialize {} record", T::KIND))
}

/// Parse an envelope (or a legacy bare record) into `T`.
pub fn decode<T: Persisted>(raw: &str) -> Result<T> {
    let value: Value =
        serde_json::from_str(raw.trim()).with_context(|| format!("parse {} record", T::KIND))?;
    let is_envelope = matches!(
        &value,
        Value::Object(map) if map.contains_key("kind") && map.contains_key("state")
    );
    let (version, state) = if is_envelope {
        let envelope: Envelope = serde_json::from_value(value)
            .with_context(|| format!("parse {} envelope", T::KIND))?;
        if envelope.kind != T::KIND {
            bail!("expected a '{}' record, found '{}'", T::KIND, envelope.kind);
        }
        (envelope.version, envelope.state)
    } else if value.is_object() {
        (0, value)
    } else {
        bail!("{} record must be a JSON object", T::KIND);
    };
    if version > T::VERSION {
        return Err(anyhow!(
            "{} record version {} is newer than supported version {}",
            T::KIND,
            version,
            T::VERSION
        ));
    }
    let state = if version < T::VERSION {
        debug!(kind = T::KIND, from = version, to = T::VERSION, "upgrading record");
        T::upgrade(version, state)?
    } else {
        state
    };
    serde_json::from_value(state).with_context(|| format!("deserialize {} record", T::KIND))
}

/// Record kind named by an envelope, `None` for a legacy bare record.
pub fn peek_kind(raw: &str) -> Result<Option<String>> {
    let value: Value = serde_json::from_str(raw.trim()).context("parse state record")?;
    match value.get("kind") {
        Some(Value::String(kind)) if value.get("state").is_some() => Ok(Some(kind.clone())),
        _ if value.is_object() => Ok(None),
        _ => bail!("state record must be a JSON object"),
    }
}

/// JSON state file written atomically (temp file + rename).
#[derive(Debug)]
pub struct JsonFileStore<T> {
    path: PathBuf,
    _record: PhantomData<fn() -> T>,
}

impl<T> JsonFileStore<T> {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl<T: Persisted> StateStore<T> for JsonFileStore<T> {
    fn load(&mut self) -> Result<Option<T>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no state file, fresh start");
            return Ok(None);
        }
        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("read state {}", self.path.display()))?;
        let value = decode(&contents).with_context(|| format!("load {}", self.path.display()))?;
        Ok(Some(value))
    }

    fn save(&mut self, value: &T) -> Result<()> {
        let mut buf = encode(value)?;
        buf.push('\n');
        write_atomic(&self.path, &buf)
    }
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("state path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp state {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace state {}", path.display()))?;
    Ok(())
}
