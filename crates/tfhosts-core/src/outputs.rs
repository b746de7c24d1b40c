//! Provisioning output reader
//!
//! Runs the provisioning tool's output export (`terraform output -json` by default) and
//! parses it into [`ProvisioningOutput`]. Each entry in the export is an object carrying the
//! value alongside its type tag:
//!
//! ```json
//! { "nat_host_public_ip": { "value": "3.3.3.3", "type": "string", "sensitive": false } }
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::Value;
use tfhosts_exec::{CommandExecutor, CommandSpec, ExecError};
use tracing::{debug, info, instrument};

use crate::error::InventoryError;

/// Default bound on the provisioning command
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A single exported output
#[derive(Clone, PartialEq, Deserialize)]
pub struct OutputValue {
    /// Raw value (string, number, list, object)
    pub value: Value,
    /// Declared type tag, e.g. `"string"` or `["list", "string"]`
    #[serde(rename = "type", default)]
    pub type_tag: Option<Value>,
    /// Marked sensitive by the provisioning tool
    #[serde(default)]
    pub sensitive: bool,
}

impl OutputValue {
    /// Wrap a bare value with no type tag
    pub fn new(value: impl Into<Value>) -> Self {
        Self {
            value: value.into(),
            type_tag: None,
            sensitive: false,
        }
    }

    /// Whether the value is a list
    #[must_use]
    pub fn is_list(&self) -> bool {
        self.value.is_array()
    }

    /// Coerce a scalar to a non-empty string
    ///
    /// Strings are trimmed and numbers formatted. Anything else is rejected with a reason.
    pub fn as_scalar_string(&self) -> Result<String, String> {
        scalar_string(&self.value)
    }

    /// Coerce to one or more non-empty strings
    ///
    /// A scalar yields one element, a list of scalars yields one element per entry.
    pub fn as_string_list(&self) -> Result<Vec<String>, String> {
        match &self.value {
            Value::Array(items) if items.is_empty() => Err("empty list".to_string()),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, item)| scalar_string(item).map_err(|e| format!("element {i}: {e}")))
                .collect(),
            other => scalar_string(other).map(|s| vec![s]),
        }
    }
}

fn scalar_string(value: &Value) -> Result<String, String> {
    match value {
        Value::String(s) if s.trim().is_empty() => Err("empty string".to_string()),
        Value::String(s) => Ok(s.trim().to_string()),
        Value::Number(n) => Ok(n.to_string()),
        Value::Null => Err("null value".to_string()),
        Value::Bool(_) => Err("expected a string, found a boolean".to_string()),
        Value::Array(_) => Err("expected a string, found a list".to_string()),
        Value::Object(_) => Err("expected a string, found an object".to_string()),
    }
}

impl fmt::Debug for OutputValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("OutputValue");
        if self.sensitive {
            s.field("value", &"<sensitive>");
        } else {
            s.field("value", &self.value);
        }
        s.field("type_tag", &self.type_tag)
            .field("sensitive", &self.sensitive)
            .finish()
    }
}

/// Outputs exported by one provisioning run, keyed by output name
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProvisioningOutput {
    values: BTreeMap<String, OutputValue>,
}

impl ProvisioningOutput {
    /// Parse the provisioning tool's JSON export
    ///
    /// # Errors
    /// Returns `MalformedOutput` if the text is not a JSON object of `{ "value": ... }` entries.
    pub fn from_json(text: &str) -> Result<Self, InventoryError> {
        let values: BTreeMap<String, OutputValue> = serde_json::from_str(text)
            .map_err(|e| InventoryError::MalformedOutput(e.to_string()))?;
        Ok(Self { values })
    }

    /// Look up an output by name
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&OutputValue> {
        self.values.get(name)
    }

    /// Insert or replace an output
    pub fn insert(&mut self, name: impl Into<String>, value: OutputValue) {
        self.values.insert(name.into(), value);
    }

    /// Number of outputs
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether there are no outputs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>> FromIterator<(K, OutputValue)> for ProvisioningOutput {
    fn from_iter<I: IntoIterator<Item = (K, OutputValue)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Fetches outputs from the provisioning tool
pub struct OutputReader {
    executor: Arc<dyn CommandExecutor>,
    command: CommandSpec,
    timeout: Duration,
}

impl OutputReader {
    /// Create a reader running `command` through `executor`
    pub fn new(executor: Arc<dyn CommandExecutor>, command: CommandSpec) -> Self {
        Self {
            executor,
            command,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Reader for `terraform output -json` in the current directory
    pub fn terraform(executor: Arc<dyn CommandExecutor>) -> Self {
        Self::new(executor, terraform_command())
    }

    /// Set command timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Run the export command and parse its output
    ///
    /// # Errors
    /// - `ProvisioningUnavailable` if the command cannot be spawned or exits non-zero
    /// - `ProvisioningTimeout` if it does not exit within the configured timeout
    /// - `MalformedOutput` if stdout is not a well-formed export
    #[instrument(skip(self), fields(command = %self.command, executor = self.executor.executor_type()))]
    pub async fn fetch_outputs(&self) -> Result<ProvisioningOutput, InventoryError> {
        debug!(timeout = ?self.timeout, "fetching provisioning outputs");

        let result = self
            .executor
            .run_with_timeout(&self.command, self.timeout)
            .await
            .map_err(|e| match e {
                ExecError::Timeout { timeout } => InventoryError::ProvisioningTimeout {
                    command: self.command.to_string(),
                    timeout,
                },
                other => InventoryError::ProvisioningUnavailable {
                    command: self.command.to_string(),
                    stderr: single_line(&other.to_string()),
                },
            })?;

        if !result.success() {
            let stderr = single_line(&result.stderr);
            return Err(InventoryError::ProvisioningUnavailable {
                command: self.command.to_string(),
                stderr: if stderr.is_empty() {
                    format!("exited with status {}", result.status)
                } else {
                    stderr
                },
            });
        }

        let outputs = ProvisioningOutput::from_json(&result.stdout)?;
        info!(count = outputs.len(), duration = ?result.duration, "fetched provisioning outputs");

        Ok(outputs)
    }
}

/// Collapse multi-line tool output into one line
///
/// Terraform frames its diagnostics with box-drawing characters (`╷`, `│`, `╵`); those are
/// stripped, blank lines dropped, and the rest joined with `"; "`.
#[must_use]
pub fn single_line(text: &str) -> String {
    text.lines()
        .map(|line| line.trim_matches(|c: char| c.is_whitespace() || matches!(c, '╷' | '│' | '╵')))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

/// The default export command
#[must_use]
pub fn terraform_command() -> CommandSpec {
    CommandSpec::new("terraform").args(["output", "-json"])
}
