//! Command-line flags backend.

use async_trait::async_trait;
use clap::{Arg, ArgAction, Command};
use tokio_util::sync::CancellationToken;
use tracing::trace;

use strata_core::{Backend, BackendError, BackendResult, FieldSet, SchemaLoader};

/// Schema-aware population from command-line flags.
///
/// Flags must be defined before an argument list can be parsed, which is
/// why this backend consumes the introspected schema instead of answering
/// keyed lookups: it defines one long flag per eligible descriptor key,
/// parses the captured arguments, and writes only the flags the user
/// actually set — untouched fields stay available for later backends.
///
/// Every flag takes a value (`--debug true`, `--port=8080`);
/// presence-only boolean flags are not modeled.
pub struct FlagsBackend {
    args: Vec<String>,
}

impl FlagsBackend {
    /// Captures the process argument list (without the binary name).
    pub fn new() -> Self {
        Self {
            args: std::env::args().skip(1).collect(),
        }
    }

    /// Uses an explicit argument list instead of the process arguments.
    pub fn from_args<I, S>(args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for FlagsBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SchemaLoader for FlagsBackend {
    async fn load_fields(
        &self,
        _cancel: &CancellationToken,
        fields: &mut FieldSet<'_>,
    ) -> BackendResult<()> {
        let mut command = Command::new("strata")
            .no_binary_name(true)
            .disable_help_flag(true);

        for field in fields.iter() {
            if !field.is_eligible() {
                // Already satisfied by an earlier backend, or pinned to a
                // different one: no flag gets defined for it.
                continue;
            }
            command = command.arg(
                Arg::new(field.key().to_string())
                    .long(field.key().to_string())
                    .action(ArgAction::Set),
            );
        }

        let matches = command
            .try_get_matches_from(&self.args)
            .map_err(BackendError::other)?;

        for field in fields.iter_mut() {
            if !field.is_eligible() {
                continue;
            }
            if let Some(value) = matches.get_one::<String>(field.key()) {
                trace!(key = field.key(), "flag set");
                field.write(value)?;
            }
        }

        Ok(())
    }
}

#[async_trait]
impl Backend for FlagsBackend {
    fn name(&self) -> &str {
        "flags"
    }

    /// Keyed lookup is not meaningful for command-line flags.
    async fn get(&self, _cancel: &CancellationToken, _key: &str) -> BackendResult<Vec<u8>> {
        Err(BackendError::other(
            "flags backend does not support keyed lookup",
        ))
    }

    fn as_schema_loader(&self) -> Option<&dyn SchemaLoader> {
        Some(self)
    }
}
