#![warn(clippy::all, clippy::pedantic)]
#![allow(
    clippy::doc_markdown,
    clippy::map_unwrap_or,
    clippy::manual_let_else,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::needless_pass_by_value,
    clippy::redundant_closure_for_method_calls,
    clippy::return_self_not_must_use,
    clippy::similar_names,
    clippy::single_match_else,
    clippy::struct_field_names,
    clippy::too_many_lines,
    clippy::uninlined_format_args,
    clippy::unnecessary_wraps,
    clippy::unused_self
)]

use clap::Subcommand;
use serde::{Deserialize, Serialize};

pub mod config;
pub mod delivery;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod lifecycle;
pub mod registry;
pub mod resolver;
pub mod stream;

pub use config::Config;
pub use dispatcher::{Dispatcher, HandlerResponse, InvocationEvent};
pub use error::RelayError;

/// Connection registry subcommands
#[derive(Subcommand, Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub enum ConnectionCommands {
    /// List live connection records
    List {
        /// Filter by agent identity
        #[arg(long)]
        agent: Option<String>,
    },
    /// Remove connection records from the registry
    #[command(long_about = "\
Remove connection records from the registry.

Deletes a single record by connection id, or every record when no \
id is given. Deleting a record does not close the underlying \
transport session; it only stops routing to it.

Examples:
  echorelay connections clear --connection-id abc123 --yes
  echorelay connections clear --yes")]
    Clear {
        /// Delete a single record by connection id
        #[arg(long)]
        connection_id: Option<String>,
        /// Skip confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}
