//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module    | Commands handled                              |
//! |-----------|-----------------------------------------------|
//! | `project` | `Init`                                        |
//! | `config`  | `Config`                                      |
//! | `mission` | `Create`, `Status`, `List`, `Usage`, `Check`  |
//! | `run`     | `Step`, `Run`                                 |
//! | `tool`    | `Tool`                                        |

pub mod config;
pub mod mission;
pub mod project;
pub mod run;
pub mod tool;

pub use config::cmd_config;
pub use mission::{cmd_check, cmd_create, cmd_list, cmd_status, cmd_usage};
pub use project::cmd_init;
pub use run::{cmd_run, cmd_step};
pub use tool::cmd_tool;
