//! tfflow - Ordered, lock-guarded plan/apply/destroy workflows for
//! Terraform-compatible tools.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── workflow      # plan / apply / destroy commands, progress output
//! │   ├── output        # Terminal styling helpers
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── settings      # .tfflow.toml management
//!     ├── target        # app/cloud/env and derived paths
//!     ├── environment   # Explicit environment context
//!     ├── credentials   # Dotenv credential loading
//!     ├── merge         # Variable fragment merging
//!     ├── variables     # Merged document + sensitive handling
//!     ├── mirror        # Provider mirror CLI config
//!     ├── runner        # Command specs and process execution
//!     ├── tool          # Provisioning tool command builders
//!     ├── lock          # Per-composition run lock
//!     ├── plan          # Plan artifacts and fingerprints
//!     ├── confirm       # Destroy confirmation
//!     └── workflow/     # Step definitions, state machine, engine, reports
//! ```
//!
//! # Features
//!
//! - Deterministic merge of YAML/JSON variable fragments
//! - Sensitive variables kept out of files on disk and out of logs
//! - Offline provider installation from a filesystem mirror
//! - Fresh, fingerprinted plan artifacts for every apply
//! - Explicit confirmation before destroy
//! - One run per composition directory at a time

pub mod cli;
pub mod core;
pub mod error;
