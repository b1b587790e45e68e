//! CLI command implementations.

pub mod helpers;
pub mod init;
pub mod items;
pub mod payment;
pub mod projects;
pub mod stats;
pub mod tracking;

pub use init::run_init;
pub use items::{run_items_add, run_items_list};
pub use payment::{run_payment_calc, run_payment_syllables};
pub use projects::{run_members_add, run_members_list, run_projects_create, run_projects_list};
pub use stats::{
    run_stats_annotators, run_stats_export, run_stats_reviewers, run_stats_summary,
};
pub use tracking::{
    run_lock, run_review, run_start, run_status, run_submit, run_unlock, ReviewAction,
};
