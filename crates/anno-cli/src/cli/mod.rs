//! CLI command definitions.

use anno_core::store::registry::Role;
use clap::{Parser, Subcommand};

pub mod commands;

/// Annotation review tracker
#[derive(Parser, Debug)]
#[command(name = "anno")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Output JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Override acting user (default: $ANNO_USER or $USER)
    #[arg(long, global = true)]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Initialize a new .anno directory in the current directory
    Init,

    /// Manage projects
    #[command(subcommand)]
    Projects(ProjectsCommands),

    /// Manage project members
    #[command(subcommand)]
    Members(MembersCommands),

    /// Manage annotation items
    #[command(subcommand)]
    Items(ItemsCommands),

    /// Track annotation lifecycle and review
    #[command(subcommand)]
    Tracking(TrackingCommands),

    /// Completion metrics
    #[command(subcommand)]
    Stats(StatsCommands),

    /// Payment accounting
    #[command(subcommand)]
    Payment(PaymentCommands),
}

// ============================================================================
// Projects subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ProjectsCommands {
    /// Create a new project
    Create {
        /// Project name (also the payment rate key)
        name: String,

        /// Optional description
        #[arg(long = "description", visible_alias = "desc")]
        description: Option<String>,
    },

    /// List projects
    List,
}

// ============================================================================
// Members subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum MembersCommands {
    /// Add a member to a project (or change their role)
    Add {
        /// Project id
        project: i64,

        /// Username
        username: String,

        /// Member role
        #[arg(long, value_enum)]
        role: Role,
    },

    /// List members of a project
    List {
        /// Project id
        project: i64,
    },
}

// ============================================================================
// Items subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum ItemsCommands {
    /// Add an item to a project
    Add {
        /// Project id
        project: i64,

        /// Item text
        #[arg(long)]
        text: Option<String>,

        /// Audio duration in minutes
        #[arg(long)]
        audio_minutes: Option<f64>,
    },

    /// List items visible to the acting user
    List {
        /// Project id
        project: i64,
    },
}

// ============================================================================
// Tracking subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum TrackingCommands {
    /// Show tracking status for an item
    Status {
        /// Project id
        project: i64,

        /// Item id
        item: i64,
    },

    /// Start annotating an item
    Start {
        /// Project id
        project: i64,

        /// Item id
        item: i64,
    },

    /// Submit an item's annotation for review
    Submit {
        /// Project id
        project: i64,

        /// Item id
        item: i64,
    },

    /// Approve an item's annotation
    Approve {
        /// Project id
        project: i64,

        /// Item id
        item: i64,

        /// Optional review notes
        #[arg(long)]
        notes: Option<String>,
    },

    /// Reject an item's annotation (notes required)
    Reject {
        /// Project id
        project: i64,

        /// Item id
        item: i64,

        /// Reason the annotator must address
        #[arg(long)]
        notes: String,
    },

    /// Acquire the edit lock on an item
    Lock {
        /// Project id
        project: i64,

        /// Item id
        item: i64,
    },

    /// Release the edit lock on an item
    Unlock {
        /// Project id
        project: i64,

        /// Item id
        item: i64,
    },
}

// ============================================================================
// Stats subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum StatsCommands {
    /// Project completion summary
    Summary {
        /// Project id
        project: i64,
    },

    /// Per-annotator performance
    Annotators {
        /// Project id
        project: i64,
    },

    /// Per-reviewer performance
    Reviewers {
        /// Project id
        project: i64,
    },

    /// Export tracking records as CSV to stdout
    Export {
        /// Project id
        project: i64,
    },
}

// ============================================================================
// Payment subcommands
// ============================================================================

#[derive(Subcommand, Debug)]
pub enum PaymentCommands {
    /// Calculate payment for a project window
    Calc {
        /// Project name (rate table key)
        project: String,

        /// Total audio minutes
        #[arg(long, default_value = "0")]
        minutes: f64,

        /// Approved segment count
        #[arg(long, default_value = "0")]
        segments: i64,

        /// Reviewed syllable count
        #[arg(long, default_value = "0")]
        syllables: i64,
    },

    /// Count syllables in a text
    Syllables {
        /// Text to tokenize
        text: String,
    },
}
