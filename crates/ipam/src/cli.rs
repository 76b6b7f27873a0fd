//! Clap derive structures for the `ipam` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use std::path::PathBuf;

use clap::{ArgGroup, Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ipam -- IP address management from the command line
#[derive(Debug, Parser)]
#[command(
    name = "ipam",
    version,
    about = "Track subnets, address assignments and DNS zones",
    long_about = "Track IPv4 and IPv6 subnets, hand out the next free address,\n\
        and keep DNS names inside the zones you have registered.\n\n\
        State lives in a JSON data file selected by profile or --data-file.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Configuration profile to use
    #[arg(long, short = 'p', env = "IPAM_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Data file to operate on (overrides profile)
    #[arg(long, short = 'd', env = "IPAM_DATA_FILE", global = true)]
    pub data_file: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "IPAM_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage subnets
    #[command(alias = "subnet", alias = "sn")]
    Subnets(SubnetsArgs),

    /// Manage address assignments
    #[command(alias = "address", alias = "addr", alias = "ip")]
    Addresses(AddressesArgs),

    /// Manage DNS zones
    #[command(alias = "zone", alias = "z")]
    Zones(ZonesArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SUBNETS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct SubnetsArgs {
    #[command(subcommand)]
    pub command: SubnetsCommand,
}

#[derive(Debug, Subcommand)]
pub enum SubnetsCommand {
    /// List all subnets
    #[command(alias = "ls")]
    List,

    /// Show subnet details
    Get {
        /// Subnet ID, name, or CIDR
        subnet: String,
    },

    /// Look up subnets by CIDR, name, or a contained address
    Find(FindSubnetArgs),

    /// Create a subnet
    Create {
        /// Network in CIDR notation; host bits are cleared
        cidr: String,

        /// Unique subnet name
        #[arg(long, short = 'n')]
        name: Option<String>,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },

    /// Delete a subnet and every address in it
    #[command(alias = "rm")]
    Delete {
        /// Subnet ID, name, or CIDR
        subnet: String,
    },

    /// Show how much of a subnet is assigned
    Usage {
        /// Subnet ID, name, or CIDR
        subnet: String,
    },
}

#[derive(Debug, Args)]
#[command(group(
    ArgGroup::new("criterion")
        .required(true)
        .args(["cidr", "name", "contains"])
))]
pub struct FindSubnetArgs {
    /// Exact network, e.g. 10.0.0.0/24
    #[arg(long)]
    pub cidr: Option<String>,

    /// Exact subnet name
    #[arg(long)]
    pub name: Option<String>,

    /// Every subnet containing this address, most specific first
    #[arg(long)]
    pub contains: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ADDRESSES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct AddressesArgs {
    #[command(subcommand)]
    pub command: AddressesCommand,
}

#[derive(Debug, Subcommand)]
pub enum AddressesCommand {
    /// List assigned addresses
    #[command(alias = "ls")]
    List(AddressListArgs),

    /// Show address details
    Get {
        /// Address record ID
        id: u64,
    },

    /// Assign the lowest free address in a subnet
    #[command(alias = "next")]
    Allocate {
        /// Subnet ID, name, or CIDR
        subnet: String,

        #[command(flatten)]
        assignment: AssignmentArgs,
    },

    /// Assign a specific address in a subnet
    Register {
        /// Subnet ID, name, or CIDR
        subnet: String,

        /// Address to assign
        address: String,

        #[command(flatten)]
        assignment: AssignmentArgs,
    },

    /// Change the DNS name or description of an address
    Update {
        /// Address record ID
        id: u64,

        /// New DNS name
        #[arg(long, conflicts_with = "clear_dns_name")]
        dns_name: Option<String>,

        /// Remove the DNS name
        #[arg(long)]
        clear_dns_name: bool,

        /// New description
        #[arg(long, conflicts_with = "clear_description")]
        description: Option<String>,

        /// Remove the description
        #[arg(long)]
        clear_description: bool,
    },

    /// Release an address
    #[command(alias = "rm", alias = "release")]
    Delete {
        /// Address record ID
        id: u64,
    },
}

#[derive(Debug, Args)]
pub struct AddressListArgs {
    /// Only addresses in this subnet (ID, name, or CIDR)
    #[arg(long, short = 's')]
    pub subnet: Option<String>,

    /// Exact address
    #[arg(long)]
    pub address: Option<String>,

    /// Exact DNS name
    #[arg(long)]
    pub dns_name: Option<String>,

    /// Max results (1-1000)
    #[arg(long, short = 'l', default_value = "100")]
    pub limit: usize,

    /// Pagination offset
    #[arg(long, default_value = "0")]
    pub offset: usize,
}

#[derive(Debug, Args)]
pub struct AssignmentArgs {
    /// DNS name; must fall inside a registered zone
    #[arg(long)]
    pub dns_name: Option<String>,

    /// Free-form description
    #[arg(long)]
    pub description: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ZONES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ZonesArgs {
    #[command(subcommand)]
    pub command: ZonesCommand,
}

#[derive(Debug, Subcommand)]
pub enum ZonesCommand {
    /// List DNS zones
    #[command(alias = "ls")]
    List,

    /// Show zone details
    Get {
        /// Zone ID
        id: u64,
    },

    /// Register a DNS zone
    Create {
        /// Zone name, e.g. example.com
        name: String,

        /// Primary name server
        #[arg(long)]
        mname: String,

        /// Responsible mailbox in DNS form, e.g. hostmaster.example.com
        #[arg(long)]
        rname: String,

        #[command(flatten)]
        timers: SoaTimerArgs,

        /// Free-form description
        #[arg(long)]
        description: Option<String>,
    },

    /// Rename a zone or change its SOA
    Update {
        /// Zone ID
        id: u64,

        /// New zone name
        #[arg(long)]
        name: Option<String>,

        /// New description
        #[arg(long)]
        description: Option<String>,

        /// New primary name server
        #[arg(long)]
        mname: Option<String>,

        /// New responsible mailbox
        #[arg(long)]
        rname: Option<String>,

        #[command(flatten)]
        timers: SoaTimerArgs,
    },

    /// Remove a zone
    #[command(alias = "rm")]
    Delete {
        /// Zone ID
        id: u64,
    },
}

/// SOA timers. Omitted values keep their defaults (create) or current values (update).
#[derive(Debug, Args)]
pub struct SoaTimerArgs {
    /// Zone serial number
    #[arg(long)]
    pub serial: Option<u32>,

    /// Refresh interval in seconds
    #[arg(long)]
    pub refresh: Option<u32>,

    /// Retry interval in seconds
    #[arg(long)]
    pub retry: Option<u32>,

    /// Expire time in seconds
    #[arg(long)]
    pub expire: Option<u32>,

    /// Negative-caching TTL in seconds
    #[arg(long)]
    pub minimum: Option<u32>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },

    /// Set a value on the active profile
    Set {
        /// Key: data_file, allocation_attempts, or description
        key: String,

        /// Value to set
        value: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
