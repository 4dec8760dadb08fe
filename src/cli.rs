use clap::Parser;

/// BGP route propagation simulator.
#[derive(Parser, Debug)]
#[command(name = "bgpsimulator", about = "BGP route propagation simulator")]
pub struct Cli {
    /// Run under a ROV++ variant (v0, v0.1, v0.2, v0.3) instead of plain ROV.
    #[arg(long)]
    pub rovpp: bool,

    /// Run under the EZBGPsec policy overlay.
    #[arg(long)]
    pub ezbgpsec: bool,

    /// Enable random tie-break on exact-priority route comparisons.
    #[arg(long)]
    pub random: bool,

    /// Invert stored results (store ASNs that did NOT select a route).
    #[arg(long)]
    pub invert_results: bool,

    /// Also persist each AS's second-best (depref) route.
    #[arg(long)]
    pub store_depref: bool,

    /// Number of seed rows per prefix block before the planner bisects further.
    #[arg(long, default_value_t = 100_000)]
    pub iteration_size: usize,

    #[arg(long, default_value = "results")]
    pub results_table: String,

    #[arg(long, default_value = "depref_results")]
    pub depref_table: String,

    #[arg(long, default_value = "inverse_results")]
    pub inverse_results_table: String,

    #[arg(long, default_value = "announcements")]
    pub announcements_table: String,

    #[arg(long, default_value = "simulation")]
    pub simulation_table: String,

    /// May be repeated to name multiple per-policy output tables.
    #[arg(long = "policy-table")]
    pub policy_tables: Vec<String>,

    /// Run the up/down propagation cycle twice per block.
    #[arg(long)]
    pub prop_twice: bool,

    #[arg(long)]
    pub config_section: Option<String>,

    /// May be repeated to exclude one or more ASNs from the run entirely.
    #[arg(long = "exclude-asn")]
    pub exclude_asn: Vec<u32>,

    /// 0 = single-threaded, 1 = multi-homed aware, 2 = full multi-homed propagation.
    #[arg(long, default_value_t = 0)]
    pub mh_propagation_mode: u8,

    #[arg(long)]
    pub log_folder: Option<String>,

    /// 0 = error .. 4 = trace, matching `log::LevelFilter` ordinal order.
    #[arg(long, default_value_t = 2)]
    pub severity_level: u8,
}

impl Cli {
    pub fn log_level_filter(&self) -> log::LevelFilter {
        match self.severity_level {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Warn,
            2 => log::LevelFilter::Info,
            3 => log::LevelFilter::Debug,
            _ => log::LevelFilter::Trace,
        }
    }
}
