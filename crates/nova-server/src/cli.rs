use clap::Parser;
use nova_ltc::{Component, Config};

/// Flags accepted by the `nova-server` binary (CLI surface). Field names keep the
/// flag's own `snake_case` spelling rather than clap's default kebab-case, since that's the
/// name operators and existing deploy scripts already use.
#[derive(Debug, Parser)]
#[command(name = "nova-server", about = "Nova LTC/StoC process entry point")]
pub(crate) struct Cli {
    #[arg(long = "db_path")]
    pub(crate) db_path: String,

    #[arg(long = "server_id", default_value_t = 0)]
    pub(crate) server_id: u32,

    #[arg(long = "comp", default_value = "cc")]
    pub(crate) comp: CliComponent,

    #[arg(long = "cc_config_path")]
    pub(crate) cc_config_path: Option<String>,

    #[arg(long = "dc_config_path")]
    pub(crate) dc_config_path: Option<String>,

    #[arg(long = "enable_rdma", default_value_t = true)]
    pub(crate) enable_rdma: bool,

    #[arg(long = "enable_load_data", default_value_t = false)]
    pub(crate) enable_load_data: bool,

    #[arg(long = "cc_num_conn_workers", default_value_t = 4)]
    pub(crate) cc_num_conn_workers: u32,

    #[arg(long = "cc_num_async_workers", default_value_t = 2)]
    pub(crate) cc_num_async_workers: u32,

    #[arg(long = "cc_num_compaction_workers", default_value_t = 2)]
    pub(crate) cc_num_compaction_workers: u32,

    #[arg(long = "cc_num_wb_workers", default_value_t = 1)]
    pub(crate) cc_num_wb_workers: u32,

    #[arg(long = "cc_block_cache_mb", default_value_t = 256)]
    pub(crate) cc_block_cache_mb: u32,

    #[arg(long = "cc_write_buffer_size_mb", default_value_t = 64)]
    pub(crate) cc_write_buffer_size_mb: u32,

    #[arg(long = "rdma_port", default_value_t = 9000)]
    pub(crate) rdma_port: u16,

    #[arg(long = "rdma_max_msg_size", default_value_t = 4096)]
    pub(crate) rdma_max_msg_size: u32,

    #[arg(long = "rdma_max_num_sends", default_value_t = 32)]
    pub(crate) rdma_max_num_sends: u32,

    #[arg(long = "rdma_doorbell_batch_size", default_value_t = 8)]
    pub(crate) rdma_doorbell_batch_size: u32,

    #[arg(long = "rdma_pq_batch_size", default_value_t = 8)]
    pub(crate) rdma_pq_batch_size: u32,

    #[arg(long = "mem_pool_size_gb", default_value_t = 4)]
    pub(crate) mem_pool_size_gb: u32,

    #[arg(long = "use_fixed_value_size", default_value_t = false)]
    pub(crate) use_fixed_value_size: bool,
}

/// Mirrors [`Component`] so `clap`'s `ValueEnum` derive doesn't need to live on the `nova-ltc`
/// side of the crate boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum CliComponent {
    Cc,
    Mc,
    Dc,
}

impl From<CliComponent> for Component {
    fn from(value: CliComponent) -> Self {
        match value {
            CliComponent::Cc => Self::Cc,
            CliComponent::Mc => Self::Mc,
            CliComponent::Dc => Self::Dc,
        }
    }
}

impl Cli {
    #[must_use]
    pub(crate) fn into_config(self) -> Config {
        Config {
            db_path:        self.db_path,
            server_id:      self.server_id,
            comp:           self.comp.into(),
            cc_config_path: self.cc_config_path,
            dc_config_path: self.dc_config_path,
            enable_rdma:    self.enable_rdma,
            enable_load_data: self.enable_load_data,

            cc_num_conn_workers:       self.cc_num_conn_workers,
            cc_num_async_workers:      self.cc_num_async_workers,
            cc_num_compaction_workers: self.cc_num_compaction_workers,
            cc_num_wb_workers:         self.cc_num_wb_workers,
            cc_block_cache_mb:         self.cc_block_cache_mb,
            cc_write_buffer_size_mb:   self.cc_write_buffer_size_mb,

            rdma_port:                self.rdma_port,
            rdma_max_msg_size:        self.rdma_max_msg_size,
            rdma_max_num_sends:       self.rdma_max_num_sends,
            rdma_doorbell_batch_size: self.rdma_doorbell_batch_size,
            rdma_pq_batch_size:       self.rdma_pq_batch_size,

            mem_pool_size_gb:     self.mem_pool_size_gb,
            use_fixed_value_size: self.use_fixed_value_size,
        }
    }
}
