use crate::error::Error;

/// Which role this process plays (`--comp` flag): `Cc` is an LTC compute node, `Mc` a
/// metadata-cache node, `Dc` a StoC storage node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    Cc,
    Mc,
    Dc,
}

/// Immutable process configuration, constructed once at startup and passed by reference to
/// every component thereafter ("Global state" design note: no mutable singleton).
#[derive(Debug, Clone)]
pub struct Config {
    pub db_path:        String,
    pub server_id:      u32,
    pub comp:           Component,
    pub cc_config_path: Option<String>,
    pub dc_config_path: Option<String>,
    pub enable_rdma:    bool,
    pub enable_load_data: bool,

    pub cc_num_conn_workers:       u32,
    pub cc_num_async_workers:      u32,
    pub cc_num_compaction_workers: u32,
    pub cc_num_wb_workers:         u32,
    pub cc_block_cache_mb:         u32,
    pub cc_write_buffer_size_mb:   u32,

    pub rdma_port:               u16,
    pub rdma_max_msg_size:       u32,
    pub rdma_max_num_sends:      u32,
    pub rdma_doorbell_batch_size: u32,
    pub rdma_pq_batch_size:      u32,

    pub mem_pool_size_gb:       u32,
    pub use_fixed_value_size:   bool,
}

impl Config {
    /// Checks the invariants that require a non-zero exit: a server id must be set, and
    /// (Open Question, resolved in `DESIGN.md`: "`dc_workers`" is read as `cc_num_conn_workers`,
    /// since no separate `dc_*` worker-count flag is named) the compaction and async worker
    /// counts must sum to the connection worker count.
    ///
    /// # Errors
    /// `InvalidArgument` naming which check failed.
    pub fn validate(&self) -> Result<(), Error> {
        if self.server_id == 0 {
            return Err(Error::InvalidArgument("server_id must be set".to_owned()));
        }
        let dc_workers = self.cc_num_conn_workers;
        let dispatch_workers = self.cc_num_compaction_workers + self.cc_num_async_workers;
        if dispatch_workers != dc_workers {
            return Err(Error::InvalidArgument(format!(
                "cc_num_compaction_workers ({}) + cc_num_async_workers ({}) must equal \
                 cc_num_conn_workers ({dc_workers})",
                self.cc_num_compaction_workers, self.cc_num_async_workers,
            )));
        }
        Ok(())
    }
}
