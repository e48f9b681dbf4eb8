/// All tunable parameters -- exposed as request overrides in the server.
#[derive(Clone, Debug)]
pub struct Params {
    // Board
    pub tile_size: usize,

    // Population phase
    pub retry_budget: u32,
    pub populate_delay_ms: u64,

    // Animation phase
    pub animate_delay_ms: u64,
    /// Animation ticks recorded by headless drivers. The live animation
    /// itself has no terminal condition.
    pub animation_steps: usize,

    // Longest-path search
    pub search_delay_ms: u64,
    pub search_depth_limit: usize,
    pub search_node_budget: usize,

    // Command handling
    pub restart_delay_ms: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            tile_size: 8,
            retry_budget: 32,
            populate_delay_ms: 1,
            animate_delay_ms: 100,
            animation_steps: 256,
            search_delay_ms: 1000,
            search_depth_limit: 64,
            search_node_budget: 20_000,
            restart_delay_ms: 10,
        }
    }
}
