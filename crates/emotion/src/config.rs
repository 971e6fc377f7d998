/// Run-time knobs for [`crate::emotion_engine::system::System`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Core cycles per bus cycle. Timers advance once per bus cycle.
    pub bus_divider: u64,
    /// Start executing here instead of the reset vector or the ELF entry.
    pub entry_point: Option<u32>,
    /// Core cycles to run before returning; `None` runs forever.
    pub cycles: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bus_divider: 2,
            entry_point: None,
            cycles: None,
        }
    }
}
