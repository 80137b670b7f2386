//! Gas schedule shared by the stateful precompiles.

/// Cost of writing one storage slot.
pub const WRITE_GAS_COST_PER_SLOT: u64 = 20_000;

/// Cost of reading one storage slot.
pub const READ_GAS_COST_PER_SLOT: u64 = 5_000;

/// Base cost of emitting a log.
pub const LOG_GAS: u64 = 375;

/// Cost per log topic.
pub const LOG_TOPIC_GAS: u64 = 375;

/// Cost per byte of log data.
pub const LOG_DATA_GAS: u64 = 8;

/// Gas charged for a log with `topics` topics and `data_len` bytes of data.
pub const fn log_gas(topics: usize, data_len: usize) -> u64 {
    LOG_GAS
        .saturating_add(LOG_TOPIC_GAS.saturating_mul(topics as u64))
        .saturating_add(LOG_DATA_GAS.saturating_mul(data_len as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_gas_counts_topics_and_bytes() {
        assert_eq!(log_gas(0, 0), 375);
        assert_eq!(log_gas(4, 32), 375 + 4 * 375 + 32 * 8);
    }
}
