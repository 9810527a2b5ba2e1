//! Balance simulator for the default economy.
//! Run with: cargo test simulate_greedy -- --nocapture
