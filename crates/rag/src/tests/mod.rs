//! End-to-end orchestrator scenarios.
