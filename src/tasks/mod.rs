pub(crate) mod scheduler;
pub(crate) mod status_sweep;
