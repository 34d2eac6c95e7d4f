// Job Engine Infrastructure - In-Memory Adapter
// Implements: JobStore (live queue ordered by dispatch key + dead-letter list)

mod job_store;

pub use job_store::MemoryJobStore;
