// Pipelines — batch extraction and the classify/rescore workflows.

pub mod classify;
pub mod extract;
