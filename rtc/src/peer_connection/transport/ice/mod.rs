pub(crate) mod candidate;
pub(crate) mod candidate_set;
pub(crate) mod candidate_type;
pub(crate) mod protocol;
pub(crate) mod server;
