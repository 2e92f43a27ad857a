pub mod fetch;
pub mod naming;
pub mod pipeline;
pub mod resolver;
pub mod retry;
pub mod tagger;
pub mod track;
pub mod transcode;
