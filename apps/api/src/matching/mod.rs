// Candidate/vacancy matching engine.
// Implements: segmentation, experience matching, categorization, similarity
// oracles, scoring. Network access happens only inside embedding_client.

pub mod categorizer;
pub mod depth;
pub mod embedding_client;
pub mod engine;
pub mod experience;
pub mod handlers;
pub mod models;
pub mod oracle;
pub mod segmenter;
