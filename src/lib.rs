pub mod changelog;
pub mod classify;
pub mod config;
pub mod html;
pub mod keys;
pub mod lexicon;
pub mod pipeline;
pub mod progress;
pub mod quality;
pub mod resolve;
pub mod table;
pub mod textutil;
